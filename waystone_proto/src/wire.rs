use thiserror::Error;
use uuid::Uuid;

use crate::WaystoneId;

const TAG_SELECT: u8 = 0x01;
const TAG_SORT: u8 = 0x02;
const TAG_REMOVE: u8 = 0x03;
const TAG_REQUEST_EDIT: u8 = 0x04;

const UUID_LEN: usize = 16;

/// Commands a client sends about its waystone list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireMessage {
    Select { waystone: WaystoneId },
    /// Indices address the sender's full list. Lists longer than 256 entries
    /// cannot be fully addressed.
    Sort { index: u8, other_index: u8 },
    Remove { waystone: WaystoneId },
    RequestEdit { waystone: WaystoneId },
}

/// Error returned when a frame does not hold a well-formed command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireDecodeError {
    #[error("empty command frame")]
    Empty,
    #[error("unknown command tag {0:#04x}")]
    UnknownTag(u8),
    #[error("{kind} payload must be {expected} bytes, got {actual}")]
    Length {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl WireMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Select { .. } => "select",
            WireMessage::Sort { .. } => "sort",
            WireMessage::Remove { .. } => "remove",
            WireMessage::RequestEdit { .. } => "request_edit",
        }
    }

    pub fn encoded_len(&self) -> usize {
        1 + match self {
            WireMessage::Sort { .. } => 2,
            _ => UUID_LEN,
        }
    }

    /// Encode as `tag ++ payload`.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.encoded_len());
        match self {
            WireMessage::Select { waystone } => {
                buffer.push(TAG_SELECT);
                buffer.extend_from_slice(waystone.0.as_bytes());
            }
            WireMessage::Sort { index, other_index } => {
                buffer.push(TAG_SORT);
                buffer.push(*index);
                buffer.push(*other_index);
            }
            WireMessage::Remove { waystone } => {
                buffer.push(TAG_REMOVE);
                buffer.extend_from_slice(waystone.0.as_bytes());
            }
            WireMessage::RequestEdit { waystone } => {
                buffer.push(TAG_REQUEST_EDIT);
                buffer.extend_from_slice(waystone.0.as_bytes());
            }
        }
        buffer
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireDecodeError> {
        let (&tag, payload) = bytes.split_first().ok_or(WireDecodeError::Empty)?;
        match tag {
            TAG_SELECT => Ok(WireMessage::Select {
                waystone: read_uuid("select", payload)?,
            }),
            TAG_SORT => match payload {
                [index, other_index] => Ok(WireMessage::Sort {
                    index: *index,
                    other_index: *other_index,
                }),
                _ => Err(WireDecodeError::Length {
                    kind: "sort",
                    expected: 2,
                    actual: payload.len(),
                }),
            },
            TAG_REMOVE => Ok(WireMessage::Remove {
                waystone: read_uuid("remove", payload)?,
            }),
            TAG_REQUEST_EDIT => Ok(WireMessage::RequestEdit {
                waystone: read_uuid("request_edit", payload)?,
            }),
            other => Err(WireDecodeError::UnknownTag(other)),
        }
    }
}

fn read_uuid(kind: &'static str, payload: &[u8]) -> Result<WaystoneId, WireDecodeError> {
    let bytes: [u8; UUID_LEN] = payload.try_into().map_err(|_| WireDecodeError::Length {
        kind,
        expected: UUID_LEN,
        actual: payload.len(),
    })?;
    Ok(WaystoneId(Uuid::from_bytes(bytes)))
}
