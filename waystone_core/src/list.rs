use serde::{Deserialize, Serialize};
use thiserror::Error;
use waystone_proto::{WaystoneId, WaystoneRef};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListError {
    #[error("index {index} outside list of length {len}")]
    OutOfRange { index: usize, len: usize },
}

/// Ordered per-player sequence of waystones.
///
/// Sort indices always equal list positions (`0..len`), so the sequence has
/// no gaps or duplicates no matter which mutations were applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerWaystoneList {
    waystones: Vec<WaystoneRef>,
}

impl PlayerWaystoneList {
    pub fn new(waystones: Vec<WaystoneRef>) -> Self {
        let mut list = Self { waystones };
        list.reindex();
        list
    }

    pub fn entries(&self) -> &[WaystoneRef] {
        &self.waystones
    }

    pub fn into_entries(self) -> Vec<WaystoneRef> {
        self.waystones
    }

    pub fn len(&self) -> usize {
        self.waystones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waystones.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WaystoneRef> {
        self.waystones.get(index)
    }

    pub fn position(&self, id: WaystoneId) -> Option<usize> {
        self.waystones.iter().position(|waystone| waystone.id == id)
    }

    pub fn find(&self, id: WaystoneId) -> Option<&WaystoneRef> {
        self.waystones.iter().find(|waystone| waystone.id == id)
    }

    fn check(&self, index: usize) -> Result<(), ListError> {
        if index < self.waystones.len() {
            Ok(())
        } else {
            Err(ListError::OutOfRange {
                index,
                len: self.waystones.len(),
            })
        }
    }

    /// Exchange two entries. Returns whether the order changed.
    pub fn swap(&mut self, index: usize, other_index: usize) -> Result<bool, ListError> {
        self.check(index)?;
        self.check(other_index)?;
        if index == other_index {
            return Ok(false);
        }
        self.waystones.swap(index, other_index);
        self.waystones[index].sort_index = index as u32;
        self.waystones[other_index].sort_index = other_index as u32;
        Ok(true)
    }

    /// Remove by id, compacting the indices of everything after it.
    pub fn remove(&mut self, id: WaystoneId) -> Option<WaystoneRef> {
        let index = self.position(id)?;
        let removed = self.waystones.remove(index);
        self.reindex();
        Some(removed)
    }

    fn reindex(&mut self) {
        for (index, waystone) in self.waystones.iter_mut().enumerate() {
            waystone.sort_index = index as u32;
        }
    }
}

impl From<Vec<WaystoneRef>> for PlayerWaystoneList {
    fn from(waystones: Vec<WaystoneRef>) -> Self {
        Self::new(waystones)
    }
}
