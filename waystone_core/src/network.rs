use std::collections::HashMap;
use std::io::{self, BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use waystone_proto::{
    decode_hello, decode_snapshot, encode_hello, encode_snapshot, read_frame, write_frame,
    FrameError, ListSnapshot, SessionHello, WireMessage,
};

use crate::dispatcher::CommandSink;
use crate::handler::{AuthoritativeListHandler, SessionId};
use crate::store::WaystoneStore;

/// Connection activity forwarded from reader threads to the handler loop.
#[derive(Debug)]
pub enum SessionEvent {
    Opened {
        session: SessionId,
        hello: SessionHello,
        stream: TcpStream,
    },
    Command {
        session: SessionId,
        message: WireMessage,
    },
    Closed {
        session: SessionId,
    },
}

/// Bind the command listener and spawn its accept thread.
///
/// Every connection gets its own reader thread, but all of them feed the one
/// returned receiver, which serializes commands for the handler.
pub fn start_command_listener(
    bind_addr: SocketAddr,
) -> io::Result<(Receiver<SessionEvent>, SocketAddr)> {
    let listener = TcpListener::bind(bind_addr)?;
    let local_addr = listener.local_addr()?;
    let (sender, receiver) = unbounded::<SessionEvent>();
    let next_session = Arc::new(AtomicU64::new(1));

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let session = SessionId(next_session.fetch_add(1, Ordering::Relaxed));
                    let sender = sender.clone();
                    thread::spawn(move || handle_connection(session, stream, sender));
                }
                Err(err) => {
                    warn!(target: "waystones::net", "Error accepting command client: {}", err);
                }
            }
        }
    });

    Ok((receiver, local_addr))
}

fn handle_connection(session: SessionId, stream: TcpStream, sender: Sender<SessionEvent>) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    if let Err(err) = stream.set_nodelay(true) {
        warn!(target: "waystones::net", "Failed to set TCP_NODELAY: {}", err);
    }
    let writer = match stream.try_clone() {
        Ok(writer) => writer,
        Err(err) => {
            error!(target: "waystones::net", %peer, "connection.rejected=clone_failed: {}", err);
            return;
        }
    };
    let mut reader = BufReader::new(stream);

    let hello = match read_frame(&mut reader) {
        Ok(Some(frame)) => match decode_hello(&frame) {
            Ok(hello) => hello,
            Err(err) => {
                warn!(target: "waystones::net", %peer, "connection.rejected=bad_hello: {}", err);
                return;
            }
        },
        Ok(None) => return,
        Err(err) => {
            warn!(target: "waystones::net", %peer, "connection.rejected=hello_read: {}", err);
            return;
        }
    };
    info!(target: "waystones::net", %peer, %session, player = %hello.player, "Command client connected");
    if sender
        .send(SessionEvent::Opened {
            session,
            hello,
            stream: writer,
        })
        .is_err()
    {
        return;
    }

    loop {
        match read_frame(&mut reader) {
            Ok(Some(frame)) => match WireMessage::decode(&frame) {
                Ok(message) => {
                    if sender.send(SessionEvent::Command { session, message }).is_err() {
                        return;
                    }
                }
                Err(err) => warn!(target: "waystones::net", %session, "Invalid command: {}", err),
            },
            Ok(None) => break,
            Err(err) => {
                warn!(target: "waystones::net", %session, "Command read error: {}", err);
                break;
            }
        }
    }
    let _ = sender.send(SessionEvent::Closed { session });
}

/// Owns the handler and the write halves of open connections.
pub struct SessionLoop<S> {
    handler: AuthoritativeListHandler<S>,
    writers: HashMap<SessionId, TcpStream>,
}

impl<S: WaystoneStore> SessionLoop<S> {
    pub fn new(handler: AuthoritativeListHandler<S>) -> Self {
        Self {
            handler,
            writers: HashMap::new(),
        }
    }

    pub fn handler(&self) -> &AuthoritativeListHandler<S> {
        &self.handler
    }

    pub fn into_handler(self) -> AuthoritativeListHandler<S> {
        self.handler
    }

    /// Drain events until every sender is gone.
    pub fn run(&mut self, events: &Receiver<SessionEvent>) {
        while let Ok(event) = events.recv() {
            self.process(event);
        }
    }

    pub fn process(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Opened {
                session,
                hello,
                mut stream,
            } => {
                let snapshot = match self.handler.open_session(session, &hello) {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        error!(target: "waystones::server", %session, "session.open_failed: {}", err);
                        close_stream(session, &stream);
                        return;
                    }
                };
                let written = encode_snapshot(&snapshot)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
                    .and_then(|bytes| write_frame(&mut stream, &bytes));
                match written {
                    Ok(()) => {
                        self.writers.insert(session, stream);
                    }
                    Err(err) => {
                        warn!(target: "waystones::server", %session, "snapshot.send_failed: {}", err);
                        close_stream(session, &stream);
                        self.handler.close_session(session);
                    }
                }
            }
            SessionEvent::Command { session, message } => {
                if let Err(err) = self.handler.handle(session, message) {
                    error!(
                        target: "waystones::server",
                        %session,
                        kind = message.kind(),
                        "command.persist_failed: {}",
                        err
                    );
                }
            }
            SessionEvent::Closed { session } => {
                self.writers.remove(&session);
                self.handler.close_session(session);
            }
        }
    }
}

/// Shuts down both directions so the reader thread and the peer see EOF.
fn close_stream(session: SessionId, stream: &TcpStream) {
    if let Err(err) = stream.shutdown(Shutdown::Both) {
        debug!(target: "waystones::net", %session, "connection.shutdown_failed: {}", err);
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Io(#[from] io::Error),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("payload encoding failed: {0}")]
    Codec(#[from] bincode::Error),
    #[error("server closed the connection before sending a snapshot")]
    Closed,
}

/// Client end of the command connection.
pub struct CommandClient {
    writer: BufWriter<TcpStream>,
}

impl CommandClient {
    /// Connect, introduce the player and wait for the list snapshot.
    pub fn connect<A: ToSocketAddrs>(
        addr: A,
        hello: &SessionHello,
    ) -> Result<(Self, ListSnapshot), ClientError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);
        write_frame(&mut writer, &encode_hello(hello)?)?;
        let frame = read_frame(&mut reader)?.ok_or(ClientError::Closed)?;
        let snapshot = decode_snapshot(&frame)?;
        Ok((Self { writer }, snapshot))
    }
}

impl CommandSink for CommandClient {
    fn send(&mut self, message: WireMessage) {
        if let Err(err) = write_frame(&mut self.writer, &message.encode_to_vec()) {
            warn!(
                target: "waystones::client",
                kind = message.kind(),
                "command.send_failed: {}",
                err
            );
        }
    }
}
