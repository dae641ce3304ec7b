//! Transports between the server and its simulated processes.
//!
//! The engine only needs three non-blocking primitives: accept a pending
//! connection, read one framed message, and write one framed message.
//! [`unix`] implements them over Unix domain sockets, [`memory`] over
//! in-process buffers for deterministic runs.

use std::io::{self, Read, Write};

use crate::error::SendError;
use crate::message::{Message, MESSAGE_SIZE};

pub mod memory;
pub mod unix;

pub use memory::{MemoryChannel, MemoryListener, MemoryPeer};
pub use unix::{UnixChannel, UnixListenerSource};

/// Result of one non-blocking read attempt on a channel.
#[derive(Debug)]
pub enum RecvOutcome {
    /// A complete frame arrived.
    Message(Message),
    /// Nothing (or only part of a frame) is available yet.
    WouldBlock,
    /// The peer closed the connection.
    Closed,
    /// Hard read failure.
    Failed(io::Error),
}

/// One client connection, message-framed and non-blocking on reads.
pub trait Channel {
    /// Attempts to read one request without blocking.
    fn try_recv(&mut self) -> RecvOutcome;

    /// Hands one message to the client without blocking.
    ///
    /// Frames are never truncated: what the peer cannot take yet is kept
    /// and written ahead of later traffic.
    fn send(&mut self, msg: &Message) -> Result<(), SendError>;
}

/// Source of new client connections.
pub trait Listener {
    type Channel: Channel;

    /// Accepts one pending connection.
    ///
    /// `Ok(None)` means no connection is pending right now.
    fn accept(&mut self) -> io::Result<Option<Self::Channel>>;
}

/// Reassembles frames that arrive split across several reads
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: [u8; MESSAGE_SIZE],
    filled: usize,
}

impl FrameBuffer {
    pub fn new() -> FrameBuffer {
        FrameBuffer::default()
    }

    /// Reads from `source` until a frame is complete or the source would block
    pub fn read_from<R: Read>(&mut self, source: &mut R) -> RecvOutcome {
        while self.filled < MESSAGE_SIZE {
            match source.read(&mut self.buf[self.filled..]) {
                Ok(0) => return RecvOutcome::Closed,
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return RecvOutcome::WouldBlock,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return RecvOutcome::Failed(e),
            }
        }

        self.filled = 0;
        RecvOutcome::Message(Message::decode(&self.buf))
    }
}

/// Most frames a channel holds for a client that is not reading
pub const OUTBOX_FRAMES: usize = 64;

/// Frames written by the server but not yet taken by the socket
///
/// Writes never wait: whatever the socket refuses stays here, whole frames
/// only, and goes out on the next flush. A client that lets more than
/// [`OUTBOX_FRAMES`] pile up is reported as stalled.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<u8>,
}

impl Outbox {
    pub fn new() -> Outbox {
        Outbox::default()
    }

    /// Queues one frame behind the ones already pending
    pub fn push(&mut self, msg: &Message) -> Result<(), SendError> {
        if self.pending.len() + MESSAGE_SIZE > OUTBOX_FRAMES * MESSAGE_SIZE {
            return Err(SendError::Stalled);
        }

        self.pending.extend_from_slice(&msg.encode());
        Ok(())
    }

    /// Writes as much as `sink` accepts without blocking
    pub fn flush_to<W: Write>(&mut self, sink: &mut W) -> Result<(), SendError> {
        while !self.pending.is_empty() {
            match sink.write(&self.pending) {
                Ok(0) => return Err(SendError::Closed),
                Ok(n) => {
                    self.pending.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset) => {
                    return Err(SendError::Closed)
                }
                Err(e) => return Err(SendError::Io(e)),
            }
        }

        Ok(())
    }

    /// Bytes still waiting for the socket
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
