//! In-process transport.
//!
//! Everything lives behind `Rc<RefCell<..>>`: the engine is single-threaded,
//! so a harness can drive ticks back to back and inspect what every simulated
//! process received without any real sockets or pacing delays.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read};
use std::rc::Rc;

use super::{Channel, FrameBuffer, Listener, RecvOutcome};
use crate::error::SendError;
use crate::message::Message;

#[derive(Debug, Default)]
struct Pipe {
    /// Bytes written by the client, not yet read by the server
    inbound: VecDeque<u8>,
    /// Messages delivered by the server, not yet taken by the client
    outbound: VecDeque<Message>,
    client_closed: bool,
    server_closed: bool,
    broken: Option<io::ErrorKind>,
}

/// Server side of an in-memory connection
#[derive(Debug)]
pub struct MemoryChannel {
    pipe: Rc<RefCell<Pipe>>,
    frame: FrameBuffer,
}

/// Client side of an in-memory connection
#[derive(Debug, Clone)]
pub struct MemoryPeer {
    pipe: Rc<RefCell<Pipe>>,
}

struct PipeReader<'a> {
    pipe: &'a RefCell<Pipe>,
}

impl Read for PipeReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut pipe = self.pipe.borrow_mut();

        if let Some(kind) = pipe.broken {
            return Err(kind.into());
        }

        if pipe.inbound.is_empty() {
            return if pipe.client_closed {
                Ok(0)
            } else {
                Err(io::ErrorKind::WouldBlock.into())
            };
        }

        let n = buf.len().min(pipe.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(pipe.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Channel for MemoryChannel {
    fn try_recv(&mut self) -> RecvOutcome {
        let mut reader = PipeReader { pipe: &self.pipe };
        self.frame.read_from(&mut reader)
    }

    fn send(&mut self, msg: &Message) -> Result<(), SendError> {
        let mut pipe = self.pipe.borrow_mut();

        if let Some(kind) = pipe.broken {
            return Err(SendError::Io(kind.into()));
        }
        if pipe.client_closed {
            return Err(SendError::Closed);
        }

        pipe.outbound.push_back(*msg);
        Ok(())
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.pipe.borrow_mut().server_closed = true;
    }
}

impl MemoryPeer {
    /// Sends a request frame to the server
    pub fn send(&self, msg: Message) {
        self.send_raw(&msg.encode());
    }

    /// Writes arbitrary bytes, e.g. half a frame
    pub fn send_raw(&self, bytes: &[u8]) {
        self.pipe.borrow_mut().inbound.extend(bytes.iter().copied());
    }

    /// Takes every message the server has delivered so far
    pub fn received(&self) -> Vec<Message> {
        self.pipe.borrow_mut().outbound.drain(..).collect()
    }

    /// Orderly close from the client side
    pub fn close(&self) {
        self.pipe.borrow_mut().client_closed = true;
    }

    /// Makes every further read and write on the server side fail with `kind`
    pub fn break_with(&self, kind: io::ErrorKind) {
        self.pipe.borrow_mut().broken = Some(kind);
    }

    /// True once the server dropped its end of the connection
    pub fn is_released(&self) -> bool {
        self.pipe.borrow().server_closed
    }
}

/// Listener whose pending connections are created by [`MemoryListener::connect`]
///
/// Clones share the same backlog, so a harness keeps one clone to connect
/// clients while the simulation owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryListener {
    backlog: Rc<RefCell<VecDeque<MemoryChannel>>>,
}

impl MemoryListener {
    pub fn new() -> MemoryListener {
        MemoryListener::default()
    }

    /// Queues a new connection and returns its client side
    pub fn connect(&self) -> MemoryPeer {
        let pipe = Rc::new(RefCell::new(Pipe::default()));

        self.backlog.borrow_mut().push_back(MemoryChannel {
            pipe: Rc::clone(&pipe),
            frame: FrameBuffer::new(),
        });

        MemoryPeer { pipe }
    }
}

impl Listener for MemoryListener {
    type Channel = MemoryChannel;

    fn accept(&mut self) -> io::Result<Option<MemoryChannel>> {
        Ok(self.backlog.borrow_mut().pop_front())
    }
}
