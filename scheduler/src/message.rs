//! The fixed-size frame exchanged between the server and a simulated process.
//!
//! A frame is three native-endian 32-bit words: the pid, the request kind and
//! a time value in milliseconds.

use crate::{Pid, Timestamp};

/// Size of one frame on the wire.
pub const MESSAGE_SIZE: usize = 12;

const REQUEST_RUN: u32 = 0;
const REQUEST_BLOCK: u32 = 1;
const REQUEST_DONE: u32 = 2;
const REQUEST_ACK: u32 = 3;

/// Kind of a request or notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Request {
    /// Client asks for `time_ms` of CPU time.
    Run,
    /// Client blocks on I/O for `time_ms`.
    Block,
    /// Server reports that the last RUN or BLOCK finished.
    Done,
    /// Server acknowledges a RUN or BLOCK.
    Ack,
    /// Any code the protocol does not define.
    Unknown(u32),
}

impl Request {
    pub fn code(&self) -> u32 {
        match self {
            Request::Run => REQUEST_RUN,
            Request::Block => REQUEST_BLOCK,
            Request::Done => REQUEST_DONE,
            Request::Ack => REQUEST_ACK,
            Request::Unknown(code) => *code,
        }
    }

    pub fn from_code(code: u32) -> Request {
        match code {
            REQUEST_RUN => Request::Run,
            REQUEST_BLOCK => Request::Block,
            REQUEST_DONE => Request::Done,
            REQUEST_ACK => Request::Ack,
            other => Request::Unknown(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Message {
    pub pid: u32,
    pub request: Request,
    pub time_ms: u32,
}

impl Message {
    pub fn new(pid: u32, request: Request, time_ms: u32) -> Message {
        Message {
            pid,
            request,
            time_ms,
        }
    }

    /// The ACK sent back for an accepted RUN or BLOCK
    pub fn ack(pid: Pid, now: Timestamp) -> Message {
        Message::new(pid.get(), Request::Ack, now.as_wire())
    }

    /// The DONE sent when a RUN or BLOCK has been fully served
    pub fn done(pid: Pid, now: Timestamp) -> Message {
        Message::new(pid.get(), Request::Done, now.as_wire())
    }

    pub fn encode(&self) -> [u8; MESSAGE_SIZE] {
        let mut frame = [0u8; MESSAGE_SIZE];
        frame[0..4].copy_from_slice(&self.pid.to_ne_bytes());
        frame[4..8].copy_from_slice(&self.request.code().to_ne_bytes());
        frame[8..12].copy_from_slice(&self.time_ms.to_ne_bytes());
        frame
    }

    pub fn decode(frame: &[u8; MESSAGE_SIZE]) -> Message {
        let word = |at: usize| {
            u32::from_ne_bytes([frame[at], frame[at + 1], frame[at + 2], frame[at + 3]])
        };

        Message {
            pid: word(0),
            request: Request::from_code(word(4)),
            time_ms: word(8),
        }
    }
}
