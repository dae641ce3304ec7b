//! Client side of the protocol, for simulated processes and tests.

use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use crate::message::{Message, Request, MESSAGE_SIZE};

/// A simulated process connected to the scheduler server
///
/// All calls block. The `send_*` calls return as soon as the request is
/// written, which lets a caller that also drives the server's ticks avoid
/// waiting on itself.
#[derive(Debug)]
pub struct ProcessClient {
    stream: UnixStream,
    pid: u32,
}

impl ProcessClient {
    pub fn connect(path: impl AsRef<Path>) -> io::Result<ProcessClient> {
        let stream = UnixStream::connect(path)?;
        Ok(ProcessClient { stream, pid: 0 })
    }

    /// The pid the server assigned, known after the first ACK
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }

    pub fn send_run(&mut self, time_ms: u32) -> io::Result<()> {
        self.send(Message::new(self.pid, Request::Run, time_ms))
    }

    pub fn send_block(&mut self, time_ms: u32) -> io::Result<()> {
        self.send(Message::new(self.pid, Request::Block, time_ms))
    }

    pub fn send(&mut self, msg: Message) -> io::Result<()> {
        self.stream.write_all(&msg.encode())
    }

    /// Reads the next message from the server
    pub fn recv(&mut self) -> io::Result<Message> {
        let mut frame = [0u8; MESSAGE_SIZE];
        self.stream.read_exact(&mut frame)?;

        let msg = Message::decode(&frame);
        if msg.request == Request::Ack {
            self.pid = msg.pid;
        }
        Ok(msg)
    }

    /// Requests `time_ms` of CPU time; returns the server time of the ACK
    pub fn run(&mut self, time_ms: u32) -> io::Result<u32> {
        self.send_run(time_ms)?;
        self.expect_reply(Request::Ack).map(|msg| msg.time_ms)
    }

    /// Blocks for `time_ms`; returns the server time of the ACK
    pub fn block(&mut self, time_ms: u32) -> io::Result<u32> {
        self.send_block(time_ms)?;
        self.expect_reply(Request::Ack).map(|msg| msg.time_ms)
    }

    /// Waits for the DONE closing the current instruction
    pub fn wait_done(&mut self) -> io::Result<Message> {
        self.expect_reply(Request::Done)
    }

    fn expect_reply(&mut self, request: Request) -> io::Result<Message> {
        let msg = self.recv()?;
        if msg.request != request {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected {:?}, got {:?}", request, msg.request),
            ));
        }
        Ok(msg)
    }
}
