use std::fs;
use std::io;
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::{Channel, FrameBuffer, Listener, Outbox, RecvOutcome};
use crate::error::SendError;
use crate::message::Message;

/// A connected simulated process over a Unix stream socket
///
/// Reads and writes never block. Replies the socket cannot take yet wait in
/// an [`Outbox`] and are flushed on every later read or write. Once a client
/// lets the outbox overflow, or a write fails, the connection is shut down
/// and the next read reports it closed.
#[derive(Debug)]
pub struct UnixChannel {
    stream: UnixStream,
    frame: FrameBuffer,
    outbox: Outbox,
    hung_up: bool,
}

impl UnixChannel {
    /// Wraps an accepted stream and switches it to non-blocking mode
    pub fn new(stream: UnixStream) -> io::Result<UnixChannel> {
        stream.set_nonblocking(true)?;

        Ok(UnixChannel {
            stream,
            frame: FrameBuffer::new(),
            outbox: Outbox::new(),
            hung_up: false,
        })
    }

    /// Bytes of reply still waiting for the client to read
    pub fn backlog(&self) -> usize {
        self.outbox.pending()
    }

    fn hang_up(&mut self) {
        self.hung_up = true;
        self.outbox.clear();
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            debug!("shutdown: {}", e);
        }
    }
}

impl Channel for UnixChannel {
    fn try_recv(&mut self) -> RecvOutcome {
        if self.hung_up {
            return RecvOutcome::Closed;
        }

        if let Err(e) = self.outbox.flush_to(&mut self.stream) {
            debug!("flushing replies: {}", e);
            self.hang_up();
            return RecvOutcome::Closed;
        }

        self.frame.read_from(&mut self.stream)
    }

    fn send(&mut self, msg: &Message) -> Result<(), SendError> {
        if self.hung_up {
            return Err(SendError::Closed);
        }

        let result = self
            .outbox
            .flush_to(&mut self.stream)
            .and_then(|()| self.outbox.push(msg))
            .and_then(|()| self.outbox.flush_to(&mut self.stream));

        if result.is_err() {
            self.hang_up();
        }
        result
    }
}

impl Drop for UnixChannel {
    fn drop(&mut self) {
        if self.hung_up {
            return;
        }
        match self.outbox.flush_to(&mut self.stream) {
            Ok(()) if self.outbox.is_empty() => (),
            Ok(()) => warn!("dropping {} unread reply bytes", self.outbox.pending()),
            Err(e) => debug!("final flush: {}", e),
        }
    }
}

/// The server's listening socket
///
/// The socket file is removed again when the listener is dropped.
#[derive(Debug)]
pub struct UnixListenerSource {
    listener: UnixListener,
    path: PathBuf,
}

impl UnixListenerSource {
    /// Removes a stale socket file, binds `path` and makes accepts non-blocking
    pub fn bind(path: impl AsRef<Path>) -> io::Result<UnixListenerSource> {
        let path = path.as_ref().to_path_buf();

        match fs::remove_file(&path) {
            Ok(()) => debug!("removed stale socket {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => (),
            Err(e) => return Err(e),
        }

        let listener = UnixListener::bind(&path)?;
        listener.set_nonblocking(true)?;

        Ok(UnixListenerSource { listener, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Listener for UnixListenerSource {
    type Channel = UnixChannel;

    fn accept(&mut self) -> io::Result<Option<UnixChannel>> {
        match self.listener.accept() {
            Ok((stream, _)) => UnixChannel::new(stream).map(Some),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Drop for UnixListenerSource {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::message::{Request, MESSAGE_SIZE};

    /// Sends ACKs until the socket and the outbox are both full
    fn fill(channel: &mut UnixChannel) -> u32 {
        let mut sent = 0;
        while channel.send(&Message::new(1, Request::Ack, sent)).is_ok() {
            sent += 1;
            assert!(sent < 1_000_000, "send never pushed back");
        }
        sent
    }

    #[test]
    fn client_that_never_reads_is_hung_up() {
        let (server, _client) = UnixStream::pair().unwrap();
        let mut channel = UnixChannel::new(server).unwrap();

        let sent = fill(&mut channel);

        assert!(sent > 0);
        assert_eq!(channel.backlog(), 0);
        assert!(matches!(channel.try_recv(), RecvOutcome::Closed));
        assert!(matches!(
            channel.send(&Message::new(1, Request::Done, 0)),
            Err(SendError::Closed)
        ));
    }

    #[test]
    fn backlog_drains_in_order_once_the_client_reads() {
        let (server, mut client) = UnixStream::pair().unwrap();
        client.set_nonblocking(true).unwrap();
        let mut channel = UnixChannel::new(server).unwrap();

        let mut sent = 0;
        while channel.backlog() == 0 {
            channel.send(&Message::new(1, Request::Ack, sent)).unwrap();
            sent += 1;
            assert!(sent < 1_000_000, "socket never filled up");
        }
        for _ in 0..5 {
            channel.send(&Message::new(1, Request::Ack, sent)).unwrap();
            sent += 1;
        }

        let mut bytes = Vec::new();
        let mut chunk = [0u8; 4096];
        for _ in 0..10_000 {
            if bytes.len() == sent as usize * MESSAGE_SIZE {
                break;
            }
            assert!(matches!(channel.try_recv(), RecvOutcome::WouldBlock));
            match client.read(&mut chunk) {
                Ok(n) => bytes.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => (),
                Err(e) => panic!("client read: {e}"),
            }
        }

        assert_eq!(channel.backlog(), 0);
        let times: Vec<u32> = bytes
            .chunks_exact(MESSAGE_SIZE)
            .map(|frame| Message::decode(frame.try_into().unwrap()).time_ms)
            .collect();
        assert_eq!(times, (0..sent).collect::<Vec<_>>());
    }
}
