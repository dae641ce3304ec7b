//! Connection and protocol handling.
//!
//! New clients land in the command queue. A RUN moves a PCB to the ready
//! structure, a BLOCK to the blocked queue; both are acknowledged with the
//! current time. When a block expires the client gets DONE and goes back to
//! the command queue for its next instruction.

use std::io;

use log::{debug, error, warn};

use crate::channel::{Channel, Listener, RecvOutcome};
use crate::message::{Message, Request};
use crate::process_control_block::PcbStore;
use crate::queue::{Queue, ReadyStructure};
use crate::{Clock, Timestamp};

/// What one pass over the listener and the command queue did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommandScan {
    /// New connections accepted
    pub accepted: usize,
    /// PCBs discarded because their client hung up or failed
    pub cancelled: usize,
    /// PCBs moved to the ready structure
    pub admitted: usize,
    /// PCBs moved to the blocked queue
    pub blocked: usize,
    /// Requests of an unexpected kind
    pub ignored: usize,
}

impl CommandScan {
    pub fn merge(&mut self, other: CommandScan) {
        self.accepted += other.accepted;
        self.cancelled += other.cancelled;
        self.admitted += other.admitted;
        self.blocked += other.blocked;
        self.ignored += other.ignored;
    }
}

/// Owns the listener, the command queue and the blocked queue
pub struct ProcessManager<L: Listener> {
    listener: L,
    store: PcbStore,
    command: Queue<L::Channel>,
    blocked: Queue<L::Channel>,
}

impl<L: Listener> ProcessManager<L> {
    pub fn new(listener: L) -> ProcessManager<L> {
        ProcessManager {
            listener,
            store: PcbStore::new(),
            command: Queue::new(),
            blocked: Queue::new(),
        }
    }

    /// PCBs waiting for their next instruction
    pub fn command_queue(&self) -> &Queue<L::Channel> {
        &self.command
    }

    /// PCBs serving a BLOCK instruction
    pub fn blocked_queue(&self) -> &Queue<L::Channel> {
        &self.blocked
    }

    /// Accepts every pending connection
    ///
    /// Stops at the first would-block, at a descriptor limit, or at an
    /// unexpected error; whatever is left is picked up on the next call.
    pub fn accept_new(&mut self) -> usize {
        let mut accepted = 0;

        loop {
            match self.listener.accept() {
                Ok(Some(channel)) => {
                    let pcb = self.store.create(channel, 0);
                    debug!("new client connected: pid={}", pcb.pid());
                    self.command.enqueue(pcb);
                    accepted += 1;
                }
                Ok(None) => break,
                Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted) => {
                    continue
                }
                Err(e) if is_resource_limit(&e) => {
                    warn!("accept: too many open descriptors: {}", e);
                    break;
                }
                Err(e) => {
                    error!("accept: {}", e);
                    break;
                }
            }
        }

        accepted
    }

    /// Accepts new clients, then polls every PCB in the command queue once
    pub fn check_commands(&mut self, now: Timestamp, ready: &mut ReadyStructure<L::Channel>) -> CommandScan {
        let mut scan = CommandScan {
            accepted: self.accept_new(),
            ..CommandScan::default()
        };

        let ProcessManager { command, blocked, .. } = self;

        command.sweep(|mut pcb| match pcb.channel_mut().try_recv() {
            RecvOutcome::WouldBlock => Some(pcb),
            RecvOutcome::Closed => {
                debug!("process {}: connection closed by client", pcb.pid());
                scan.cancelled += 1;
                pcb.destroy();
                None
            }
            RecvOutcome::Failed(e) => {
                error!("process {}: read: {}", pcb.pid(), e);
                scan.cancelled += 1;
                pcb.destroy();
                None
            }
            RecvOutcome::Message(msg) => match msg.request {
                Request::Run => {
                    debug!("process {} requested RUN for {} ms", pcb.pid(), msg.time_ms);
                    pcb.load_run(msg.time_ms);
                    pcb.notify(Message::ack(pcb.pid(), now));
                    ready.admit(pcb);
                    scan.admitted += 1;
                    None
                }
                Request::Block => {
                    debug!("process {} requested BLOCK for {} ms", pcb.pid(), msg.time_ms);
                    pcb.load_block(msg.time_ms, now);
                    pcb.notify(Message::ack(pcb.pid(), now));
                    blocked.enqueue(pcb);
                    scan.blocked += 1;
                    None
                }
                other => {
                    warn!("process {}: unexpected request {:?} from client", pcb.pid(), other);
                    scan.ignored += 1;
                    Some(pcb)
                }
            },
        });

        scan
    }

    /// Charges one tick to every blocked PCB
    ///
    /// A PCB is charged at most once per tick however often this runs. Once
    /// its block has elapsed it is sent DONE and returns to the command
    /// queue. Returns how many PCBs were released.
    pub fn check_blocked(&mut self, clock: &Clock) -> usize {
        let now = clock.now();
        let mut released = 0;

        let ProcessManager { command, blocked, .. } = self;

        blocked.sweep(|mut pcb| {
            if !pcb.tick_blocked(now, clock.tick_ms()) {
                return Some(pcb);
            }

            debug!("process {} finished BLOCK, sending DONE", pcb.pid());
            pcb.notify(Message::done(pcb.pid(), now));
            pcb.await_instruction();
            command.enqueue(pcb);
            released += 1;
            None
        });

        released
    }
}

fn is_resource_limit(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(libc::EMFILE) | Some(libc::ENFILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{MemoryChannel, MemoryListener};
    use crate::scheduler::ProcessState;
    use crate::Pid;

    fn manager() -> (MemoryListener, ProcessManager<MemoryListener>, ReadyStructure<MemoryChannel>) {
        let listener = MemoryListener::new();
        let manager = ProcessManager::new(listener.clone());
        (listener, manager, ReadyStructure::single())
    }

    #[test]
    fn connections_wait_in_command_queue() {
        let (listener, mut manager, mut ready) = manager();
        listener.connect();
        listener.connect();

        let scan = manager.check_commands(Timestamp::new(0), &mut ready);

        assert_eq!(scan.accepted, 2);
        assert_eq!(manager.command_queue().pids(), vec![Pid::new(1), Pid::new(2)]);
        assert!(manager
            .command_queue()
            .iter()
            .all(|pcb| pcb.state() == ProcessState::AwaitingInstruction && pcb.requested_ms() == 0));
    }

    #[test]
    fn run_is_acknowledged_and_admitted() {
        let (listener, mut manager, mut ready) = manager();
        let client = listener.connect();
        client.send(Message::new(0, Request::Run, 700));

        let scan = manager.check_commands(Timestamp::new(400), &mut ready);

        assert_eq!(scan.admitted, 1);
        assert!(manager.command_queue().is_empty());
        assert_eq!(client.received(), vec![Message::new(1, Request::Ack, 400)]);

        let pcb = ready.queue(0).and_then(Queue::head).unwrap();
        assert_eq!(pcb.state(), ProcessState::Ready);
        assert_eq!(pcb.requested_ms(), 700);
        assert_eq!(pcb.elapsed_ms(), 0);
    }

    #[test]
    fn hangup_cancels_silently() {
        let (listener, mut manager, mut ready) = manager();
        let quiet = listener.connect();
        let leaving = listener.connect();
        let broken = listener.connect();
        leaving.close();
        broken.break_with(io::ErrorKind::ConnectionReset);

        let scan = manager.check_commands(Timestamp::new(0), &mut ready);

        assert_eq!(scan.cancelled, 2);
        assert_eq!(manager.command_queue().pids(), vec![Pid::new(1)]);
        assert!(leaving.is_released());
        assert!(broken.is_released());
        assert!(leaving.received().is_empty());
        assert!(!quiet.is_released());
    }

    #[test]
    fn unexpected_requests_leave_pcb_in_place() {
        let (listener, mut manager, mut ready) = manager();
        let client = listener.connect();
        client.send(Message::new(0, Request::Ack, 0));
        client.send(Message::new(0, Request::Unknown(9), 0));

        let first = manager.check_commands(Timestamp::new(0), &mut ready);
        let second = manager.check_commands(Timestamp::new(0), &mut ready);

        assert_eq!(first.ignored + second.ignored, 2);
        assert_eq!(manager.command_queue().len(), 1);
        assert!(client.received().is_empty());

        client.send(Message::new(0, Request::Run, 100));
        manager.check_commands(Timestamp::new(100), &mut ready);
        assert_eq!(ready.len(), 1);
    }

    #[test]
    fn block_round_trip_returns_to_command_queue() {
        let (listener, mut manager, mut ready) = manager();
        let client = listener.connect();
        client.send(Message::new(0, Request::Block, 200));

        let mut clock = Clock::new(100);
        manager.check_commands(clock.now(), &mut ready);
        assert_eq!(manager.blocked_queue().len(), 1);
        assert_eq!(client.received(), vec![Message::new(1, Request::Ack, 0)]);

        assert_eq!(manager.check_blocked(&clock), 0);
        clock.advance();
        assert_eq!(manager.check_blocked(&clock), 0);
        assert_eq!(manager.check_blocked(&clock), 0);
        clock.advance();
        assert_eq!(manager.check_blocked(&clock), 1);

        assert!(manager.blocked_queue().is_empty());
        assert_eq!(manager.command_queue().pids(), vec![Pid::new(1)]);
        assert_eq!(client.received(), vec![Message::new(1, Request::Done, 200)]);
    }

    #[test]
    fn request_split_across_scans_is_reassembled() {
        let (listener, mut manager, mut ready) = manager();
        let client = listener.connect();
        let frame = Message::new(0, Request::Run, 300).encode();

        client.send_raw(&frame[..5]);
        let scan = manager.check_commands(Timestamp::new(0), &mut ready);
        assert_eq!(scan, CommandScan { accepted: 1, ..CommandScan::default() });
        assert_eq!(manager.command_queue().pids(), vec![Pid::new(1)]);
        assert!(client.received().is_empty());

        client.send_raw(&frame[5..]);
        let scan = manager.check_commands(Timestamp::new(100), &mut ready);
        assert_eq!(scan.admitted, 1);
        assert!(manager.command_queue().is_empty());
        assert_eq!(client.received(), vec![Message::new(1, Request::Ack, 100)]);
        assert_eq!(ready.queue(0).and_then(Queue::head).map(|pcb| pcb.requested_ms()), Some(300));
    }

    #[test]
    fn hangup_mid_frame_cancels() {
        let (listener, mut manager, mut ready) = manager();
        let client = listener.connect();
        client.send_raw(&Message::new(0, Request::Block, 200).encode()[..7]);

        let scan = manager.check_commands(Timestamp::new(0), &mut ready);
        assert_eq!(scan.cancelled, 0);
        assert_eq!(manager.command_queue().len(), 1);

        client.close();
        let scan = manager.check_commands(Timestamp::new(100), &mut ready);
        assert_eq!(scan.cancelled, 1);
        assert!(manager.command_queue().is_empty());
        assert!(manager.blocked_queue().is_empty());
        assert!(client.is_released());
        assert!(client.received().is_empty());
    }
}
