use log::{debug, warn};

use crate::channel::Channel;
use crate::message::Message;
use crate::scheduler::{Process, ProcessState};
use crate::{Pid, Timestamp};

/// The server-side record of one connected simulated process
///
/// A PCB is always held by value: by a queue, by the CPU slot, or by the
/// code moving it between the two. It cannot be in two places at once, and
/// it is destroyed exactly once, by consuming it.
#[derive(Debug)]
pub struct Pcb<C> {
    /// The pid of the process
    pid: Pid,
    /// The connection to the client process
    channel: C,
    /// The state of the process
    state: ProcessState,
    /// CPU time requested by the current RUN instruction
    time_ms: u32,
    /// CPU time already consumed towards `time_ms`
    elapsed_ms: u32,
    /// CPU time consumed in the current quantum
    slice_ms: u32,
    /// MLFQ level, 0 being the highest priority
    ///
    /// Only ever increases while serving one RUN instruction.
    level: usize,
    /// Time left before the current BLOCK instruction completes
    block_remaining_ms: u32,
    /// Last tick at which the blocked time was charged
    last_update: Timestamp,
}

impl<C> Pcb<C> {
    /// Creates a new Process Control Block, waiting for its first instruction
    ///
    /// * `pid` - pid of the new process
    /// * `channel` - connection to the client process
    /// * `time_ms` - initial requested duration
    pub(crate) fn new(pid: Pid, channel: C, time_ms: u32) -> Pcb<C> {
        Pcb {
            pid,
            channel,
            state: ProcessState::AwaitingInstruction,
            time_ms,
            elapsed_ms: 0,
            slice_ms: 0,
            level: 0,
            block_remaining_ms: 0,
            last_update: Timestamp::new(0),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn requested_ms(&self) -> u32 {
        self.time_ms
    }

    pub fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    pub fn slice_ms(&self) -> u32 {
        self.slice_ms
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn block_remaining_ms(&self) -> u32 {
        self.block_remaining_ms
    }

    pub(crate) fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Loads a RUN instruction and marks the process ready
    ///
    /// A fresh burst re-enters the feedback queue at the top level.
    pub(crate) fn load_run(&mut self, time_ms: u32) {
        self.time_ms = time_ms;
        self.elapsed_ms = 0;
        self.slice_ms = 0;
        self.level = 0;
        self.state = ProcessState::Ready;
    }

    /// Loads a BLOCK instruction received at `now`
    ///
    /// The blocked time starts counting down on the next tick.
    pub(crate) fn load_block(&mut self, time_ms: u32, now: Timestamp) {
        self.block_remaining_ms = time_ms;
        self.last_update = now;
        self.state = ProcessState::Blocked;
    }

    /// Charges one tick of CPU time
    pub(crate) fn execute(&mut self, tick_ms: u32) {
        self.elapsed_ms = self.elapsed_ms.saturating_add(tick_ms);
        self.slice_ms = self.slice_ms.saturating_add(tick_ms);
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.elapsed_ms >= self.time_ms
    }

    /// Puts the process on the CPU with a fresh quantum
    pub(crate) fn set_running(&mut self) {
        self.slice_ms = 0;
        self.state = ProcessState::Running;
    }

    /// Takes the process off the CPU with its quantum reset
    pub(crate) fn preempt(&mut self) {
        self.slice_ms = 0;
        self.state = ProcessState::Ready;
    }

    /// Moves one level down, unless already on `lowest`
    ///
    /// Returns the level the process ends up on.
    pub(crate) fn demote(&mut self, lowest: usize) -> usize {
        if self.level < lowest {
            self.level += 1;
        }
        self.level
    }

    /// Charges one tick of blocked time, at most once per tick
    ///
    /// Returns true once the block has fully elapsed.
    pub(crate) fn tick_blocked(&mut self, now: Timestamp, tick_ms: u32) -> bool {
        if self.last_update < now {
            self.block_remaining_ms = self.block_remaining_ms.saturating_sub(tick_ms);
            self.last_update = now;
        }

        self.block_remaining_ms == 0
    }

    pub(crate) fn await_instruction(&mut self) {
        self.state = ProcessState::AwaitingInstruction;
    }

    /// Releases the PCB together with its connection
    ///
    /// The channel is owned by the PCB, so it is dropped here and the client
    /// sees end of file right after its last reply. Nothing would poll the
    /// connection again once its PCB is gone.
    pub fn destroy(self) {
        debug!("process {} destroyed", self.pid);
    }
}

impl<C: Channel> Pcb<C> {
    /// Delivers `msg` to the client
    ///
    /// Delivery failures are only logged: a dead connection is noticed, and
    /// the PCB discarded, the next time its channel is polled.
    pub(crate) fn notify(&mut self, msg: Message) {
        if let Err(e) = self.channel.send(&msg) {
            warn!("process {}: could not send {:?}: {}", self.pid, msg.request, e);
        }
    }
}

impl<C> Process for Pcb<C> {
    fn pid(&self) -> Pid {
        self.pid
    }

    fn state(&self) -> ProcessState {
        self.state
    }

    fn timings(&self) -> (u32, u32, u32) {
        (self.time_ms, self.elapsed_ms, self.slice_ms)
    }

    fn priority(&self) -> usize {
        self.level
    }

    fn extra(&self) -> String {
        if self.state == ProcessState::Blocked {
            format!("blocked_for={}", self.block_remaining_ms)
        } else {
            String::new()
        }
    }
}

/// Creates PCBs with unique, monotonically increasing pids
#[derive(Debug)]
pub struct PcbStore {
    next_pid: Pid,
}

impl PcbStore {
    pub fn new() -> PcbStore {
        PcbStore {
            next_pid: Pid::new(1),
        }
    }

    /// Creates the PCB for a newly connected client
    ///
    /// * `channel` - connection to the client
    /// * `time_ms` - initial requested duration, 0 until a RUN arrives
    pub fn create<C>(&mut self, channel: C, time_ms: u32) -> Pcb<C> {
        let pid = self.next_pid;
        self.next_pid = self.next_pid + 1;

        Pcb::new(pid, channel, time_ms)
    }
}

impl Default for PcbStore {
    fn default() -> Self {
        PcbStore::new()
    }
}
