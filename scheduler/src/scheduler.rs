use std::fmt;

use crate::channel::Channel;
use crate::process_control_block::Pcb;
use crate::queue::ReadyStructure;
use crate::{Clock, Pid};

/// The state of a process
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    /// Connected, waiting for the client to send RUN or BLOCK
    AwaitingInstruction,
    /// Waiting in the ready structure for the CPU
    Ready,
    /// On the CPU
    Running,
    /// Serving a BLOCK instruction
    Blocked,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::AwaitingInstruction => "awaiting-instruction",
            ProcessState::Ready => "ready",
            ProcessState::Running => "running",
            ProcessState::Blocked => "blocked",
        };
        f.write_str(name)
    }
}

/// Read-only view of a process, as listed by a [`Collector`](crate::Collector)
pub trait Process {
    fn pid(&self) -> Pid;

    fn state(&self) -> ProcessState;

    /// Returns `(requested, elapsed, slice)` in milliseconds
    fn timings(&self) -> (u32, u32, u32);

    /// The feedback-queue level, 0 being the highest priority
    fn priority(&self) -> usize;

    fn extra(&self) -> String;
}

/// Why a process left the CPU
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The RUN instruction was fully served; DONE has been sent
    Completed,
    /// The quantum expired; the process was re-queued on `level`
    Expired { level: usize },
}

/// What one policy call did to the CPU slot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulingDecision {
    /// The process taken off the CPU, if any
    pub stopped: Option<(Pid, StopReason)>,
    /// The process put on the CPU, if any
    pub dispatched: Option<Pid>,
}

impl SchedulingDecision {
    pub fn completed(&self) -> Option<Pid> {
        match self.stopped {
            Some((pid, StopReason::Completed)) => Some(pid),
            _ => None,
        }
    }

    pub fn expired(&self) -> Option<(Pid, usize)> {
        match self.stopped {
            Some((pid, StopReason::Expired { level })) => Some((pid, level)),
            _ => None,
        }
    }
}

/// A scheduling policy
///
/// Every call first charges one tick to the running process, then makes at
/// most one decision to take it off the CPU (completion is checked before
/// quantum expiry) and at most one decision to dispatch a new process.
pub trait Scheduler<C: Channel> {
    /// The name the policy is selected by
    fn name(&self) -> &'static str;

    /// Builds the ready structure this policy schedules from
    fn ready_structure(&self) -> ReadyStructure<C>;

    /// Runs the policy for the tick at `clock.now()`
    ///
    /// * `ready` - the processes waiting for the CPU
    /// * `cpu` - the CPU slot, cleared or filled by the policy
    fn schedule(
        &mut self,
        clock: &Clock,
        ready: &mut ReadyStructure<C>,
        cpu: &mut Option<Pcb<C>>,
    ) -> SchedulingDecision;
}
