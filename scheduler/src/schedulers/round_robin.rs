use std::num::NonZeroU32;

use crate::channel::Channel;
use crate::common_funcs::{dispatch_next, execute_exit, execute_expired, execute_tick};
use crate::process_control_block::Pcb;
use crate::queue::ReadyStructure;
use crate::scheduler::{Scheduler, SchedulingDecision, StopReason};
use crate::Clock;

/// Round robin over a single ready queue
pub struct RoundRobinScheduler {
    /// Time quanta of the scheduler
    ///
    /// The maximum time a process can run before being preempted
    quanta: NonZeroU32,
}

impl RoundRobinScheduler {
    pub fn new(timeslice: NonZeroU32) -> RoundRobinScheduler {
        RoundRobinScheduler { quanta: timeslice }
    }
}

impl<C: Channel> Scheduler<C> for RoundRobinScheduler {
    fn name(&self) -> &'static str {
        "RR"
    }

    fn ready_structure(&self) -> ReadyStructure<C> {
        ReadyStructure::single()
    }

    fn schedule(
        &mut self,
        clock: &Clock,
        ready: &mut ReadyStructure<C>,
        cpu: &mut Option<Pcb<C>>,
    ) -> SchedulingDecision {
        execute_tick(clock, cpu);

        /* Completion wins over expiry when both happen on the same tick */
        let stopped = match execute_exit(clock, cpu) {
            Some(pid) => Some((pid, StopReason::Completed)),
            None => execute_expired(ready, cpu, self.quanta.get(), false)
                .map(|(pid, level)| (pid, StopReason::Expired { level })),
        };

        let dispatched = dispatch_next(ready, cpu, ReadyStructure::dequeue_highest);

        SchedulingDecision { stopped, dispatched }
    }
}
