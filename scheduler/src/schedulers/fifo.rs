use crate::channel::Channel;
use crate::common_funcs::{dispatch_next, execute_exit, execute_tick};
use crate::process_control_block::Pcb;
use crate::queue::ReadyStructure;
use crate::scheduler::{Scheduler, SchedulingDecision, StopReason};
use crate::Clock;

/// First come, first served
///
/// A process keeps the CPU until its RUN instruction is fully served.
#[derive(Debug, Default, Clone, Copy)]
pub struct FifoScheduler;

impl FifoScheduler {
    pub fn new() -> FifoScheduler {
        FifoScheduler
    }
}

impl<C: Channel> Scheduler<C> for FifoScheduler {
    fn name(&self) -> &'static str {
        "FIFO"
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

        let stopped = execute_exit(clock, cpu).map(|pid| (pid, StopReason::Completed));
        let dispatched = dispatch_next(ready, cpu, ReadyStructure::dequeue_highest);

        SchedulingDecision { stopped, dispatched }
    }
}
