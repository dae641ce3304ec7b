use crate::channel::Channel;
use crate::common_funcs::{dispatch_next, execute_exit, execute_tick};
use crate::process_control_block::Pcb;
use crate::queue::ReadyStructure;
use crate::scheduler::{Scheduler, SchedulingDecision, StopReason};
use crate::Clock;

/// Non-preemptive shortest job first
///
/// When the CPU goes idle, the ready process with the smallest requested
/// duration is dispatched; among equal durations the one that has waited
/// longest wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct SjfScheduler;

impl SjfScheduler {
    pub fn new() -> SjfScheduler {
        SjfScheduler
    }
}

impl<C: Channel> Scheduler<C> for SjfScheduler {
    fn name(&self) -> &'static str {
        "SJF"
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
        let dispatched = dispatch_next(ready, cpu, ReadyStructure::dequeue_shortest);

        SchedulingDecision { stopped, dispatched }
    }
}
