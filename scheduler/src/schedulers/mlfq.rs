use crate::channel::Channel;
use crate::common_funcs::{dispatch_next, execute_exit, execute_expired, execute_tick};
use crate::error::Result;
use crate::process_control_block::Pcb;
use crate::queue::{validate_levels, ReadyStructure};
use crate::scheduler::{Scheduler, SchedulingDecision, StopReason};
use crate::Clock;

/// Multi-level feedback queue
///
/// Processes enter at level 0. A process that uses up the quantum of its
/// level drops one level and goes to the tail of that level's queue; the
/// lowest level only re-queues. Nothing is ever promoted, so a steady supply
/// of short jobs can starve the lower levels.
#[derive(Debug, Clone)]
pub struct MlfqScheduler {
    /// Quantum of each level, highest priority first; validated by `new`
    quanta_ms: Vec<u32>,
}

impl MlfqScheduler {
    /// Creates the scheduler for the given quantum table
    ///
    /// * `quanta_ms` - one quantum per level, non-empty and non-decreasing
    pub fn new(quanta_ms: &[u32]) -> Result<MlfqScheduler> {
        validate_levels(quanta_ms)?;

        Ok(MlfqScheduler {
            quanta_ms: quanta_ms.to_vec(),
        })
    }
}

impl<C: Channel> Scheduler<C> for MlfqScheduler {
    fn name(&self) -> &'static str {
        "MLFQ"
    }

    fn ready_structure(&self) -> ReadyStructure<C> {
        ReadyStructure::from_quanta(&self.quanta_ms)
    }

    fn schedule(
        &mut self,
        clock: &Clock,
        ready: &mut ReadyStructure<C>,
        cpu: &mut Option<Pcb<C>>,
    ) -> SchedulingDecision {
        execute_tick(clock, cpu);

        let stopped = match execute_exit(clock, cpu) {
            Some(pid) => Some((pid, StopReason::Completed)),
            None => {
                /* Without levels there is no quantum, and the policy degrades to FIFO */
                let quantum = cpu
                    .as_ref()
                    .and_then(|pcb| ready.quantum_ms(pcb.level()));

                quantum
                    .and_then(|quantum_ms| execute_expired(ready, cpu, quantum_ms, true))
                    .map(|(pid, level)| (pid, StopReason::Expired { level }))
            }
        };

        let dispatched = dispatch_next(ready, cpu, ReadyStructure::dequeue_highest);

        SchedulingDecision { stopped, dispatched }
    }
}
