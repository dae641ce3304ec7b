//! Steps shared by every scheduling policy.

use log::debug;

use crate::channel::Channel;
use crate::message::Message;
use crate::process_control_block::Pcb;
use crate::queue::ReadyStructure;
use crate::{Clock, Pid};

/// Charges one tick of CPU time to the running process, if any
pub fn execute_tick<C>(clock: &Clock, cpu: &mut Option<Pcb<C>>) {
    if let Some(pcb) = cpu.as_mut() {
        pcb.execute(clock.tick_ms());
    }
}

/// Retires the running process if its RUN instruction is fully served
///
/// Sends DONE stamped with the current time, destroys the PCB and leaves the
/// CPU idle. Returns the pid of the completed process.
pub fn execute_exit<C: Channel>(clock: &Clock, cpu: &mut Option<Pcb<C>>) -> Option<Pid> {
    if !cpu.as_ref().is_some_and(Pcb::is_complete) {
        return None;
    }

    let mut pcb = cpu.take()?;
    let pid = pcb.pid();

    pcb.notify(Message::done(pid, clock.now()));
    debug!("process {} completed at {}", pid, clock.now());
    pcb.destroy();

    Some(pid)
}

/// Preempts the running process once its slice reaches `quantum_ms`
///
/// With `demote` set the process drops one level (never below the lowest
/// one) before being re-queued at the tail of its level. Returns the pid and
/// the level it was queued on.
pub fn execute_expired<C>(
    ready: &mut ReadyStructure<C>,
    cpu: &mut Option<Pcb<C>>,
    quantum_ms: u32,
    demote: bool,
) -> Option<(Pid, usize)> {
    if !cpu.as_ref().is_some_and(|pcb| pcb.slice_ms() >= quantum_ms) {
        return None;
    }

    let mut pcb = cpu.take()?;
    let pid = pcb.pid();
    let from = pcb.level();

    pcb.preempt();
    let level = if demote {
        pcb.demote(ready.lowest_level())
    } else {
        from
    };

    if level != from {
        debug!("process {} demoted {} -> {}", pid, from, level);
    }
    debug!("process {} preempted after {} ms", pid, quantum_ms);

    ready.enqueue_at(level, pcb);
    Some((pid, level))
}

/// Fills an idle CPU with the process chosen by `select`
pub fn dispatch_next<C, F>(ready: &mut ReadyStructure<C>, cpu: &mut Option<Pcb<C>>, select: F) -> Option<Pid>
where
    F: FnOnce(&mut ReadyStructure<C>) -> Option<Pcb<C>>,
{
    if cpu.is_some() {
        return None;
    }

    let mut pcb = select(ready)?;
    pcb.set_running();

    let pid = pcb.pid();
    debug!("process {} dispatched", pid);

    *cpu = Some(pcb);
    Some(pid)
}
