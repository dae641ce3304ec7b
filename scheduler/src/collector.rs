use crate::scheduler::Process;

pub trait Collector {
    // Returns the process on the CPU, if any
    fn collect_running(&self) -> Vec<&dyn Process>;

    // Returns the ready processes, highest priority first
    fn collect_ready(&self) -> Vec<&dyn Process>;

    // Returns the blocked processes
    fn collect_blocked(&self) -> Vec<&dyn Process>;

    // Returns the processes waiting for an instruction
    fn collect_command(&self) -> Vec<&dyn Process>;
}

pub fn collect_all(scheduler: &dyn Collector) -> Vec<&dyn Process> {
    let mut procs: Vec<&dyn Process> = Vec::new();

    procs.extend(scheduler.collect_running());
    procs.extend(scheduler.collect_ready());
    procs.extend(scheduler.collect_blocked());
    procs.extend(scheduler.collect_command());

    procs
}
