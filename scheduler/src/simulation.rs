//! The simulation context and its dispatch loop.

use std::thread;
use std::time::Duration;

use log::info;

use crate::channel::Listener;
use crate::collector::Collector;
use crate::config::SimConfig;
use crate::error::Result;
use crate::process_control_block::Pcb;
use crate::process_manager::{CommandScan, ProcessManager};
use crate::queue::{Queue, ReadyStructure};
use crate::scheduler::{Process, Scheduler, SchedulingDecision};
use crate::schedulers::Policy;
use crate::{Clock, Timestamp};

/// What happened during one tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// The simulated time the tick ran at
    pub time: Timestamp,
    /// Both command-queue scans of the tick, merged
    pub commands: CommandScan,
    /// Blocked PCBs released back to the command queue
    pub unblocked: usize,
    /// The policy's decision
    pub decision: SchedulingDecision,
}

/// Everything the server mutates, threaded through one tick at a time
pub struct Simulation<L: Listener> {
    clock: Clock,
    manager: ProcessManager<L>,
    ready: ReadyStructure<L::Channel>,
    cpu: Option<Pcb<L::Channel>>,
    policy: Box<dyn Scheduler<L::Channel>>,
    pause: Option<Duration>,
    heartbeat_ms: u64,
}

impl<L: Listener> Simulation<L> {
    /// Builds a simulation running `policy` with the settings in `config`
    pub fn new(listener: L, policy: Policy, config: &SimConfig) -> Result<Simulation<L>> {
        config.validate()?;
        let scheduler = policy.build(config)?;

        Ok(Simulation::with_scheduler(listener, scheduler, config))
    }

    /// Builds a simulation around an already constructed scheduler
    pub fn with_scheduler(
        listener: L,
        scheduler: Box<dyn Scheduler<L::Channel>>,
        config: &SimConfig,
    ) -> Simulation<L> {
        Simulation {
            clock: Clock::new(config.tick_ms),
            manager: ProcessManager::new(listener),
            ready: scheduler.ready_structure(),
            cpu: None,
            policy: scheduler,
            pause: config.pause(),
            heartbeat_ms: u64::from(config.heartbeat_ms),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn cpu(&self) -> Option<&Pcb<L::Channel>> {
        self.cpu.as_ref()
    }

    pub fn ready(&self) -> &ReadyStructure<L::Channel> {
        &self.ready
    }

    pub fn command_queue(&self) -> &Queue<L::Channel> {
        self.manager.command_queue()
    }

    pub fn blocked_queue(&self) -> &Queue<L::Channel> {
        self.manager.blocked_queue()
    }

    /// Runs one tick
    ///
    /// Protocol work always completes before the policy runs, so a PCB made
    /// ready during this tick can be dispatched in it.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now();

        let mut commands = self.manager.check_commands(now, &mut self.ready);

        if self.heartbeat_ms != 0 && now.get() % self.heartbeat_ms == 0 {
            info!("Current time: {} s", now.get() / 1000);
        }

        let unblocked = self.manager.check_blocked(&self.clock);
        self.pace();

        /* Blocked PCBs may just have returned to the command queue */
        commands.merge(self.manager.check_commands(now, &mut self.ready));

        let decision = self.policy.schedule(&self.clock, &mut self.ready, &mut self.cpu);

        self.pace();
        self.clock.advance();

        TickReport {
            time: now,
            commands,
            unblocked,
            decision,
        }
    }

    /// Runs `count` ticks back to back
    pub fn run_ticks(&mut self, count: usize) -> Vec<TickReport> {
        (0..count).map(|_| self.tick()).collect()
    }

    /// Runs the dispatch loop forever
    pub fn run(&mut self) -> ! {
        loop {
            self.tick();
        }
    }

    fn pace(&self) {
        if let Some(pause) = self.pause {
            thread::sleep(pause);
        }
    }
}

impl<L: Listener> Collector for Simulation<L> {
    fn collect_running(&self) -> Vec<&dyn Process> {
        self.cpu.iter().map(|pcb| pcb as &dyn Process).collect()
    }

    fn collect_ready(&self) -> Vec<&dyn Process> {
        self.ready.iter().map(|pcb| pcb as &dyn Process).collect()
    }

    fn collect_blocked(&self) -> Vec<&dyn Process> {
        self.blocked_queue().iter().map(|pcb| pcb as &dyn Process).collect()
    }

    fn collect_command(&self) -> Vec<&dyn Process> {
        self.command_queue().iter().map(|pcb| pcb as &dyn Process).collect()
    }
}
