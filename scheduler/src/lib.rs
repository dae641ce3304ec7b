//! A simulated process scheduler.
//!
//! Client processes connect over a local socket and ask for CPU time (RUN)
//! or for an I/O wait (BLOCK). The server advances a simulated clock in fixed
//! ticks, runs one scheduling policy per tick and tells each client when its
//! request is done.
//!

mod scheduler;
pub use crate::scheduler::{Process, ProcessState, Scheduler, SchedulingDecision, StopReason};

mod common_types;
pub use crate::common_types::{Clock, Pid, Timestamp};

mod error;
pub use crate::error::{Result, SchedError, SendError};

pub mod message;
pub use crate::message::{Message, Request, MESSAGE_SIZE};

pub mod channel;
pub use crate::channel::{Channel, Listener, RecvOutcome};

mod process_control_block;
pub use process_control_block::{Pcb, PcbStore};

mod queue;
pub use crate::queue::{Level, Queue, ReadyStructure};

mod common_funcs;
pub use common_funcs::{dispatch_next, execute_exit, execute_expired, execute_tick};

mod schedulers;
pub use schedulers::{FifoScheduler, MlfqScheduler, Policy, RoundRobinScheduler, SjfScheduler};

mod process_manager;
pub use crate::process_manager::{CommandScan, ProcessManager};

mod collector;
pub use crate::collector::{collect_all, Collector};

pub mod config;
pub use crate::config::SimConfig;

mod simulation;
pub use crate::simulation::{Simulation, TickReport};

pub mod client;
pub use crate::client::ProcessClient;
