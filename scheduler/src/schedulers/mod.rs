//! The scheduling policies.
//!
//! Each policy implements [`Scheduler`](crate::Scheduler) over the same
//! ready structure and CPU slot; [`Policy`] selects one by name.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::channel::Channel;
use crate::config::SimConfig;
use crate::error::{Result, SchedError};
use crate::scheduler::Scheduler;

mod fifo;
pub use fifo::FifoScheduler;

mod sjf;
pub use sjf::SjfScheduler;

mod round_robin;
pub use round_robin::RoundRobinScheduler;

mod mlfq;
pub use mlfq::MlfqScheduler;

/// The policies the server can run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    Fifo,
    Sjf,
    RoundRobin,
    Mlfq,
}

impl Policy {
    /// Every policy, in the order they are listed to the user
    pub const ALL: [Policy; 4] = [Policy::Fifo, Policy::Sjf, Policy::RoundRobin, Policy::Mlfq];

    pub fn name(&self) -> &'static str {
        match self {
            Policy::Fifo => "FIFO",
            Policy::Sjf => "SJF",
            Policy::RoundRobin => "RR",
            Policy::Mlfq => "MLFQ",
        }
    }

    /// Instantiates the policy with the quanta from `config`
    pub fn build<C: Channel>(&self, config: &SimConfig) -> Result<Box<dyn Scheduler<C>>> {
        let scheduler: Box<dyn Scheduler<C>> = match self {
            Policy::Fifo => Box::new(FifoScheduler::new()),
            Policy::Sjf => Box::new(SjfScheduler::new()),
            Policy::RoundRobin => {
                let quanta = NonZeroU32::new(config.rr_quantum_ms)
                    .ok_or_else(|| SchedError::InvalidConfig("rr_quantum_ms must be positive".into()))?;
                Box::new(RoundRobinScheduler::new(quanta))
            }
            Policy::Mlfq => Box::new(MlfqScheduler::new(&config.mlfq_quanta_ms)?),
        };

        Ok(scheduler)
    }
}

impl FromStr for Policy {
    type Err = SchedError;

    /// Names are matched exactly, as listed by [`Policy::name`]
    fn from_str(name: &str) -> Result<Policy> {
        Policy::ALL
            .into_iter()
            .find(|policy| policy.name() == name)
            .ok_or_else(|| SchedError::UnknownPolicy(name.to_string()))
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for policy in Policy::ALL {
            assert_eq!(policy.name().parse::<Policy>().unwrap(), policy);
        }
    }

    #[test]
    fn names_are_case_sensitive() {
        assert!(matches!("fifo".parse::<Policy>(), Err(SchedError::UnknownPolicy(_))));
        assert!(matches!("LOTTERY".parse::<Policy>(), Err(SchedError::UnknownPolicy(_))));
    }

    #[test]
    fn mlfq_rejects_a_bad_table() {
        let config = SimConfig {
            mlfq_quanta_ms: vec![400, 200],
            ..SimConfig::default()
        };
        assert!(Policy::Mlfq
            .build::<crate::channel::MemoryChannel>(&config)
            .is_err());
    }

    #[test]
    fn built_policies_shape_their_ready_structure() {
        let config = SimConfig::default();

        let mlfq = Policy::Mlfq.build::<crate::channel::MemoryChannel>(&config).unwrap();
        let ready = mlfq.ready_structure();
        assert_eq!(mlfq.name(), "MLFQ");
        assert_eq!(ready.lowest_level(), 2);
        assert_eq!(
            (0..4).map(|level| ready.quantum_ms(level)).collect::<Vec<_>>(),
            vec![Some(100), Some(200), Some(400), None]
        );

        for policy in [Policy::Fifo, Policy::Sjf, Policy::RoundRobin] {
            let scheduler = policy.build::<crate::channel::MemoryChannel>(&config).unwrap();
            assert_eq!(scheduler.name(), policy.name());
            assert_eq!(scheduler.ready_structure().quantum_ms(0), None);
        }
    }
}
