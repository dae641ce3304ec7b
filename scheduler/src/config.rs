use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedError};
use crate::queue::validate_levels;

pub const DEFAULT_SOCKET_PATH: &str = "/tmp/scheduler.sock";

/// Simulation settings, loadable from a TOML file
///
/// Keys missing from the file keep their default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulated milliseconds per tick
    pub tick_ms: u32,
    /// Round robin quantum
    pub rr_quantum_ms: u32,
    /// MLFQ quantum of each level, highest priority first
    pub mlfq_quanta_ms: Vec<u32>,
    /// Where the server listens
    pub socket_path: PathBuf,
    /// Sleep in real time between the phases of a tick
    pub pacing: bool,
    /// How often the current simulated time is logged
    pub heartbeat_ms: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            tick_ms: 100,
            rr_quantum_ms: 500,
            mlfq_quanta_ms: vec![100, 200, 400],
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            pacing: true,
            heartbeat_ms: 1000,
        }
    }
}

impl SimConfig {
    /// Reads and validates a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<SimConfig> {
        let text = fs::read_to_string(path)?;
        SimConfig::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<SimConfig> {
        let config: SimConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            return Err(SchedError::InvalidConfig("tick_ms must be positive".into()));
        }

        if self.rr_quantum_ms == 0 {
            return Err(SchedError::InvalidConfig("rr_quantum_ms must be positive".into()));
        }

        validate_levels(&self.mlfq_quanta_ms)
    }

    /// Real-time pause taken twice per tick, if pacing is on
    pub fn pause(&self) -> Option<Duration> {
        self.pacing
            .then(|| Duration::from_millis(u64::from(self.tick_ms) / 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let config = SimConfig::from_toml("tick_ms = 50\npacing = false\n").unwrap();

        assert_eq!(config.tick_ms, 50);
        assert!(!config.pacing);
        assert_eq!(config.rr_quantum_ms, 500);
        assert_eq!(config.mlfq_quanta_ms, vec![100, 200, 400]);
        assert_eq!(config.socket_path, PathBuf::from(DEFAULT_SOCKET_PATH));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            SimConfig::from_toml("tick_ms = 0"),
            Err(SchedError::InvalidConfig(_))
        ));
        assert!(matches!(
            SimConfig::from_toml("mlfq_quanta_ms = [300, 100]"),
            Err(SchedError::InvalidLevels(_))
        ));
        assert!(matches!(
            SimConfig::from_toml("tick_ms = \"fast\""),
            Err(SchedError::Config(_))
        ));
    }

    #[test]
    fn load_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ossim.toml");
        fs::write(&path, "rr_quantum_ms = 300\nsocket_path = \"/tmp/other.sock\"\n").unwrap();

        let config = SimConfig::load(&path).unwrap();
        assert_eq!(config.rr_quantum_ms, 300);
        assert_eq!(config.socket_path, PathBuf::from("/tmp/other.sock"));
    }

    #[test]
    fn pause_is_half_a_tick() {
        let config = SimConfig::default();
        assert_eq!(config.pause(), Some(Duration::from_millis(50)));

        let config = SimConfig {
            pacing: false,
            ..SimConfig::default()
        };
        assert_eq!(config.pause(), None);
    }
}
