//! Engine-wide tunables, read from the environment the way the rest of
//! the ambient stack expects (`FENSAK_*` variables, falling back to the
//! defaults spec §5 names).

use std::env;

/// How a running rule's `console.*` calls are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// Discard log lines entirely (the default for production gating).
    Drop,
    /// Print immediately to the host process's stdout/stderr.
    Console,
    /// Buffer log lines and return them on the [`crate::sandbox::EvaluationRecord`].
    Capture,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Guest micro-steps executed between cooperative yields.
    pub n_steps: u64,
    /// Duration of each cooperative yield, in milliseconds.
    pub sleep_ms: u64,
    /// Wall-clock budget for one rule invocation, in milliseconds.
    pub max_runtime_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            n_steps: 100,
            sleep_ms: 100,
            max_runtime_ms: 5000,
        }
    }
}

impl EngineConfig {
    /// Overlay defaults with `FENSAK_N_STEPS` / `FENSAK_SLEEP_MS` /
    /// `FENSAK_MAX_RUNTIME_MS`, if set and parseable. Unset or malformed
    /// values silently fall back to the default rather than failing
    /// startup — these are tuning knobs, not required configuration.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        EngineConfig {
            n_steps: read_env_u64("FENSAK_N_STEPS").unwrap_or(defaults.n_steps),
            sleep_ms: read_env_u64("FENSAK_SLEEP_MS").unwrap_or(defaults.sleep_ms),
            max_runtime_ms: read_env_u64("FENSAK_MAX_RUNTIME_MS").unwrap_or(defaults.max_runtime_ms),
        }
    }
}

fn read_env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_nominal_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.n_steps, 100);
        assert_eq!(cfg.sleep_ms, 100);
        assert_eq!(cfg.max_runtime_ms, 5000);
    }
}
