//! Editor configuration: typed tunables with defaults, overridable from
//! `STACKPLAN_*` environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::str::FromStr;

use crate::consts::{
    COLLAGE_THRESHOLD, DEFERRED_MIN_MOVE, DUPLICATE_ATTEMPTS, DUPLICATE_OFFSET, GAP_EPSILON, GAP_TARGET, GRID_SIZE,
    HISTORY_DEPTH, PLACEMENT_STEP, SCALE_QUANTUM, SCALE_QUANTUM_FINE, SNAP_THRESHOLD,
};
use crate::editor::ErrorCode;
use crate::snap::SnapSettings;
use crate::support::SupportMode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}: cannot parse {value:?}")]
    Parse { key: String, value: String },
    #[error("{key}: {value} is out of range")]
    OutOfRange { key: String, value: String },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "E_CONFIG_PARSE",
            Self::OutOfRange { .. } => "E_CONFIG_RANGE",
        }
    }
}

/// Every tunable the editor reads.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    pub snap_threshold: f64,
    pub grid_size: f64,
    pub grid_snap: bool,
    pub collage_threshold: f64,
    pub gap_target: f64,
    pub gap_epsilon: f64,
    pub duplicate_offset: f64,
    pub duplicate_attempts: u32,
    pub history_depth: usize,
    pub deferred_min_move: f64,
    pub support_mode: SupportMode,
    pub lock_edge: bool,
    pub scale_quantum: f64,
    pub scale_quantum_fine: f64,
    pub placement_step: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap_threshold: SNAP_THRESHOLD,
            grid_size: GRID_SIZE,
            grid_snap: false,
            collage_threshold: COLLAGE_THRESHOLD,
            gap_target: GAP_TARGET,
            gap_epsilon: GAP_EPSILON,
            duplicate_offset: DUPLICATE_OFFSET,
            duplicate_attempts: DUPLICATE_ATTEMPTS,
            history_depth: HISTORY_DEPTH,
            deferred_min_move: DEFERRED_MIN_MOVE,
            support_mode: SupportMode::Fast,
            lock_edge: true,
            scale_quantum: SCALE_QUANTUM,
            scale_quantum_fine: SCALE_QUANTUM_FINE,
            placement_step: PLACEMENT_STEP,
        }
    }
}

impl EditorConfig {
    /// Defaults overridden by `STACKPLAN_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first variable that does not parse
    /// or is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var_os(key).map(|v| v.to_string_lossy().into_owned()))
    }

    /// Defaults overridden by whatever `lookup` returns for each key.
    ///
    /// # Errors
    ///
    /// Same as [`EditorConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let positive = |key: &str, default: f64| env_parse_positive(&lookup, key, default);
        Ok(Self {
            snap_threshold: positive("STACKPLAN_SNAP_THRESHOLD", d.snap_threshold)?,
            grid_size: positive("STACKPLAN_GRID_SIZE", d.grid_size)?,
            grid_snap: env_parse_bool(&lookup, "STACKPLAN_GRID_SNAP", d.grid_snap)?,
            collage_threshold: positive("STACKPLAN_COLLAGE_THRESHOLD", d.collage_threshold)?,
            gap_target: positive("STACKPLAN_GAP_TARGET", d.gap_target)?,
            gap_epsilon: positive("STACKPLAN_GAP_EPSILON", d.gap_epsilon)?,
            duplicate_offset: positive("STACKPLAN_DUPLICATE_OFFSET", d.duplicate_offset)?,
            duplicate_attempts: env_parse_nonzero(&lookup, "STACKPLAN_DUPLICATE_ATTEMPTS", d.duplicate_attempts)?,
            history_depth: env_parse_nonzero(&lookup, "STACKPLAN_HISTORY_DEPTH", d.history_depth)?,
            deferred_min_move: positive("STACKPLAN_DEFERRED_MIN_MOVE", d.deferred_min_move)?,
            support_mode: env_parse_mode(&lookup, "STACKPLAN_SUPPORT_MODE", d.support_mode)?,
            lock_edge: env_parse_bool(&lookup, "STACKPLAN_LOCK_EDGE", d.lock_edge)?,
            scale_quantum: positive("STACKPLAN_SCALE_QUANTUM", d.scale_quantum)?,
            scale_quantum_fine: positive("STACKPLAN_SCALE_QUANTUM_FINE", d.scale_quantum_fine)?,
            placement_step: positive("STACKPLAN_PLACEMENT_STEP", d.placement_step)?,
        })
    }

    /// Snapping settings derived from this config and the live grid flag.
    #[must_use]
    pub fn snap_settings(&self, grid_snap: bool) -> SnapSettings {
        SnapSettings {
            threshold: self.snap_threshold,
            grid_size: self.grid_size,
            grid_snap,
            collage_threshold: self.collage_threshold,
            gap_target: self.gap_target,
            gap_epsilon: self.gap_epsilon,
        }
    }
}

// =============================================================================
// PARSING HELPERS
// =============================================================================

fn env_parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    raw.trim().parse::<T>().map_err(|_| ConfigError::Parse { key: key.to_owned(), value: raw })
}

fn env_parse_positive<F>(lookup: &F, key: &str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value: f64 = env_parse(lookup, key, default)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange { key: key.to_owned(), value: value.to_string() })
    }
}

fn env_parse_nonzero<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Default + PartialEq + ToString,
{
    let value: T = env_parse(lookup, key, default)?;
    if value == T::default() {
        return Err(ConfigError::OutOfRange { key: key.to_owned(), value: value.to_string() });
    }
    Ok(value)
}

fn env_parse_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Parse { key: key.to_owned(), value: raw }),
    }
}

fn env_parse_mode<F>(lookup: &F, key: &str, default: SupportMode) -> Result<SupportMode, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "fast" => Ok(SupportMode::Fast),
        "precise" => Ok(SupportMode::Precise),
        _ => Err(ConfigError::Parse { key: key.to_owned(), value: raw }),
    }
}
