//! Run configuration loaded from TOML and overridden by command-line flags.

use std::{collections::VecDeque, fs, path::Path};

use anyhow::{ensure, Context, Result};
use ridge_defence_core::Facing;
use serde::Deserialize;

const DEFAULT_FRAME_MS: f32 = 16.0;
const DEFAULT_MAX_SECONDS: f32 = 300.0;

/// Contents of a run configuration file. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct RunConfig {
    pub(crate) frame_ms: Option<f32>,
    pub(crate) max_seconds: Option<f32>,
    pub(crate) seed: Option<u64>,
    pub(crate) jitter: Option<f32>,
    pub(crate) actions: Vec<Action>,
}

/// Scripted request fired once the timeline reaches `at`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub(crate) enum Action {
    Deploy {
        at: f32,
        operator: String,
        x: u32,
        z: u32,
        #[serde(default)]
        facing: Facing,
    },
    Withdraw {
        at: f32,
        operator: String,
    },
}

impl Action {
    pub(crate) fn at(&self) -> f32 {
        match self {
            Self::Deploy { at, .. } | Self::Withdraw { at, .. } => *at,
        }
    }
}

/// Flag values that take precedence over the file.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Overrides {
    pub(crate) frame_ms: Option<f32>,
    pub(crate) max_seconds: Option<f32>,
    pub(crate) seed: Option<u64>,
    pub(crate) jitter: Option<f32>,
}

/// Resolved loop parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Settings {
    pub(crate) frame: f32,
    pub(crate) max_seconds: f32,
    pub(crate) seed: u64,
    pub(crate) jitter: f32,
}

impl RunConfig {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read run configuration {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse run configuration {}", path.display()))
    }

    pub(crate) fn settings(&self, overrides: Overrides) -> Result<Settings> {
        let frame_ms = overrides
            .frame_ms
            .or(self.frame_ms)
            .unwrap_or(DEFAULT_FRAME_MS);
        let max_seconds = overrides
            .max_seconds
            .or(self.max_seconds)
            .unwrap_or(DEFAULT_MAX_SECONDS);
        let jitter = overrides.jitter.or(self.jitter).unwrap_or(0.0);

        ensure!(frame_ms > 0.0, "frame interval must be positive, got {frame_ms} ms");
        ensure!(max_seconds > 0.0, "time limit must be positive, got {max_seconds} s");
        ensure!(
            (0.0..1.0).contains(&jitter),
            "jitter must lie in [0, 1), got {jitter}"
        );

        Ok(Settings {
            frame: frame_ms / 1000.0,
            max_seconds,
            seed: overrides.seed.or(self.seed).unwrap_or(0),
            jitter,
        })
    }

    /// Actions ordered by firing time; ties keep file order.
    pub(crate) fn into_script(self) -> VecDeque<Action> {
        let mut actions = self.actions;
        actions.sort_by(|left, right| left.at().total_cmp(&right.at()));
        actions.into()
    }
}
