//! Engine configuration: beam, learning, and mining parameter bundles,
//! loadable from and savable to JSON (`serde_json`) for user-facing
//! config rather than wire formats.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::beam::BeamParams;
use crate::error::MelvinResult;
use crate::learner::LearningParams;
use crate::miner::MiningConfig;
use crate::scorer::ScoringWeights;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MelvinConfig {
    pub beam_width: usize,
    pub max_depth: usize,
    pub top_k: usize,
    pub top_p: f64,
    pub stop_threshold: f64,
    pub enable_loop_detection: bool,
    pub enable_stochastic_expansion: bool,

    pub alpha_core: f32,
    pub alpha_ctx: f32,
    pub alpha_infer: f32,
    pub lambda_core: f32,
    pub lambda_ctx: f32,
    pub epsilon_prune: f32,
    pub epsilon_anchor: f32,

    pub mining_window_size: usize,
    pub mining_theta_pat: f64,
    pub mining_theta_pmi: f64,

    pub rng_seed: u64,
}

impl Default for MelvinConfig {
    fn default() -> Self {
        let beam = BeamParams::default();
        let learn = LearningParams::default();
        let mining = MiningConfig::default();
        Self {
            beam_width: beam.beam_width,
            max_depth: beam.max_depth,
            top_k: beam.top_k,
            top_p: beam.top_p,
            stop_threshold: beam.stop_threshold,
            enable_loop_detection: beam.enable_loop_detection,
            enable_stochastic_expansion: beam.enable_stochastic_expansion,
            alpha_core: learn.alpha_core,
            alpha_ctx: learn.alpha_ctx,
            alpha_infer: learn.alpha_infer,
            lambda_core: learn.lambda_core,
            lambda_ctx: learn.lambda_ctx,
            epsilon_prune: learn.epsilon_prune,
            epsilon_anchor: learn.epsilon_anchor,
            mining_window_size: mining.window_size,
            mining_theta_pat: mining.theta_pat,
            mining_theta_pmi: mining.theta_pmi,
            rng_seed: 0,
        }
    }
}

impl MelvinConfig {
    pub fn load(path: impl AsRef<Path>) -> MelvinResult<Self> {
        let text = std::fs::read_to_string(path).map_err(crate::error::StorageError::from)?;
        serde_json::from_str(&text)
            .map_err(|e| crate::error::MelvinError::Config(e.to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> MelvinResult<()> {
        let text = serde_json::to_string_pretty(self).map_err(crate::error::StorageError::from)?;
        std::fs::write(path, text).map_err(crate::error::StorageError::from)?;
        Ok(())
    }

    pub fn beam_params(&self) -> BeamParams {
        BeamParams {
            beam_width: self.beam_width,
            max_depth: self.max_depth,
            top_k: self.top_k,
            top_p: self.top_p,
            stop_threshold: self.stop_threshold,
            enable_loop_detection: self.enable_loop_detection,
            enable_stochastic_expansion: self.enable_stochastic_expansion,
        }
    }

    pub fn learning_params(&self) -> LearningParams {
        LearningParams {
            alpha_core: self.alpha_core,
            alpha_ctx: self.alpha_ctx,
            alpha_infer: self.alpha_infer,
            lambda_core: self.lambda_core,
            lambda_ctx: self.lambda_ctx,
            epsilon_prune: self.epsilon_prune,
            epsilon_anchor: self.epsilon_anchor,
            ..LearningParams::default()
        }
    }

    pub fn scoring_weights(&self) -> ScoringWeights {
        ScoringWeights::default()
    }

    pub fn mining_config(&self) -> MiningConfig {
        MiningConfig {
            window_size: self.mining_window_size,
            theta_pat: self.mining_theta_pat,
            theta_pmi: self.mining_theta_pmi,
            ..MiningConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut cfg = MelvinConfig::default();
        cfg.beam_width = 99;
        cfg.save(&path).unwrap();
        let loaded = MelvinConfig::load(&path).unwrap();
        assert_eq!(loaded.beam_width, 99);
    }

    #[test]
    fn defaults_match_beam_params_defaults() {
        let cfg = MelvinConfig::default();
        assert_eq!(cfg.beam_width, BeamParams::default().beam_width);
    }
}
