//! Optimizer-side state-dict reporting.
//!
//! burn keeps optimizer state in a per-parameter-id record; this snapshot
//! joins that record against the model's [`StateDict`] so entries come out
//! under the same dot-qualified names as the model parameters.

use super::dict::StateDict;
use crate::optim::{SgdOptimizer, SgdSettings};
use burn::module::{AutodiffModule, ParamId};
use burn::optim::Optimizer;
use burn::tensor::backend::AutodiffBackend;
use std::fmt;

/// Snapshot of an SGD optimizer's state dict: the hyperparameters plus one
/// entry per parameter the optimizer has accumulated state for.
///
/// The state starts empty and fills in once training steps run.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerStateDict {
    pub lr: f64,
    pub momentum: f64,
    pub dampening: f64,
    pub nesterov: bool,
    pub weight_decay: f64,
    /// State entries resolved against the model state dict, in model order.
    pub state: Vec<OptimizerStateEntry>,
    /// Record entries whose id matched no model parameter.
    pub unmatched: usize,
}

/// Per-parameter optimizer state. With momentum enabled the velocity buffer
/// is shaped like its parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerStateEntry {
    pub name: String,
    pub id: ParamId,
    pub shape: Vec<usize>,
}

impl OptimizerStateDict {
    pub fn collect<AutoM, AutoB>(
        settings: &SgdSettings,
        optim: &SgdOptimizer<AutoM, AutoB>,
        params: &StateDict,
    ) -> Self
    where
        AutoM: AutodiffModule<AutoB>,
        AutoB: AutodiffBackend,
    {
        let record = optim.to_record();
        let state: Vec<OptimizerStateEntry> = params
            .iter()
            .filter(|entry| record.contains_key(&entry.id))
            .map(|entry| OptimizerStateEntry {
                name: entry.name.clone(),
                id: entry.id,
                shape: entry.shape.clone(),
            })
            .collect();
        let unmatched = record.len() - state.len();

        Self {
            lr: settings.lr,
            momentum: settings.momentum,
            dampening: settings.dampening,
            nesterov: settings.nesterov,
            weight_decay: settings.weight_decay,
            state,
            unmatched,
        }
    }
}

impl fmt::Display for OptimizerStateDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "lr: {}", self.lr)?;
        writeln!(f, "momentum: {}", self.momentum)?;
        writeln!(f, "dampening: {}", self.dampening)?;
        writeln!(f, "nesterov: {}", self.nesterov)?;
        writeln!(f, "weight_decay: {}", self.weight_decay)?;
        if self.state.is_empty() {
            write!(f, "state: (empty)")?;
        } else {
            write!(f, "state: {} entries", self.state.len())?;
            let width = self
                .state
                .iter()
                .map(|entry| entry.name.len())
                .max()
                .unwrap_or(0);
            for entry in &self.state {
                write!(f, "\n  {:width$}  {:?}", entry.name, entry.shape)?;
            }
        }
        if self.unmatched > 0 {
            write!(f, "\n  (+{} entries without a model parameter)", self.unmatched)?;
        }
        Ok(())
    }
}
