//! Name-to-tensor bookkeeping for a model's learnable parameters.
//!
//! burn identifies parameters by [`ParamId`] rather than by name, so the
//! dot-qualified names usual in state-dict printouts are enumerated by the
//! model itself through [`NamedParams`].

use super::stats::ParamStats;
use burn::module::{Param, ParamId};
use burn::prelude::*;
use num_format::{Locale, ToFormattedString};
use std::fmt;

/// Visitor over a module's named parameters, in declaration order.
///
/// Modeled on [`burn::module::ModuleVisitor`], which walks parameters by id
/// only.
pub trait ParamVisitor<B: Backend> {
    fn visit_float<const D: usize>(&mut self, name: &str, param: &Param<Tensor<B, D>>);
}

/// Implemented by modules that can enumerate their parameters under unique,
/// dot-qualified names.
pub trait NamedParams<B: Backend> {
    fn visit_params<V: ParamVisitor<B>>(&self, visitor: &mut V);

    /// Name-to-tensor-metadata mapping of the learnable parameters.
    fn state_dict(&self) -> StateDict {
        let mut collector = MetaCollector::default();
        self.visit_params(&mut collector);
        collector.dict
    }

    /// Per-parameter value statistics, in state-dict order.
    fn param_stats(&self) -> Vec<(String, ParamStats)> {
        let mut collector = StatsCollector::default();
        self.visit_params(&mut collector);
        collector.stats
    }
}

/// One learnable tensor of a model: its dot-qualified name, parameter id,
/// and shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamEntry {
    pub name: String,
    pub id: ParamId,
    pub shape: Vec<usize>,
}

impl ParamEntry {
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Ordered mapping from dot-qualified parameter names to tensor metadata.
///
/// Keys are unique; only layers with learnable parameters (or registered
/// running statistics) contribute entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDict {
    entries: Vec<ParamEntry>,
}

impl StateDict {
    pub fn push(&mut self, entry: ParamEntry) {
        debug_assert!(
            self.get(&entry.name).is_none(),
            "duplicate state-dict key {}",
            entry.name,
        );
        self.entries.push(entry);
    }

    pub fn get(&self, name: &str) -> Option<&ParamEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Resolves a parameter id back to its dot-qualified name.
    pub fn name_of(&self, id: ParamId) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total element count over all entries.
    pub fn total_params(&self) -> usize {
        self.entries.iter().map(ParamEntry::numel).sum()
    }
}

impl fmt::Display for StateDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .entries
            .iter()
            .map(|entry| entry.name.len())
            .max()
            .unwrap_or(0);
        for entry in &self.entries {
            writeln!(f, "{:width$}  {:?}", entry.name, entry.shape)?;
        }
        write!(
            f,
            "{} tensors, {} parameters",
            self.entries.len(),
            self.total_params().to_formatted_string(&Locale::en),
        )
    }
}

#[derive(Default)]
struct MetaCollector {
    dict: StateDict,
}

impl<B: Backend> ParamVisitor<B> for MetaCollector {
    fn visit_float<const D: usize>(&mut self, name: &str, param: &Param<Tensor<B, D>>) {
        self.dict.push(ParamEntry {
            name: name.to_string(),
            id: param.id,
            shape: param.dims().to_vec(),
        });
    }
}

#[derive(Default)]
struct StatsCollector {
    stats: Vec<(String, ParamStats)>,
}

impl<B: Backend> ParamVisitor<B> for StatsCollector {
    fn visit_float<const D: usize>(&mut self, name: &str, param: &Param<Tensor<B, D>>) {
        self.stats.push((name.to_string(), ParamStats::of(param)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, shape: &[usize]) -> ParamEntry {
        ParamEntry {
            name: name.to_string(),
            id: ParamId::new(),
            shape: shape.to_vec(),
        }
    }

    #[test]
    fn totals_sum_over_entries() {
        let mut dict = StateDict::default();
        dict.push(entry("conv.weight", &[8, 1, 3, 3]));
        dict.push(entry("conv.bias", &[8]));

        assert_eq!(dict.len(), 2);
        assert_eq!(dict.total_params(), 8 * 9 + 8);
    }

    #[test]
    fn resolves_names_by_id() {
        let mut dict = StateDict::default();
        let weight = entry("fc.weight", &[4, 2]);
        let id = weight.id;
        dict.push(weight);
        dict.push(entry("fc.bias", &[2]));

        assert_eq!(dict.name_of(id), Some("fc.weight"));
        assert_eq!(dict.name_of(ParamId::new()), None);
    }

    #[test]
    #[should_panic(expected = "duplicate state-dict key")]
    fn rejects_duplicate_keys() {
        let mut dict = StateDict::default();
        dict.push(entry("fc.weight", &[4, 2]));
        dict.push(entry("fc.weight", &[4, 2]));
    }

    #[test]
    fn display_lists_names_shapes_and_totals() {
        let mut dict = StateDict::default();
        dict.push(entry("conv.weight", &[8, 1, 3, 3]));
        dict.push(entry("conv.bias", &[8]));

        let printed = dict.to_string();
        assert!(printed.contains("conv.weight  [8, 1, 3, 3]"));
        assert!(printed.contains("2 tensors, 80 parameters"));
    }
}
