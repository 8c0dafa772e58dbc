//! Registry of risk agents keyed by dimension.

use std::sync::Arc;

use realitycheck_core::Dimension;

use super::AgentSpec;
use crate::prompts;

/// Ordered collection of risk-agent specs, one per dimension at most.
///
/// Iteration always follows the canonical dimension order, regardless of
/// registration order.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    entries: Vec<(Dimension, Arc<AgentSpec>)>,
}

impl AgentRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the five built-in risk agents.
    pub fn default_dimensions() -> Self {
        let mut registry = Self::new();
        for dimension in Dimension::ALL {
            registry.register(dimension, prompts::dimension_spec(dimension));
        }
        registry
    }

    /// Register a spec, replacing any spec already bound to the dimension.
    pub fn register(&mut self, dimension: Dimension, spec: AgentSpec) {
        let spec = Arc::new(spec);
        match self.entries.iter_mut().find(|(d, _)| *d == dimension) {
            Some(entry) => entry.1 = spec,
            None => {
                self.entries.push((dimension, spec));
                self.entries.sort_by_key(|(d, _)| *d);
            }
        }
    }

    pub fn get(&self, dimension: Dimension) -> Option<&Arc<AgentSpec>> {
        self.entries
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, spec)| spec)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &Arc<AgentSpec>)> {
        self.entries.iter().map(|(d, spec)| (*d, spec))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dimensions_in_order() {
        let registry = AgentRegistry::default_dimensions();
        let order: Vec<Dimension> = registry.iter().map(|(d, _)| d).collect();
        assert_eq!(order, Dimension::ALL.to_vec());
        assert_eq!(
            registry.get(Dimension::Market).map(|s| s.name.as_str()),
            Some("Market Reality Agent")
        );
    }

    #[test]
    fn test_register_keeps_canonical_order() {
        let mut registry = AgentRegistry::new();
        registry.register(Dimension::Timing, AgentSpec::new("T", "r", "d"));
        registry.register(Dimension::Market, AgentSpec::new("M", "r", "d"));

        let order: Vec<Dimension> = registry.iter().map(|(d, _)| d).collect();
        assert_eq!(order, vec![Dimension::Market, Dimension::Timing]);
        assert!(registry.get(Dimension::Execution).is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = AgentRegistry::default_dimensions();
        registry.register(Dimension::Market, AgentSpec::new("Custom Market Agent", "r", "d"));

        assert_eq!(registry.len(), 5);
        assert_eq!(
            registry.get(Dimension::Market).map(|s| s.name.as_str()),
            Some("Custom Market Agent")
        );
    }
}
