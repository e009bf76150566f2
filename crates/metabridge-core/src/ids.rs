//! Per-type identifier allocation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Counter state for one local type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounter {
    pub prefix: String,
    pub counter: u64,
}

/// Issues `{prefix}-{n}` identifiers; counters only move forward.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityAllocator {
    counters: BTreeMap<String, IdCounter>,
}

impl IdentityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_counters(counters: BTreeMap<String, IdCounter>) -> Self {
        Self { counters }
    }

    /// Register a type tag. An existing entry is left untouched so counters never go back.
    pub fn register(&mut self, kind: &str, prefix: impl Into<String>) {
        self.counters
            .entry(kind.to_string())
            .or_insert_with(|| IdCounter {
                prefix: prefix.into(),
                counter: 0,
            });
    }

    /// Next id for `kind`. Unseen tags are registered with a prefix derived from the tag.
    pub fn allocate(&mut self, kind: &str) -> String {
        let entry = self
            .counters
            .entry(kind.to_string())
            .or_insert_with(|| IdCounter {
                prefix: derive_prefix(kind),
                counter: 0,
            });
        entry.counter += 1;
        format!("{}-{}", entry.prefix, entry.counter)
    }

    pub fn peek(&self, kind: &str) -> Option<&IdCounter> {
        self.counters.get(kind)
    }
}

/// `@openBIS.Object` -> `OBJECT`, `https://x.org/Thing` -> `THING`.
pub fn derive_prefix(kind: &str) -> String {
    let tail = kind
        .rsplit(['.', '/', '#'])
        .find(|s| !s.is_empty())
        .unwrap_or(kind);
    let prefix: String = tail
        .trim_start_matches('@')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase();
    if prefix.is_empty() {
        "ID".to_string()
    } else {
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_id_for_fresh_counter_is_one() {
        let mut ids = IdentityAllocator::new();
        ids.register("@openBIS.Object", "OBJ");
        assert_eq!(ids.allocate("@openBIS.Object"), "OBJ-1");
    }

    #[test]
    fn sequential_allocations_are_monotonic_and_distinct() {
        let mut ids = IdentityAllocator::new();
        ids.register("@aiida.Sample", "SAMPLE");
        for _ in 0..2 {
            ids.allocate("@aiida.Sample");
        }
        assert_eq!(ids.allocate("@aiida.Sample"), "SAMPLE-3");
        assert_eq!(ids.allocate("@aiida.Sample"), "SAMPLE-4");
        assert_eq!(ids.peek("@aiida.Sample").map(|c| c.counter), Some(4));
    }

    #[test]
    fn register_does_not_reset_existing_counter() {
        let mut ids = IdentityAllocator::new();
        ids.register("@aiida.Workflow", "WF");
        ids.allocate("@aiida.Workflow");
        ids.register("@aiida.Workflow", "OTHER");
        assert_eq!(ids.allocate("@aiida.Workflow"), "WF-2");
    }

    #[test]
    fn unseen_tag_gets_derived_prefix() {
        let mut ids = IdentityAllocator::new();
        assert_eq!(ids.allocate("@openBIS.Instrument"), "INSTRUMENT-1");
        assert_eq!(derive_prefix("https://schema.org/Protein"), "PROTEIN");
        assert_eq!(derive_prefix("@@"), "ID");
    }
}
