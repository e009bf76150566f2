//! Ontology registry: ontology id -> (local type tag, translation context).
//!
//! The registry also keeps a platform-wide binding of global field identifiers to local field
//! names. A global identifier is bound at most once; every vocabulary learned later reuses the
//! bound name instead of introducing a synonym.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ExchangeError, ExchangeResult};
use crate::types::Context;

/// What a platform knows about one ontology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyEntry {
    pub local_type: String,
    pub context: Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OntologyRegistry {
    entries: BTreeMap<String, OntologyEntry>,
    /// global field id -> local field name
    bindings: BTreeMap<String, String>,
    fallback_type: String,
}

impl OntologyRegistry {
    /// Empty registry; unknown ontologies are learned under `fallback_type`.
    pub fn new(fallback_type: impl Into<String>) -> Self {
        Self {
            entries: BTreeMap::new(),
            bindings: BTreeMap::new(),
            fallback_type: fallback_type.into(),
        }
    }

    pub fn fallback_type(&self) -> &str {
        &self.fallback_type
    }

    /// Install a known ontology. Its field names become the bound names for any global
    /// identifiers not bound yet.
    pub fn register(&mut self, ontology: &str, local_type: impl Into<String>, context: Context) {
        for (local, def) in &context {
            self.bindings
                .entry(def.id.clone())
                .or_insert_with(|| local.clone());
        }
        self.entries.insert(
            ontology.to_string(),
            OntologyEntry {
                local_type: local_type.into(),
                context,
            },
        );
    }

    pub fn resolve(&self, ontology: &str) -> ExchangeResult<&OntologyEntry> {
        self.entries
            .get(ontology)
            .ok_or_else(|| ExchangeError::NotFound(format!("ontology {}", ontology)))
    }

    /// Bind a previously unknown ontology to the fallback type, deriving its context from the
    /// caller-supplied one.
    pub fn learn(&mut self, ontology: &str, supplied: &Context) -> OntologyEntry {
        let mut context = Context::new();
        for (supplied_name, def) in supplied {
            let candidate = self.bindings.get(&def.id).unwrap_or(supplied_name);
            let name = if context.contains_key(candidate) {
                def.id.clone()
            } else {
                candidate.clone()
            };
            // An unbound identifier is bound to the name it was stored under.
            self.bindings
                .entry(def.id.clone())
                .or_insert_with(|| name.clone());
            context.insert(name, def.clone());
        }

        let entry = OntologyEntry {
            local_type: self.fallback_type.clone(),
            context,
        };
        info!(
            ontology = %ontology,
            local_type = %entry.local_type,
            fields = entry.context.len(),
            "learned ontology"
        );
        self.entries.insert(ontology.to_string(), entry.clone());
        entry
    }

    /// Resolve `ontology`, learning it from `supplied` when unknown. The flag is true when the
    /// ontology was learned by this call.
    pub fn resolve_or_learn(&mut self, ontology: &str, supplied: &Context) -> (OntologyEntry, bool) {
        match self.entries.get(ontology) {
            Some(entry) => (entry.clone(), false),
            None => (self.learn(ontology, supplied), true),
        }
    }

    /// Local name bound to a global field identifier, if any.
    pub fn binding(&self, global_id: &str) -> Option<&str> {
        self.bindings.get(global_id).map(String::as_str)
    }

    /// Known ontology identifiers, sorted.
    pub fn ontologies(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// `{"@context": {...}}` annotation for an ontology; an empty object when unknown.
    pub fn context_document(&self, ontology: &str) -> serde_json::Value {
        match self.entries.get(ontology) {
            Some(entry) => serde_json::json!({ "@context": entry.context }),
            None => serde_json::json!({}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldDef;

    fn ctx(pairs: &[(&str, &str)]) -> Context {
        pairs
            .iter()
            .map(|(local, global)| (local.to_string(), FieldDef::new(*global)))
            .collect()
    }

    fn openbis_registry() -> OntologyRegistry {
        let mut reg = OntologyRegistry::new("@openBIS.Object");
        reg.register(
            "https://schema.org/MolecularEntity",
            "@openBIS.Sample",
            ctx(&[
                ("inChIKey", "https://schema.org/inChIKey"),
                ("iupacName", "https://schema.org/iupacName"),
            ]),
        );
        reg
    }

    #[test]
    fn resolve_unknown_is_not_found() {
        let reg = openbis_registry();
        assert!(matches!(
            reg.resolve("https://aiida.net/Simulation"),
            Err(ExchangeError::NotFound(_))
        ));
    }

    #[test]
    fn learn_reuses_bound_names_and_adopts_new_ones() {
        let mut reg = openbis_registry();
        let supplied = ctx(&[
            ("label", "https://schema.org/iupacName"),
            ("aiida_version", "https://aiida.net/aiida_version"),
        ]);
        let entry = reg.learn("https://aiida.net/Molecule", &supplied);
        assert_eq!(entry.local_type, "@openBIS.Object");
        assert!(entry.context.contains_key("iupacName"));
        assert!(entry.context.contains_key("aiida_version"));
        assert!(!entry.context.contains_key("label"));
        assert_eq!(reg.binding("https://aiida.net/aiida_version"), Some("aiida_version"));
    }

    #[test]
    fn resolve_after_learn_returns_same_pair() {
        let mut reg = openbis_registry();
        let supplied = ctx(&[("id", "https://aiida.net/id")]);
        let learned = reg.learn("https://aiida.net/Simulation", &supplied);
        assert_eq!(reg.resolve("https://aiida.net/Simulation").unwrap(), &learned);
        let (again, was_learned) = reg.resolve_or_learn("https://aiida.net/Simulation", &Context::new());
        assert!(!was_learned);
        assert_eq!(again, learned);
    }

    #[test]
    fn learn_breaks_name_clash_with_global_id() {
        let mut reg = openbis_registry();
        // Both supplied names resolve to the bound name "iupacName" or collide with it.
        let supplied = ctx(&[
            ("iupacName", "https://example.org/otherName"),
            ("label", "https://schema.org/iupacName"),
        ]);
        let entry = reg.learn("https://example.org/Thing", &supplied);
        assert_eq!(entry.context["iupacName"].id, "https://example.org/otherName");
        assert_eq!(
            entry.context["https://schema.org/iupacName"].id,
            "https://schema.org/iupacName"
        );
    }

    #[test]
    fn identifier_displaced_by_a_clash_is_bound_to_its_stored_name() {
        let mut reg = OntologyRegistry::new("@Object");
        reg.register("known", "@Known", ctx(&[("b", "https://example.org/X")]));
        let supplied = ctx(&[
            ("a", "https://example.org/X"),
            ("b", "https://example.org/Y"),
        ]);
        let entry = reg.learn("new", &supplied);
        let keys: Vec<&str> = entry.context.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "https://example.org/Y"]);
        assert_eq!(entry.context["b"].id, "https://example.org/X");
        assert_eq!(reg.binding("https://example.org/Y"), Some("https://example.org/Y"));

        // A later vocabulary using Y gets the same local name.
        let later = reg.learn("later", &ctx(&[("c", "https://example.org/Y")]));
        assert!(later.context.contains_key("https://example.org/Y"));
        assert!(!later.context.contains_key("c"));
    }

    #[test]
    fn context_document_wraps_context() {
        let reg = openbis_registry();
        let doc = reg.context_document("https://schema.org/MolecularEntity");
        assert_eq!(
            doc["@context"]["inChIKey"]["@id"],
            serde_json::json!("https://schema.org/inChIKey")
        );
        assert_eq!(reg.context_document("nope"), serde_json::json!({}));
    }
}
