//! Wire and domain types shared by the store, the registry and the exchange protocol.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Schema-less metadata record: field name -> JSON value.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Local field name -> field definition.
pub type Context = BTreeMap<String, FieldDef>;

/// Metadata key carrying provenance inside an exchanged record.
pub const PROVENANCE_KEY: &str = "wasImported";

/// Canonical identifier of the provenance field.
pub const PROVENANCE_GLOBAL_ID: &str = "https://schema.org/wasImported";

/// Where an entity's data last arrived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub from: String,
    pub with_id: String,
}

impl Provenance {
    pub fn new(from: impl Into<String>, with_id: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            with_id: with_id.into(),
        }
    }

    /// Parse a provenance tag from a metadata value; `None` when the shape does not match.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({ "from": self.from, "with_id": self.with_id })
    }
}

/// One record held by a platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub ontology: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

/// Definition of one local field: its canonical identifier plus optional JSON-LD hints.
///
/// Accepts both the expanded object form `{"@id": ..., "@type": ...}` and the bare IRI
/// shorthand `"field": "https://..."`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FieldDefRepr")]
pub struct FieldDef {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "@container", default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

impl FieldDef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: None,
            container: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldDefRepr {
    Iri(String),
    Full {
        #[serde(rename = "@id")]
        id: String,
        #[serde(rename = "@type", default)]
        kind: Option<String>,
        #[serde(rename = "@container", default)]
        container: Option<String>,
    },
}

impl From<FieldDefRepr> for FieldDef {
    fn from(repr: FieldDefRepr) -> Self {
        match repr {
            FieldDefRepr::Iri(id) => FieldDef::new(id),
            FieldDefRepr::Full {
                id,
                kind,
                container,
            } => FieldDef {
                id,
                kind,
                container,
            },
        }
    }
}

/// Self-describing entity as it travels between platforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangePayload {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub ontology: String,
    #[serde(default, alias = "@context")]
    pub context: Context,
}

/// Body of a local authoring request.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportRequest {
    pub title: String,
    pub ontology: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, alias = "@context")]
    pub context: Context,
}

/// How a received package was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiveOutcome {
    Created,
    Merged,
}

/// Result of applying a received package to the local store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveReport {
    pub outcome: ReceiveOutcome,
    pub entity: Entity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_def_accepts_iri_shorthand_and_full_form() {
        let ctx: Context = serde_json::from_value(serde_json::json!({
            "label": "https://schema.org/iupacName",
            "weight": { "@id": "https://schema.org/molecularWeight", "@type": "xsd:float" },
        }))
        .unwrap();
        assert_eq!(ctx["label"], FieldDef::new("https://schema.org/iupacName"));
        assert_eq!(ctx["weight"].kind.as_deref(), Some("xsd:float"));
    }

    #[test]
    fn entity_serializes_type_and_omits_empty_provenance() {
        let entity = Entity {
            id: "SIM-1".into(),
            kind: "@aiida.Simulation".into(),
            title: "A simulation".into(),
            metadata: Metadata::new(),
            ontology: "https://aiida.net/Simulation".into(),
            provenance: None,
        };
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["type"], "@aiida.Simulation");
        assert!(json.get("provenance").is_none());
    }

    #[test]
    fn import_request_accepts_jsonld_context_key() {
        let req: ImportRequest = serde_json::from_value(serde_json::json!({
            "title": "t",
            "ontology": "o",
            "metadata": { "a": 1 },
            "@context": { "a": "https://example.org/a" },
        }))
        .unwrap();
        assert_eq!(req.context["a"].id, "https://example.org/a");
    }

    #[test]
    fn provenance_parses_only_matching_shape() {
        let ok = serde_json::json!({ "from": "AiiDA", "with_id": "SIM-1" });
        assert_eq!(Provenance::from_value(&ok), Some(Provenance::new("AiiDA", "SIM-1")));
        assert_eq!(Provenance::from_value(&serde_json::json!("AiiDA")), None);
    }
}
