//! Bundled startup datasets. A platform's reset snapshot is built from one of these.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{ExchangeError, ExchangeResult};
use crate::ids::{IdCounter, IdentityAllocator};
use crate::ontology::OntologyRegistry;
use crate::state::PlatformState;
use crate::store::EntityStore;
use crate::types::{Context, Entity};

const AIIDA_SEED: &str = include_str!("../seeds/aiida.json");
const OPENBIS_SEED: &str = include_str!("../seeds/openbis.json");

/// Which bundled dataset a platform starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seed {
    Aiida,
    Openbis,
    Empty,
}

impl FromStr for Seed {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aiida" => Ok(Seed::Aiida),
            "openbis" => Ok(Seed::Openbis),
            "empty" => Ok(Seed::Empty),
            other => Err(ExchangeError::Seed(format!("unknown seed '{}'", other))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    fallback_type: String,
    #[serde(default)]
    ids: BTreeMap<String, IdCounter>,
    #[serde(default)]
    mapping: BTreeMap<String, String>,
    #[serde(default)]
    contexts: BTreeMap<String, Context>,
    #[serde(default)]
    data: Vec<Entity>,
}

impl Seed {
    /// Build the startup state for this seed.
    pub fn load(self) -> ExchangeResult<PlatformState> {
        let raw = match self {
            Seed::Aiida => AIIDA_SEED,
            Seed::Openbis => OPENBIS_SEED,
            Seed::Empty => {
                let mut ids = IdentityAllocator::new();
                ids.register("@Object", "OBJ");
                return Ok(PlatformState::new(
                    EntityStore::new(),
                    ids,
                    OntologyRegistry::new("@Object"),
                ));
            }
        };
        parse_seed(raw)
    }
}

fn parse_seed(raw: &str) -> ExchangeResult<PlatformState> {
    let file: SeedFile =
        serde_json::from_str(raw).map_err(|e| ExchangeError::Seed(e.to_string()))?;

    let mut registry = OntologyRegistry::new(file.fallback_type.clone());
    for (ontology, local_type) in &file.mapping {
        let context = file.contexts.get(ontology).cloned().unwrap_or_default();
        registry.register(ontology, local_type.clone(), context);
    }

    let mut ids = IdentityAllocator::from_counters(file.ids);
    ids.register(&file.fallback_type, "OBJ");

    let store = EntityStore::from_entities(file.data)?;
    Ok(PlatformState::new(store, ids, registry))
}
