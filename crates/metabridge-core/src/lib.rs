//! metabridge-core: ontology-aware metadata exchange between research data platforms.
//!
//! Each platform owns one [`PlatformState`] (entities, id counters, known ontologies) behind a
//! [`Platform`] lock. Records move between platforms as zip packages; field names are rewritten
//! through canonical identifiers, unknown vocabularies are learned on arrival, and provenance
//! tags let a platform recognize its own records when they come back.

pub mod config;
pub mod error;
pub mod exchange;
pub mod ids;
pub mod ontology;
pub mod package;
pub mod seed;
pub mod state;
pub mod store;
pub mod translator;
pub mod types;

pub use crate::config::PlatformConfig;
pub use error::{ExchangeError, ExchangeResult, TranslationFailure};
pub use exchange::{PeerTransport, Platform};
pub use ids::{IdCounter, IdentityAllocator};
pub use ontology::{OntologyEntry, OntologyRegistry};
pub use package::{build_package, read_payload, read_payload_bytes, PayloadRole};
pub use seed::Seed;
pub use state::PlatformState;
pub use store::EntityStore;
pub use translator::{compact, expand, translate};
pub use types::{
    Context, Entity, ExchangePayload, FieldDef, ImportRequest, Metadata, Provenance,
    ReceiveOutcome, ReceiveReport, PROVENANCE_GLOBAL_ID, PROVENANCE_KEY,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
