//! Mutable state of one platform and the read-then-write operations performed on it.
//!
//! Every method here assumes the caller holds the platform lock (see [`crate::Platform`]).
//! Failing operations leave the state untouched: a newly learned ontology is staged on a copy
//! of the registry and only committed once the entity write succeeded.

use tracing::info;

use crate::error::{ExchangeError, ExchangeResult};
use crate::ids::IdentityAllocator;
use crate::ontology::{OntologyEntry, OntologyRegistry};
use crate::store::EntityStore;
use crate::translator::{compact, expand, translate};
use crate::types::{
    Context, Entity, ExchangePayload, ImportRequest, Metadata, Provenance, ReceiveOutcome, ReceiveReport,
    PROVENANCE_GLOBAL_ID, PROVENANCE_KEY,
};

#[derive(Debug, Clone, PartialEq)]
pub struct PlatformState {
    pub store: EntityStore,
    pub ids: IdentityAllocator,
    pub registry: OntologyRegistry,
}

impl PlatformState {
    pub fn new(store: EntityStore, ids: IdentityAllocator, registry: OntologyRegistry) -> Self {
        Self {
            store,
            ids,
            registry,
        }
    }

    /// Resolve `ontology`, or learn it on a staged copy of the registry.
    fn stage_ontology(
        &self,
        ontology: &str,
        supplied: &Context,
    ) -> (OntologyEntry, Option<OntologyRegistry>) {
        match self.registry.resolve(ontology) {
            Ok(entry) => (entry.clone(), None),
            Err(_) => {
                let mut staged = self.registry.clone();
                let entry = staged.learn(ontology, supplied);
                (entry, Some(staged))
            }
        }
    }

    /// Insert a new entity, then commit the staged registry.
    fn commit_new(
        &mut self,
        entity: Entity,
        staged: Option<OntologyRegistry>,
    ) -> ExchangeResult<Entity> {
        self.store.insert(entity.clone())?;
        if let Some(registry) = staged {
            self.registry = registry;
        }
        Ok(entity)
    }

    /// Local authoring: translate the supplied record into the local vocabulary and store it.
    pub fn import(&mut self, request: ImportRequest) -> ExchangeResult<Entity> {
        if self.store.contains_title(&request.title) {
            return Err(ExchangeError::DuplicateTitle(request.title));
        }
        let (entry, staged) = self.stage_ontology(&request.ontology, &request.context);
        let metadata = translate(&request.metadata, &request.context, &entry.context)?;

        let id = self.ids.allocate(&entry.local_type);
        let entity = Entity {
            id,
            kind: entry.local_type,
            title: request.title,
            metadata,
            ontology: request.ontology,
            provenance: None,
        };
        let entity = self.commit_new(entity, staged)?;
        info!(id = %entity.id, kind = %entity.kind, "imported entity");
        Ok(entity)
    }

    /// Self-describing form of a local entity: metadata in the local vocabulary, the context
    /// needed to read it, and the provenance tag when the entity came from elsewhere.
    pub fn export_payload(&self, id: &str) -> ExchangeResult<ExchangePayload> {
        let entity = self.store.find_by_id(id)?;
        let context = self
            .registry
            .resolve(&entity.ontology)
            .map(|entry| entry.context.clone())
            .unwrap_or_default();

        let mut metadata = entity.metadata.clone();
        if let Some(provenance) = &entity.provenance {
            let key = context
                .iter()
                .find(|(_, def)| def.id == PROVENANCE_GLOBAL_ID)
                .map(|(local, _)| local.as_str())
                .unwrap_or(PROVENANCE_KEY);
            metadata.insert(key.to_string(), provenance.to_value());
        }

        Ok(ExchangePayload {
            id: entity.id.clone(),
            kind: entity.kind.clone(),
            title: entity.title.clone(),
            metadata,
            ontology: entity.ontology.clone(),
            context,
        })
    }

    /// Apply a payload received from `origin`: merge when it is one of our own entities coming
    /// back, otherwise create a new entity carrying fresh provenance.
    pub fn receive(
        &mut self,
        own_id: &str,
        origin: &str,
        payload: ExchangePayload,
    ) -> ExchangeResult<ReceiveReport> {
        let (entry, staged) = self.stage_ontology(&payload.ontology, &payload.context);

        let mut expanded = expand(&payload.metadata, &payload.context)?;
        let provenance = take_provenance(&mut expanded);
        let metadata = compact(&expanded, &entry.context)?;

        if let Some(tag) = provenance.filter(|p| p.from == own_id) {
            if self.store.find_by_id(&tag.with_id).is_ok() {
                let entity = self.store.update_metadata(&tag.with_id, metadata)?.clone();
                if let Some(registry) = staged {
                    self.registry = registry;
                }
                info!(id = %entity.id, origin = %origin, "merged returning entity");
                return Ok(ReceiveReport {
                    outcome: ReceiveOutcome::Merged,
                    entity,
                });
            }
        }

        if self.store.contains_title(&payload.title) {
            return Err(ExchangeError::DuplicateTitle(payload.title));
        }
        let id = self.ids.allocate(&entry.local_type);
        let entity = Entity {
            id,
            kind: entry.local_type,
            title: payload.title,
            metadata,
            ontology: payload.ontology,
            provenance: Some(Provenance::new(origin, payload.id)),
        };
        let entity = self.commit_new(entity, staged)?;
        info!(id = %entity.id, origin = %origin, "created entity from peer");
        Ok(ReceiveReport {
            outcome: ReceiveOutcome::Created,
            entity,
        })
    }

    /// Entity JSON with its ontology's `@context` merged in.
    pub fn contextualize(&self, entity: &Entity) -> serde_json::Value {
        let mut doc = match self.registry.context_document(&entity.ontology) {
            serde_json::Value::Object(map) => map,
            _ => Metadata::new(),
        };
        if let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(entity) {
            doc.extend(fields);
        }
        serde_json::Value::Object(doc)
    }
}

/// Remove the provenance field from an expanded record. A value that is not a provenance tag
/// stays in the record.
fn take_provenance(expanded: &mut Metadata) -> Option<Provenance> {
    for key in [PROVENANCE_GLOBAL_ID, PROVENANCE_KEY] {
        if let Some(value) = expanded.remove(key) {
            match Provenance::from_value(&value) {
                Some(tag) => return Some(tag),
                None => {
                    expanded.insert(key.to_string(), value);
                }
            }
        }
    }
    None
}
