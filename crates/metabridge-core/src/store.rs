//! In-memory entity collection for one platform.

use crate::error::{ExchangeError, ExchangeResult};
use crate::types::{Entity, Metadata};

/// Ordered list of entities; ids and titles are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityStore {
    entities: Vec<Entity>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from seed entities, rejecting duplicate ids or titles.
    pub fn from_entities(entities: Vec<Entity>) -> ExchangeResult<Self> {
        let mut store = Self::new();
        for entity in entities {
            store.insert(entity)?;
        }
        Ok(store)
    }

    pub fn insert(&mut self, entity: Entity) -> ExchangeResult<()> {
        if self.contains_title(&entity.title) {
            return Err(ExchangeError::DuplicateTitle(entity.title));
        }
        if self.entities.iter().any(|e| e.id == entity.id) {
            return Err(ExchangeError::DuplicateId(entity.id));
        }
        self.entities.push(entity);
        Ok(())
    }

    pub fn contains_title(&self, title: &str) -> bool {
        self.entities.iter().any(|e| e.title == title)
    }

    pub fn find_by_id(&self, id: &str) -> ExchangeResult<&Entity> {
        self.entities
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ExchangeError::NotFound(format!("entity {}", id)))
    }

    /// Shallow-merge `partial` into the entity's metadata, overwriting on key collision.
    pub fn update_metadata(&mut self, id: &str, partial: Metadata) -> ExchangeResult<&Entity> {
        let entity = self
            .entities
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| ExchangeError::NotFound(format!("entity {}", id)))?;
        entity.metadata.extend(partial);
        Ok(entity)
    }

    pub fn filter_by_type(&self, kind: &str) -> Vec<&Entity> {
        self.entities
            .iter()
            .filter(|e| e.kind.eq_ignore_ascii_case(kind))
            .collect()
    }

    pub fn filter_by_ontology(&self, ontology: &str) -> Vec<&Entity> {
        self.entities
            .iter()
            .filter(|e| e.ontology.eq_ignore_ascii_case(ontology))
            .collect()
    }

    pub fn all(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(id: &str, title: &str, kind: &str) -> Entity {
        Entity {
            id: id.into(),
            kind: kind.into(),
            title: title.into(),
            metadata: json!({ "info": "1D image" }).as_object().cloned().unwrap(),
            ontology: "https://openbis.ont.ethz.ch/DataSet".into(),
            provenance: None,
        }
    }

    #[test]
    fn duplicate_title_is_rejected_and_store_unchanged() {
        let mut store = EntityStore::new();
        store.insert(entity("DS-1", "An image", "@openBIS.Dataset")).unwrap();
        let err = store
            .insert(entity("DS-2", "An image", "@openBIS.Dataset"))
            .unwrap_err();
        assert!(matches!(err, ExchangeError::DuplicateTitle(t) if t == "An image"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut store = EntityStore::new();
        store.insert(entity("DS-1", "a", "@openBIS.Dataset")).unwrap();
        assert!(matches!(
            store.insert(entity("DS-1", "b", "@openBIS.Dataset")),
            Err(ExchangeError::DuplicateId(_))
        ));
    }

    #[test]
    fn update_metadata_merges_shallowly() {
        let mut store = EntityStore::new();
        store.insert(entity("DS-1", "a", "@openBIS.Dataset")).unwrap();
        let partial = json!({ "info": "2D image", "reviewed": true })
            .as_object()
            .cloned()
            .unwrap();
        let updated = store.update_metadata("DS-1", partial).unwrap();
        assert_eq!(updated.metadata["info"], json!("2D image"));
        assert_eq!(updated.metadata["reviewed"], json!(true));
    }

    #[test]
    fn update_missing_id_is_not_found() {
        let mut store = EntityStore::new();
        assert!(matches!(
            store.update_metadata("nope", Metadata::new()),
            Err(ExchangeError::NotFound(_))
        ));
    }

    #[test]
    fn filters_ignore_case() {
        let store = EntityStore::from_entities(vec![
            entity("DS-1", "a", "@openBIS.Dataset"),
            entity("EXP-1", "b", "@openBIS.Experiment"),
        ])
        .unwrap();
        assert_eq!(store.filter_by_type("@openbis.dataset").len(), 1);
        assert_eq!(
            store
                .filter_by_ontology("https://OPENBIS.ont.ethz.ch/DataSet")
                .len(),
            2
        );
    }
}
