//! Resolved entities
//!
//! A resolved entity records the outcome of processing one config: its display
//! name, its resolved properties (including the remote `id` once deployed) and
//! whether it was skipped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::config::Config;
use super::coordinate::Coordinate;
use super::parameter::{Properties, PropertyResolver};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub entity_name: String,
    pub coordinate: Coordinate,
    pub properties: Properties,
    pub skip: bool,
}

impl ResolvedEntity {
    /// Entity for a config that was deliberately not deployed
    pub fn skipped(config: &Config) -> Self {
        Self {
            entity_name: config.coordinate.config_id.clone(),
            coordinate: config.coordinate.clone(),
            properties: Properties::new(),
            skip: true,
        }
    }
}

/// Resolved entities of one deployment pass, keyed by coordinate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityLookup {
    entities: HashMap<Coordinate, ResolvedEntity>,
}

impl EntityLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an entity, replacing any earlier entry for the same coordinate
    pub fn put_resolved(&mut self, entity: ResolvedEntity) {
        self.entities.insert(entity.coordinate.clone(), entity);
    }

    pub fn get_resolved_entity(&self, coordinate: &Coordinate) -> Option<&ResolvedEntity> {
        self.entities.get(coordinate)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates entities in coordinate order
    pub fn entities(&self) -> Vec<&ResolvedEntity> {
        let mut sorted: Vec<_> = self.entities.values().collect();
        sorted.sort_by(|a, b| a.coordinate.cmp(&b.coordinate));
        sorted
    }

    /// Moves every entity of `other` into this lookup
    pub fn merge(&mut self, other: EntityLookup) {
        self.entities.extend(other.entities);
    }
}

impl PropertyResolver for EntityLookup {
    fn get_resolved_property(&self, coordinate: &Coordinate, property: &str) -> Option<Value> {
        self.entities
            .get(coordinate)
            .and_then(|e| e.properties.get(property))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(id: &str, remote: &str) -> ResolvedEntity {
        let mut properties = Properties::new();
        properties.insert("id".into(), json!(remote));
        ResolvedEntity {
            entity_name: id.to_string(),
            coordinate: Coordinate::new("p", "dashboard", id),
            properties,
            skip: false,
        }
    }

    #[test]
    fn lookup_resolves_properties() {
        let mut lookup = EntityLookup::new();
        lookup.put_resolved(entity("a", "remote-a"));

        let c = Coordinate::new("p", "dashboard", "a");
        assert_eq!(lookup.get_resolved_property(&c, "id"), Some(json!("remote-a")));
        assert_eq!(lookup.get_resolved_property(&c, "name"), None);
        assert!(lookup
            .get_resolved_entity(&Coordinate::new("p", "dashboard", "b"))
            .is_none());
    }

    #[test]
    fn merge_and_ordered_entities() {
        let mut left = EntityLookup::new();
        left.put_resolved(entity("b", "2"));
        let mut right = EntityLookup::new();
        right.put_resolved(entity("a", "1"));

        left.merge(right);
        let ids: Vec<_> = left
            .entities()
            .iter()
            .map(|e| e.coordinate.config_id.clone())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(left.len(), 2);
    }
}
