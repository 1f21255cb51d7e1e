//! Ordered entity collection
//!
//! A map from id to entity paired with an explicit presentation order. The
//! order always holds every key of the map exactly once.

use std::collections::HashMap;

use crate::models::Entity;

#[derive(Debug, Clone)]
pub struct OrderedCollection<T> {
    items: HashMap<String, T>,
    order: Vec<String>,
}

impl<T> Default for OrderedCollection<T> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T: Entity> OrderedCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a collection from a list, keeping list order.
    ///
    /// A repeated id keeps its first position and its last value.
    pub fn from_vec(values: Vec<T>) -> Self {
        let mut collection = Self::new();
        for value in values {
            collection.upsert(value);
        }
        collection
    }

    /// Insert or replace by id. New ids are appended; existing ids keep
    /// their position. Returns true if the id was new.
    pub fn upsert(&mut self, value: T) -> bool {
        let id = value.id().to_string();
        let is_new = self.items.insert(id.clone(), value).is_none();
        if is_new {
            self.order.push(id);
        }
        is_new
    }

    /// Remove both the entry and its order slot
    pub fn remove(&mut self, id: &str) -> Option<T> {
        let removed = self.items.remove(id)?;
        self.order.retain(|entry| entry != id);
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.items.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in presentation order
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn first_id(&self) -> Option<&str> {
        self.order.first().map(String::as_str)
    }

    /// Entities in presentation order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    /// Clone the entities out in presentation order
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SheetKind, SheetTemplate};
    use std::collections::HashSet;

    fn template(id: &str, name: &str) -> SheetTemplate {
        SheetTemplate::new(id, SheetKind::Enemy, name)
    }

    fn assert_consistent(collection: &OrderedCollection<SheetTemplate>) {
        let order: HashSet<&String> = collection.order().iter().collect();
        assert_eq!(order.len(), collection.order().len(), "duplicate ids in order");
        assert_eq!(order.len(), collection.items.len());
        for id in collection.order() {
            assert!(collection.items.contains_key(id), "dangling id {}", id);
        }
    }

    #[test]
    fn test_upsert_appends_new_ids() {
        let mut collection = OrderedCollection::new();
        assert!(collection.upsert(template("a", "A")));
        assert!(collection.upsert(template("b", "B")));
        assert_eq!(collection.order(), ["a", "b"]);
    }

    #[test]
    fn test_upsert_existing_keeps_position() {
        let mut collection = OrderedCollection::new();
        collection.upsert(template("a", "A"));
        collection.upsert(template("b", "B"));
        assert!(!collection.upsert(template("a", "A2")));

        assert_eq!(collection.order(), ["a", "b"]);
        assert_eq!(collection.get("a").unwrap().name, "A2");
    }

    #[test]
    fn test_remove_deletes_entry_and_order_slot() {
        let mut collection = OrderedCollection::new();
        collection.upsert(template("a", "A"));
        collection.upsert(template("b", "B"));

        assert!(collection.remove("a").is_some());
        assert!(collection.remove("missing").is_none());
        assert_eq!(collection.order(), ["b"]);
        assert!(!collection.contains("a"));
    }

    #[test]
    fn test_from_vec_collapses_duplicates() {
        let collection = OrderedCollection::from_vec(vec![
            template("a", "A"),
            template("b", "B"),
            template("a", "A2"),
        ]);

        assert_eq!(collection.order(), ["a", "b"]);
        assert_eq!(collection.get("a").unwrap().name, "A2");
    }

    #[test]
    fn test_order_matches_keys_after_mixed_operations() {
        let mut collection = OrderedCollection::new();
        let steps = ["a", "b", "-a", "c", "b", "a", "-c", "-z", "d", "-b"];

        for step in steps {
            match step.strip_prefix('-') {
                Some(id) => {
                    collection.remove(id);
                }
                None => {
                    collection.upsert(template(step, step));
                }
            }
            assert_consistent(&collection);
        }

        assert_eq!(collection.order(), ["a", "d"]);
    }

    #[test]
    fn test_iter_follows_order() {
        let collection =
            OrderedCollection::from_vec(vec![template("z", "Z"), template("a", "A")]);
        let names: Vec<&str> = collection.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Z", "A"]);
        assert_eq!(collection.first_id(), Some("z"));
    }
}
