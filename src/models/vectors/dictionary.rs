//! # Dictionary registry
//!
//! Per-reader map from dictionary id to the shared vector holding that
//! dictionary's values.
//!
//! Entries are created while the vector tree is built, the first time a field
//! references an id. They are filled when the matching dictionary batch is
//! loaded, exactly once. Every index vector referencing the id holds a clone
//! of the same `Arc`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use log::debug;

use crate::error::{IpcError, IpcResult};
use crate::models::types::field::FieldDesc;
use crate::models::vectors::SharedVector;
use crate::models::vectors::factory::build_vector;

#[derive(Debug, Default)]
pub struct DictionaryRegistry {
    entries: HashMap<i64, SharedVector>,
    loaded: HashSet<i64>,
}

impl DictionaryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds entries for `field` and every nested field, in preorder.
    ///
    /// An id already present is reused, so fields sharing an id share one
    /// dictionary vector.
    pub fn register(&mut self, field: &FieldDesc) -> IpcResult<()> {
        if let Some(dict) = field.dictionary {
            if !self.entries.contains_key(&dict.id) {
                let value_field = Arc::new(field.dictionary_value_field(dict.id)?);
                let vector = build_vector(&value_field, self)?;
                debug!(
                    "Registered dictionary {} ({}) for field '{}'",
                    dict.id, value_field.data_type, field.name
                );
                self.entries.insert(dict.id, Arc::new(RwLock::new(vector)));
            }
        }
        for child in &field.children {
            self.register(child)?;
        }
        Ok(())
    }

    pub fn get(&self, id: i64) -> Option<SharedVector> {
        self.entries.get(&id).cloned()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_loaded(&self, id: i64) -> bool {
        self.loaded.contains(&id)
    }

    /// Records that dictionary `id` now holds data. Loading the same id twice
    /// is an error.
    pub(crate) fn mark_loaded(&mut self, id: i64) -> IpcResult<()> {
        if !self.loaded.insert(id) {
            return Err(IpcError::format(format!(
                "dictionary {id} appears in more than one dictionary batch"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::field::{DataType, DictionaryRef, IntType};

    fn dict_field(name: &str, id: i64) -> FieldDesc {
        FieldDesc::new(name, DataType::Utf8, false).with_dictionary(DictionaryRef {
            id,
            index_type: IntType {
                bit_width: 32,
                signed: true,
            },
        })
    }

    #[test]
    fn test_same_id_shares_one_vector() {
        let mut registry = DictionaryRegistry::new();
        registry.register(&dict_field("a", 3)).unwrap();
        let first = registry.get(3).unwrap();
        registry.register(&dict_field("b", 3)).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&first, &registry.get(3).unwrap()));
    }

    #[test]
    fn test_nested_ids_are_seeded() {
        let parent = FieldDesc::new("s", DataType::Struct, true)
            .with_children(vec![dict_field("x", 1), dict_field("y", 2)]);
        let mut registry = DictionaryRegistry::new();
        registry.register(&parent).unwrap();
        assert_eq!(registry.ids(), vec![1, 2]);
    }

    #[test]
    fn test_dictionary_loads_once() {
        let mut registry = DictionaryRegistry::new();
        registry.register(&dict_field("a", 0)).unwrap();
        assert!(!registry.is_loaded(0));
        registry.mark_loaded(0).unwrap();
        assert!(registry.is_loaded(0));
        assert!(matches!(registry.mark_loaded(0), Err(IpcError::Format(_))));
    }
}
