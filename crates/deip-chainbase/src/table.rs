//! The generic building block every typed table is composed from: a
//! primary `ObjectId → T` map with a monotonic, never-reused allocator
//! (§4.1). Secondary indices are maintained by each domain table in
//! `crate::tables` alongside this primary store.

use std::collections::BTreeMap;

use deip_core::types::ObjectId;

#[derive(Clone)]
pub struct PrimaryTable<T> {
    rows: BTreeMap<ObjectId, T>,
    next_id: ObjectId,
}

impl<T> Default for PrimaryTable<T> {
    fn default() -> Self {
        Self { rows: BTreeMap::new(), next_id: 0 }
    }
}

impl<T> PrimaryTable<T> {
    /// Allocate the next id without inserting a row yet. The caller is
    /// expected to call [`PrimaryTable::insert`] with this id immediately.
    pub fn alloc_id(&mut self) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, id: ObjectId, value: T) {
        self.rows.insert(id, value);
    }

    pub fn get(&self, id: ObjectId) -> Option<&T> {
        self.rows.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut T> {
        self.rows.get_mut(&id)
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<T> {
        self.rows.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, &T)> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Undoing a creation must free the id rather than leave a gap (§4.1):
    /// only legal when `id` is the most recently allocated one, which
    /// holds as long as undo replays in reverse creation order.
    pub fn rollback_next_id(&mut self, id: ObjectId) {
        if self.next_id == id + 1 {
            self.next_id = id;
        }
    }
}
