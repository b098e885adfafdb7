//! Ownership store for elements.

use std::rc::Rc;

use ms_core::ElementId;

use crate::ElementHandle;

/// Owns every element of the algorithm.
///
/// Storing a handle that is already present (same allocation) returns the
/// existing id, so an element reached through several registration points
/// is owned once.  Invocation order is kept elsewhere, as a list of ids.
#[derive(Default)]
pub struct ElementStore {
    elements: Vec<ElementHandle>,
}

impl ElementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, handle: ElementHandle) -> ElementId {
        if let Some(id) = self.find(&handle) {
            return id;
        }
        self.elements.push(handle);
        ElementId::from_index(self.elements.len() - 1)
    }

    /// Id of `handle` if it is already stored.
    pub fn find(&self, handle: &ElementHandle) -> Option<ElementId> {
        self.elements
            .iter()
            .position(|stored| std::ptr::addr_eq(Rc::as_ptr(stored), Rc::as_ptr(handle)))
            .map(ElementId::from_index)
    }

    pub fn get(&self, id: ElementId) -> Option<&ElementHandle> {
        self.elements.get(id.index())
    }

    pub fn contains(&self, id: ElementId) -> bool {
        id.index() < self.elements.len()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &ElementHandle)> {
        self.elements.iter().enumerate().map(|(i, h)| (ElementId::from_index(i), h))
    }
}

/// Remove repeated ids, keeping the first occurrence.
pub fn dedup_ids(ids: &[ElementId]) -> Vec<ElementId> {
    let mut seen = rustc_hash::FxHashSet::default();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
