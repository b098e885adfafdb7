//! Build-scoped lookup of shared stages.

use rustc_hash::FxHashMap;

use ms_core::ElementId;

/// The stages that may be shared between independent builders.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ServiceKind {
    StatePropagatorData,
    EnergyData,
    FreeEnergyPerturbation,
    Forces,
}

/// Maps each [`ServiceKind`] to the stored element providing it.
///
/// Only lives while the algorithm is being assembled.
#[derive(Default, Debug)]
pub struct ServiceRegistry {
    services: FxHashMap<ServiceKind, ElementId>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ServiceKind) -> Option<ElementId> {
        self.services.get(&kind).copied()
    }

    /// Register `id` for `kind`, returning the id it replaced.
    pub fn insert(&mut self, kind: ServiceKind, id: ElementId) -> Option<ElementId> {
        self.services.insert(kind, id)
    }

    /// Look up `kind`, creating it with `make` the first time.
    pub fn get_or_insert_with<E>(
        &mut self,
        kind: ServiceKind,
        make: impl FnOnce() -> Result<ElementId, E>,
    ) -> Result<ElementId, E> {
        if let Some(id) = self.get(kind) {
            return Ok(id);
        }
        let id = make()?;
        self.services.insert(kind, id);
        Ok(id)
    }
}
