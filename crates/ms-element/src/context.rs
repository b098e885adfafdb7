//! Assembly-time context handed to element builders.

use ms_core::{ElementId, RunConfig};

use crate::stages::{SharedEnergy, SharedFreeEnergy, SharedState};
use crate::{ElementHandle, ElementResult, ElementStore, ServiceKind, ServiceRegistry, Wiring};

/// Everything an element builder may reach while the algorithm is being
/// assembled: the run configuration, the shared data objects, the
/// ownership store, the service registry, and the deferred wiring.
pub struct BuildContext<'a> {
    config:      &'a RunConfig,
    store:       &'a mut ElementStore,
    registry:    &'a mut ServiceRegistry,
    wiring:      &'a mut Wiring,
    state:       &'a SharedState,
    energy:      &'a SharedEnergy,
    free_energy: Option<&'a SharedFreeEnergy>,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        config:      &'a RunConfig,
        store:       &'a mut ElementStore,
        registry:    &'a mut ServiceRegistry,
        wiring:      &'a mut Wiring,
        state:       &'a SharedState,
        energy:      &'a SharedEnergy,
        free_energy: Option<&'a SharedFreeEnergy>,
    ) -> Self {
        Self { config, store, registry, wiring, state, energy, free_energy }
    }

    pub fn config(&self) -> &RunConfig {
        self.config
    }

    pub fn state(&self) -> SharedState {
        SharedState::clone(self.state)
    }

    pub fn energy(&self) -> SharedEnergy {
        SharedEnergy::clone(self.energy)
    }

    /// Lambda data, present only in free-energy runs.
    pub fn free_energy(&self) -> Option<SharedFreeEnergy> {
        self.free_energy.cloned()
    }

    pub fn wiring(&mut self) -> &mut Wiring {
        self.wiring
    }

    /// Hand an element to the ownership store.
    pub fn store_element(&mut self, handle: ElementHandle) -> ElementId {
        self.store.store(handle)
    }

    /// Id of the shared element for `kind`, stored on first use.
    pub fn service(
        &mut self,
        kind: ServiceKind,
        make: impl FnOnce() -> ElementResult<ElementHandle>,
    ) -> ElementResult<ElementId> {
        let store = &mut *self.store;
        self.registry.get_or_insert_with(kind, || make().map(|handle| store.store(handle)))
    }
}

/// Builds one element (or looks up a shared one) and returns its id in the
/// ownership store.
pub trait BuildElement {
    fn build(self, ctx: &mut BuildContext<'_>) -> ElementResult<ElementId>;
}

/// An already constructed element is stored as is.  Adding the same
/// handle twice yields the same id.
impl BuildElement for ElementHandle {
    fn build(self, ctx: &mut BuildContext<'_>) -> ElementResult<ElementId> {
        Ok(ctx.store_element(self))
    }
}
