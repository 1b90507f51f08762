//! Registry of GPU-side resources owned by the scene.
//!
//! Every geometry, material and light attached to the scene holds a [`ResourceId`]
//! allocated here. Releasing an id queues it for the renderer, which deletes the matching
//! GL objects on its next paint.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(u64);

impl ResourceId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Geometry,
    Material,
    Light,
}

#[derive(Debug, Default)]
pub struct GpuResources {
    next: u64,
    live: BTreeMap<ResourceId, ResourceKind>,
    released: Vec<ResourceId>,
    total_allocated: u64,
}

impl GpuResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, kind: ResourceKind) -> ResourceId {
        self.next += 1;
        self.total_allocated += 1;
        let id = ResourceId(self.next);
        self.live.insert(id, kind);
        id
    }

    pub fn release(&mut self, id: ResourceId) {
        if self.live.remove(&id).is_some() {
            self.released.push(id);
        } else {
            tracing::warn!("Released unknown or already released resource {}", id.0);
        }
    }

    /// Ids released since the last drain, in release order
    pub fn drain_released(&mut self) -> Vec<ResourceId> {
        std::mem::take(&mut self.released)
    }

    pub fn is_live(&self, id: ResourceId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_of(&self, kind: ResourceKind) -> usize {
        self.live.values().filter(|k| **k == kind).count()
    }

    pub fn live_ids(&self) -> Vec<ResourceId> {
        self.live.keys().copied().collect()
    }

    pub fn total_allocated(&self) -> u64 {
        self.total_allocated
    }
}
