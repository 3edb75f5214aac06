//! Slave registry
//!
//! Fixed table of eight slots, one per [`SlaveId`]. Slots start empty and
//! stay filled once registered; there is no removal.

use crate::error::SpiError;
use crate::slave::{SlaveDescriptor, SlaveId};

/// Number of addressable slaves
pub const MAX_SLAVES: usize = 8;

/// Eight-slot table of slave descriptors
#[derive(Debug, Clone, Default)]
pub struct SlaveRegistry {
    slots: [Option<SlaveDescriptor>; MAX_SLAVES],
}

impl SlaveRegistry {
    /// Create an empty registry
    pub const fn new() -> Self {
        Self {
            slots: [None; MAX_SLAVES],
        }
    }

    /// Store a copy of the descriptor, replacing any previous one
    ///
    /// Returns the descriptor that was replaced, if any.
    pub fn insert(
        &mut self,
        id: SlaveId,
        descriptor: SlaveDescriptor,
    ) -> Option<SlaveDescriptor> {
        self.slots[id.index()].replace(descriptor)
    }

    /// Descriptor registered for `id`
    pub fn get(&self, id: SlaveId) -> Option<&SlaveDescriptor> {
        self.slots[id.index()].as_ref()
    }

    /// Descriptor registered for `id`, or `SlaveNotRegistered`
    pub fn require(&self, id: SlaveId) -> Result<SlaveDescriptor, SpiError> {
        self.get(id)
            .copied()
            .ok_or(SpiError::SlaveNotRegistered(id.get()))
    }

    /// Check whether a descriptor is registered for `id`
    pub fn contains(&self, id: SlaveId) -> bool {
        self.slots[id.index()].is_some()
    }

    /// Number of registered slaves
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Check if no slave is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over registered slaves in id order
    pub fn iter(&self) -> impl Iterator<Item = (SlaveId, &SlaveDescriptor)> {
        SlaveId::all().filter_map(move |id| self.get(id).map(|d| (id, d)))
    }
}
