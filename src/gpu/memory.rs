// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use slotmap::SlotMap;
use tracing::{
    debug,
    warn,
};

use super::{
    BufferHandle,
    BufferKey,
    Device,
    ViewKey,
};
use crate::error::{
    Error,
    Result,
};

#[derive(Debug)]
struct Buffer {
    label: String,
    data:  Vec<f32>,
    bytes: usize,
}

/// Host-memory device. Buffers live in a slot map, so stale handles never
/// alias a newer buffer.
#[derive(Debug, Default)]
pub struct MemoryDevice {
    buffers: SlotMap<BufferKey, Buffer>,
    views:   SlotMap<ViewKey, BufferKey>,

    budget: Option<usize>,
    used:   usize,
}

impl MemoryDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails allocations once `budget` bytes are live.
    pub fn with_budget(budget: usize) -> Self {
        Self {
            budget: Some(budget),
            ..Self::default()
        }
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub const fn used_bytes(&self) -> usize {
        self.used
    }

    pub fn label(
        &self,
        handle: BufferHandle,
    ) -> Option<&str> {
        self.buffers
            .get(handle.buffer)
            .map(|buffer| buffer.label.as_str())
    }
}

impl Device for MemoryDevice {
    fn create_buffer(
        &mut self,
        label: &str,
        contents: &[u8],
    ) -> Result<BufferHandle> {
        if let Some(budget) = self.budget {
            let available = budget.saturating_sub(self.used);
            if contents.len() > available {
                warn!(label, requested = contents.len(), available, "Allocation failed");
                return Err(Error::OutOfDeviceMemory {
                    requested: contents.len(),
                    available,
                });
            }
        }

        let buffer = self.buffers.insert(Buffer {
            label: label.to_owned(),
            data:  bytemuck::pod_collect_to_vec(contents),
            bytes: contents.len(),
        });
        let view = self.views.insert(buffer);
        self.used += contents.len();

        debug!(label, bytes = contents.len(), ?buffer, "Created buffer");
        Ok(BufferHandle { buffer, view })
    }

    fn release_buffer(
        &mut self,
        handle: BufferHandle,
    ) {
        self.views.remove(handle.view);
        if let Some(buffer) = self.buffers.remove(handle.buffer) {
            self.used -= buffer.bytes;
            debug!(label = %buffer.label, bytes = buffer.bytes, "Released buffer");
        }
    }

    fn read_buffer(
        &self,
        handle: BufferHandle,
    ) -> Option<&[f32]> {
        let buffer = *self.views.get(handle.view)?;
        if buffer != handle.buffer {
            return None;
        }
        self.buffers.get(buffer).map(|buffer| buffer.data.as_slice())
    }
}
