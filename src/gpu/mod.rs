// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

//! Upload side of the pipeline: flat float arrays split into chunks that
//! each fit one device buffer.

mod chunk;
mod memory;

pub use chunk::{
    plan_chunks,
    records_per_chunk,
    Chunk,
    ChunkedBuffer,
    PackedView,
};
pub use memory::MemoryDevice;

use crate::error::Result;

slotmap::new_key_type! {
    pub struct BufferKey;
    pub struct ViewKey;
}

/// A storage buffer together with the view shaders bind it through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle {
    pub buffer: BufferKey,
    pub view:   ViewKey,
}

pub trait Device {
    /// Creates a read-only float buffer holding `contents`.
    fn create_buffer(
        &mut self,
        label: &str,
        contents: &[u8],
    ) -> Result<BufferHandle>;

    /// Releasing a handle twice is a no-op.
    fn release_buffer(
        &mut self,
        handle: BufferHandle,
    );

    fn read_buffer(
        &self,
        handle: BufferHandle,
    ) -> Option<&[f32]>;
}

impl<D: Device + ?Sized> Device for &mut D {
    fn create_buffer(
        &mut self,
        label: &str,
        contents: &[u8],
    ) -> Result<BufferHandle> {
        (**self).create_buffer(label, contents)
    }

    fn release_buffer(
        &mut self,
        handle: BufferHandle,
    ) {
        (**self).release_buffer(handle);
    }

    fn read_buffer(
        &self,
        handle: BufferHandle,
    ) -> Option<&[f32]> {
        (**self).read_buffer(handle)
    }
}
