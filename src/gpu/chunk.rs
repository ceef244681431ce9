// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use std::{
    mem::size_of,
    ops::Range,
};

use tracing::{
    info,
    instrument,
    warn,
};

use super::{
    BufferHandle,
    Device,
};
use crate::error::{
    Error,
    Result,
};

/// Whole records of `stride` floats that fit in one buffer.
pub fn records_per_chunk(
    stride: usize,
    max_buffer_size: usize,
) -> Result<usize> {
    let record_bytes = stride * size_of::<f32>();
    match max_buffer_size.checked_div(record_bytes) {
        Some(records) if records > 0 => Ok(records),
        _ => Err(Error::BufferTooSmall {
            max_buffer_size,
            stride,
        }),
    }
}

/// Contiguous record ranges covering `0..records` in order, all but the last
/// holding exactly `records_per_chunk`.
pub fn plan_chunks(
    records: usize,
    records_per_chunk: usize,
) -> Vec<Range<usize>> {
    (0..records)
        .step_by(records_per_chunk.max(1))
        .map(|start| start..records.min(start + records_per_chunk.max(1)))
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub start:  usize,
    pub count:  usize,
    pub handle: BufferHandle,
}

/// One logical record array spread over device buffers. Must be handed back
/// with `release`; dropping it with chunks still held logs a leak.
#[must_use = "device buffers leak unless released"]
#[derive(Debug, PartialEq, Eq)]
pub struct ChunkedBuffer {
    stride:            usize,
    records_per_chunk: usize,
    total_records:     usize,
    chunks:            Vec<Chunk>,
}

impl ChunkedBuffer {
    #[instrument(skip(device, data), fields(floats = data.len()))]
    pub fn upload<D: Device>(
        device: &mut D,
        label: &str,
        stride: usize,
        max_buffer_size: usize,
        data: &[f32],
    ) -> Result<Self> {
        if stride == 0 || data.len() % stride != 0 {
            return Err(Error::RaggedArray {
                len: data.len(),
                stride,
            });
        }
        let records_per_chunk = records_per_chunk(stride, max_buffer_size)?;
        let total_records = data.len() / stride;

        let mut chunks = Vec::new();
        for (idx, range) in plan_chunks(total_records, records_per_chunk)
            .into_iter()
            .enumerate()
        {
            let floats = &data[range.start * stride..range.end * stride];
            match device.create_buffer(&format!("{label}[{idx}]"), bytemuck::cast_slice(floats)) {
                Ok(handle) => chunks.push(Chunk {
                    start: range.start,
                    count: range.len(),
                    handle,
                }),
                Err(e) => {
                    warn!(chunk = idx, created = chunks.len(), "Upload failed, releasing chunks");
                    for chunk in chunks {
                        device.release_buffer(chunk.handle);
                    }
                    return Err(e);
                },
            }
        }

        info!(
            records = total_records,
            records_per_chunk,
            chunks = chunks.len(),
            "Uploaded {label}"
        );

        Ok(Self {
            stride,
            records_per_chunk,
            total_records,
            chunks,
        })
    }

    pub fn release<D: Device>(
        mut self,
        device: &mut D,
    ) {
        for chunk in self.chunks.drain(..) {
            device.release_buffer(chunk.handle);
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub const fn stride(&self) -> usize {
        self.stride
    }

    pub const fn records_per_chunk(&self) -> usize {
        self.records_per_chunk
    }

    pub const fn total_records(&self) -> usize {
        self.total_records
    }

    /// Borrows every chunk's contents, `None` if the device no longer holds
    /// one of them.
    pub fn view<'a, D: Device>(
        &self,
        device: &'a D,
    ) -> Option<PackedView<'a>> {
        let chunks = self
            .chunks
            .iter()
            .map(|chunk| device.read_buffer(chunk.handle))
            .collect::<Option<Vec<_>>>()?;

        Some(PackedView {
            chunks,
            stride: self.stride,
            records_per_chunk: self.records_per_chunk,
        })
    }
}

impl Drop for ChunkedBuffer {
    fn drop(&mut self) {
        if !self.chunks.is_empty() {
            warn!(
                chunks = self.chunks.len(),
                records = self.total_records,
                "Dropped without release, leaking buffers"
            );
        }
    }
}

/// Read access to a chunked array by global record index, the way a shader
/// binding the chunks as separate buffers addresses it.
#[derive(Clone, Debug)]
pub struct PackedView<'a> {
    chunks:            Vec<&'a [f32]>,
    stride:            usize,
    records_per_chunk: usize,
}

impl<'a> PackedView<'a> {
    pub const fn empty(stride: usize) -> Self {
        Self {
            chunks: Vec::new(),
            stride,
            records_per_chunk: 1,
        }
    }

    /// Resolves `global = chunk * records_per_chunk + local`.
    #[inline]
    pub fn record(
        &self,
        global: usize,
    ) -> Option<&'a [f32]> {
        let chunk: &'a [f32] = self.chunks.get(global / self.records_per_chunk).copied()?;
        let local = global % self.records_per_chunk;
        chunk.get(local * self.stride..(local + 1) * self.stride)
    }

    pub fn len(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.len()).sum::<usize>() / self.stride
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenation of every chunk, in order.
    pub fn to_vec(&self) -> Vec<f32> {
        self.chunks.concat()
    }
}
