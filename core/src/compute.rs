//! Compute Context
//!
//! Builders produce host side arrays; transferring them to the device goes
//! through a `CommandQueue` owned by an explicitly passed `ComputeContext`.

use crate::error::BuildTransferError;
use bytemuck::Pod;
use std::marker::PhantomData;

/// Identifies a buffer created by a `CommandQueue`.
pub type BufferId = usize;

/// Minimal device queue interface needed to upload build results.
pub trait CommandQueue {
    /// Create a device buffer initialized with `bytes` and return its id.
    ///
    /// * `bytes` - Buffer contents. Never empty.
    fn write_buffer(&mut self, bytes: &[u8]) -> Result<BufferId, BuildTransferError>;
}

/// In-memory queue that keeps buffers on the host. An optional capacity
/// limits the total number of bytes it accepts.
#[derive(Default)]
pub struct HostQueue {
    /// Buffer contents indexed by id.
    buffers: Vec<Vec<u8>>,

    /// Maximum total size in bytes.
    capacity: Option<usize>,

    /// Bytes currently allocated.
    used: usize,
}

impl HostQueue {
    /// Create a queue without a capacity limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that fails with `OutOfResources` once `capacity`
    /// bytes are in use.
    ///
    /// * `capacity` - Maximum total size in bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Returns the contents of a buffer.
    ///
    /// * `id` - Buffer id.
    pub fn buffer(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(id).map(|b| b.as_slice())
    }

    /// Returns the number of bytes in use.
    pub fn bytes_used(&self) -> usize {
        self.used
    }
}

impl CommandQueue for HostQueue {
    fn write_buffer(&mut self, bytes: &[u8]) -> Result<BufferId, BuildTransferError> {
        if bytes.is_empty() {
            return Err(BuildTransferError::InvalidBufferSize { bytes: 0 });
        }
        if let Some(capacity) = self.capacity {
            if self.used + bytes.len() > capacity {
                return Err(BuildTransferError::OutOfResources { bytes: bytes.len() });
            }
        }

        self.used += bytes.len();
        self.buffers.push(bytes.to_vec());
        Ok(self.buffers.len() - 1)
    }
}

/// A device buffer holding `len` elements of `T`. Empty buffers have no id.
#[derive(Debug, PartialEq, Eq)]
pub struct TypedBuffer<T> {
    id: Option<BufferId>,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T> TypedBuffer<T> {
    /// Returns a buffer that was never allocated on the device.
    pub fn empty() -> Self {
        Self {
            id: None,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Returns the device buffer id, if allocated.
    pub fn id(&self) -> Option<BufferId> {
        self.id
    }

    /// Returns the element count.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Owns the queue used to transfer build results.
pub struct ComputeContext {
    queue: Box<dyn CommandQueue>,
}

impl ComputeContext {
    /// Create a new context.
    ///
    /// * `queue` - The command queue.
    pub fn new(queue: Box<dyn CommandQueue>) -> Self {
        Self { queue }
    }

    /// Create a context backed by an unlimited `HostQueue`.
    pub fn host() -> Self {
        Self::new(Box::new(HostQueue::new()))
    }

    /// Copy `data` into a new device buffer. Empty slices skip the device
    /// and return `TypedBuffer::empty()`.
    ///
    /// * `label` - Name used in log messages.
    /// * `data`  - Elements to upload.
    pub fn upload<T: Pod>(&mut self, label: &str, data: &[T]) -> Result<TypedBuffer<T>, BuildTransferError> {
        if data.is_empty() {
            debug!("{label}: nothing to upload");
            return Ok(TypedBuffer::empty());
        }

        let bytes: &[u8] = bytemuck::cast_slice(data);
        let id = self.queue.write_buffer(bytes)?;
        debug!("{label}: uploaded {} elements ({} bytes) to buffer {id}", data.len(), bytes.len());

        Ok(TypedBuffer {
            id: Some(id),
            len: data.len(),
            _marker: PhantomData,
        })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
