//! Publication buffer shared with the rendering subsystem
//!
//! The parallel backend copies every new generation into this buffer and the
//! renderer draws one instance per cell straight from it. Exactly one side
//! holds the buffer at a time:
//!
//! - the simulation takes it with [`PublicationBuffer::acquire`], records its
//!   copy, and hands it back with [`SimulationAccess::release`], which blocks
//!   until the copy has landed;
//! - the renderer takes it with [`PublicationHandle::read`] between
//!   generations.
//!
//! Both guards give the buffer back on drop, including on error paths.

use crate::compute::ComputeContext;
use crate::error::{BackendError, Holder, SyncError};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use wgpu::{Buffer, BufferUsages, CommandEncoder};

const RELEASED: u8 = 0;
const SIMULATION: u8 = 1;
const RENDERER: u8 = 2;

fn code(holder: Holder) -> u8 {
    match holder {
        Holder::Simulation => SIMULATION,
        Holder::Renderer => RENDERER,
    }
}

/// Ownership flag and published-generation counter
#[derive(Debug, Default)]
struct AccessFlag {
    state: AtomicU8,
    generation: AtomicU64,
}

impl AccessFlag {
    fn try_acquire(&self, holder: Holder) -> Result<(), SyncError> {
        self.state
            .compare_exchange(RELEASED, code(holder), Ordering::Acquire, Ordering::Relaxed)
            .map(|_| ())
            .map_err(|current| {
                SyncError::Busy(if current == SIMULATION {
                    Holder::Simulation
                } else {
                    Holder::Renderer
                })
            })
    }

    fn release(&self, holder: Holder) {
        debug_assert_eq!(self.state.load(Ordering::Relaxed), code(holder));
        self.state.store(RELEASED, Ordering::Release);
    }

    fn holder(&self) -> Option<Holder> {
        match self.state.load(Ordering::Acquire) {
            SIMULATION => Some(Holder::Simulation),
            RENDERER => Some(Holder::Renderer),
            _ => None,
        }
    }
}

fn padded(cell_count: usize) -> u64 {
    (cell_count.div_ceil(4) * 4) as u64
}

/// Device buffer the simulation publishes each generation into
pub struct PublicationBuffer {
    buffer: Arc<Buffer>,
    cell_count: usize,
    flag: Arc<AccessFlag>,
}

impl PublicationBuffer {
    /// Create a buffer the renderer can bind as per-instance vertex data
    pub fn new(device: &wgpu::Device, cell_count: usize) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Life Publication Buffer"),
            size: padded(cell_count),
            usage: BufferUsages::VERTEX
                | BufferUsages::STORAGE
                | BufferUsages::COPY_DST
                | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        Self {
            buffer: Arc::new(buffer),
            cell_count,
            flag: Arc::default(),
        }
    }

    /// Adopt a buffer created by the renderer
    ///
    /// It must allow `COPY_DST` and hold `cell_count` bytes rounded up to a
    /// whole word.
    pub fn from_buffer(buffer: Arc<Buffer>, cell_count: usize) -> Result<Self, BackendError> {
        if !buffer.usage().contains(BufferUsages::COPY_DST) {
            return Err(BackendError::PublicationUsage);
        }
        if buffer.size() < padded(cell_count) {
            return Err(BackendError::SizeMismatch {
                expected: padded(cell_count) as usize,
                actual: buffer.size() as usize,
            });
        }

        Ok(Self {
            buffer,
            cell_count,
            flag: Arc::default(),
        })
    }

    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Number of completed publications
    pub fn generation(&self) -> u64 {
        self.flag.generation.load(Ordering::Acquire)
    }

    /// Domain currently holding the buffer, `None` when released
    pub fn holder(&self) -> Option<Holder> {
        self.flag.holder()
    }

    /// Take exclusive access for the simulation
    pub fn acquire<'a>(
        &'a self,
        context: &'a ComputeContext,
    ) -> Result<SimulationAccess<'a>, SyncError> {
        self.flag.try_acquire(Holder::Simulation)?;
        Ok(SimulationAccess {
            publication: self,
            context,
            encoder: None,
        })
    }

    /// Cloneable handle for the rendering side
    pub fn renderer_handle(&self) -> PublicationHandle {
        PublicationHandle {
            buffer: Arc::clone(&self.buffer),
            cell_count: self.cell_count,
            flag: Arc::clone(&self.flag),
        }
    }
}

/// Simulation-side exclusive access
pub struct SimulationAccess<'a> {
    publication: &'a PublicationBuffer,
    context: &'a ComputeContext,
    encoder: Option<CommandEncoder>,
}

impl SimulationAccess<'_> {
    /// Record a device copy of `src` into the publication buffer
    pub fn copy_from(&mut self, src: &Buffer) {
        let device = self.context.device();
        let encoder = self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Life Publication Encoder"),
            })
        });
        encoder.copy_buffer_to_buffer(
            src,
            0,
            &self.publication.buffer,
            0,
            padded(self.publication.cell_count),
        );
    }

    /// Submit the recorded copy, wait for it and hand the buffer back
    pub fn release(mut self) -> Result<(), BackendError> {
        self.flush()
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        let Some(encoder) = self.encoder.take() else {
            return Ok(());
        };
        self.context.scoped("publication copy", |_, queue| {
            queue.submit(std::iter::once(encoder.finish()));
        })?;
        self.context.wait_idle()?;
        self.publication.flag.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

impl Drop for SimulationAccess<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            log::error!("Publication flush failed during release: {}", err);
        }
        self.publication.flag.release(Holder::Simulation);
    }
}

/// Renderer's view of the publication buffer
#[derive(Clone)]
pub struct PublicationHandle {
    buffer: Arc<Buffer>,
    cell_count: usize,
    flag: Arc<AccessFlag>,
}

impl PublicationHandle {
    /// Borrow the buffer for drawing; fails while the simulation writes it
    pub fn read(&self) -> Result<RenderAccess<'_>, SyncError> {
        self.flag.try_acquire(Holder::Renderer)?;
        Ok(RenderAccess { handle: self })
    }

    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Number of completed publications
    pub fn generation(&self) -> u64 {
        self.flag.generation.load(Ordering::Acquire)
    }

    /// Copy the published cells to the host
    ///
    /// Only works for buffers with `COPY_SRC`, such as the ones created by
    /// [`PublicationBuffer::new`].
    pub fn snapshot(&self, context: &ComputeContext) -> Result<Vec<u8>, BackendError> {
        let access = self.read()?;
        let mut cells = context.read_buffer(access.buffer(), padded(self.cell_count))?;
        cells.truncate(self.cell_count);
        Ok(cells)
    }
}

/// Renderer-side access, released on drop
pub struct RenderAccess<'a> {
    handle: &'a PublicationHandle,
}

impl<'a> RenderAccess<'a> {
    pub fn buffer(&self) -> &'a Buffer {
        &self.handle.buffer
    }

    /// One byte per cell, ready for `set_vertex_buffer`
    pub fn slice(&self) -> wgpu::BufferSlice<'a> {
        self.handle.buffer.slice(..self.handle.cell_count as u64)
    }
}

impl Drop for RenderAccess<'_> {
    fn drop(&mut self) {
        self.handle.flag.release(Holder::Renderer);
    }
}
