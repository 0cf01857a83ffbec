//! Parallel backend
//!
//! Runs the life kernel on the GPU with ping-pong device buffers and
//! publishes every generation into a buffer shared with the renderer.
//!
//! A host mirror of the current grid backs `set_cell`, `set_grid` and random
//! fills: the mirror is edited and re-uploaded in full, then republished, so
//! host and device never drift apart. After a step the mirror is stale until
//! the next readback.
//!
//! Every mutation takes the publication buffer before touching any state. If
//! the renderer holds it the call fails with `SyncError::Busy` and the grid,
//! the mirror and the published generation are all left as they were.

use super::grid::{self, GridShape};
use super::publication::{PublicationBuffer, PublicationHandle};
use super::traits::{check_len, BackendKind, SimulationBackend};
use crate::compute::{ComputeContext, LifeParams, WorkSizes};
use crate::config::ConfigError;
use crate::error::BackendError;
use crate::wgpu_utils::{self, UniformBuffer};
use std::sync::Arc;

pub struct ParallelBackend {
    context: Arc<ComputeContext>,
    shape: GridShape,
    work: WorkSizes,

    params: UniformBuffer<LifeParams>,
    // Ping-pong pair, `bind_groups[i]` reads `buffers[i]` and writes the other
    buffers: [wgpu::Buffer; 2],
    bind_groups: [wgpu::BindGroup; 2],
    current: usize,

    publication: PublicationBuffer,

    // Padded to whole words, only the first `cell_count` bytes are cells
    host: Vec<u8>,
    host_stale: bool,
}

/// Refuse grids the device cannot bind or dispatch in one pass
fn check_limits(context: &ComputeContext, cells: usize) -> Result<(), BackendError> {
    let limits = context.device().limits();
    let max_cells = WorkSizes::max_cells(limits.max_compute_workgroups_per_dimension)
        .min(limits.max_storage_buffer_binding_size as usize)
        .min(u32::MAX as usize);
    if cells > max_cells {
        return Err(BackendError::GridTooLarge { cells, max_cells });
    }
    Ok(())
}

impl ParallelBackend {
    /// Allocate device buffers for a `rows x cols` grid publishing into
    /// `publication`
    ///
    /// The new grid is all dead and already published.
    pub fn new(
        context: Arc<ComputeContext>,
        rows: u32,
        cols: u32,
        publication: PublicationBuffer,
    ) -> Result<Self, BackendError> {
        if rows == 0 || cols == 0 {
            return Err(ConfigError::EmptyGrid { rows, cols }.into());
        }
        let shape = GridShape::new(rows, cols);
        let cells = shape.cell_count();
        if publication.cell_count() != cells {
            return Err(BackendError::SizeMismatch {
                expected: cells,
                actual: publication.cell_count(),
            });
        }

        check_limits(&context, cells)?;

        let work = WorkSizes::for_cells(cells);
        log::debug!(
            "Life work sizes for {}x{}: {} groups x {} invocations x {} cells",
            rows,
            cols,
            work.groups,
            work.local,
            work.cells_per_thread
        );

        let size = shape.padded_len() as u64;
        let (params, buffers, bind_groups) = context.scoped("grid allocation", |device, _| {
            let params = UniformBuffer::new_with_data(
                device,
                &LifeParams {
                    cols,
                    rows,
                    cells_per_thread: work.cells_per_thread,
                    cell_count: cells as u32,
                },
            );
            let buffers = [
                wgpu_utils::create_storage_buffer(device, size, "Life Grid A"),
                wgpu_utils::create_storage_buffer(device, size, "Life Grid B"),
            ];
            let kernel = context.kernel();
            let bind_groups = [
                kernel.bind(device, &buffers[0], &buffers[1], params.binding_resource(), "Life A->B"),
                kernel.bind(device, &buffers[1], &buffers[0], params.binding_resource(), "Life B->A"),
            ];
            (params, buffers, bind_groups)
        })?;

        let mut backend = Self {
            context,
            shape,
            work,
            params,
            buffers,
            bind_groups,
            current: 0,
            publication,
            host: vec![0; shape.padded_len()],
            host_stale: false,
        };
        backend.commit_host(|_| ())?;
        log::info!("Parallel backend ready ({}x{})", rows, cols);
        Ok(backend)
    }

    /// Backend with its own publication buffer on the context's device
    pub fn with_own_publication(
        context: Arc<ComputeContext>,
        rows: u32,
        cols: u32,
    ) -> Result<Self, BackendError> {
        let cells = rows as usize * cols as usize;
        check_limits(&context, cells)?;
        let publication = PublicationBuffer::new(context.device(), cells);
        Self::new(context, rows, cols, publication)
    }

    pub fn context(&self) -> &Arc<ComputeContext> {
        &self.context
    }

    pub fn work_sizes(&self) -> WorkSizes {
        self.work
    }

    /// Kernel parameters bound for this grid
    pub fn params(&self) -> &LifeParams {
        self.params.content()
    }

    /// Handle the renderer draws from
    pub fn publication(&self) -> PublicationHandle {
        self.publication.renderer_handle()
    }

    /// Edit the host mirror, upload it to the current buffer and republish
    fn commit_host(&mut self, edit: impl FnOnce(&mut [u8])) -> Result<(), BackendError> {
        let mut access = self.publication.acquire(&self.context)?;

        edit(&mut self.host);
        let current = &self.buffers[self.current];
        self.context.queue().write_buffer(current, 0, &self.host);
        self.host_stale = false;

        access.copy_from(current);
        access.release()
    }

    /// Make the host mirror current before editing it
    fn sync_host(&mut self) -> Result<(), BackendError> {
        if self.host_stale {
            self.copy_grid_to_host()?;
        }
        Ok(())
    }
}

impl SimulationBackend for ParallelBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Parallel
    }

    fn shape(&self) -> GridShape {
        self.shape
    }

    fn initialize(&mut self) -> Result<(), BackendError> {
        self.commit_host(|host| host.fill(0))
    }

    fn initialize_random(&mut self, seed: u64) -> Result<(), BackendError> {
        let cells = self.shape.cell_count();
        self.commit_host(|host| {
            grid::fill_random(&mut host[..cells], seed);
            host[cells..].fill(0);
        })
    }

    fn set_cell(&mut self, i: u32, j: u32, state: u8) -> Result<(), BackendError> {
        let Some(idx) = self.shape.index(i, j) else {
            return Ok(());
        };
        self.sync_host()?;
        self.commit_host(|host| host[idx] = u8::from(state != 0))
    }

    fn step(&mut self) -> Result<(), BackendError> {
        let mut access = self.publication.acquire(&self.context)?;
        let context = &self.context;
        let bind_group = &self.bind_groups[self.current];
        let next = self.current ^ 1;
        let groups = self.work.groups;

        context.scoped("life step", |device, queue| {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Life Compute Encoder"),
            });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Life Compute Pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(context.kernel().pipeline());
                pass.set_bind_group(0, bind_group, &[]);
                pass.dispatch_workgroups(groups, 1, 1);
            }
            queue.submit(std::iter::once(encoder.finish()));
        })?;

        // Release waits for the kernel and the copy behind it
        access.copy_from(&self.buffers[next]);
        access.release()?;

        self.current = next;
        self.host_stale = true;
        Ok(())
    }

    fn grid(&mut self) -> Result<&[u8], BackendError> {
        self.sync_host()?;
        Ok(&self.host[..self.shape.cell_count()])
    }

    fn set_grid(&mut self, cells: &[u8]) -> Result<(), BackendError> {
        check_len(self.shape, cells)?;
        self.commit_host(|host| {
            grid::copy_normalized(host, cells);
            host[cells.len()..].fill(0);
        })
    }

    fn copy_grid_to_host(&mut self) -> Result<(), BackendError> {
        let data = self
            .context
            .read_buffer(&self.buffers[self.current], self.host.len() as u64)?;
        self.host.copy_from_slice(&data);
        self.host_stale = false;
        Ok(())
    }
}

impl Drop for ParallelBackend {
    fn drop(&mut self) {
        log::debug!(
            "Releasing parallel backend ({}x{}), context holders left: {}",
            self.shape.rows,
            self.shape.cols,
            Arc::strong_count(&self.context) - 1
        );
    }
}
