//! Shared GPU compute context
//!
//! Owns the device, the queue and the compiled life kernel. Backends hold it
//! through an `Arc`, so the device is torn down exactly when the last backend
//! using it is dropped. [`ComputeContext::shared`] hands out one lazily
//! created process-wide instance without keeping it alive on its own.

use super::kernel::LifeKernel;
use crate::error::BackendError;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};
use wgpu::{Device, Queue};

static SHARED: OnceLock<Mutex<Weak<ComputeContext>>> = OnceLock::new();

pub struct ComputeContext {
    device: Arc<Device>,
    queue: Arc<Queue>,
    adapter_name: String,
    kernel: LifeKernel,
}

impl ComputeContext {
    /// Discover an adapter, open a device and compile the kernel
    pub fn new_headless() -> Result<Self, BackendError> {
        Self::new_headless_with_limits(wgpu::Limits::downlevel_defaults())
    }

    /// Like [`ComputeContext::new_headless`], requesting `limits` from the device
    ///
    /// Grids the limits cannot cover are refused with
    /// [`BackendError::GridTooLarge`] when a backend is built.
    pub fn new_headless_with_limits(limits: wgpu::Limits) -> Result<Self, BackendError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;

        let info = adapter.get_info();
        if !adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            return Err(BackendError::ComputeUnsupported(info.name));
        }
        log::info!(
            "Selected compute adapter: {} ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Life Compute Device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::Off,
        }))?;

        Self::build(Arc::new(device), Arc::new(queue), info.name)
    }

    /// Run the simulation on a device the renderer already owns
    ///
    /// Publication buffers must live on the same device for the renderer to
    /// draw from them.
    pub fn from_device(device: Arc<Device>, queue: Arc<Queue>) -> Result<Self, BackendError> {
        Self::build(device, queue, "external device".to_string())
    }

    /// Process-wide context, created on first use
    ///
    /// The slot only keeps a weak reference; once every holder is dropped the
    /// device is released and the next call opens a fresh one.
    pub fn shared() -> Result<Arc<Self>, BackendError> {
        let slot = SHARED.get_or_init(|| Mutex::new(Weak::new()));
        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(context) = slot.upgrade() {
            return Ok(context);
        }

        let context = Arc::new(Self::new_headless()?);
        *slot = Arc::downgrade(&context);
        Ok(context)
    }

    fn build(
        device: Arc<Device>,
        queue: Arc<Queue>,
        adapter_name: String,
    ) -> Result<Self, BackendError> {
        let (kernel, error) = capture_errors(&device, || LifeKernel::new(&device));
        if let Some(error) = error {
            return Err(BackendError::KernelCompilation(error.to_string()));
        }
        log::debug!("Life kernel compiled on {}", adapter_name);

        Ok(Self {
            device,
            queue,
            adapter_name,
            kernel,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn kernel(&self) -> &LifeKernel {
        &self.kernel
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Block until every submitted command has finished
    pub fn wait_idle(&self) -> Result<(), BackendError> {
        self.device
            .poll(wgpu::PollType::Wait)
            .map(|_| ())
            .map_err(|err| BackendError::Device(err.to_string()))
    }

    /// Run `op` inside validation and out-of-memory error scopes
    pub fn scoped<T>(
        &self,
        what: &str,
        op: impl FnOnce(&Device, &Queue) -> T,
    ) -> Result<T, BackendError> {
        let (value, error) = capture_errors(&self.device, || op(&self.device, &self.queue));
        match error {
            Some(err) => Err(BackendError::Device(format!("{}: {}", what, err))),
            None => Ok(value),
        }
    }

    /// Copy `size` bytes of `src` into host memory (blocking)
    ///
    /// `src` needs `COPY_SRC` usage.
    pub fn read_buffer(&self, src: &wgpu::Buffer, size: u64) -> Result<Vec<u8>, BackendError> {
        let staging = self.scoped("readback copy", |device, queue| {
            let staging = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Life Staging Buffer"),
                size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });

            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Life Readback Encoder"),
            });
            encoder.copy_buffer_to_buffer(src, 0, &staging, 0, size);
            queue.submit(std::iter::once(encoder.finish()));
            staging
        })?;

        let slice = staging.slice(..);
        let (tx, rx) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        self.wait_idle()?;

        match futures::executor::block_on(rx) {
            Ok(Ok(())) => {
                let data = slice.get_mapped_range().to_vec();
                staging.unmap();
                Ok(data)
            }
            Ok(Err(err)) => Err(BackendError::Readback(err.to_string())),
            Err(_) => Err(BackendError::Readback("map callback was dropped".to_string())),
        }
    }
}

impl Drop for ComputeContext {
    fn drop(&mut self) {
        log::debug!("Releasing compute context on {}", self.adapter_name);
    }
}

/// Run `op` and report the first validation or out-of-memory error it raised
fn capture_errors<T>(device: &Device, op: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = op();
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());
    (value, validation.or(out_of_memory))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Private context for one test, or `None` on hosts without a usable GPU
    pub(crate) fn test_context() -> Option<Arc<ComputeContext>> {
        match ComputeContext::new_headless() {
            Ok(context) => Some(Arc::new(context)),
            Err(err) => {
                eprintln!("skipping GPU test: {}", err);
                None
            }
        }
    }

    #[test]
    fn test_kernel_compiles() {
        let Some(context) = test_context() else {
            return;
        };
        assert!(!context.adapter_name().is_empty());
        context.wait_idle().unwrap();
    }

    #[test]
    fn test_read_buffer_round_trip() {
        let Some(context) = test_context() else {
            return;
        };
        let buffer = crate::wgpu_utils::create_storage_buffer(context.device(), 8, "test");
        context
            .queue()
            .write_buffer(&buffer, 0, &[1, 0, 1, 1, 0, 0, 1, 0]);
        let data = context.read_buffer(&buffer, 8).unwrap();
        assert_eq!(data, vec![1, 0, 1, 1, 0, 0, 1, 0]);
    }

    #[test]
    fn test_shared_context_is_refcounted() {
        let first = match ComputeContext::shared() {
            Ok(context) => context,
            Err(err) => {
                eprintln!("skipping GPU test: {}", err);
                return;
            }
        };
        let second = ComputeContext::shared().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let weak = Arc::downgrade(&first);
        drop(first);
        assert!(weak.upgrade().is_some(), "still held by the second owner");
        drop(second);
        assert!(weak.upgrade().is_none(), "last owner tears the context down");

        let third = ComputeContext::shared().unwrap();
        assert_eq!(Arc::strong_count(&third), 1);
    }
}
