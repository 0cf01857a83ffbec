//! Life stepping kernel
//!
//! Cells are bytes packed four to a `u32` word. Each invocation rewrites
//! `cells_per_thread` consecutive cells as whole words, so no two invocations
//! ever touch the same word of the output grid.

use crate::wgpu_utils::binding_types;
use crate::wgpu_utils::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc};
use bytemuck::{Pod, Zeroable};
use wgpu::Device;

pub const ENTRY_POINT: &str = "life";

/// Uniform parameters bound next to the two grids
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct LifeParams {
    pub cols: u32,
    pub rows: u32,
    pub cells_per_thread: u32,
    pub cell_count: u32,
}

/// Compiled pipeline and its bind group layout
///
/// Bindings: 0 = current grid (read), 1 = next grid (write), 2 = params.
pub struct LifeKernel {
    pipeline: wgpu::ComputePipeline,
    layout: BindGroupLayoutWithDesc,
}

impl LifeKernel {
    /// Compile the kernel on `device`
    ///
    /// Call inside an error scope; compilation errors surface there.
    pub fn new(device: &Device) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Life Kernel"),
            source: wgpu::ShaderSource::Wgsl(LIFE_KERNEL.into()),
        });

        let layout = BindGroupLayoutBuilder::new()
            .next_binding_compute(binding_types::storage_buffer_read_only())
            .next_binding_compute(binding_types::storage_buffer_read_write())
            .next_binding_compute(binding_types::uniform())
            .create(device, "Life Bind Group Layout");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Life Pipeline Layout"),
            bind_group_layouts: &[&layout.layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Life Pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(ENTRY_POINT),
            compilation_options: Default::default(),
            cache: None,
        });

        Self { pipeline, layout }
    }

    pub fn pipeline(&self) -> &wgpu::ComputePipeline {
        &self.pipeline
    }

    /// Bind group reading `current` and writing `next`
    pub fn bind(
        &self,
        device: &Device,
        current: &wgpu::Buffer,
        next: &wgpu::Buffer,
        params: wgpu::BindingResource,
        label: &str,
    ) -> wgpu::BindGroup {
        BindGroupBuilder::new(&self.layout)
            .buffer(current)
            .buffer(next)
            .resource(params)
            .create(device, label)
    }
}

const LIFE_KERNEL: &str = r#"
struct Params {
    cols: u32,
    rows: u32,
    cells_per_thread: u32,
    cell_count: u32,
}

@group(0) @binding(0) var<storage, read> current_grid: array<u32>;
@group(0) @binding(1) var<storage, read_write> next_grid: array<u32>;
@group(0) @binding(2) var<uniform> params: Params;

fn cell(x: u32, y: u32) -> u32 {
    let idx = y * params.cols + x;
    let byte = (current_grid[idx >> 2u] >> ((idx & 3u) * 8u)) & 0xffu;
    return select(0u, 1u, byte != 0u);
}

fn next_state(idx: u32) -> u32 {
    let x = idx % params.cols;
    let y = idx / params.cols;
    let left = (x + params.cols - 1u) % params.cols;
    let right = (x + 1u) % params.cols;
    let up = (y + params.rows - 1u) % params.rows;
    let down = (y + 1u) % params.rows;

    let alive = cell(left, up) + cell(x, up) + cell(right, up)
              + cell(left, y)                + cell(right, y)
              + cell(left, down) + cell(x, down) + cell(right, down);

    if (alive == 3u || (alive == 2u && cell(x, y) == 1u)) {
        return 1u;
    }
    return 0u;
}

@compute @workgroup_size(256)
fn life(@builtin(global_invocation_id) gid: vec3<u32>) {
    let words = params.cells_per_thread / 4u;
    let first = gid.x * words;

    for (var w = 0u; w < words; w++) {
        let word = first + w;
        let base = word * 4u;
        if (base >= params.cell_count) {
            return;
        }

        var packed = 0u;
        for (var b = 0u; b < 4u; b++) {
            let idx = base + b;
            if (idx < params.cell_count) {
                packed = packed | (next_state(idx) << (b * 8u));
            }
        }
        next_grid[word] = packed;
    }
}
"#;
