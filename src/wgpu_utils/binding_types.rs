// src/wgpu_utils/binding_types.rs
//! Binding types used by the life kernel

fn storage(read_only: bool) -> wgpu::BindingType {
    wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Storage { read_only },
        has_dynamic_offset: false,
        min_binding_size: None,
    }
}

/// Grid the kernel writes
pub fn storage_buffer_read_write() -> wgpu::BindingType {
    storage(false)
}

/// Grid the kernel only reads
pub fn storage_buffer_read_only() -> wgpu::BindingType {
    storage(true)
}

/// Small parameter block, sized by the shader
pub fn uniform() -> wgpu::BindingType {
    wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: false,
        min_binding_size: None,
    }
}
