// src/wgpu_utils/binding_builder.rs
//! Builders for compute bind group layouts and the bind groups made from them
//!
//! Bindings are numbered in the order they are added, so a layout and every
//! bind group built against it stay in step.

/// Layout plus the entries it was created from
pub struct BindGroupLayoutWithDesc {
    pub layout: wgpu::BindGroupLayout,
    pub entries: Vec<wgpu::BindGroupLayoutEntry>,
}

#[derive(Default)]
pub struct BindGroupLayoutBuilder {
    entries: Vec<wgpu::BindGroupLayoutEntry>,
}

impl BindGroupLayoutBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the next binding, visible to the compute stage
    pub fn next_binding_compute(mut self, ty: wgpu::BindingType) -> Self {
        self.entries.push(wgpu::BindGroupLayoutEntry {
            binding: self.entries.len() as u32,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty,
            count: None,
        });
        self
    }

    pub fn create(self, device: &wgpu::Device, label: &str) -> BindGroupLayoutWithDesc {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &self.entries,
        });
        BindGroupLayoutWithDesc {
            layout,
            entries: self.entries,
        }
    }
}

pub struct BindGroupBuilder<'a> {
    layout: &'a BindGroupLayoutWithDesc,
    entries: Vec<wgpu::BindGroupEntry<'a>>,
}

impl<'a> BindGroupBuilder<'a> {
    pub fn new(layout: &'a BindGroupLayoutWithDesc) -> Self {
        Self {
            layout,
            entries: Vec::with_capacity(layout.entries.len()),
        }
    }

    /// Bind `resource` to the next slot of the layout
    pub fn resource(mut self, resource: wgpu::BindingResource<'a>) -> Self {
        self.entries.push(wgpu::BindGroupEntry {
            binding: self.entries.len() as u32,
            resource,
        });
        self
    }

    pub fn buffer(self, buffer: &'a wgpu::Buffer) -> Self {
        self.resource(buffer.as_entire_binding())
    }

    pub fn create(self, device: &wgpu::Device, label: &str) -> wgpu::BindGroup {
        debug_assert_eq!(
            self.entries.len(),
            self.layout.entries.len(),
            "bind group '{}' does not fill its layout",
            label
        );
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.layout.layout,
            entries: &self.entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::context::tests::test_context;
    use crate::wgpu_utils::binding_types;

    #[test]
    fn test_bindings_numbered_in_order() {
        let Some(context) = test_context() else {
            return;
        };
        let layout = BindGroupLayoutBuilder::new()
            .next_binding_compute(binding_types::storage_buffer_read_only())
            .next_binding_compute(binding_types::storage_buffer_read_write())
            .next_binding_compute(binding_types::uniform())
            .create(context.device(), "test layout");

        let bindings: Vec<u32> = layout.entries.iter().map(|entry| entry.binding).collect();
        assert_eq!(bindings, vec![0, 1, 2]);
        assert!(layout
            .entries
            .iter()
            .all(|entry| entry.visibility == wgpu::ShaderStages::COMPUTE));
        assert!(matches!(
            layout.entries[1].ty,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                ..
            }
        ));
    }
}
