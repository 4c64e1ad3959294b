//! Quad renderer for color and mask content using instanced quads
//!
//! Every quad renders in a single draw call: four strip vertices per
//! instance, no index buffer. Pipelines are built lazily per render target
//! configuration and kept for the renderer's lifetime.

use sheen_core::{FilterMode, Globals, InstanceRecord};
use wgpu::util::DeviceExt;

use crate::atlas::GpuAtlas;
use crate::error::RenderError;
use crate::shaders::builtin;

/// Vertex attributes of [`InstanceRecord`], one per field
pub const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 8] = wgpu::vertex_attr_array![
    0 => Sint32x2,
    1 => Uint32,
    2 => Uint32,
    3 => Uint32,
    4 => Uint32,
    5 => Float32,
    6 => Float32,
    7 => Float32
];

/// Instance buffer layout
pub fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: InstanceRecord::SIZE as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &INSTANCE_ATTRIBUTES,
    }
}

/// Render target configuration a pipeline was built for
#[derive(Clone, Debug, PartialEq)]
struct PipelineKey {
    format: wgpu::TextureFormat,
    multisample: wgpu::MultisampleState,
    depth_stencil: Option<wgpu::DepthStencilState>,
}

/// Instanced quad renderer
pub struct QuadRenderer {
    shader: wgpu::ShaderModule,
    atlas_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: Vec<(PipelineKey, wgpu::RenderPipeline)>,
    /// Index into `pipelines` selected by the last `prepare_target`
    active: Option<usize>,
    sampler: wgpu::Sampler,
    atlas_bind_group: Option<wgpu::BindGroup>,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    instance_count: u32,
}

impl QuadRenderer {
    pub const MAX_INSTANCES: usize = 16 * 1024;

    pub fn new(device: &wgpu::Device, filter: FilterMode, max_instances: usize) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Quad Shader"),
            source: wgpu::ShaderSource::Wgsl(builtin::QUAD.into()),
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let atlas_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Quad Atlas Bind Group Layout"),
            entries: &[
                // color atlas
                texture_entry(0),
                // mask atlas
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Quad Globals Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Quad Pipeline Layout"),
            bind_group_layouts: &[&atlas_layout, &globals_layout],
            push_constant_ranges: &[],
        });

        let filter_mode = match filter {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Quad Atlas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter_mode,
            min_filter: filter_mode,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Globals Buffer"),
            contents: bytemuck::cast_slice(&[Globals::new(1, 1)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Quad Globals Bind Group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let instance_capacity = max_instances.max(1);
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Quad Instance Buffer"),
            size: (instance_capacity * InstanceRecord::SIZE) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            shader,
            atlas_layout,
            pipeline_layout,
            pipelines: Vec::new(),
            active: None,
            sampler,
            atlas_bind_group: None,
            globals_buffer,
            globals_bind_group,
            instance_buffer,
            instance_capacity,
            instance_count: 0,
        }
    }

    /// Point bind group 0 at a new pair of atlases.
    ///
    /// Call again whenever an atlas texture is recreated; pipelines are kept.
    pub fn bind_atlases(&mut self, device: &wgpu::Device, color: &GpuAtlas, mask: &GpuAtlas) {
        self.atlas_bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Quad Atlas Bind Group"),
            layout: &self.atlas_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(color.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(mask.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        }));
    }

    /// Select (building if needed) the pipeline for a render target
    pub fn prepare_target(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        multisample: wgpu::MultisampleState,
        depth_stencil: Option<wgpu::DepthStencilState>,
    ) {
        let key = PipelineKey {
            format,
            multisample,
            depth_stencil,
        };

        let index = match self.pipelines.iter().position(|(k, _)| *k == key) {
            Some(index) => index,
            None => {
                let pipeline = self.create_pipeline(device, &key);
                self.pipelines.push((key, pipeline));
                self.pipelines.len() - 1
            }
        };
        self.active = Some(index);
    }

    fn create_pipeline(&self, device: &wgpu::Device, key: &PipelineKey) -> wgpu::RenderPipeline {
        log::debug!(
            "Creating quad pipeline: format={:?} samples={} depth={}",
            key.format,
            key.multisample.count,
            key.depth_stencil.is_some()
        );

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Quad Pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                buffers: &[instance_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: key.depth_stencil.clone(),
            multisample: key.multisample,
            multiview: None,
            cache: None,
        })
    }

    /// Upload the screen size and this frame's instances.
    ///
    /// Instances beyond the buffer capacity are dropped with a warning.
    pub fn prepare(&mut self, queue: &wgpu::Queue, resolution: [u32; 2], instances: &[InstanceRecord]) {
        let globals = Globals::new(resolution[0], resolution[1]);
        queue.write_buffer(&self.globals_buffer, 0, bytemuck::cast_slice(&[globals]));

        let kept = if instances.len() > self.instance_capacity {
            log::warn!(
                "Dropping {} quads over instance capacity {}",
                instances.len() - self.instance_capacity,
                self.instance_capacity
            );
            &instances[..self.instance_capacity]
        } else {
            instances
        };

        if !kept.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, InstanceRecord::as_bytes(kept));
        }
        self.instance_count = kept.len() as u32;
    }

    /// Record the draw into `render_pass`
    pub fn render<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) -> Result<(), RenderError> {
        if self.instance_count == 0 {
            return Ok(());
        }

        let atlas_bind_group = self.atlas_bind_group.as_ref().ok_or(RenderError::AtlasesNotBound)?;
        let Some((_, pipeline)) = self.active.and_then(|i| self.pipelines.get(i)) else {
            return Err(RenderError::PipelineNotPrepared);
        };

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, atlas_bind_group, &[]);
        render_pass.set_bind_group(1, &self.globals_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.instance_buffer.slice(..));

        // 4 vertices per instance (triangle strip quad)
        render_pass.draw(0..4, 0..self.instance_count);
        Ok(())
    }

    pub fn instance_count(&self) -> usize {
        self.instance_count as usize
    }

    pub fn instance_capacity(&self) -> usize {
        self.instance_capacity
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }
}
