// src/rendering_lib/wgpu_backend.rs

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::ops::Range;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::geometry::TextureId;

use super::backend::{
    resolve_attributes, BlendFactor, BlendMode, GraphicsBackend, ProgramId, ProgramSource, UniformId, UniformValue,
    VertexArrayId,
};
use super::batch::Topology;
use super::error::BackendError;
use super::shader::{
    compose_wgsl, UNIFORM_ASSET, UNIFORM_LIGHT_CENTER, UNIFORM_LIGHT_INTENSITY, UNIFORM_LIGHT_RADIUS, UNIFORM_VIEW,
};
use super::vertex::{Vertex, VertexAttribute};

const MIN_BUFFER_SIZE: u64 = 256;

/// Mirrors `DrawUniforms` in the WGSL prelude.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct DrawUniforms {
    view: [f32; 4],
    light_center: [f32; 2],
    light_radius: f32,
    light_intensity: f32,
}

impl Default for DrawUniforms {
    fn default() -> Self {
        Self {
            view: [0.0, 0.0, 1.0, 1.0],
            light_center: [0.0, 0.0],
            light_radius: 1.0,
            light_intensity: 1.0,
        }
    }
}

const UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniforms>() as u64;

struct GpuArray {
    buffer: Option<wgpu::Buffer>,
    capacity: u64,
    len: u32,
    attributes: Vec<VertexAttribute>,
}

struct GpuProgram {
    label: String,
    module: wgpu::ShaderModule,
    attributes: Vec<VertexAttribute>,
    uniform_names: Vec<String>,
    uniforms: DrawUniforms,
    textured: bool,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    blend: BlendMode,
    topology: wgpu::PrimitiveTopology,
}

enum DrawRange {
    Vertices(Range<u32>),
    Indices(Range<u32>),
}

struct DrawCommand {
    key: PipelineKey,
    array: VertexArrayId,
    texture: Option<TextureId>,
    uniform_offset: u32,
    range: DrawRange,
}

/// Draws recorded by `draw()` and not yet encoded by `submit()`.
#[derive(Default)]
struct PendingDraws {
    commands: Vec<DrawCommand>,
    uniform_data: Vec<u8>,
    indices: Vec<u32>,
}

impl PendingDraws {
    /// Appends one aligned uniform block and returns its dynamic offset.
    fn push_uniforms(&mut self, uniforms: &DrawUniforms, alignment: u64) -> u32 {
        let offset = self.uniform_data.len();
        self.uniform_data.extend_from_slice(bytemuck::bytes_of(uniforms));
        self.uniform_data.resize(offset + alignment as usize, 0);
        offset as u32
    }

    fn push_fan(&mut self, offset: u32, count: u32) -> Range<u32> {
        let start = self.indices.len() as u32;
        self.indices.extend(fan_indices(offset, count));
        start..self.indices.len() as u32
    }

    fn len(&self) -> usize {
        self.commands.len()
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.uniform_data.clear();
        self.indices.clear();
    }
}

fn wgpu_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
        BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
    }
}

fn component(src: BlendFactor, dst: BlendFactor) -> wgpu::BlendComponent {
    wgpu::BlendComponent {
        src_factor: wgpu_factor(src),
        dst_factor: wgpu_factor(dst),
        operation: wgpu::BlendOperation::Add,
    }
}

pub fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    match mode {
        BlendMode::Func { src, dst } => wgpu::BlendState { color: component(src, dst), alpha: component(src, dst) },
        BlendMode::Separate { src_rgb, dst_rgb, src_alpha, dst_alpha } => wgpu::BlendState {
            color: component(src_rgb, dst_rgb),
            alpha: component(src_alpha, dst_alpha),
        },
    }
}

pub fn primitive_topology(topology: Topology) -> wgpu::PrimitiveTopology {
    match topology {
        Topology::Points => wgpu::PrimitiveTopology::PointList,
        Topology::Lines => wgpu::PrimitiveTopology::LineList,
        // Fans are expanded to indexed triangle lists.
        Topology::TriangleFan | Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
    }
}

/// Indices turning the fan `offset..offset + count` into a triangle list.
pub fn fan_indices(offset: u32, count: u32) -> impl Iterator<Item = u32> {
    (1..count.saturating_sub(1)).flat_map(move |i| [offset, offset + i, offset + i + 1])
}

fn padded_size(bytes: u64) -> u64 {
    bytes.max(MIN_BUFFER_SIZE).next_power_of_two()
}

/// [`GraphicsBackend`] over wgpu.
///
/// Draws are recorded during `end()` and encoded into one render pass by
/// [`WgpuBackend::submit`].
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    target_format: wgpu::TextureFormat,

    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    plain_pipeline_layout: wgpu::PipelineLayout,
    textured_pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    uniform_alignment: u64,

    arrays: Vec<GpuArray>,
    programs: Vec<GpuProgram>,
    textures: Vec<GpuTexture>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    current_program: Option<ProgramId>,
    current_array: Option<VertexArrayId>,
    current_texture: Option<TextureId>,
    blend: BlendMode,

    pending: PendingDraws,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    index_buffer: wgpu::Buffer,
}

impl WgpuBackend {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, target_format: wgpu::TextureFormat) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_uniforms_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("asset_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let plain_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Plain Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });
        let textured_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Textured Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("asset_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniform_alignment = (device.limits().min_uniform_buffer_offset_alignment as u64).max(UNIFORM_SIZE);
        let uniform_buffer = Self::make_buffer(&device, "Draw Uniform Buffer", MIN_BUFFER_SIZE, wgpu::BufferUsages::UNIFORM);
        let uniform_bind_group = Self::make_uniform_bind_group(&device, &uniform_layout, &uniform_buffer);
        let index_buffer = Self::make_buffer(&device, "Fan Index Buffer", MIN_BUFFER_SIZE, wgpu::BufferUsages::INDEX);

        Self {
            device,
            queue,
            target_format,
            uniform_layout,
            texture_layout,
            plain_pipeline_layout,
            textured_pipeline_layout,
            sampler,
            uniform_alignment,
            arrays: Vec::new(),
            programs: Vec::new(),
            textures: Vec::new(),
            pipelines: HashMap::new(),
            current_program: None,
            current_array: None,
            current_texture: None,
            blend: BlendMode::STANDARD_ALPHA,
            pending: PendingDraws::default(),
            uniform_buffer,
            uniform_bind_group,
            index_buffer,
        }
    }

    fn make_buffer(device: &wgpu::Device, label: &str, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn make_uniform_bind_group(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, buffer: &wgpu::Buffer) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_uniforms_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: NonZeroU64::new(UNIFORM_SIZE),
                }),
            }],
        })
    }

    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            // The browser cannot block on an error scope; errors reach the uncaptured handler.
            fn scoped<T>(&self, _filter: wgpu::ErrorFilter, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, wgpu::Error> {
                Ok(f(&self.device))
            }
        } else {
            /// Runs `f` inside an error scope and reports anything it raised.
            fn scoped<T>(&self, filter: wgpu::ErrorFilter, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, wgpu::Error> {
                self.device.push_error_scope(filter);
                let value = f(&self.device);
                match pollster::block_on(self.device.pop_error_scope()) {
                    Some(err) => Err(err),
                    None => Ok(value),
                }
            }
        }
    }

    fn grow_buffer(&self, label: &str, bytes: u64, usage: wgpu::BufferUsages) -> Result<(wgpu::Buffer, u64), BackendError> {
        let size = padded_size(bytes);
        let buffer = self
            .scoped(wgpu::ErrorFilter::OutOfMemory, |device| Self::make_buffer(device, label, size, usage))
            .map_err(|err| BackendError::Allocation(err.to_string()))?;
        log::debug!("allocated {} ({} bytes)", label, size);
        Ok((buffer, size))
    }

    /// Uploads an RGBA8 image and returns its handle for [`GraphicsBackend::bind_texture`].
    pub fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<TextureId, BackendError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected || expected == 0 {
            return Err(BackendError::TextureData { expected, actual: rgba.len() });
        }
        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let texture = self
            .scoped(wgpu::ErrorFilter::OutOfMemory, |device| {
                device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("asset_texture"),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::Rgba8UnormSrgb,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                })
            })
            .map_err(|err| BackendError::Allocation(err.to_string()))?;

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("asset_bind_group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&self.sampler) },
            ],
        });

        let id = TextureId(self.textures.len() as u32);
        self.textures.push(GpuTexture { _texture: texture, bind_group });
        log::debug!("created {}x{} texture {:?}", width, height, id);
        Ok(id)
    }

    fn program(&self, program: ProgramId) -> Result<&GpuProgram, BackendError> {
        self.programs
            .get(program.0 as usize)
            .ok_or(BackendError::InvalidHandle { kind: "program", id: program.0 })
    }

    fn array(&self, array: VertexArrayId) -> Result<&GpuArray, BackendError> {
        self.arrays
            .get(array.0 as usize)
            .ok_or(BackendError::InvalidHandle { kind: "vertex array", id: array.0 })
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) -> Result<(), BackendError> {
        if self.pipelines.contains_key(&key) {
            return Ok(());
        }
        let program = self.program(key.program)?;
        let attributes = Vertex::attributes_desc(&program.attributes);
        let layout = if program.textured { &self.textured_pipeline_layout } else { &self.plain_pipeline_layout };
        let label = format!("{} pipeline", program.label);

        let pipeline = self
            .scoped(wgpu::ErrorFilter::Validation, |device| {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(&label),
                    layout: Some(layout),
                    vertex: wgpu::VertexState {
                        module: &program.module,
                        entry_point: "vs_main",
                        buffers: &[Vertex::desc(&attributes)],
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &program.module,
                        entry_point: "fs_main",
                        targets: &[Some(wgpu::ColorTargetState {
                            format: self.target_format,
                            blend: Some(blend_state(key.blend)),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: key.topology,
                        strip_index_format: None,
                        front_face: wgpu::FrontFace::Ccw,
                        cull_mode: None,
                        polygon_mode: wgpu::PolygonMode::Fill,
                        unclipped_depth: false,
                        conservative: false,
                    },
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
                    multiview: None,
                })
            })
            .map_err(|err| BackendError::ShaderCompile { label: program.label.clone(), message: err.to_string() })?;

        log::debug!("created pipeline {:?}", key);
        self.pipelines.insert(key, pipeline);
        Ok(())
    }

    /// Encodes every draw recorded since the last submit into one render pass
    /// that first clears `view` to `clear`.
    pub fn submit(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        clear: wgpu::Color,
    ) -> Result<(), BackendError> {
        let uniform_bytes = self.pending.uniform_data.len() as u64;
        if uniform_bytes > self.uniform_buffer.size() {
            let (buffer, _) = self.grow_buffer("Draw Uniform Buffer", uniform_bytes, wgpu::BufferUsages::UNIFORM)?;
            self.uniform_bind_group = Self::make_uniform_bind_group(&self.device, &self.uniform_layout, &buffer);
            self.uniform_buffer = buffer;
        }
        if uniform_bytes > 0 {
            self.queue.write_buffer(&self.uniform_buffer, 0, &self.pending.uniform_data);
        }

        let index_bytes = (self.pending.indices.len() * std::mem::size_of::<u32>()) as u64;
        if index_bytes > self.index_buffer.size() {
            let (buffer, _) = self.grow_buffer("Fan Index Buffer", index_bytes, wgpu::BufferUsages::INDEX)?;
            self.index_buffer = buffer;
        }
        if index_bytes > 0 {
            self.queue.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&self.pending.indices));
        }

        let commands = std::mem::take(&mut self.pending.commands);
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Lumen Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { a: 1.0, ..clear }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for command in &commands {
                let (Some(pipeline), Some(buffer)) = (
                    self.pipelines.get(&command.key),
                    self.arrays.get(command.array.0 as usize).and_then(|a| a.buffer.as_ref()),
                ) else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[command.uniform_offset]);
                if let Some(texture) = command.texture.and_then(|t| self.textures.get(t.0 as usize)) {
                    render_pass.set_bind_group(1, &texture.bind_group, &[]);
                }
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                match &command.range {
                    DrawRange::Vertices(range) => render_pass.draw(range.clone(), 0..1),
                    DrawRange::Indices(range) => {
                        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(range.clone(), 0, 0..1);
                    }
                }
            }
        }
        log::trace!("submitted {} draws", commands.len());

        self.pending.clear();
        Ok(())
    }
}

impl GraphicsBackend for WgpuBackend {
    fn create_vertex_array(&mut self, attributes: &[VertexAttribute]) -> Result<VertexArrayId, BackendError> {
        let id = VertexArrayId(self.arrays.len() as u32);
        self.arrays.push(GpuArray { buffer: None, capacity: 0, len: 0, attributes: attributes.to_vec() });
        Ok(id)
    }

    fn upload_vertices(&mut self, array: VertexArrayId, vertices: &[Vertex]) -> Result<(), BackendError> {
        let capacity = self.array(array)?.capacity;
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let len = u32::try_from(vertices.len()).map_err(|_| BackendError::Allocation(format!("{} vertices", vertices.len())))?;

        if bytes.len() as u64 > capacity {
            let (buffer, size) = self.grow_buffer("Frame Vertex Buffer", bytes.len() as u64, wgpu::BufferUsages::VERTEX)?;
            let gpu_array = &mut self.arrays[array.0 as usize];
            gpu_array.buffer = Some(buffer);
            gpu_array.capacity = size;
        }
        let gpu_array = &mut self.arrays[array.0 as usize];
        if let Some(buffer) = &gpu_array.buffer {
            if !bytes.is_empty() {
                self.queue.write_buffer(buffer, 0, bytes);
            }
        }
        gpu_array.len = len;
        log::trace!("uploaded {} vertices to {:?}", len, array);
        Ok(())
    }

    fn create_program(&mut self, source: &ProgramSource<'_>, attributes: &[&str]) -> Result<ProgramId, BackendError> {
        let resolved = resolve_attributes(attributes)?;
        let wgsl = compose_wgsl(source);
        let module = self
            .scoped(wgpu::ErrorFilter::Validation, |device| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(source.label),
                    source: wgpu::ShaderSource::Wgsl(wgsl.into()),
                })
            })
            .map_err(|err| BackendError::ShaderCompile { label: source.label.to_string(), message: err.to_string() })?;

        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(GpuProgram {
            label: source.label.to_string(),
            module,
            attributes: resolved,
            uniform_names: source.uniforms.iter().map(|u| u.to_string()).collect(),
            uniforms: DrawUniforms::default(),
            textured: source.textured,
        });
        Ok(id)
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Result<UniformId, BackendError> {
        let slot = self
            .program(program)?
            .uniform_names
            .iter()
            .position(|u| u == name)
            .ok_or_else(|| BackendError::UnknownUniform { program: program.0, name: name.to_string() })?;
        Ok(UniformId { program, slot: slot as u32 })
    }

    fn use_program(&mut self, program: ProgramId) -> Result<(), BackendError> {
        self.program(program)?;
        self.current_program = Some(program);
        Ok(())
    }

    fn bind_vertex_array(&mut self, array: VertexArrayId) -> Result<(), BackendError> {
        self.array(array)?;
        self.current_array = Some(array);
        Ok(())
    }

    fn set_uniform(&mut self, uniform: UniformId, value: UniformValue) -> Result<(), BackendError> {
        let program = self
            .programs
            .get_mut(uniform.program.0 as usize)
            .ok_or(BackendError::InvalidHandle { kind: "program", id: uniform.program.0 })?;
        let name = program
            .uniform_names
            .get(uniform.slot as usize)
            .ok_or(BackendError::InvalidHandle { kind: "uniform", id: uniform.slot })?;

        let mismatch = |value: &'static str| BackendError::UniformType { name: name.clone(), value };
        match (name.as_str(), value) {
            (UNIFORM_VIEW, UniformValue::Vec4(v)) => program.uniforms.view = v,
            (UNIFORM_LIGHT_CENTER, UniformValue::Vec2(v)) => program.uniforms.light_center = v,
            (UNIFORM_LIGHT_RADIUS, UniformValue::Float(v)) => program.uniforms.light_radius = v,
            (UNIFORM_LIGHT_INTENSITY, UniformValue::Float(v)) => program.uniforms.light_intensity = v,
            // Only texture unit 0 exists.
            (UNIFORM_ASSET, UniformValue::Int(0)) => {}
            (_, UniformValue::Int(_)) => return Err(mismatch("int")),
            (_, UniformValue::Float(_)) => return Err(mismatch("float")),
            (_, UniformValue::Vec2(_)) => return Err(mismatch("vec2")),
            (_, UniformValue::Vec4(_)) => return Err(mismatch("vec4")),
        }
        Ok(())
    }

    fn set_blend(&mut self, mode: BlendMode) {
        self.blend = mode;
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> Result<(), BackendError> {
        if unit != 0 || texture.0 as usize >= self.textures.len() {
            return Err(BackendError::InvalidHandle { kind: "texture", id: texture.0 });
        }
        self.current_texture = Some(texture);
        Ok(())
    }

    fn draw(&mut self, topology: Topology, offset: u32, count: u32) -> Result<(), BackendError> {
        let program_id = self.current_program.ok_or(BackendError::NothingBound("program"))?;
        let array_id = self.current_array.ok_or(BackendError::NothingBound("vertex array"))?;
        let program = self.program(program_id)?;
        let array = self.array(array_id)?;

        if let Some(missing) = program.attributes.iter().find(|a| !array.attributes.contains(a)) {
            return Err(BackendError::AttributeMismatch { program: program_id.0, array: array_id.0, attribute: missing.name() });
        }
        let texture = if program.textured {
            Some(self.current_texture.ok_or(BackendError::NoTextureBound { program: program_id.0 })?)
        } else {
            None
        };
        let end = offset.saturating_add(count);
        if end > array.len {
            return Err(BackendError::DrawOutOfRange { array: array_id.0, offset, end, len: array.len });
        }
        let uniforms = program.uniforms;

        let key = PipelineKey { program: program_id, blend: self.blend, topology: primitive_topology(topology) };
        self.ensure_pipeline(key)?;

        let range = match topology {
            Topology::TriangleFan => DrawRange::Indices(self.pending.push_fan(offset, count)),
            _ => DrawRange::Vertices(offset..end),
        };
        let uniform_offset = self.pending.push_uniforms(&uniforms, self.uniform_alignment);
        self.pending.commands.push(DrawCommand { key, array: array_id, texture, uniform_offset, range });
        log::trace!("draw {:?} {}..{} with {:?}", topology, offset, end, key.blend);
        Ok(())
    }

    fn discard_pending(&mut self) {
        if self.pending.len() > 0 {
            log::debug!("discarding {} unsubmitted draws", self.pending.len());
        }
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_expands_to_triangle_list() {
        let indices: Vec<u32> = fan_indices(10, 5).collect();
        assert_eq!(indices, vec![10, 11, 12, 10, 12, 13, 10, 13, 14]);
        assert_eq!(fan_indices(0, 2).count(), 0);
    }

    #[test]
    fn mask_blend_keeps_colour_and_zeroes_alpha() {
        let state = blend_state(BlendMode::MASK);
        assert_eq!(state.color.src_factor, wgpu::BlendFactor::Zero);
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(state.alpha.dst_factor, wgpu::BlendFactor::Zero);
    }

    #[test]
    fn standard_alpha_matches_wgpu_alpha_blending() {
        let state = blend_state(BlendMode::STANDARD_ALPHA);
        assert_eq!(state.color, wgpu::BlendState::ALPHA_BLENDING.color);
    }

    #[test]
    fn buffers_grow_to_powers_of_two() {
        assert_eq!(padded_size(1), MIN_BUFFER_SIZE);
        assert_eq!(padded_size(1000), 1024);
        assert_eq!(padded_size(4096), 4096);
    }

    #[test]
    fn pending_draws_clear_between_frames() {
        let mut pending = PendingDraws::default();
        let key = PipelineKey {
            program: ProgramId(0),
            blend: BlendMode::STANDARD_ALPHA,
            topology: wgpu::PrimitiveTopology::TriangleList,
        };
        let first = pending.push_uniforms(&DrawUniforms::default(), 256);
        let second = pending.push_uniforms(&DrawUniforms::default(), 256);
        assert_eq!((first, second), (0, 256));
        let range = pending.push_fan(0, 5);
        assert_eq!(range, 0..9);
        pending.commands.push(DrawCommand {
            key,
            array: VertexArrayId(0),
            texture: None,
            uniform_offset: first,
            range: DrawRange::Indices(range),
        });
        assert_eq!(pending.len(), 1);

        pending.clear();
        assert_eq!(pending.len(), 0);
        assert!(pending.uniform_data.is_empty());
        assert!(pending.indices.is_empty());
        assert_eq!(pending.push_uniforms(&DrawUniforms::default(), 256), 0);
    }

    #[test]
    fn uniform_block_is_32_bytes() {
        assert_eq!(UNIFORM_SIZE, 32);
    }
}
