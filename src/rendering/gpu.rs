//! wgpu render surface: HDR scene, bloom, composite and FXAA passes.

use std::sync::Arc;
use wgpu::util::DeviceExt;

use super::bloom::BloomChain;
use super::mesh::{OrbMesh, OrbVertex};
use super::uniforms::{
    BackdropUniforms, BloomUniforms, FxaaUniforms, OrbUniforms, ParticleUniforms,
};
use super::{Frame, RenderSurface};
use crate::composition::bloom_mip_chain;
use crate::error::RenderError;
use crate::particles::ParticleInstance;

const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
const LDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const CLEAR: wgpu::LoadOp<wgpu::Color> = wgpu::LoadOp::Clear(wgpu::Color::BLACK);

/// Sphere tessellation for the orb
const ORB_SEGMENTS: u32 = 96;
const ORB_RINGS: u32 = 64;

/// Uniform buffers that survive a resize
struct UniformBuffers {
    orb: wgpu::Buffer,
    particles: wgpu::Buffer,
    backdrop: wgpu::Buffer,
    bright: wgpu::Buffer,
    composite: wgpu::Buffer,
    fxaa: wgpu::Buffer,
}

impl UniformBuffers {
    fn new(device: &wgpu::Device) -> Self {
        let create = |label: &str, size: usize| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: size as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let bloom_size = std::mem::size_of::<BloomUniforms>();
        Self {
            orb: create("Orb Uniform Buffer", std::mem::size_of::<OrbUniforms>()),
            particles: create(
                "Particle Uniform Buffer",
                std::mem::size_of::<ParticleUniforms>(),
            ),
            backdrop: create(
                "Backdrop Uniform Buffer",
                std::mem::size_of::<BackdropUniforms>(),
            ),
            bright: create("Bloom Threshold Uniform Buffer", bloom_size),
            composite: create("Composite Uniform Buffer", bloom_size),
            fxaa: create("FXAA Uniform Buffer", std::mem::size_of::<FxaaUniforms>()),
        }
    }
}

/// Bind group layouts shared by pipelines and size-dependent bind groups
struct Layouts {
    uniform: wgpu::BindGroupLayout,
    sampled: wgpu::BindGroupLayout,
    composite: wgpu::BindGroupLayout,
}

impl Layouts {
    fn new(device: &wgpu::Device) -> Self {
        let uniform_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };

        Self {
            uniform: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Uniform Bind Group Layout"),
                entries: &[uniform_entry(0)],
            }),
            sampled: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Sampled Bind Group Layout"),
                entries: &[uniform_entry(0), texture_entry(1), sampler_entry(2)],
            }),
            composite: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Composite Bind Group Layout"),
                entries: &[
                    uniform_entry(0),
                    texture_entry(1),
                    texture_entry(2),
                    sampler_entry(3),
                ],
            }),
        }
    }
}

/// One bloom level: its blur targets and per-pass uniforms
struct GpuBloomLevel {
    size: (u32, u32),
    h_view: wgpu::TextureView,
    v_view: wgpu::TextureView,
    h_buffer: wgpu::Buffer,
    v_buffer: wgpu::Buffer,
    add_buffer: wgpu::Buffer,
    h_group: wgpu::BindGroup,
    v_group: wgpu::BindGroup,
    add_group: wgpu::BindGroup,
}

/// Offscreen targets and the bind groups that read them
struct Targets {
    scene: wgpu::TextureView,
    depth: wgpu::TextureView,
    bright: wgpu::TextureView,
    bloom_sum: wgpu::TextureView,
    composite: wgpu::TextureView,
    levels: Vec<GpuBloomLevel>,
    bright_group: wgpu::BindGroup,
    composite_group: wgpu::BindGroup,
    fxaa_group: wgpu::BindGroup,
}

impl Targets {
    fn new(
        device: &wgpu::Device,
        layouts: &Layouts,
        buffers: &UniformBuffers,
        sampler: &wgpu::Sampler,
        size: (u32, u32),
        bloom_mips: &[(u32, u32)],
    ) -> Self {
        let bloom_size = bloom_mips.first().copied().unwrap_or(size);
        let scene = create_target(device, "Scene Target", size, HDR_FORMAT);
        let depth = create_target(device, "Depth Target", size, DEPTH_FORMAT);
        let bright = create_target(device, "Bloom Bright Target", bloom_size, HDR_FORMAT);
        let bloom_sum = create_target(device, "Bloom Sum Target", bloom_size, HDR_FORMAT);
        let composite = create_target(device, "Composite Target", size, LDR_FORMAT);

        let sampled = |label: &str, buffer: &wgpu::Buffer, view: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &layouts.sampled,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            })
        };
        let bloom_buffer = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<BloomUniforms>() as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };

        // Each level blurs the previous level's result; the first reads the bright pass
        let mut levels: Vec<GpuBloomLevel> = Vec::with_capacity(bloom_mips.len());
        for (i, &mip) in bloom_mips.iter().enumerate() {
            let target = |label: String| create_target(device, &label, mip, HDR_FORMAT);
            let h_view = target(format!("Bloom Blur H Target {}", i));
            let v_view = target(format!("Bloom Blur V Target {}", i));
            let h_buffer = bloom_buffer(&format!("Bloom Blur H Uniform Buffer {}", i));
            let v_buffer = bloom_buffer(&format!("Bloom Blur V Uniform Buffer {}", i));
            let add_buffer = bloom_buffer(&format!("Bloom Accumulate Uniform Buffer {}", i));

            let input = levels.last().map_or(&bright, |previous| &previous.v_view);
            let h_group = sampled(&format!("Bloom Blur H Bind Group {}", i), &h_buffer, input);
            let v_group = sampled(&format!("Bloom Blur V Bind Group {}", i), &v_buffer, &h_view);
            let add_group =
                sampled(&format!("Bloom Accumulate Bind Group {}", i), &add_buffer, &v_view);

            levels.push(GpuBloomLevel {
                size: mip,
                h_view,
                v_view,
                h_buffer,
                v_buffer,
                add_buffer,
                h_group,
                v_group,
                add_group,
            });
        }

        let bright_group = sampled("Bloom Threshold Bind Group", &buffers.bright, &scene);
        let fxaa_group = sampled("FXAA Bind Group", &buffers.fxaa, &composite);

        let composite_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Bind Group"),
            layout: &layouts.composite,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.composite.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&scene),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&bloom_sum),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        Self {
            scene,
            depth,
            bright,
            bloom_sum,
            composite,
            levels,
            bright_group,
            composite_group,
            fxaa_group,
        }
    }

    fn bloom_sizes(&self) -> Vec<(u32, u32)> {
        self.levels.iter().map(|level| level.size).collect()
    }
}

/// Rendering system managing wgpu device, pipelines, and buffers
pub struct GpuSurface {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    layouts: Layouts,
    sampler: wgpu::Sampler,
    buffers: UniformBuffers,
    uniform_groups: UniformGroups,
    targets: Targets,
    backdrop_pipeline: wgpu::RenderPipeline,
    orb_pipeline: wgpu::RenderPipeline,
    particle_pipeline: wgpu::RenderPipeline,
    bright_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    accumulate_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    fxaa_pipeline: wgpu::RenderPipeline,
    orb_vertex_buffer: wgpu::Buffer,
    orb_index_buffer: wgpu::Buffer,
    orb_index_count: u32,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
}

/// Bind groups over the plain uniform buffers
struct UniformGroups {
    orb: wgpu::BindGroup,
    particles: wgpu::BindGroup,
    backdrop: wgpu::BindGroup,
}

impl GpuSurface {
    /// Bring up the device and all pipelines for `window`
    pub async fn new(
        window: Arc<winit::window::Window>,
        orb_radius: f32,
        particle_capacity: usize,
        bloom_levels: usize,
    ) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Window must have 'static lifetime via Arc
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        log::info!("GPU adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RenderError::UnsupportedSurface)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let layouts = Layouts::new(&device);
        let buffers = UniformBuffers::new(&device);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Clamp Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let targets = Targets::new(
            &device,
            &layouts,
            &buffers,
            &sampler,
            (config.width, config.height),
            &bloom_mip_chain((config.width, config.height), bloom_levels),
        );

        let uniform_group = |label: &str, buffer: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &layouts.uniform,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            })
        };
        let uniform_groups = UniformGroups {
            orb: uniform_group("Orb Bind Group", &buffers.orb),
            particles: uniform_group("Particle Bind Group", &buffers.particles),
            backdrop: uniform_group("Backdrop Bind Group", &buffers.backdrop),
        };

        // Load shaders
        let shader = |label: &str, source: &'static str| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        };
        let backdrop_shader = shader("Backdrop Shader", include_str!("backdrop.wgsl"));
        let orb_shader = shader("Orb Shader", include_str!("orb.wgsl"));
        let particle_shader = shader("Particle Shader", include_str!("particles.wgsl"));
        let bloom_shader = shader("Bloom Shader", include_str!("bloom.wgsl"));
        let composite_shader = shader("Composite Shader", include_str!("composite.wgsl"));
        let fxaa_shader = shader("FXAA Shader", include_str!("fxaa.wgsl"));

        let scene_depth = |write: bool, compare: wgpu::CompareFunction| wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: write,
            depth_compare: compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        };

        let backdrop_pipeline = create_pipeline(
            &device,
            PipelineSpec {
                label: "Backdrop Pipeline",
                layouts: &[&layouts.uniform],
                module: &backdrop_shader,
                fs_entry: "fs_main",
                buffers: &[],
                format: HDR_FORMAT,
                blend: None,
                cull_mode: None,
                depth: Some(scene_depth(false, wgpu::CompareFunction::Always)),
            },
        );

        let orb_pipeline = create_pipeline(
            &device,
            PipelineSpec {
                label: "Orb Pipeline",
                layouts: &[&layouts.uniform],
                module: &orb_shader,
                fs_entry: "fs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<OrbVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
                }],
                format: HDR_FORMAT,
                blend: None,
                cull_mode: Some(wgpu::Face::Back),
                depth: Some(scene_depth(true, wgpu::CompareFunction::Less)),
            },
        );

        let additive = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Zero,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        };
        let particle_pipeline = create_pipeline(
            &device,
            PipelineSpec {
                label: "Particle Pipeline",
                layouts: &[&layouts.uniform],
                module: &particle_shader,
                fs_entry: "fs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<ParticleInstance>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32,
                        2 => Float32x3,
                        3 => Float32
                    ],
                }],
                format: HDR_FORMAT,
                blend: Some(additive),
                cull_mode: None,
                depth: Some(scene_depth(false, wgpu::CompareFunction::Less)),
            },
        );

        let post = |label: &'static str,
                    layout: &wgpu::BindGroupLayout,
                    module: &wgpu::ShaderModule,
                    fs_entry: &'static str,
                    format: wgpu::TextureFormat,
                    blend: Option<wgpu::BlendState>| {
            create_pipeline(
                &device,
                PipelineSpec {
                    label,
                    layouts: &[layout],
                    module,
                    fs_entry,
                    buffers: &[],
                    format,
                    blend,
                    cull_mode: None,
                    depth: None,
                },
            )
        };
        let sum = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent::REPLACE,
        };
        let bright_pipeline = post(
            "Bloom Threshold Pipeline",
            &layouts.sampled,
            &bloom_shader,
            "fs_threshold",
            HDR_FORMAT,
            None,
        );
        let blur_pipeline = post(
            "Bloom Blur Pipeline",
            &layouts.sampled,
            &bloom_shader,
            "fs_blur",
            HDR_FORMAT,
            None,
        );
        let accumulate_pipeline = post(
            "Bloom Accumulate Pipeline",
            &layouts.sampled,
            &bloom_shader,
            "fs_accumulate",
            HDR_FORMAT,
            Some(sum),
        );
        let composite_pipeline = post(
            "Composite Pipeline",
            &layouts.composite,
            &composite_shader,
            "fs_main",
            LDR_FORMAT,
            None,
        );
        let fxaa_pipeline = post(
            "FXAA Pipeline",
            &layouts.sampled,
            &fxaa_shader,
            "fs_main",
            config.format,
            None,
        );

        let mesh = OrbMesh::uv_sphere(orb_radius, ORB_SEGMENTS, ORB_RINGS);
        let orb_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Orb Vertex Buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let orb_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Orb Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let instance_capacity = particle_capacity.max(1);
        let instance_buffer = create_instance_buffer(&device, instance_capacity);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            layouts,
            sampler,
            buffers,
            uniform_groups,
            targets,
            backdrop_pipeline,
            orb_pipeline,
            particle_pipeline,
            bright_pipeline,
            blur_pipeline,
            accumulate_pipeline,
            composite_pipeline,
            fxaa_pipeline,
            orb_vertex_buffer,
            orb_index_buffer,
            orb_index_count: mesh.indices.len() as u32,
            instance_buffer,
            instance_capacity,
        })
    }

    fn write_uniforms(&self, frame: &Frame<'_>) {
        let write = |buffer: &wgpu::Buffer, bytes: &[u8]| self.queue.write_buffer(buffer, 0, bytes);

        write(&self.buffers.orb, bytemuck::bytes_of(&frame.orb));
        write(&self.buffers.particles, bytemuck::bytes_of(&frame.particles));
        write(&self.buffers.backdrop, bytemuck::bytes_of(&frame.backdrop));
        write(&self.buffers.bright, bytemuck::bytes_of(&frame.bloom));
        let chain = BloomChain::new(&frame.bloom, frame.bloom_mips);
        for (target, level) in self.targets.levels.iter().zip(chain.levels()) {
            write(&target.h_buffer, bytemuck::bytes_of(&level.blur_h));
            write(&target.v_buffer, bytemuck::bytes_of(&level.blur_v));
            write(&target.add_buffer, bytemuck::bytes_of(&level.accumulate));
        }
        write(&self.buffers.composite, bytemuck::bytes_of(&frame.bloom));
        write(&self.buffers.fxaa, bytemuck::bytes_of(&frame.fxaa));
    }

    fn rebuild_targets(&mut self, bloom_mips: &[(u32, u32)]) {
        self.targets = Targets::new(
            &self.device,
            &self.layouts,
            &self.buffers,
            &self.sampler,
            (self.config.width, self.config.height),
            bloom_mips,
        );
    }

    fn write_instances(&mut self, instances: &[ParticleInstance]) {
        if instances.len() > self.instance_capacity {
            self.instance_capacity = instances.len();
            self.instance_buffer = create_instance_buffer(&self.device, self.instance_capacity);
        }
        if !instances.is_empty() {
            self.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(instances));
        }
    }
}

impl RenderSurface for GpuSurface {
    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        let mips = bloom_mip_chain((width, height), self.targets.levels.len());
        self.rebuild_targets(&mips);
    }

    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // Skip this frame; the next one draws into the fresh swapchain
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        if self.targets.bloom_sizes() != frame.bloom_mips {
            self.rebuild_targets(frame.bloom_mips);
        }
        self.write_uniforms(frame);
        self.write_instances(frame.instances);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // Scene: backdrop, orb, particles
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.scene,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.backdrop_pipeline);
            pass.set_bind_group(0, &self.uniform_groups.backdrop, &[]);
            pass.draw(0..3, 0..1); // Fullscreen triangle

            pass.set_pipeline(&self.orb_pipeline);
            pass.set_bind_group(0, &self.uniform_groups.orb, &[]);
            pass.set_vertex_buffer(0, self.orb_vertex_buffer.slice(..));
            pass.set_index_buffer(self.orb_index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..self.orb_index_count, 0, 0..1);

            if !frame.instances.is_empty() {
                pass.set_pipeline(&self.particle_pipeline);
                pass.set_bind_group(0, &self.uniform_groups.particles, &[]);
                pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
                pass.draw(0..6, 0..frame.instances.len() as u32);
            }
        }

        // Bloom: threshold, blur each level from the one above, then sum
        fullscreen_pass(
            &mut encoder,
            "Bloom Threshold Pass",
            &self.targets.bright,
            &self.bright_pipeline,
            &self.targets.bright_group,
            CLEAR,
        );
        for level in &self.targets.levels {
            fullscreen_pass(
                &mut encoder,
                "Bloom Blur H Pass",
                &level.h_view,
                &self.blur_pipeline,
                &level.h_group,
                CLEAR,
            );
            fullscreen_pass(
                &mut encoder,
                "Bloom Blur V Pass",
                &level.v_view,
                &self.blur_pipeline,
                &level.v_group,
                CLEAR,
            );
        }
        for (i, level) in self.targets.levels.iter().enumerate() {
            fullscreen_pass(
                &mut encoder,
                "Bloom Accumulate Pass",
                &self.targets.bloom_sum,
                &self.accumulate_pipeline,
                &level.add_group,
                if i == 0 { CLEAR } else { wgpu::LoadOp::Load },
            );
        }
        fullscreen_pass(
            &mut encoder,
            "Composite Pass",
            &self.targets.composite,
            &self.composite_pipeline,
            &self.targets.composite_group,
            CLEAR,
        );
        fullscreen_pass(
            &mut encoder,
            "FXAA Pass",
            &view,
            &self.fxaa_pipeline,
            &self.targets.fxaa_group,
            CLEAR,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

/// Inputs for one render pipeline
struct PipelineSpec<'a> {
    label: &'static str,
    layouts: &'a [&'a wgpu::BindGroupLayout],
    module: &'a wgpu::ShaderModule,
    fs_entry: &'static str,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    cull_mode: Option<wgpu::Face>,
    depth: Option<wgpu::DepthStencilState>,
}

fn create_pipeline(device: &wgpu::Device, spec: PipelineSpec<'_>) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(spec.label),
        bind_group_layouts: spec.layouts,
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: spec.module,
            entry_point: Some("vs_main"),
            buffers: spec.buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: spec.module,
            entry_point: Some(spec.fs_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: spec.format,
                blend: spec.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: spec.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: spec.depth,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
    load: wgpu::LoadOp<wgpu::Color>,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}

fn create_target(
    device: &wgpu::Device,
    label: &str,
    size: (u32, u32),
    format: wgpu::TextureFormat,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.0.max(1),
            height: size.1.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Particle Instance Buffer"),
        size: (capacity * std::mem::size_of::<ParticleInstance>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
