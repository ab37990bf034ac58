//! wgpu backend implementation
//!
//! Every quad draw and blit is recorded into its own command buffer; the
//! buffers are submitted to the queue in recording order on [`ResourceBackend::frame`].

use crate::backend::traits::*;
use crate::backend::types::*;
use std::borrow::Cow;
use std::collections::HashMap;
use wgpu::util::DeviceExt;

/// GPU texture together with a view covering every mip and layer
struct WgpuTexture {
    texture: wgpu::Texture,
    sampled_view: wgpu::TextureView,
    desc: TextureDescriptor,
}

/// Single attachment view used as a render target
struct WgpuFrameBuffer {
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
}

/// Pipeline cache key: program, target format and whether the source is filterable
type PipelineKey = (u64, wgpu::TextureFormat, bool);

/// wgpu backend implementation
pub struct WgpuBackend {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,

    // Shared quad pipeline state, indexed by `filterable as usize`
    bind_group_layouts: [wgpu::BindGroupLayout; 2],
    pipeline_layouts: [wgpu::PipelineLayout; 2],
    linear_sampler: wgpu::Sampler,
    nearest_sampler: wgpu::Sampler,

    // Resource storage
    textures: HashMap<u64, WgpuTexture>,
    frame_buffers: HashMap<u64, WgpuFrameBuffer>,
    programs: HashMap<u64, wgpu::ShaderModule>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    next_id: u64,

    // Recorded but not yet submitted work
    pending: Vec<wgpu::CommandBuffer>,
}

impl WgpuBackend {
    fn convert_texture_format(format: TextureFormat) -> wgpu::TextureFormat {
        match format {
            TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
            TextureFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
            TextureFormat::Rgb10a2Unorm => wgpu::TextureFormat::Rgb10a2Unorm,
            TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            TextureFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
            TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
        }
    }

    fn convert_texture_usage(usage: TextureUsage) -> wgpu::TextureUsages {
        let mut result = wgpu::TextureUsages::empty();
        if usage.contains(TextureUsage::COPY_SRC) {
            result |= wgpu::TextureUsages::COPY_SRC;
        }
        if usage.contains(TextureUsage::COPY_DST) {
            result |= wgpu::TextureUsages::COPY_DST;
        }
        if usage.contains(TextureUsage::TEXTURE_BINDING) {
            result |= wgpu::TextureUsages::TEXTURE_BINDING;
        }
        if usage.contains(TextureUsage::RENDER_ATTACHMENT) {
            result |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }
        result
    }

    /// Wrap an existing device created by the host application.
    pub fn new(adapter: wgpu::Adapter, device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let bind_group_layouts = [
            Self::create_quad_layout(&device, false),
            Self::create_quad_layout(&device, true),
        ];
        let pipeline_layouts = [
            Self::create_pipeline_layout(&device, &bind_group_layouts[0]),
            Self::create_pipeline_layout(&device, &bind_group_layouts[1]),
        ];

        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Quad Linear Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let nearest_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Quad Nearest Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            adapter,
            device,
            queue,
            bind_group_layouts,
            pipeline_layouts,
            linear_sampler,
            nearest_sampler,
            textures: HashMap::new(),
            frame_buffers: HashMap::new(),
            programs: HashMap::new(),
            pipelines: HashMap::new(),
            next_id: 1,
            pending: Vec::new(),
        }
    }

    /// Create a backend on the best available adapter, without a surface.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new_headless() -> BackendResult<Self> {
        pollster::block_on(Self::new_headless_async())
    }

    /// Async variant of [`new_headless`](Self::new_headless) (required on web).
    pub async fn new_headless_async() -> BackendResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| BackendError::InitializationFailed("No suitable adapter found".into()))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Selected GPU: {} ({:?} backend)",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Radiance Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                },
                None,
            )
            .await
            .map_err(|e| BackendError::DeviceCreationFailed(e.to_string()))?;

        Ok(Self::new(adapter, device, queue))
    }

    fn create_quad_layout(device: &wgpu::Device, filterable: bool) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(if filterable {
                "Quad Layout (filtering)"
            } else {
                "Quad Layout (non-filtering)"
            }),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(if filterable {
                        wgpu::SamplerBindingType::Filtering
                    } else {
                        wgpu::SamplerBindingType::NonFiltering
                    }),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        })
    }

    fn create_pipeline_layout(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
    ) -> wgpu::PipelineLayout {
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Quad Pipeline Layout"),
            bind_group_layouts: &[layout],
            push_constant_ranges: &[],
        })
    }

    fn format_features(&self, format: wgpu::TextureFormat) -> wgpu::TextureFormatFeatures {
        if self
            .device
            .features()
            .contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES)
        {
            self.adapter.get_texture_format_features(format)
        } else {
            format.guaranteed_format_features(self.device.features())
        }
    }

    fn is_filterable(&self, format: TextureFormat) -> bool {
        self.format_features(Self::convert_texture_format(format))
            .flags
            .contains(wgpu::TextureFormatFeatureFlags::FILTERABLE)
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Reject descriptors the device limits cannot hold before wgpu sees them
    fn check_limits(&self, desc: &TextureDescriptor) -> BackendResult<()> {
        let limits = self.device.limits();
        if desc.width > limits.max_texture_dimension_2d || desc.height > limits.max_texture_dimension_2d {
            return Err(BackendError::TextureCreationFailed(format!(
                "extent {}x{} exceeds device limit {}",
                desc.width, desc.height, limits.max_texture_dimension_2d
            )));
        }
        if desc.layers == 0 || desc.layers > limits.max_texture_array_layers {
            return Err(BackendError::TextureCreationFailed(format!(
                "{} layers exceeds device limit {}",
                desc.layers, limits.max_texture_array_layers
            )));
        }
        let max_mips = u32::BITS - desc.width.max(desc.height).leading_zeros();
        if desc.mip_levels == 0 || desc.mip_levels > max_mips {
            return Err(BackendError::TextureCreationFailed(format!(
                "{} mips for extent {}x{}",
                desc.mip_levels, desc.width, desc.height
            )));
        }
        Ok(())
    }

    /// Run `create` with validation and out-of-memory errors captured instead
    /// of reaching the device's uncaptured error handler.
    #[cfg(not(target_arch = "wasm32"))]
    fn scoped<T>(
        &self,
        failed: fn(String) -> BackendError,
        create: impl FnOnce(&wgpu::Device) -> T,
    ) -> BackendResult<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let created = create(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        match (out_of_memory, validation) {
            (Some(_), _) => Err(BackendError::OutOfMemory),
            (None, Some(err)) => Err(failed(err.to_string())),
            (None, None) => Ok(created),
        }
    }

    // Error scopes resolve asynchronously on the web; only limit checks apply there.
    #[cfg(target_arch = "wasm32")]
    fn scoped<T>(
        &self,
        _failed: fn(String) -> BackendError,
        create: impl FnOnce(&wgpu::Device) -> T,
    ) -> BackendResult<T> {
        Ok(create(&self.device))
    }

    /// Create the pipeline for `key` if missing. Returns false if the program is unknown.
    fn ensure_pipeline(&mut self, key: PipelineKey) -> bool {
        if self.pipelines.contains_key(&key) {
            return true;
        }
        let (program, format, filterable) = key;
        let Some(module) = self.programs.get(&program) else {
            return false;
        };

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Quad Pipeline"),
                layout: Some(&self.pipeline_layouts[filterable as usize]),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: "vs_main",
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: "fs_main",
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            });

        self.pipelines.insert(key, pipeline);
        true
    }

    /// Get reference to the wgpu device
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Get reference to the wgpu queue
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Get the wgpu texture behind a handle (for binding in host render passes)
    pub fn wgpu_texture(&self, texture: TextureHandle) -> Option<&wgpu::Texture> {
        self.textures.get(&texture.0).map(|t| &t.texture)
    }

    /// Get the array view covering every mip and layer of a texture
    pub fn wgpu_texture_view(&self, texture: TextureHandle) -> Option<&wgpu::TextureView> {
        self.textures.get(&texture.0).map(|t| &t.sampled_view)
    }
}

impl ResourceBackend for WgpuBackend {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn caps(&self) -> BackendCaps {
        let info = self.adapter.get_info();
        BackendCaps {
            texture_blit: true,
            mip_render_targets: true,
            constrained: cfg!(target_arch = "wasm32") || info.backend == wgpu::Backend::Gl,
            max_texture_layers: self.device.limits().max_texture_array_layers,
        }
    }

    fn is_texture_valid(
        &self,
        format: TextureFormat,
        _mips: bool,
        layers: u32,
        usage: TextureUsage,
    ) -> bool {
        if layers == 0 || layers > self.device.limits().max_texture_array_layers {
            return false;
        }
        let features = self.format_features(Self::convert_texture_format(format));
        features
            .allowed_usages
            .contains(Self::convert_texture_usage(usage))
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError::TextureCreationFailed(format!(
                "invalid extent {}x{}",
                desc.width, desc.height
            )));
        }

        self.check_limits(desc)?;

        let (texture, sampled_view) = self.scoped(BackendError::TextureCreationFailed, |device| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: desc.label.as_deref(),
                size: wgpu::Extent3d {
                    width: desc.width,
                    height: desc.height,
                    depth_or_array_layers: desc.layers,
                },
                mip_level_count: desc.mip_levels,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: Self::convert_texture_format(desc.format),
                usage: Self::convert_texture_usage(desc.usage),
                view_formats: &[],
            });
            let sampled_view = texture.create_view(&wgpu::TextureViewDescriptor {
                label: desc.label.as_deref(),
                dimension: Some(wgpu::TextureViewDimension::D2Array),
                ..Default::default()
            });
            (texture, sampled_view)
        })?;

        let id = self.allocate_id();
        self.textures.insert(
            id,
            WgpuTexture {
                texture,
                sampled_view,
                desc: desc.clone(),
            },
        );

        Ok(TextureHandle(id))
    }

    fn write_texture(&mut self, texture: TextureHandle, data: &[u8], width: u32, height: u32) {
        if let Some(tex) = self.textures.get(&texture.0) {
            self.queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &tex.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(width * tex.desc.format.bytes_per_pixel()),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }
    }

    fn texture_exists(&self, texture: TextureHandle) -> bool {
        self.textures.contains_key(&texture.0)
    }

    fn texture_format(&self, texture: TextureHandle) -> Option<TextureFormat> {
        self.textures.get(&texture.0).map(|t| t.desc.format)
    }

    fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures
            .get(&texture.0)
            .map(|t| (t.desc.width, t.desc.height))
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if let Some(tex) = self.textures.remove(&texture.0) {
            tex.texture.destroy();
        }
    }

    fn create_frame_buffer(&mut self, attachment: &Attachment) -> BackendResult<FrameBufferHandle> {
        let tex = self.textures.get(&attachment.texture.0).ok_or_else(|| {
            BackendError::InvalidHandle(format!("texture {:?}", attachment.texture))
        })?;

        if attachment.mip >= tex.desc.mip_levels || attachment.layer >= tex.desc.layers {
            return Err(BackendError::FrameBufferCreationFailed(format!(
                "attachment mip {} layer {} out of range",
                attachment.mip, attachment.layer
            )));
        }

        let format = Self::convert_texture_format(tex.desc.format);
        let view = self.scoped(BackendError::FrameBufferCreationFailed, |_| {
            tex.texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some("Frame Buffer Attachment"),
                dimension: Some(wgpu::TextureViewDimension::D2),
                base_mip_level: attachment.mip,
                mip_level_count: Some(1),
                base_array_layer: attachment.layer,
                array_layer_count: Some(1),
                ..Default::default()
            })
        })?;

        let id = self.allocate_id();
        self.frame_buffers.insert(id, WgpuFrameBuffer { view, format });
        Ok(FrameBufferHandle(id))
    }

    fn destroy_frame_buffer(&mut self, frame_buffer: FrameBufferHandle) {
        self.frame_buffers.remove(&frame_buffer.0);
    }

    fn create_program(&mut self, desc: &ProgramDescriptor) -> BackendResult<ProgramHandle> {
        let module = self.scoped(BackendError::ProgramCreationFailed, |device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: desc.label.as_deref(),
                source: wgpu::ShaderSource::Wgsl(Cow::Owned(desc.source.clone())),
            })
        })?;

        let id = self.allocate_id();
        self.programs.insert(id, module);
        Ok(ProgramHandle(id))
    }

    fn submit_quad(&mut self, draw: &QuadDraw) {
        let (Some(target_format), Some(source_format)) = (
            self.frame_buffers.get(&draw.target.0).map(|fb| fb.format),
            self.texture_format(draw.source.texture),
        ) else {
            log::warn!("wgpu: dropping quad {:?} with stale handles", draw.label);
            return;
        };

        let filterable =
            draw.source.filter == FilterMode::Linear && self.is_filterable(source_format);
        let key = (draw.program.0, target_format, filterable);
        if !self.ensure_pipeline(key) {
            log::warn!("wgpu: dropping quad {:?} with unknown program", draw.label);
            return;
        }

        let (Some(target), Some(source), Some(pipeline)) = (
            self.frame_buffers.get(&draw.target.0),
            self.textures.get(&draw.source.texture.0),
            self.pipelines.get(&key),
        ) else {
            return;
        };

        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Quad Uniforms"),
                contents: bytemuck::bytes_of(&draw.uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let sampler = if filterable {
            &self.linear_sampler
        } else {
            &self.nearest_sampler
        };

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Quad Bind Group"),
            layout: &self.bind_group_layouts[filterable as usize],
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&source.sampled_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: draw.label.as_deref(),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: draw.label.as_deref(),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.pending.push(encoder.finish());
    }

    fn blit(&mut self, view: ViewId, region: &BlitRegion) {
        let (Some(source), Some(destination)) = (
            self.textures.get(&region.source.0),
            self.textures.get(&region.destination.texture.0),
        ) else {
            log::warn!("wgpu: dropping blit in view {:?} with stale handles", view);
            return;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Blit"),
            });
        encoder.copy_texture_to_texture(
            wgpu::ImageCopyTexture {
                texture: &source.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyTexture {
                texture: &destination.texture,
                mip_level: region.destination.mip,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: region.destination.layer,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );

        self.pending.push(encoder.finish());
    }

    fn frame(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.queue.submit(self.pending.drain(..));
    }
}
