//! Environment radiance prefiltering
//!
//! [`RadianceBlock`] turns the active environment's radiance source into a
//! chain of roughness levels on the GPU, level 0 being a plain copy and the
//! last level fully rough. Results are cached per source texture so repeated
//! frames and other environments sharing the source reuse them. Shading
//! draws get the chain bound at [`TextureSampler::Radiance`] along with the
//! `RADIANCE_ENVMAP` option.
//!
//! Anything the backend cannot do (no renderable format, creation failure)
//! disables prefiltering for that source with a single warning.

use std::any::Any;
use std::collections::HashMap;

use glam::Vec4;
use thiserror::Error;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::pipeline::copy::TextureCopy;
use crate::pipeline::filter::QuadFilter;
use crate::pipeline::shaders::PREFILTER_FRAGMENT;
use crate::pipeline::RadianceConfig;
use crate::render_block::*;
use crate::resources::GpuTexture;

/// Option bit set when prefiltered radiance is bound
pub const RADIANCE_ENVMAP: u32 = 0;
/// Option bit set when the roughness levels are array layers rather than mips
pub const RADIANCE_ARRAY: u32 = 1;

const SHADER_OPTIONS: &[&str] = &["RADIANCE_ENVMAP", "RADIANCE_ARRAY"];

/// Upper bound on roughness levels; a mip chain this deep starts 32768 texels wide
pub const MAX_ROUGHNESS_LEVELS: u32 = 16;

/// How roughness levels are stored in the output texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadianceLayout {
    /// One texture, one mip per level, halved per level
    Mipmapped,
    /// One array texture, one full resolution layer per level
    Layered,
}

impl RadianceLayout {
    pub fn from_caps(caps: &BackendCaps) -> Self {
        if caps.mip_render_targets {
            RadianceLayout::Mipmapped
        } else {
            RadianceLayout::Layered
        }
    }

    pub fn mip_levels(self, levels: u32) -> u32 {
        match self {
            RadianceLayout::Mipmapped => levels,
            RadianceLayout::Layered => 1,
        }
    }

    pub fn layers(self, levels: u32) -> u32 {
        match self {
            RadianceLayout::Mipmapped => 1,
            RadianceLayout::Layered => levels,
        }
    }

    /// (mip, layer) holding `level`
    pub fn slot(self, level: u32) -> (u32, u32) {
        match self {
            RadianceLayout::Mipmapped => (level, 0),
            RadianceLayout::Layered => (0, level),
        }
    }

    /// Size of level 0 for a render target of `size`.
    ///
    /// Mipmapped chains are widened so the last level is still one texel.
    pub fn base_size(self, size: (u32, u32), levels: u32) -> (u32, u32) {
        match self {
            RadianceLayout::Mipmapped => {
                let narrowest = 1u32 << (levels.clamp(1, 32) - 1);
                (size.0.max(narrowest), size.1.max(1))
            }
            RadianceLayout::Layered => (size.0.max(1), size.1.max(1)),
        }
    }

    /// Size of `level` given the size of level 0
    pub fn level_size(self, base: (u32, u32), level: u32) -> (u32, u32) {
        match self {
            RadianceLayout::Mipmapped => ((base.0 >> level).max(1), (base.1 >> level).max(1)),
            RadianceLayout::Layered => base,
        }
    }
}

/// How a finished level reaches its slot in the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyMethod {
    Blit,
    Render,
}

impl CopyMethod {
    pub fn from_caps(caps: &BackendCaps) -> Self {
        if caps.texture_blit {
            CopyMethod::Blit
        } else {
            CopyMethod::Render
        }
    }
}

/// Prefiltering failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrefilterError {
    #[error("No renderable radiance format (tried {primary:?} and {fallback:?})")]
    NoSupportedFormat {
        primary: TextureFormat,
        fallback: TextureFormat,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Output of a successful prefilter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefilteredRadiance {
    pub texture: TextureHandle,
    pub format: TextureFormat,
    pub layout: RadianceLayout,
    pub levels: u32,
    /// Size of level 0
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEntry {
    Ready(PrefilteredRadiance),
    /// The backend cannot prefilter this source; not retried
    Unsupported,
}

/// Prefilter results keyed by source texture
#[derive(Debug, Default)]
pub struct PrefilterCache {
    entries: HashMap<TextureHandle, CacheEntry>,
}

impl PrefilterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: TextureHandle) -> Option<&CacheEntry> {
        self.entries.get(&source)
    }

    pub fn insert(&mut self, source: TextureHandle, entry: CacheEntry) {
        self.entries.insert(source, entry);
    }

    pub fn remove(&mut self, source: TextureHandle) -> Option<CacheEntry> {
        self.entries.remove(&source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry, returning the derived textures
    pub fn drain(&mut self) -> Vec<TextureHandle> {
        self.entries
            .drain()
            .filter_map(|(_, entry)| match entry {
                CacheEntry::Ready(radiance) => Some(radiance.texture),
                CacheEntry::Unsupported => None,
            })
            .collect()
    }
}

/// Roughness filtered into `level` of a chain of `levels`
pub fn roughness_for_level(level: u32, levels: u32) -> f32 {
    if levels < 2 {
        return 0.0;
    }
    level as f32 / (levels - 1) as f32
}

/// GGX sample count for the filter kernel
pub fn sample_budget(config: &RadianceConfig, caps: &BackendCaps) -> u32 {
    if caps.constrained {
        config.constrained_sample_count
    } else {
        config.sample_count
    }
}

struct PrefilterServices {
    prefilter: QuadFilter,
    copy: TextureCopy,
}

/// Input of a level copy
struct LevelSource {
    texture: TextureHandle,
    format: TextureFormat,
    size: (u32, u32),
}

/// Scratch textures and frame buffers of the level in flight
#[derive(Default)]
struct Transients {
    textures: Vec<TextureHandle>,
    frame_buffers: Vec<FrameBufferHandle>,
}

impl Transients {
    fn texture(
        &mut self,
        backend: &mut dyn ResourceBackend,
        desc: &TextureDescriptor,
    ) -> BackendResult<TextureHandle> {
        let texture = backend.create_texture(desc)?;
        self.textures.push(texture);
        Ok(texture)
    }

    fn frame_buffer(
        &mut self,
        backend: &mut dyn ResourceBackend,
        attachment: &Attachment,
    ) -> BackendResult<FrameBufferHandle> {
        let frame_buffer = backend.create_frame_buffer(attachment)?;
        self.frame_buffers.push(frame_buffer);
        Ok(frame_buffer)
    }

    fn release(&mut self, backend: &mut dyn ResourceBackend) {
        for frame_buffer in self.frame_buffers.drain(..) {
            backend.destroy_frame_buffer(frame_buffer);
        }
        for texture in self.textures.drain(..) {
            backend.destroy_texture(texture);
        }
    }
}

/// Render block prefiltering environment radiance and binding it to shading draws
pub struct RadianceBlock {
    config: RadianceConfig,
    cache: PrefilterCache,
    index: Option<BlockIndex>,
    services: Option<PrefilterServices>,
    caps: BackendCaps,
    layout: RadianceLayout,
    copy_method: CopyMethod,
}

impl RadianceBlock {
    pub fn new(config: RadianceConfig, cache: PrefilterCache) -> Self {
        let config = RadianceConfig {
            roughness_levels: config.roughness_levels.clamp(2, MAX_ROUGHNESS_LEVELS),
            ..config
        };
        let caps = BackendCaps::default();
        Self {
            config,
            cache,
            index: None,
            services: None,
            caps,
            layout: RadianceLayout::from_caps(&caps),
            copy_method: CopyMethod::from_caps(&caps),
        }
    }

    pub fn config(&self) -> &RadianceConfig {
        &self.config
    }

    pub fn cache(&self) -> &PrefilterCache {
        &self.cache
    }

    /// Level storage chosen at init
    pub fn layout(&self) -> RadianceLayout {
        self.layout
    }

    /// Copy method chosen at init
    pub fn copy_method(&self) -> CopyMethod {
        self.copy_method
    }

    pub fn sample_budget(&self) -> u32 {
        sample_budget(&self.config, &self.caps)
    }

    /// Forget the result derived from `source` and destroy it.
    ///
    /// Call before destroying a source texture whose handle may be reused.
    /// Environments still holding the derived texture prefilter again on
    /// their next frame.
    pub fn invalidate_source(&mut self, backend: &mut dyn ResourceBackend, source: TextureHandle) {
        if let Some(CacheEntry::Ready(radiance)) = self.cache.remove(source) {
            log::debug!("Invalidated radiance derived from {:?}", source);
            backend.destroy_texture(radiance.texture);
        }
    }

    /// Destroy every cached result
    pub fn release(&mut self, backend: &mut dyn ResourceBackend) {
        for texture in self.cache.drain() {
            backend.destroy_texture(texture);
        }
    }

    /// Source of the active environment still needing a prefilter.
    ///
    /// Cache hits are assigned to the environment here.
    fn pending_source(&mut self, render: &mut Render) -> Option<GpuTexture> {
        let backend = &*render.backend;
        let radiance = &mut render.environment.as_deref_mut()?.radiance;
        let source = radiance.texture()?.clone();
        if !backend.texture_exists(source.handle) {
            return None;
        }

        if radiance.is_preprocessed() {
            match radiance.roughness_array() {
                Some(texture) if backend.texture_exists(texture) => return None,
                _ => radiance.reset(),
            }
        }

        match self.cache.get(source.handle).copied() {
            Some(CacheEntry::Ready(cached)) if backend.texture_exists(cached.texture) => {
                log::trace!("Reusing prefiltered radiance for '{}'", source.name);
                radiance.assign(cached.texture);
                None
            }
            Some(CacheEntry::Ready(_)) => {
                log::debug!("Prefiltered radiance for '{}' is gone, recomputing", source.name);
                self.cache.remove(source.handle);
                Some(source)
            }
            Some(CacheEntry::Unsupported) => None,
            None => Some(source),
        }
    }

    fn services(&self) -> BackendResult<&PrefilterServices> {
        self.services.as_ref().ok_or_else(|| {
            BackendError::InitializationFailed("radiance block is not initialized".to_string())
        })
    }

    fn output_usage() -> TextureUsage {
        TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST
    }

    fn select_format(&self, backend: &dyn ResourceBackend) -> Result<TextureFormat, PrefilterError> {
        let levels = self.config.roughness_levels;
        let mips = self.layout == RadianceLayout::Mipmapped;
        let layers = self.layout.layers(levels);

        [self.config.primary_format, self.config.fallback_format]
            .into_iter()
            .find(|&format| backend.is_texture_valid(format, mips, layers, Self::output_usage()))
            .ok_or(PrefilterError::NoSupportedFormat {
                primary: self.config.primary_format,
                fallback: self.config.fallback_format,
            })
    }

    /// Build the roughness chain for `source` at a target of `size`
    fn prefilter(
        &self,
        backend: &mut dyn ResourceBackend,
        view: ViewId,
        source: &GpuTexture,
        size: (u32, u32),
    ) -> Result<PrefilteredRadiance, PrefilterError> {
        let levels = self.config.roughness_levels;
        let format = self.select_format(backend)?;
        let (width, height) = self.layout.base_size(size, levels);

        let texture = backend.create_texture(&TextureDescriptor {
            label: Some(format!("{}_roughness", source.name)),
            width,
            height,
            layers: self.layout.layers(levels),
            mip_levels: self.layout.mip_levels(levels),
            format,
            usage: Self::output_usage(),
        })?;
        let output = PrefilteredRadiance {
            texture,
            format,
            layout: self.layout,
            levels,
            width,
            height,
        };

        let mut transients = Transients::default();
        let result = self.populate(backend, view, source, &output, &mut transients);
        transients.release(backend);

        match result {
            Ok(()) => Ok(output),
            Err(err) => {
                backend.destroy_texture(texture);
                Err(err.into())
            }
        }
    }

    fn populate(
        &self,
        backend: &mut dyn ResourceBackend,
        view: ViewId,
        source: &GpuTexture,
        output: &PrefilteredRadiance,
        transients: &mut Transients,
    ) -> BackendResult<()> {
        let services = self.services()?;
        let base = (output.width, output.height);
        let samples = self.sample_budget();

        let mirror = LevelSource {
            texture: source.handle,
            format: source.format,
            size: (source.width, source.height),
        };
        self.copy_level(backend, view, &mirror, output, 0, transients)?;
        backend.frame();
        transients.release(backend);

        for level in 1..output.levels {
            let roughness = roughness_for_level(level, output.levels);
            let size = output.layout.level_size(base, level);

            let scratch = transients.texture(
                backend,
                &TextureDescriptor {
                    label: Some(format!("radiance_scratch_{}", level)),
                    width: size.0,
                    height: size.1,
                    layers: 1,
                    mip_levels: 1,
                    format: output.format,
                    usage: TextureUsage::RENDER_ATTACHMENT
                        | TextureUsage::TEXTURE_BINDING
                        | TextureUsage::COPY_SRC,
                },
            )?;
            let scratch_target = transients.frame_buffer(backend, &Attachment::new(scratch))?;

            // Each level filters the previous one, never the source
            let (mip, layer) = output.layout.slot(level - 1);
            services.prefilter.submit_quad(
                backend,
                view,
                scratch_target,
                SamplerBinding {
                    texture: output.texture,
                    filter: FilterMode::Nearest,
                },
                QuadUniforms::source_level(mip, layer)
                    .with_params(Vec4::new(roughness, samples as f32, 0.0, 0.0)),
            );

            let filtered = LevelSource {
                texture: scratch,
                format: output.format,
                size,
            };
            self.copy_level(backend, view, &filtered, output, level, transients)?;
            backend.frame();
            transients.release(backend);
        }

        Ok(())
    }

    fn copy_level(
        &self,
        backend: &mut dyn ResourceBackend,
        view: ViewId,
        source: &LevelSource,
        output: &PrefilteredRadiance,
        level: u32,
        transients: &mut Transients,
    ) -> BackendResult<()> {
        let (mip, layer) = output.layout.slot(level);
        let (width, height) = output.layout.level_size((output.width, output.height), level);
        let slot = Attachment::new(output.texture).with_mip(mip).with_layer(layer);

        if self.copy_method == CopyMethod::Blit
            && source.format == output.format
            && source.size == (width, height)
        {
            backend.blit(
                view,
                &BlitRegion {
                    destination: slot,
                    source: source.texture,
                    width,
                    height,
                },
            );
        } else {
            let target = transients.frame_buffer(backend, &slot)?;
            self.services()?.copy.submit_quad(backend, view, target, source.texture);
        }
        Ok(())
    }

    /// Roughness chain to bind for the current frame, if any
    fn bindable(&self, render: &Render, pass: &Pass) -> Option<(BlockIndex, TextureHandle)> {
        if pass.kind == PassKind::Depth {
            return None;
        }
        let index = self.index?;
        let radiance = &render.environment()?.radiance;
        if !radiance.is_ready() {
            return None;
        }
        let texture = radiance.roughness_array()?;
        render.backend.texture_exists(texture).then_some((index, texture))
    }

    fn bind(
        &self,
        binding: (BlockIndex, TextureHandle),
        textures: &mut TextureBindings,
        shader_version: &mut ShaderVersion,
    ) {
        let (index, texture) = binding;
        textures.bind(TextureSampler::Radiance, texture);
        shader_version.set_option(index, RADIANCE_ENVMAP);
        if self.layout == RadianceLayout::Layered {
            shader_version.set_option(index, RADIANCE_ARRAY);
        }
    }
}

impl RenderBlock for RadianceBlock {
    fn name(&self) -> &str {
        "Radiance"
    }

    fn shader_options(&self) -> &'static [&'static str] {
        SHADER_OPTIONS
    }

    fn init(&mut self, backend: &mut dyn ResourceBackend, index: BlockIndex) -> BackendResult<()> {
        self.caps = backend.caps();
        self.layout = RadianceLayout::from_caps(&self.caps);
        self.copy_method = CopyMethod::from_caps(&self.caps);
        self.services = Some(PrefilterServices {
            prefilter: QuadFilter::new(backend, "radiance_prefilter", PREFILTER_FRAGMENT)?,
            copy: TextureCopy::new(backend)?,
        });
        self.index = Some(index);

        log::debug!(
            "Radiance block on '{}': {:?} layout, {:?} copies, {} samples",
            backend.name(),
            self.layout,
            self.copy_method,
            self.sample_budget()
        );
        Ok(())
    }

    fn begin_frame(&mut self, render: &mut Render) {
        if self.services.is_none() || !render.target.is_valid() {
            return;
        }
        let Some(source) = self.pending_source(render) else {
            return;
        };

        let view = render.preprocess_pass();
        let size = render.target.size();
        let entry = match self.prefilter(render.backend, view, &source, size) {
            Ok(radiance) => {
                log::debug!(
                    "Prefiltered '{}' into {} {:?} levels of {:?}",
                    source.name,
                    radiance.levels,
                    radiance.layout,
                    radiance.format
                );
                CacheEntry::Ready(radiance)
            }
            Err(err) => {
                log::warn!("Radiance prefiltering disabled for '{}': {}", source.name, err);
                CacheEntry::Unsupported
            }
        };

        self.cache.insert(source.handle, entry);
        if let (CacheEntry::Ready(radiance), Some(environment)) = (entry, render.environment_mut()) {
            environment.radiance.assign(radiance.texture);
        }
    }

    fn submit_element(&mut self, render: &mut Render, pass: &Pass, element: &mut DrawElement) {
        if let Some(binding) = self.bindable(render, pass) {
            self.bind(binding, &mut element.textures, &mut element.shader_version);
        }
    }

    fn submit_cluster(&mut self, render: &mut Render, pass: &Pass, cluster: &mut DrawCluster) {
        if let Some(binding) = self.bindable(render, pass) {
            self.bind(binding, &mut cluster.textures, &mut cluster.shader_version);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
