//! Main engine orchestrator

use crate::backend::traits::*;
use crate::pipeline::{build_radiance_pipeline, RadianceBlock};
use crate::render_block::*;
use crate::resources::{GpuTexture, TextureData};
use crate::scene::Environment;
use crate::EngineConfig;

/// Owns the backend and the block executor and drives frames
pub struct Engine<B: ResourceBackend> {
    backend: B,
    executor: BlockExecutor,
    radiance: BlockIndex,
    frame_index: u64,
    config: EngineConfig,
}

impl<B: ResourceBackend> Engine<B> {
    /// Create the engine with the radiance block registered first
    pub fn new(mut backend: B, config: EngineConfig) -> BackendResult<Self> {
        let (executor, radiance) = build_radiance_pipeline(&mut backend, &config.radiance)?;
        log::info!("Engine initialized on '{}'", backend.name());

        Ok(Self {
            backend,
            executor,
            radiance,
            frame_index: 0,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn executor(&self) -> &BlockExecutor {
        &self.executor
    }

    /// Append a block after the ones already registered
    pub fn register_block<K: RenderBlock + 'static>(&mut self, block: K) -> BackendResult<BlockIndex> {
        self.executor.register(block, &mut self.backend)
    }

    /// Index of the radiance block, selecting its options in a [`ShaderVersion`]
    pub fn radiance_index(&self) -> BlockIndex {
        self.radiance
    }

    pub fn radiance_block(&self) -> Option<&RadianceBlock> {
        self.executor.get::<RadianceBlock>(self.radiance)
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Upload texture data through the engine's backend
    pub fn upload_texture(&mut self, data: &TextureData) -> BackendResult<GpuTexture> {
        GpuTexture::create(&mut self.backend, data)
    }

    /// Destroy a source texture, dropping anything derived from it first
    pub fn destroy_texture(&mut self, texture: GpuTexture) {
        if let Some(block) = self.executor.get_mut::<RadianceBlock>(self.radiance) {
            block.invalidate_source(&mut self.backend, texture.handle);
        }
        texture.destroy(&mut self.backend);
    }

    /// Render one frame.
    ///
    /// Returns false without invoking any block when the target is empty.
    pub fn render_frame(
        &mut self,
        environment: Option<&mut Environment>,
        target: &RenderTarget,
        queues: &mut [RenderQueue],
    ) -> bool {
        if !target.is_valid() {
            log::trace!("Skipping frame {}: empty render target", self.frame_index);
            return false;
        }

        let mut render = Render::new(&mut self.backend, target, self.frame_index).with_environment(environment);
        self.executor.execute(&mut render, queues);
        self.backend.frame();

        self.frame_index += 1;
        true
    }

    /// Define names for a drawable's shader permutation
    pub fn shader_defines(&self, version: &ShaderVersion) -> Vec<&'static str> {
        self.executor.shader_defines(version)
    }
}

impl<B: ResourceBackend> Drop for Engine<B> {
    fn drop(&mut self) {
        if let Some(block) = self.executor.get_mut::<RadianceBlock>(self.radiance) {
            block.release(&mut self.backend);
        }
    }
}
