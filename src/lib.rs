//! Radiance Engine - A render-block pipeline with environment radiance prefiltering
//!
//! Rendering stages implement [`RenderBlock`](render_block::RenderBlock) and are
//! driven in a fixed order every frame by a [`BlockExecutor`](render_block::BlockExecutor).
//! The built-in [`RadianceBlock`](pipeline::RadianceBlock) turns an environment's
//! equirectangular source into a chain of roughness-filtered levels on the GPU,
//! caches it per source texture, and binds it onto shading draws.
//!
//! Two backends implement [`ResourceBackend`](backend::ResourceBackend):
//! - **wgpu**: Real GPU device, headless or sharing an application's device
//! - **Dummy**: Records commands without a GPU, with configurable capabilities

pub mod backend;
pub mod engine;
pub mod pipeline;
pub mod render_block;
pub mod resources;
pub mod scene;

pub use backend::dummy::DummyBackend;
pub use backend::wgpu_backend::WgpuBackend;
pub use engine::Engine;
pub use pipeline::{RadianceBlock, RadianceConfig};
pub use scene::{Environment, Light, LightType, Radiance};

/// Configuration for initializing the engine
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Radiance prefiltering
    pub radiance: RadianceConfig,
}
