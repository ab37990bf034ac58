//! Radiance prefiltering pipeline
//!
//! 1. Quad filter - Fullscreen draw of one program into one target
//! 2. Texture copy - Pass-through quad used when blits are unavailable
//! 3. Radiance block - Builds and binds the roughness chain of the environment

pub mod copy;
pub mod filter;
pub mod radiance;
pub mod shaders;

pub use copy::TextureCopy;
pub use filter::QuadFilter;
pub use radiance::*;

use crate::backend::traits::{BackendResult, ResourceBackend};
use crate::backend::types::TextureFormat;
use crate::render_block::{BlockExecutor, BlockIndex};

/// Configuration for radiance prefiltering
#[derive(Debug, Clone, PartialEq)]
pub struct RadianceConfig {
    /// Number of roughness levels, level 0 being the unfiltered source
    pub roughness_levels: u32,
    /// GGX samples per texel
    pub sample_count: u32,
    /// GGX samples per texel on constrained targets
    pub constrained_sample_count: u32,
    pub primary_format: TextureFormat,
    /// Used when the primary format cannot be rendered to
    pub fallback_format: TextureFormat,
}

impl Default for RadianceConfig {
    fn default() -> Self {
        Self {
            roughness_levels: 8,
            sample_count: 512,
            constrained_sample_count: 64,
            primary_format: TextureFormat::Rgba16Float,
            fallback_format: TextureFormat::Rgb10a2Unorm,
        }
    }
}

/// Build an executor with the radiance block registered
pub fn build_radiance_pipeline(
    backend: &mut dyn ResourceBackend,
    config: &RadianceConfig,
) -> BackendResult<(BlockExecutor, BlockIndex)> {
    let mut executor = BlockExecutor::new();
    let radiance = executor.register(RadianceBlock::new(config.clone(), PrefilterCache::new()), backend)?;
    Ok((executor, radiance))
}
