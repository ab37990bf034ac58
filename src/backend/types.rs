//! Common types shared between backends

use crate::backend::traits::{FrameBufferHandle, ProgramHandle, TextureHandle};
use bytemuck::{Pod, Zeroable};
use glam::Vec4;

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgb10a2Unorm,
    Rgba16Float,
    Rgba32Float,
    Depth32Float,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::Depth32Float)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, TextureFormat::Rgba16Float | TextureFormat::Rgba32Float)
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::Bgra8UnormSrgb
            | TextureFormat::Rgb10a2Unorm
            | TextureFormat::Depth32Float => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }
}

/// Texture usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureUsage(u32);

impl TextureUsage {
    pub const COPY_SRC: Self = Self(1 << 0);
    pub const COPY_DST: Self = Self(1 << 1);
    pub const TEXTURE_BINDING: Self = Self(1 << 2);
    pub const RENDER_ATTACHMENT: Self = Self(1 << 3);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for TextureUsage {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Texture descriptor
///
/// `layers > 1` describes a 2D array texture, never a 3D texture.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    pub mip_levels: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            width: 1,
            height: 1,
            layers: 1,
            mip_levels: 1,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        }
    }
}

/// Capabilities reported by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCaps {
    /// Direct texture-to-texture copies are available
    pub texture_blit: bool,
    /// Individual mip levels can be bound as render targets
    pub mip_render_targets: bool,
    /// Throughput-constrained target (web class); shaders should budget samples
    pub constrained: bool,
    /// Maximum number of layers in an array texture
    pub max_texture_layers: u32,
}

impl Default for BackendCaps {
    fn default() -> Self {
        Self {
            texture_blit: false,
            mip_render_targets: true,
            constrained: cfg!(target_arch = "wasm32"),
            max_texture_layers: 256,
        }
    }
}

/// A single render-target attachment: one mip of one layer of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attachment {
    pub texture: TextureHandle,
    pub mip: u32,
    pub layer: u32,
}

impl Attachment {
    pub fn new(texture: TextureHandle) -> Self {
        Self {
            texture,
            mip: 0,
            layer: 0,
        }
    }

    pub fn with_mip(mut self, mip: u32) -> Self {
        self.mip = mip;
        self
    }

    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }
}

/// Identifier of a view (ordered slot in the GPU command stream)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u16);

/// Filter mode for samplers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Texture bound as the sampled input of a quad draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerBinding {
    pub texture: TextureHandle,
    pub filter: FilterMode,
}

/// Uniform block shared by every fullscreen quad program
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct QuadUniforms {
    /// x = source mip level, y = source array layer, zw unused
    pub source: Vec4,
    /// Program specific parameters
    pub params: Vec4,
}

impl QuadUniforms {
    pub fn source_level(mip: u32, layer: u32) -> Self {
        Self {
            source: Vec4::new(mip as f32, layer as f32, 0.0, 0.0),
            params: Vec4::ZERO,
        }
    }

    pub fn with_params(mut self, params: Vec4) -> Self {
        self.params = params;
        self
    }
}

/// A fullscreen quad draw submission
#[derive(Debug, Clone, PartialEq)]
pub struct QuadDraw {
    pub label: Option<String>,
    pub view: ViewId,
    pub target: FrameBufferHandle,
    pub program: ProgramHandle,
    pub source: SamplerBinding,
    pub uniforms: QuadUniforms,
}

/// A texture-to-texture copy of one level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitRegion {
    pub destination: Attachment,
    pub source: TextureHandle,
    pub width: u32,
    pub height: u32,
}

/// Shader program descriptor
///
/// The source is WGSL exposing `vs_main` and `fs_main` and the bindings
/// `source_texture` (group 0, binding 0), `source_sampler` (binding 1) and a
/// [`QuadUniforms`] block (binding 2).
#[derive(Debug, Clone)]
pub struct ProgramDescriptor {
    pub label: Option<String>,
    pub source: String,
}
