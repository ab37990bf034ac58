//! Core backend abstraction traits
//!
//! The render blocks consume GPU resources only through [`ResourceBackend`].

use crate::backend::types::*;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to initialize backend: {0}")]
    InitializationFailed(String),
    #[error("Failed to create device: {0}")]
    DeviceCreationFailed(String),
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create frame buffer: {0}")]
    FrameBufferCreationFailed(String),
    #[error("Failed to create program: {0}")]
    ProgramCreationFailed(String),
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),
    #[error("Out of memory")]
    OutOfMemory,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub(crate) u64);

impl TextureHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Handle to a render target built from a single attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameBufferHandle(pub(crate) u64);

/// Handle to a fullscreen shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) u64);

/// Resource backend consumed by render blocks
pub trait ResourceBackend {
    /// Backend name for diagnostics
    fn name(&self) -> &str;

    /// Capabilities of the device
    fn caps(&self) -> BackendCaps;

    /// Whether `format` can be created as a texture with the given mip
    /// chain, layer count and usage
    fn is_texture_valid(
        &self,
        format: TextureFormat,
        mips: bool,
        layers: u32,
        usage: TextureUsage,
    ) -> bool;

    // Textures

    /// Create a texture
    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle>;

    /// Write data to mip 0, layer 0 of a texture
    fn write_texture(&mut self, texture: TextureHandle, data: &[u8], width: u32, height: u32);

    /// Whether the handle refers to a live texture
    fn texture_exists(&self, texture: TextureHandle) -> bool;

    /// Format of a live texture
    fn texture_format(&self, texture: TextureHandle) -> Option<TextureFormat>;

    /// Size of mip 0 of a live texture
    fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)>;

    /// Destroy a texture
    fn destroy_texture(&mut self, texture: TextureHandle);

    // Render targets

    /// Create a render target from one attachment
    fn create_frame_buffer(&mut self, attachment: &Attachment) -> BackendResult<FrameBufferHandle>;

    /// Destroy a render target (the attached texture is left alive)
    fn destroy_frame_buffer(&mut self, frame_buffer: FrameBufferHandle);

    // Programs

    /// Create a fullscreen quad program
    fn create_program(&mut self, desc: &ProgramDescriptor) -> BackendResult<ProgramHandle>;

    // Commands

    /// Enqueue a fullscreen quad draw
    fn submit_quad(&mut self, draw: &QuadDraw);

    /// Enqueue a texture-to-texture copy. Only valid when
    /// [`BackendCaps::texture_blit`] is set.
    fn blit(&mut self, view: ViewId, region: &BlitRegion);

    /// Flush enqueued commands so later commands observe their results
    fn frame(&mut self);
}
