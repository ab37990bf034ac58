//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. It tracks resource
//! lifetimes, validates handles and records every command it receives so the
//! render blocks can be exercised without GPU hardware. Capabilities and the
//! set of renderable formats are configurable to simulate constrained devices.

use std::collections::HashMap;

use crate::backend::traits::*;
use crate::backend::types::*;

/// A command recorded by [`DummyBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum DummyCommand {
    CreateTexture {
        handle: TextureHandle,
        desc: TextureDescriptor,
    },
    DestroyTexture(TextureHandle),
    CreateFrameBuffer {
        handle: FrameBufferHandle,
        attachment: Attachment,
    },
    DestroyFrameBuffer(FrameBufferHandle),
    CreateProgram {
        handle: ProgramHandle,
        label: Option<String>,
    },
    Quad(QuadDraw),
    Blit {
        view: ViewId,
        region: BlitRegion,
    },
    Frame,
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    caps: BackendCaps,
    supported_formats: Vec<TextureFormat>,
    textures: HashMap<u64, TextureDescriptor>,
    frame_buffers: HashMap<u64, Attachment>,
    programs: HashMap<u64, Option<String>>,
    next_id: u64,
    /// Remaining successful texture creations before simulated exhaustion
    texture_budget: Option<usize>,
    commands: Vec<DummyCommand>,
}

impl DummyBackend {
    /// Create a new dummy backend supporting every format.
    pub fn new() -> Self {
        Self {
            caps: BackendCaps::default(),
            supported_formats: vec![
                TextureFormat::Rgba8Unorm,
                TextureFormat::Rgba8UnormSrgb,
                TextureFormat::Bgra8Unorm,
                TextureFormat::Bgra8UnormSrgb,
                TextureFormat::Rgb10a2Unorm,
                TextureFormat::Rgba16Float,
                TextureFormat::Rgba32Float,
                TextureFormat::Depth32Float,
            ],
            textures: HashMap::new(),
            frame_buffers: HashMap::new(),
            programs: HashMap::new(),
            next_id: 1,
            texture_budget: None,
            commands: Vec::new(),
        }
    }

    /// Override the reported capabilities.
    pub fn with_caps(mut self, caps: BackendCaps) -> Self {
        self.caps = caps;
        self
    }

    /// Restrict the formats that can be created.
    pub fn with_supported_formats(mut self, formats: &[TextureFormat]) -> Self {
        self.supported_formats = formats.to_vec();
        self
    }

    /// Simulate resource exhaustion after `count` more texture creations.
    pub fn with_texture_budget(mut self, count: usize) -> Self {
        self.texture_budget = Some(count);
        self
    }

    /// All commands recorded so far.
    pub fn commands(&self) -> &[DummyCommand] {
        &self.commands
    }

    /// Forget recorded commands (resources stay alive).
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Number of textures created since the last [`clear_commands`](Self::clear_commands).
    pub fn texture_creations(&self) -> usize {
        self.count(|c| matches!(c, DummyCommand::CreateTexture { .. }))
    }

    /// Number of quad draws since the last clear.
    pub fn quad_draws(&self) -> usize {
        self.count(|c| matches!(c, DummyCommand::Quad(_)))
    }

    /// Number of blits since the last clear.
    pub fn blits(&self) -> usize {
        self.count(|c| matches!(c, DummyCommand::Blit { .. }))
    }

    /// Number of frame barriers since the last clear.
    pub fn frames(&self) -> usize {
        self.count(|c| matches!(c, DummyCommand::Frame))
    }

    /// Number of GPU resources (textures, frame buffers, programs) created since the last clear.
    pub fn resource_creations(&self) -> usize {
        self.count(|c| {
            matches!(
                c,
                DummyCommand::CreateTexture { .. }
                    | DummyCommand::CreateFrameBuffer { .. }
                    | DummyCommand::CreateProgram { .. }
            )
        })
    }

    /// Number of live textures.
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Number of live frame buffers.
    pub fn live_frame_buffers(&self) -> usize {
        self.frame_buffers.len()
    }

    /// Descriptor of a live texture.
    pub fn texture_descriptor(&self, texture: TextureHandle) -> Option<&TextureDescriptor> {
        self.textures.get(&texture.0)
    }

    /// Attachment of a live frame buffer.
    pub fn frame_buffer_attachment(&self, frame_buffer: FrameBufferHandle) -> Option<Attachment> {
        self.frame_buffers.get(&frame_buffer.0).copied()
    }

    fn count(&self, predicate: impl Fn(&DummyCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| predicate(c)).count()
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBackend for DummyBackend {
    fn name(&self) -> &str {
        "Dummy Backend"
    }

    fn caps(&self) -> BackendCaps {
        self.caps
    }

    fn is_texture_valid(
        &self,
        format: TextureFormat,
        _mips: bool,
        layers: u32,
        usage: TextureUsage,
    ) -> bool {
        if !self.supported_formats.contains(&format) {
            return false;
        }
        if usage.contains(TextureUsage::RENDER_ATTACHMENT) && format.is_depth() {
            return false;
        }
        layers >= 1 && layers <= self.caps.max_texture_layers
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}, {} layers, {} mips)",
            desc.label,
            desc.width,
            desc.height,
            desc.layers,
            desc.mip_levels
        );

        if desc.width == 0 || desc.height == 0 || desc.mip_levels == 0 {
            return Err(BackendError::TextureCreationFailed(format!(
                "invalid extent {}x{} with {} mips",
                desc.width, desc.height, desc.mip_levels
            )));
        }
        if !self.is_texture_valid(desc.format, desc.mip_levels > 1, desc.layers, desc.usage) {
            return Err(BackendError::TextureCreationFailed(format!(
                "unsupported format {:?}",
                desc.format
            )));
        }
        if let Some(budget) = self.texture_budget.as_mut() {
            if *budget == 0 {
                return Err(BackendError::OutOfMemory);
            }
            *budget -= 1;
        }

        let handle = TextureHandle(self.allocate_id());
        self.textures.insert(handle.0, desc.clone());
        self.commands.push(DummyCommand::CreateTexture {
            handle,
            desc: desc.clone(),
        });
        Ok(handle)
    }

    fn write_texture(&mut self, texture: TextureHandle, data: &[u8], width: u32, height: u32) {
        log::trace!(
            "DummyBackend: writing {} bytes ({}x{}) to texture {:?}",
            data.len(),
            width,
            height,
            texture
        );
    }

    fn texture_exists(&self, texture: TextureHandle) -> bool {
        self.textures.contains_key(&texture.0)
    }

    fn texture_format(&self, texture: TextureHandle) -> Option<TextureFormat> {
        self.textures.get(&texture.0).map(|desc| desc.format)
    }

    fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures.get(&texture.0).map(|desc| (desc.width, desc.height))
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture.0).is_some() {
            self.commands.push(DummyCommand::DestroyTexture(texture));
        }
    }

    fn create_frame_buffer(&mut self, attachment: &Attachment) -> BackendResult<FrameBufferHandle> {
        let desc = self.textures.get(&attachment.texture.0).ok_or_else(|| {
            BackendError::InvalidHandle(format!("texture {:?}", attachment.texture))
        })?;

        if !desc.usage.contains(TextureUsage::RENDER_ATTACHMENT) {
            return Err(BackendError::FrameBufferCreationFailed(format!(
                "texture {:?} is not a render attachment",
                desc.label
            )));
        }
        if attachment.mip >= desc.mip_levels || attachment.layer >= desc.layers {
            return Err(BackendError::FrameBufferCreationFailed(format!(
                "attachment mip {} layer {} out of range",
                attachment.mip, attachment.layer
            )));
        }

        let handle = FrameBufferHandle(self.allocate_id());
        self.frame_buffers.insert(handle.0, *attachment);
        self.commands.push(DummyCommand::CreateFrameBuffer {
            handle,
            attachment: *attachment,
        });
        Ok(handle)
    }

    fn destroy_frame_buffer(&mut self, frame_buffer: FrameBufferHandle) {
        if self.frame_buffers.remove(&frame_buffer.0).is_some() {
            self.commands.push(DummyCommand::DestroyFrameBuffer(frame_buffer));
        }
    }

    fn create_program(&mut self, desc: &ProgramDescriptor) -> BackendResult<ProgramHandle> {
        log::trace!("DummyBackend: creating program {:?}", desc.label);
        let handle = ProgramHandle(self.allocate_id());
        self.programs.insert(handle.0, desc.label.clone());
        self.commands.push(DummyCommand::CreateProgram {
            handle,
            label: desc.label.clone(),
        });
        Ok(handle)
    }

    fn submit_quad(&mut self, draw: &QuadDraw) {
        if !self.frame_buffers.contains_key(&draw.target.0)
            || !self.programs.contains_key(&draw.program.0)
            || !self.textures.contains_key(&draw.source.texture.0)
        {
            log::warn!("DummyBackend: dropping quad {:?} with stale handles", draw.label);
            return;
        }
        log::trace!("DummyBackend: quad {:?} in view {:?}", draw.label, draw.view);
        self.commands.push(DummyCommand::Quad(draw.clone()));
    }

    fn blit(&mut self, view: ViewId, region: &BlitRegion) {
        if !self.caps.texture_blit {
            log::warn!("DummyBackend: blit requested but not supported");
            return;
        }
        log::trace!("DummyBackend: blit {:?} in view {:?}", region, view);
        self.commands.push(DummyCommand::Blit {
            view,
            region: *region,
        });
    }

    fn frame(&mut self) {
        log::trace!("DummyBackend: frame");
        self.commands.push(DummyCommand::Frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_target_desc(format: TextureFormat) -> TextureDescriptor {
        TextureDescriptor {
            label: Some("target".into()),
            width: 64,
            height: 32,
            layers: 1,
            mip_levels: 3,
            format,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
        }
    }

    #[test]
    fn test_unsupported_format_rejected() {
        let backend = DummyBackend::new().with_supported_formats(&[TextureFormat::Rgba8Unorm]);
        assert!(!backend.is_texture_valid(
            TextureFormat::Rgba16Float,
            true,
            1,
            TextureUsage::RENDER_ATTACHMENT
        ));
        assert!(backend.is_texture_valid(
            TextureFormat::Rgba8Unorm,
            true,
            1,
            TextureUsage::RENDER_ATTACHMENT
        ));
    }

    #[test]
    fn test_layer_limit() {
        let backend = DummyBackend::new().with_caps(BackendCaps {
            max_texture_layers: 4,
            ..BackendCaps::default()
        });
        assert!(!backend.is_texture_valid(
            TextureFormat::Rgba16Float,
            false,
            8,
            TextureUsage::RENDER_ATTACHMENT
        ));
    }

    #[test]
    fn test_texture_lifetime() {
        let mut backend = DummyBackend::new();
        let texture = backend
            .create_texture(&render_target_desc(TextureFormat::Rgba16Float))
            .unwrap();
        assert!(backend.texture_exists(texture));
        assert_eq!(backend.texture_size(texture), Some((64, 32)));
        assert_eq!(backend.texture_format(texture), Some(TextureFormat::Rgba16Float));

        backend.destroy_texture(texture);
        assert!(!backend.texture_exists(texture));
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_frame_buffer_out_of_range_mip() {
        let mut backend = DummyBackend::new();
        let texture = backend
            .create_texture(&render_target_desc(TextureFormat::Rgba16Float))
            .unwrap();

        assert!(backend
            .create_frame_buffer(&Attachment::new(texture).with_mip(2))
            .is_ok());
        assert!(matches!(
            backend.create_frame_buffer(&Attachment::new(texture).with_mip(3)),
            Err(BackendError::FrameBufferCreationFailed(_))
        ));
    }

    #[test]
    fn test_texture_budget_exhaustion() {
        let mut backend = DummyBackend::new().with_texture_budget(1);
        let desc = render_target_desc(TextureFormat::Rgba8Unorm);
        assert!(backend.create_texture(&desc).is_ok());
        assert_eq!(backend.create_texture(&desc), Err(BackendError::OutOfMemory));
    }

    #[test]
    fn test_blit_ignored_without_caps() {
        let mut backend = DummyBackend::new();
        let texture = backend
            .create_texture(&render_target_desc(TextureFormat::Rgba8Unorm))
            .unwrap();
        backend.blit(
            ViewId(0),
            &BlitRegion {
                destination: Attachment::new(texture),
                source: texture,
                width: 1,
                height: 1,
            },
        );
        assert_eq!(backend.blits(), 0);
    }
}
