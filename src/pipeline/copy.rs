//! Texture copy through a pass-through quad

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::pipeline::filter::QuadFilter;
use crate::pipeline::shaders::COPY_FRAGMENT;

/// Copies mip 0, layer 0 of a texture into a render target.
///
/// Used wherever a blit is unavailable or the formats or sizes differ: the
/// draw resamples with linear filtering and converts to the target format.
#[derive(Debug, Clone)]
pub struct TextureCopy {
    filter: QuadFilter,
}

impl TextureCopy {
    pub fn new(backend: &mut dyn ResourceBackend) -> BackendResult<Self> {
        Ok(Self {
            filter: QuadFilter::new(backend, "texture_copy", COPY_FRAGMENT)?,
        })
    }

    pub fn filter(&self) -> &QuadFilter {
        &self.filter
    }

    pub fn submit_quad(
        &self,
        backend: &mut dyn ResourceBackend,
        view: ViewId,
        target: FrameBufferHandle,
        source: TextureHandle,
    ) {
        self.filter.submit_quad(
            backend,
            view,
            target,
            SamplerBinding {
                texture: source,
                filter: FilterMode::Linear,
            },
            QuadUniforms::source_level(0, 0),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyBackend, DummyCommand};

    #[test]
    fn test_copy_samples_base_level_linearly() {
        let mut backend = DummyBackend::new();
        let copy = TextureCopy::new(&mut backend).unwrap();

        let desc = TextureDescriptor {
            width: 4,
            height: 4,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
            ..Default::default()
        };
        let source = backend.create_texture(&desc).unwrap();
        let destination = backend.create_texture(&desc).unwrap();
        let target = backend
            .create_frame_buffer(&Attachment::new(destination))
            .unwrap();

        copy.submit_quad(&mut backend, ViewId(0), target, source);

        let Some(DummyCommand::Quad(draw)) = backend.commands().last() else {
            panic!("expected a quad draw");
        };
        assert_eq!(draw.source.texture, source);
        assert_eq!(draw.source.filter, FilterMode::Linear);
        assert_eq!(draw.uniforms, QuadUniforms::source_level(0, 0));
        assert_eq!(draw.program, copy.filter().program());
    }
}
