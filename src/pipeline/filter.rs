//! Fullscreen quad filter service

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::pipeline::shaders::quad_program_source;

/// Draws a fullscreen quad with one program into a target, sampling one source.
///
/// Holds nothing but its program; targets and sources are supplied per draw.
#[derive(Debug, Clone)]
pub struct QuadFilter {
    label: String,
    program: ProgramHandle,
}

impl QuadFilter {
    /// Build the program from a fragment stage written against the shared quad bindings
    pub fn new(backend: &mut dyn ResourceBackend, label: &str, fragment: &str) -> BackendResult<Self> {
        let program = backend.create_program(&ProgramDescriptor {
            label: Some(label.to_string()),
            source: quad_program_source(fragment),
        })?;
        log::debug!("Created quad filter '{}'", label);

        Ok(Self {
            label: label.to_string(),
            program,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    /// Enqueue one draw into `target`
    pub fn submit_quad(
        &self,
        backend: &mut dyn ResourceBackend,
        view: ViewId,
        target: FrameBufferHandle,
        source: SamplerBinding,
        uniforms: QuadUniforms,
    ) {
        backend.submit_quad(&QuadDraw {
            label: Some(self.label.clone()),
            view,
            target,
            program: self.program,
            source,
            uniforms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyBackend, DummyCommand};
    use crate::pipeline::shaders::COPY_FRAGMENT;

    #[test]
    fn test_submit_records_program_and_uniforms() {
        let mut backend = DummyBackend::new();
        let filter = QuadFilter::new(&mut backend, "test_filter", COPY_FRAGMENT).unwrap();

        let texture = backend
            .create_texture(&TextureDescriptor {
                width: 8,
                height: 8,
                usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
                ..Default::default()
            })
            .unwrap();
        let target = backend.create_frame_buffer(&Attachment::new(texture)).unwrap();
        let uniforms = QuadUniforms::source_level(2, 1);

        filter.submit_quad(
            &mut backend,
            ViewId(3),
            target,
            SamplerBinding {
                texture,
                filter: FilterMode::Nearest,
            },
            uniforms,
        );

        let Some(DummyCommand::Quad(draw)) = backend.commands().last() else {
            panic!("expected a quad draw");
        };
        assert_eq!(draw.program, filter.program());
        assert_eq!(draw.view, ViewId(3));
        assert_eq!(draw.uniforms, uniforms);
        assert_eq!(draw.label.as_deref(), Some("test_filter"));
    }
}
