//! Per-frame render context

use crate::backend::traits::ResourceBackend;
use crate::backend::types::ViewId;
use crate::scene::Environment;

/// Render target the frame is drawn into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// A zero-sized target cannot be rendered to
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Context handed to every block hook during a frame.
///
/// Carries the backend, the active environment and the target; blocks borrow
/// it for the duration of a hook and never own any of it.
pub struct Render<'a> {
    pub backend: &'a mut dyn ResourceBackend,
    pub environment: Option<&'a mut Environment>,
    pub target: &'a RenderTarget,
    pub frame_index: u64,
    next_view: u16,
}

impl<'a> Render<'a> {
    pub fn new(backend: &'a mut dyn ResourceBackend, target: &'a RenderTarget, frame_index: u64) -> Self {
        Self {
            backend,
            environment: None,
            target,
            frame_index,
            next_view: 0,
        }
    }

    pub fn with_environment(mut self, environment: Option<&'a mut Environment>) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> Option<&Environment> {
        self.environment.as_deref()
    }

    pub fn environment_mut(&mut self) -> Option<&mut Environment> {
        self.environment.as_deref_mut()
    }

    /// Allocate the next view in submission order
    pub fn allocate_view(&mut self) -> ViewId {
        let view = ViewId(self.next_view);
        self.next_view += 1;
        view
    }

    /// Allocate a view for GPU work that must run before any scene pass
    pub fn preprocess_pass(&mut self) -> ViewId {
        let view = self.allocate_view();
        log::trace!("Frame {}: preprocess view {:?}", self.frame_index, view);
        view
    }

    /// Number of views allocated so far this frame
    pub fn view_count(&self) -> u16 {
        self.next_view
    }
}
