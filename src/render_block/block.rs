//! Render block lifecycle contract

use crate::backend::traits::{BackendResult, ResourceBackend};
use crate::render_block::context::Render;
use crate::render_block::pass::{DrawCluster, DrawElement, Pass};
use std::any::Any;

/// Position of a block in the executor's registration order.
///
/// Also selects the block's slot in a [`ShaderVersion`](super::ShaderVersion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockIndex(pub(crate) u32);

impl BlockIndex {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Trait for render blocks
///
/// Hooks are invoked in this order every frame: `begin_frame`, then per pass
/// `begin_pass` followed by `submit_element` / `submit_cluster` for each
/// drawable. `init` runs once, at registration. Frame hooks cannot fail; a
/// block that cannot contribute skips its bindings and leaves its options
/// disabled.
pub trait RenderBlock {
    /// Get the block name for debugging
    fn name(&self) -> &str;

    /// Names of the shader options this block may enable, indexed by option bit
    fn shader_options(&self) -> &'static [&'static str] {
        &[]
    }

    /// One-time GPU resource allocation
    fn init(&mut self, _backend: &mut dyn ResourceBackend, _index: BlockIndex) -> BackendResult<()> {
        Ok(())
    }

    /// Preparatory GPU work before any scene pass
    fn begin_frame(&mut self, _render: &mut Render) {}

    /// Per-pass setup
    fn begin_pass(&mut self, _render: &mut Render, _pass: &mut Pass) {}

    /// Bind this block's state onto a drawable
    fn submit_element(&mut self, _render: &mut Render, _pass: &Pass, _element: &mut DrawElement) {}

    /// Bind this block's state onto an instanced cluster
    fn submit_cluster(&mut self, _render: &mut Render, _pass: &Pass, _cluster: &mut DrawCluster) {}

    /// Allow downcasting
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
