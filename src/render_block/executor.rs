//! Frame driver running registered blocks in order

use crate::backend::traits::{BackendResult, ResourceBackend};
use crate::render_block::block::*;
use crate::render_block::context::Render;
use crate::render_block::pass::RenderQueue;
use crate::render_block::shader_version::ShaderVersion;

/// Ordered registry of render blocks and the frame driver invoking them
pub struct BlockExecutor {
    blocks: Vec<Box<dyn RenderBlock>>,
}

impl BlockExecutor {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Register a block, running its `init` hook. Blocks run in registration order.
    pub fn register<B: RenderBlock + 'static>(
        &mut self,
        mut block: B,
        backend: &mut dyn ResourceBackend,
    ) -> BackendResult<BlockIndex> {
        let index = BlockIndex(self.blocks.len() as u32);
        block.init(backend, index)?;
        log::debug!("Registered render block '{}' at {:?}", block.name(), index);
        self.blocks.push(Box::new(block));
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Get block by index as concrete type
    pub fn get<B: RenderBlock + 'static>(&self, index: BlockIndex) -> Option<&B> {
        self.blocks.get(index.index())?.as_any().downcast_ref::<B>()
    }

    /// Get mutable block by index as concrete type
    pub fn get_mut<B: RenderBlock + 'static>(&mut self, index: BlockIndex) -> Option<&mut B> {
        self.blocks
            .get_mut(index.index())?
            .as_any_mut()
            .downcast_mut::<B>()
    }

    /// First block of the given type
    pub fn find<B: RenderBlock + 'static>(&self) -> Option<&B> {
        self.blocks
            .iter()
            .find_map(|block| block.as_any().downcast_ref::<B>())
    }

    /// Block names in execution order
    pub fn block_names(&self) -> Vec<&str> {
        self.blocks.iter().map(|block| block.name()).collect()
    }

    /// Run one frame: `begin_frame` on every block, then for each queued pass
    /// `begin_pass` followed by element and cluster submission.
    ///
    /// Shader options and texture bindings of every drawable are reset before
    /// submission so they reflect only this frame's resources.
    pub fn execute(&mut self, render: &mut Render, queues: &mut [RenderQueue]) {
        for block in &mut self.blocks {
            block.begin_frame(render);
        }

        for queue in queues {
            let RenderQueue {
                pass,
                elements,
                clusters,
            } = queue;

            pass.view = Some(render.allocate_view());
            for block in &mut self.blocks {
                block.begin_pass(render, pass);
            }

            for element in elements.iter_mut() {
                element.shader_version.clear();
                element.textures.clear();
                for block in &mut self.blocks {
                    block.submit_element(render, pass, element);
                }
            }

            for cluster in clusters.iter_mut() {
                cluster.shader_version.clear();
                cluster.textures.clear();
                for block in &mut self.blocks {
                    block.submit_cluster(render, pass, cluster);
                }
            }
        }
    }

    /// Define names enabled in `version` across all registered blocks
    pub fn shader_defines(&self, version: &ShaderVersion) -> Vec<&'static str> {
        version.defines(
            self.blocks
                .iter()
                .enumerate()
                .map(|(i, block)| (BlockIndex(i as u32), block.shader_options())),
        )
    }
}

impl Default for BlockExecutor {
    fn default() -> Self {
        Self::new()
    }
}
