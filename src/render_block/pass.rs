//! Passes and the drawables submitted through them

use crate::backend::traits::TextureHandle;
use crate::backend::types::ViewId;
use crate::render_block::shader_version::ShaderVersion;

/// Texture slots shading programs sample from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSampler {
    Source0,
    Source1,
    Color,
    Normal,
    Shadow,
    Radiance,
}

/// A texture bound to a sampler slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding {
    pub sampler: TextureSampler,
    pub texture: TextureHandle,
}

/// Textures bound onto one draw, at most one per slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureBindings {
    bindings: Vec<TextureBinding>,
}

impl TextureBindings {
    /// Bind a texture, replacing whatever was bound to the same slot
    pub fn bind(&mut self, sampler: TextureSampler, texture: TextureHandle) {
        match self.bindings.iter_mut().find(|b| b.sampler == sampler) {
            Some(binding) => binding.texture = texture,
            None => self.bindings.push(TextureBinding { sampler, texture }),
        }
    }

    pub fn get(&self, sampler: TextureSampler) -> Option<TextureHandle> {
        self.bindings
            .iter()
            .find(|b| b.sampler == sampler)
            .map(|b| b.texture)
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextureBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// A single drawable unit
#[derive(Debug, Clone, Default)]
pub struct DrawElement {
    pub label: Option<String>,
    pub shader_version: ShaderVersion,
    pub textures: TextureBindings,
}

impl DrawElement {
    pub fn new(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            ..Default::default()
        }
    }
}

/// An instanced batch of drawables sharing one shader permutation
#[derive(Debug, Clone, Default)]
pub struct DrawCluster {
    pub label: Option<String>,
    pub instance_count: u32,
    pub shader_version: ShaderVersion,
    pub textures: TextureBindings,
}

impl DrawCluster {
    pub fn new(label: &str, instance_count: u32) -> Self {
        Self {
            label: Some(label.to_string()),
            instance_count,
            ..Default::default()
        }
    }
}

/// Kind of pass, used by blocks to decide whether they contribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Depth,
    Opaque,
    Alpha,
    Effect,
}

/// A render pass of the frame
#[derive(Debug, Clone)]
pub struct Pass {
    pub name: String,
    pub kind: PassKind,
    /// Assigned by the executor when the pass begins
    pub view: Option<ViewId>,
}

impl Pass {
    pub fn new(name: &str, kind: PassKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            view: None,
        }
    }
}

/// A pass together with the drawables queued into it
#[derive(Debug, Clone)]
pub struct RenderQueue {
    pub pass: Pass,
    pub elements: Vec<DrawElement>,
    pub clusters: Vec<DrawCluster>,
}

impl RenderQueue {
    pub fn new(pass: Pass) -> Self {
        Self {
            pass,
            elements: Vec::new(),
            clusters: Vec::new(),
        }
    }

    pub fn with_element(mut self, element: DrawElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_cluster(mut self, cluster: DrawCluster) -> Self {
        self.clusters.push(cluster);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_replaces_same_slot() {
        let mut textures = TextureBindings::default();
        textures.bind(TextureSampler::Radiance, TextureHandle(1));
        textures.bind(TextureSampler::Color, TextureHandle(2));
        textures.bind(TextureSampler::Radiance, TextureHandle(3));

        assert_eq!(textures.len(), 2);
        assert_eq!(textures.get(TextureSampler::Radiance), Some(TextureHandle(3)));
    }
}
