//! Scene environment and its image-based radiance

use crate::backend::traits::TextureHandle;
use crate::resources::GpuTexture;
use glam::Vec3;

/// Image-based-lighting source and its prefiltered roughness levels
#[derive(Debug, Clone)]
pub struct Radiance {
    texture: Option<GpuTexture>,
    roughness_array: Option<TextureHandle>,
    preprocessed: bool,
    /// Radiance multiplier applied by shading blocks
    pub energy: f32,
}

impl Radiance {
    pub fn new(texture: GpuTexture) -> Self {
        Self {
            texture: Some(texture),
            roughness_array: None,
            preprocessed: false,
            energy: 1.0,
        }
    }

    /// Source texture (owned by the caller, read-only here)
    pub fn texture(&self) -> Option<&GpuTexture> {
        self.texture.as_ref()
    }

    /// Prefiltered roughness texture, once computed
    pub fn roughness_array(&self) -> Option<TextureHandle> {
        self.roughness_array
    }

    pub fn is_preprocessed(&self) -> bool {
        self.preprocessed
    }

    /// Whether shading can sample prefiltered radiance
    pub fn is_ready(&self) -> bool {
        self.preprocessed && self.roughness_array.is_some()
    }

    /// Forget the derived texture so the next frame prefilters again
    pub fn reset(&mut self) {
        self.roughness_array = None;
        self.preprocessed = false;
    }

    pub(crate) fn assign(&mut self, roughness_array: TextureHandle) {
        self.roughness_array = Some(roughness_array);
        self.preprocessed = true;
    }
}

impl Default for Radiance {
    fn default() -> Self {
        Self {
            texture: None,
            roughness_array: None,
            preprocessed: false,
            energy: 1.0,
        }
    }
}

/// Scene-level lighting configuration
#[derive(Debug, Clone)]
pub struct Environment {
    pub radiance: Radiance,
    pub ambient: Vec3,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            radiance: Radiance::default(),
            ambient: Vec3::new(0.03, 0.03, 0.03),
        }
    }

    pub fn with_radiance(texture: GpuTexture) -> Self {
        Self {
            radiance: Radiance::new(texture),
            ..Self::new()
        }
    }

    /// Replace the radiance source. Derived data is reset when the identity changes.
    pub fn set_radiance_source(&mut self, texture: Option<GpuTexture>) {
        let old = self.radiance.texture.as_ref().map(|t| t.handle);
        let new = texture.as_ref().map(|t| t.handle);
        self.radiance.texture = texture;
        if old != new {
            self.radiance.reset();
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TextureFormat;

    fn source(id: u64) -> GpuTexture {
        GpuTexture {
            handle: TextureHandle(id),
            width: 256,
            height: 128,
            format: TextureFormat::Rgba16Float,
            name: format!("env_{}", id),
        }
    }

    #[test]
    fn test_default_radiance_is_unlit_but_full_energy() {
        let radiance = Radiance::default();
        assert_eq!(radiance.energy, 1.0);
        assert!(radiance.texture().is_none());
        assert!(!radiance.is_ready());
        assert_eq!(Environment::default().radiance.energy, 1.0);
    }

    #[test]
    fn test_assign_marks_ready() {
        let mut environment = Environment::with_radiance(source(1));
        assert!(!environment.radiance.is_ready());

        environment.radiance.assign(TextureHandle(9));
        assert!(environment.radiance.is_ready());
        assert_eq!(environment.radiance.roughness_array(), Some(TextureHandle(9)));
    }

    #[test]
    fn test_source_change_resets() {
        let mut environment = Environment::with_radiance(source(1));
        environment.radiance.assign(TextureHandle(9));

        environment.set_radiance_source(Some(source(1)));
        assert!(environment.radiance.is_preprocessed());

        environment.set_radiance_source(Some(source(2)));
        assert!(!environment.radiance.is_preprocessed());
        assert_eq!(environment.radiance.roughness_array(), None);
    }
}
