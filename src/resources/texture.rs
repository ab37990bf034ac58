//! Texture loading and management

use crate::backend::traits::*;
use crate::backend::types::*;
use image::{DynamicImage, GenericImageView};
use std::path::Path;
use thiserror::Error;

/// Error loading texture data
#[derive(Error, Debug)]
pub enum TextureLoadError {
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// Loaded texture data
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
    pub name: String,
}

impl TextureData {
    /// Load texture from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TextureLoadError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, &name)
    }

    /// Load texture from bytes
    pub fn from_bytes(bytes: &[u8], name: &str) -> Result<Self, TextureLoadError> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_image(img, name))
    }

    /// Convert a decoded image. High dynamic range images keep full precision.
    pub fn from_image(img: DynamicImage, name: &str) -> Self {
        let (width, height) = img.dimensions();
        match img {
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                let rgba = img.to_rgba32f().into_raw();
                Self {
                    width,
                    height,
                    format: TextureFormat::Rgba32Float,
                    data: bytemuck::cast_slice(&rgba).to_vec(),
                    name: name.to_string(),
                }
            }
            _ => Self {
                width,
                height,
                format: TextureFormat::Rgba8UnormSrgb,
                data: img.to_rgba8().into_raw(),
                name: name.to_string(),
            },
        }
    }

    /// Vertical sky gradient in equirectangular layout, zenith at the top row
    pub fn sky_gradient(width: u32, height: u32, zenith: [u8; 4], horizon: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            let t = if height > 1 {
                (y as f32 / (height - 1) as f32 * 2.0).min(1.0)
            } else {
                0.0
            };
            let texel: Vec<u8> = zenith
                .iter()
                .zip(horizon.iter())
                .map(|(&a, &b)| (a as f32 + (b as f32 - a as f32) * t).round() as u8)
                .collect();
            for _ in 0..width {
                data.extend_from_slice(&texel);
            }
        }

        Self {
            width,
            height,
            format: TextureFormat::Rgba8UnormSrgb,
            data,
            name: "sky_gradient".to_string(),
        }
    }
}

/// Texture uploaded to the backend
///
/// Identity is the handle; two `GpuTexture` values with the same handle refer
/// to the same GPU resource.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuTexture {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub name: String,
}

impl GpuTexture {
    /// Create and upload texture to GPU
    pub fn create(backend: &mut dyn ResourceBackend, data: &TextureData) -> BackendResult<Self> {
        let handle = backend.create_texture(&TextureDescriptor {
            label: Some(data.name.clone()),
            width: data.width,
            height: data.height,
            layers: 1,
            mip_levels: 1,
            format: data.format,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST | TextureUsage::COPY_SRC,
        })?;

        backend.write_texture(handle, &data.data, data.width, data.height);

        Ok(Self {
            handle,
            width: data.width,
            height: data.height,
            format: data.format,
            name: data.name.clone(),
        })
    }

    /// Destroy the GPU resource
    pub fn destroy(self, backend: &mut dyn ResourceBackend) {
        backend.destroy_texture(self.handle);
    }
}
