//! Radiance prefiltering on a real GPU through the wgpu backend.
//!
//! Tests skip themselves when no adapter is available (e.g. on CI without a
//! GPU or software rasterizer).
//!
//! ```bash
//! RUST_LOG=debug cargo test --test gpu_tests -- --nocapture
//! ```

#![cfg(not(target_arch = "wasm32"))]

use radiance_engine::backend::{BackendError, ResourceBackend, TextureDescriptor, TextureFormat, TextureUsage};
use radiance_engine::pipeline::RadianceLayout;
use radiance_engine::render_block::{DrawElement, Pass, PassKind, RenderQueue, RenderTarget, TextureSampler};
use radiance_engine::resources::TextureData;
use radiance_engine::{Engine, EngineConfig, Environment, RadianceConfig, WgpuBackend};

fn headless_engine() -> Option<Engine<WgpuBackend>> {
    let _ = env_logger::builder().is_test(true).try_init();

    let backend = match WgpuBackend::new_headless() {
        Ok(backend) => backend,
        Err(err) => {
            eprintln!("wgpu backend not available, skipping: {}", err);
            return None;
        }
    };

    let config = EngineConfig {
        radiance: RadianceConfig {
            sample_count: 16,
            constrained_sample_count: 8,
            ..RadianceConfig::default()
        },
    };
    Some(Engine::new(backend, config).unwrap())
}

#[test]
fn test_prefilter_on_gpu() {
    let Some(mut engine) = headless_engine() else {
        return;
    };

    let source = engine
        .upload_texture(&TextureData::sky_gradient(64, 32, [40, 90, 200, 255], [230, 230, 255, 255]))
        .unwrap();
    let mut environment = Environment::with_radiance(source);
    let target = RenderTarget::new(64, 32);
    let mut queues = vec![RenderQueue::new(Pass::new("opaque", PassKind::Opaque)).with_element(DrawElement::new("mesh"))];

    assert!(engine.render_frame(Some(&mut environment), &target, &mut queues));
    engine.backend().device().poll(wgpu::Maintain::Wait);

    assert!(environment.radiance.is_preprocessed());
    let derived = environment.radiance.roughness_array().unwrap();
    let texture = engine.backend().wgpu_texture(derived).unwrap();
    let layout = engine.radiance_block().unwrap().layout();
    assert_eq!(texture.width(), layout.base_size(target.size(), 8).0);
    match layout {
        RadianceLayout::Mipmapped => assert_eq!(texture.mip_level_count(), 8),
        RadianceLayout::Layered => assert_eq!(texture.depth_or_array_layers(), 8),
    }
    assert!(matches!(
        engine.backend().texture_format(derived),
        Some(TextureFormat::Rgba16Float | TextureFormat::Rgb10a2Unorm)
    ));
    assert_eq!(
        queues[0].elements[0].textures.get(TextureSampler::Radiance),
        Some(derived)
    );
}

#[test]
fn test_hdr_source_on_gpu() {
    let Some(mut engine) = headless_engine() else {
        return;
    };

    let image = image::DynamicImage::ImageRgb32F(image::ImageBuffer::from_pixel(
        32,
        16,
        image::Rgb([4.0f32, 2.0, 1.0]),
    ));
    let source = engine
        .upload_texture(&TextureData::from_image(image, "hdr"))
        .unwrap();
    assert_eq!(source.format, TextureFormat::Rgba32Float);

    let mut environment = Environment::with_radiance(source);
    let target = RenderTarget::new(32, 16);
    assert!(engine.render_frame(Some(&mut environment), &target, &mut []));
    engine.backend().device().poll(wgpu::Maintain::Wait);

    assert!(environment.radiance.is_ready());
}

#[test]
fn test_texture_over_device_limit_fails() {
    let Some(mut engine) = headless_engine() else {
        return;
    };

    let max = engine.backend().device().limits().max_texture_dimension_2d;
    let desc = TextureDescriptor {
        label: Some("oversized".into()),
        width: max + 1,
        height: 8,
        layers: 1,
        mip_levels: 1,
        format: TextureFormat::Rgba16Float,
        usage: TextureUsage::TEXTURE_BINDING | TextureUsage::RENDER_ATTACHMENT,
    };
    assert!(matches!(
        engine.backend_mut().create_texture(&desc),
        Err(BackendError::TextureCreationFailed(_))
    ));
}

#[test]
fn test_prefilter_over_device_limit_is_skipped() {
    let Some(mut engine) = headless_engine() else {
        return;
    };

    let max = engine.backend().device().limits().max_texture_dimension_2d;
    let source = engine
        .upload_texture(&TextureData::sky_gradient(64, 32, [40, 90, 200, 255], [230, 230, 255, 255]))
        .unwrap();
    let mut environment = Environment::with_radiance(source);
    let target = RenderTarget::new(max + 1, 8);
    let mut queues = vec![RenderQueue::new(Pass::new("opaque", PassKind::Opaque)).with_element(DrawElement::new("mesh"))];

    assert!(engine.render_frame(Some(&mut environment), &target, &mut queues));
    engine.backend().device().poll(wgpu::Maintain::Wait);

    assert!(!environment.radiance.is_ready());
    assert_eq!(queues[0].elements[0].textures.get(TextureSampler::Radiance), None);
}
