//! Common utilities for render block integration tests.
//!
//! Provides a log capture (per test thread) and helpers for driving an
//! [`Engine`] over the [`DummyBackend`].

#![allow(dead_code)]

use std::cell::RefCell;
use std::sync::Once;

use radiance_engine::backend::{
    BackendCaps, DummyBackend, DummyCommand, QuadDraw, TextureDescriptor, TextureFormat,
};
use radiance_engine::render_block::{
    DrawCluster, DrawElement, Pass, PassKind, RenderQueue, RenderTarget,
};
use radiance_engine::resources::{GpuTexture, TextureData};
use radiance_engine::{Engine, EngineConfig, Environment};

pub const TARGET: RenderTarget = RenderTarget {
    width: 256,
    height: 128,
};

pub const PREFILTER_LABEL: &str = "radiance_prefilter";
pub const COPY_LABEL: &str = "texture_copy";

// ============================================================================
// Log Capture
// ============================================================================

thread_local! {
    static RECORDS: RefCell<Vec<(log::Level, String)>> = const { RefCell::new(Vec::new()) };
}

struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

/// Start capturing log records emitted on this thread.
pub fn capture_logs() {
    INIT.call_once(|| {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Trace);
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

/// Warnings captured on this thread since [`capture_logs`].
pub fn warnings() -> Vec<String> {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|(level, _)| *level == log::Level::Warn)
            .map(|(_, message)| message.clone())
            .collect()
    })
}

// ============================================================================
// Engine Helpers
// ============================================================================

pub fn caps(texture_blit: bool, mip_render_targets: bool) -> BackendCaps {
    BackendCaps {
        texture_blit,
        mip_render_targets,
        constrained: false,
        ..BackendCaps::default()
    }
}

pub fn engine(backend: DummyBackend) -> Engine<DummyBackend> {
    Engine::new(backend, EngineConfig::default()).unwrap()
}

/// Upload an equirectangular source of the target's size
pub fn upload_source(engine: &mut Engine<DummyBackend>, format: TextureFormat, name: &str) -> GpuTexture {
    let mut data = TextureData::sky_gradient(
        TARGET.width,
        TARGET.height,
        [40, 90, 200, 255],
        [230, 230, 255, 255],
    );
    data.name = name.to_string();
    if format != data.format {
        data.data = vec![0; (TARGET.width * TARGET.height * format.bytes_per_pixel()) as usize];
        data.format = format;
    }
    engine.upload_texture(&data).unwrap()
}

/// One depth pass and one opaque pass, each with an element; the opaque pass also has a cluster
pub fn shading_queues() -> Vec<RenderQueue> {
    vec![
        RenderQueue::new(Pass::new("depth", PassKind::Depth)).with_element(DrawElement::new("mesh")),
        RenderQueue::new(Pass::new("opaque", PassKind::Opaque))
            .with_element(DrawElement::new("mesh"))
            .with_cluster(DrawCluster::new("particles", 64)),
    ]
}

pub fn render(engine: &mut Engine<DummyBackend>, environment: &mut Environment) -> Vec<RenderQueue> {
    let mut queues = shading_queues();
    assert!(engine.render_frame(Some(environment), &TARGET, &mut queues));
    queues
}

// ============================================================================
// Command Inspection
// ============================================================================

pub fn quads_labelled<'a>(backend: &'a DummyBackend, label: &str) -> Vec<&'a QuadDraw> {
    backend
        .commands()
        .iter()
        .filter_map(|command| match command {
            DummyCommand::Quad(draw) if draw.label.as_deref() == Some(label) => Some(draw),
            _ => None,
        })
        .collect()
}

pub fn created_textures(backend: &DummyBackend) -> Vec<&TextureDescriptor> {
    backend
        .commands()
        .iter()
        .filter_map(|command| match command {
            DummyCommand::CreateTexture { desc, .. } => Some(desc),
            _ => None,
        })
        .collect()
}

pub fn scratch_sizes(backend: &DummyBackend) -> Vec<(u32, u32)> {
    created_textures(backend)
        .into_iter()
        .filter(|desc| {
            desc.label
                .as_deref()
                .is_some_and(|label| label.starts_with("radiance_scratch"))
        })
        .map(|desc| (desc.width, desc.height))
        .collect()
}
