//! Backend abstraction layer
//!
//! Provides the resource backend trait consumed by render blocks, and the
//! wgpu and dummy backends that implement it.

pub mod dummy;
pub mod traits;
pub mod types;
pub mod wgpu_backend;

pub use dummy::{DummyBackend, DummyCommand};
pub use traits::*;
pub use types::*;
