//! Render Block System
//!
//! Independently authored rendering stages implement [`RenderBlock`] and are
//! registered into a [`BlockExecutor`], which invokes their lifecycle hooks in
//! a fixed order every frame against a shared [`Render`] context.

pub mod block;
pub mod context;
pub mod executor;
pub mod pass;
pub mod shader_version;

pub use block::*;
pub use context::*;
pub use executor::*;
pub use pass::*;
pub use shader_version::*;
