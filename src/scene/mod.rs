//! Scene data consumed by render blocks

mod environment;
mod light;

pub use environment::*;
pub use light::*;
