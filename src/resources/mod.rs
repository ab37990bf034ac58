//! Resource management
//!
//! Loading environment source images and uploading them to the backend.

mod texture;

pub use texture::*;
