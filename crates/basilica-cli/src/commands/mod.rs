//! CLI command implementations.

pub mod common;
pub mod impulse;
pub mod morph;
pub mod presets;
pub mod randomize;
pub mod render;
