//! Rust code generation module.

pub mod impl_block;

pub use impl_block::ImplBlockGenerator;
