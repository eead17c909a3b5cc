//! SPIR-V parsing and shader resource reflection.
//!
//! A module is parsed once with [`parse_words`] (or [`parse_bytes`]),
//! after which [`reflect`] extracts the stage interface and uniform
//! declarations of one entry point as a [`ShaderResources`] value.

use spirv_headers as spv;

mod build;
mod data;
mod error;
mod path;
mod reflect;
mod resources;
pub mod testing;
mod types;
mod view;

pub use build::{parse_bytes, parse_words};
pub use data::{Id, Module};
pub use error::*;
pub use path::*;
pub use reflect::*;
pub use resources::*;
pub use types::*;
pub use view::*;

pub use spv::Decoration;
pub use spv::ExecutionModel;
pub use spv::StorageClass;
