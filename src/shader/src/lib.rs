//! Shader compilation: from source or SPIR-V to backend-ready code with
//! reflection data attached.
//!
//! SPIR-V is the intermediate form. Source compilation and translation
//! into backend shading languages are delegated to the
//! [`SourceCompiler`] and [`CrossCompiler`] collaborators.

mod binary;
mod compiler;
mod error;
#[cfg(feature = "shaderc")]
mod glsl;
mod info;
mod intermediate;
pub mod testing;

pub use binary::*;
pub use compiler::*;
pub use error::*;
#[cfg(feature = "shaderc")]
pub use glsl::*;
pub use info::*;
pub use intermediate::*;
