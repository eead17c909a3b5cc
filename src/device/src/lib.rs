//! Backend-facing half of the pipeline: compiled shaders are merged into
//! a [`ResourceLayout`], from which resource sets and pipelines are built
//! and translated into native tables by a [`GraphicsBackend`].

#![allow(
    clippy::module_inception,
    clippy::too_many_arguments,
)]

macro_rules! err_msg {
    ($($arg:tt)*) => {
        crate::Error(anyhow::anyhow!($($arg)*))
    }
}

#[macro_use]
mod util;

mod backend;
mod buffer;
mod device;
mod frame;
mod image;
mod layout;
mod pipeline;
mod sampler;
mod set;
mod stage;
mod uniform;

pub use backend::*;
pub use buffer::*;
pub use device::*;
pub use frame::*;
pub use image::*;
pub use layout::*;
pub use pipeline::*;
pub use sampler::*;
pub use set::*;
pub use stage::*;
pub use uniform::*;
pub use util::*;

#[cfg(test)]
mod testing;

use derive_more::Display;

#[derive(Debug, Display)]
#[display(fmt = "{}", _0)]
pub struct Error(anyhow::Error);

impl std::error::Error for Error {}

impl Error {
    /// Recovers the typed error this error was created from, if any.
    pub fn downcast_ref<E>(&self) -> Option<&E>
        where E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static
    {
        self.0.downcast_ref()
    }
}

impl From<LookupError> for Error {
    fn from(err: LookupError) -> Self {
        Self(err.into())
    }
}

impl From<UniformError> for Error {
    fn from(err: UniformError) -> Self {
        Self(err.into())
    }
}

impl From<shader::ShaderError> for Error {
    fn from(err: shader::ShaderError) -> Self {
        Self(err.into())
    }
}

pub type DeviceResult<T> = std::result::Result<T, Error>;
