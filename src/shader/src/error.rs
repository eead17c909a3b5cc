use derive_more::Display;

use crate::ShaderRepresentation;

/// Diagnostic text produced by an external compiler, passed through
/// verbatim.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display(fmt = "{}", _0)]
pub struct CompileError(pub String);

impl std::error::Error for CompileError {}

impl CompileError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[non_exhaustive]
pub enum ShaderError {
    #[display(fmt = "compilation failed: {}", _0)]
    Compile(CompileError),
    #[display(fmt = "reflection failed: {}", _0)]
    Reflect(spv::ReflectError),
    #[display(fmt = "unsupported source representation: {:?}", _0)]
    UnsupportedRepresentation(ShaderRepresentation),
    /// The operation needs a compiler collaborator that was not
    /// configured.
    #[display(fmt = "no {} configured", _0)]
    MissingCollaborator(&'static str),
    /// The cross-compiler assigned no binding to a reflected uniform.
    #[display(fmt = "no backend binding for uniform `{}`", _0)]
    MissingBackendBinding(String),
    #[display(fmt = "SPIR-V code length {} is not a whole number of words", _0)]
    MisalignedCode(usize),
}

impl std::error::Error for ShaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShaderError::Compile(e) => Some(e),
            ShaderError::Reflect(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CompileError> for ShaderError {
    fn from(err: CompileError) -> Self {
        Self::Compile(err)
    }
}

impl From<spv::ReflectError> for ShaderError {
    fn from(err: spv::ReflectError) -> Self {
        Self::Reflect(err)
    }
}

pub type ShaderResult<T> = std::result::Result<T, ShaderError>;
