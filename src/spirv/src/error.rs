use derive_more::*;

use crate::spv;

/// Failure to reflect a shader module. Reflection is all-or-nothing;
/// no partial result accompanies an error.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[non_exhaustive]
pub enum ReflectError {
    /// The word stream is not a valid SPIR-V module.
    #[display(fmt = "invalid module: {}", _0)]
    InvalidModule(String),
    /// No entry point with the requested execution model and name.
    #[display(fmt = "no {:?} entry point named `{}`", model, name)]
    NoEntryPoint {
        model: spv::ExecutionModel,
        name: String,
    },
    /// A stage variable or uniform lacks an explicit numbering
    /// decoration.
    #[display(fmt = "`{}` has no {:?} decoration", name, decoration)]
    MissingDecoration {
        name: String,
        decoration: spv::Decoration,
    },
    /// A type with no mapping into the variable type model.
    #[display(fmt = "unsupported type: {}", _0)]
    UnsupportedType(String),
}

impl std::error::Error for ReflectError {}

impl ReflectError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidModule(msg.into())
    }

    pub(crate) fn missing(name: &str, decoration: spv::Decoration) -> Self {
        Self::MissingDecoration {
            name: name.to_owned(),
            decoration,
        }
    }
}

/// Failure to resolve a dotted member path against a variable type.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[non_exhaustive]
pub enum MemberPathError {
    #[display(fmt = "empty member path")]
    EmptyPath,
    /// A name segment was applied to a non-struct type.
    #[display(fmt = "`{}` is not a struct", _0)]
    NotAStruct(String),
    #[display(fmt = "member `{}` not found", _0)]
    MemberNotFound(String),
    /// An index segment was applied to a member that is not an array.
    #[display(fmt = "`{}` is not an array", _0)]
    NotAnArray(String),
    #[display(fmt = "index {} out of range for `{}` (length {})", index, name, len)]
    IndexOutOfRange {
        name: String,
        index: u32,
        len: u32,
    },
}

impl std::error::Error for MemberPathError {}

pub type ReflectResult<T> = std::result::Result<T, ReflectError>;
