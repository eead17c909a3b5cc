use derivative::Derivative;
use fnv::FnvHashMap as HashMap;
use spirv_headers as spv;

pub type Id = u32;

/// The SPIR-V version as a pair `(major, minor)`.
pub type Version = (u8, u8);

/// A parsed module, reduced to the instructions that reflection needs.
#[derive(Debug)]
pub struct Module {
    pub(crate) version: Version,
    pub(crate) names: HashMap<Id, String>,
    pub(crate) member_names: HashMap<(Id, u32), String>,
    pub(crate) decorations: HashMap<Id, DecorationSet>,
    pub(crate) member_decorations: HashMap<(Id, u32), MemberDecorationSet>,
    pub(crate) types: HashMap<Id, Type>,
    pub(crate) constants: HashMap<Id, u64>,
    // Module order, which is also declaration order.
    pub(crate) variables: Vec<Variable>,
    pub(crate) entry_points: Vec<EntryPoint>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct DecorationSet {
    pub(crate) location: Option<u32>,
    pub(crate) set: Option<u32>,
    pub(crate) binding: Option<u32>,
    pub(crate) array_stride: Option<u32>,
    pub(crate) block: bool,
    pub(crate) buffer_block: bool,
    pub(crate) builtin: bool,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct MemberDecorationSet {
    pub(crate) offset: Option<u32>,
    pub(crate) matrix_stride: Option<u32>,
    pub(crate) row_major: bool,
    pub(crate) builtin: bool,
}

/// Type declarations, kept close to their SPIR-V instructions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Type {
    Void,
    Bool,
    Int { width: u32, signed: bool },
    Float { width: u32 },
    Vector { component: Id, count: u32 },
    Matrix { column: Id, count: u32 },
    Image,
    Sampler,
    SampledImage,
    Array { elem: Id, length: Id },
    RuntimeArray { elem: Id },
    Struct { members: Vec<Id> },
    Pointer { storage_class: spv::StorageClass, pointee: Id },
    Function,
}

#[derive(Debug, Derivative)]
#[derivative(Default)]
pub(crate) struct Variable {
    pub(crate) id: Id,
    // The pointer type, as declared.
    pub(crate) ty: Id,
    #[derivative(Default(value = "spv::StorageClass::UniformConstant"))]
    pub(crate) storage_class: spv::StorageClass,
}

#[derive(Debug, Derivative)]
#[derivative(Default)]
pub(crate) struct EntryPoint {
    #[derivative(Default(value = "spv::ExecutionModel::Vertex"))]
    pub(crate) execution_model: spv::ExecutionModel,
    pub(crate) name: String,
    pub(crate) interface: Vec<Id>,
}
