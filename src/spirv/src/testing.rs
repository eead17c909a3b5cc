//! Builds small SPIR-V modules in-process for reflection tests.
//!
//! A thin layer over [`rspirv::dr::Builder`] that fills in the
//! boilerplate every module needs: capability, memory model, a shared
//! empty entry point body and deduplicated scalar types.

use fnv::FnvHashMap as HashMap;
use rspirv::binary::Assemble;
use rspirv::dr;

use crate::spv;
use crate::Id;

#[derive(Debug)]
enum Scalar {
    Int(u32, bool),
    Float(u32),
}

pub struct ModuleBuilder {
    inner: dr::Builder,
    scalars: HashMap<(bool, u32, bool), Id>,
    function: Option<Id>,
}

impl std::fmt::Debug for ModuleBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleBuilder")
            .field("function", &self.function)
            .finish()
    }
}

impl Default for ModuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn literals(values: &[u32]) -> Vec<dr::Operand> {
    values.iter().map(|&v| dr::Operand::LiteralInt32(v)).collect()
}

impl ModuleBuilder {
    pub fn new() -> Self {
        let mut inner = dr::Builder::new();
        inner.set_version(1, 0);
        inner.capability(spv::Capability::Shader);
        inner.memory_model(spv::AddressingModel::Logical,
            spv::MemoryModel::GLSL450);
        Self {
            inner,
            scalars: Default::default(),
            function: None,
        }
    }

    fn scalar(&mut self, scalar: Scalar) -> Id {
        let key = match scalar {
            Scalar::Int(width, signed) => (false, width, signed),
            Scalar::Float(width) => (true, width, true),
        };
        if let Some(&id) = self.scalars.get(&key) {
            return id;
        }
        let id = match scalar {
            Scalar::Int(width, signed) =>
                self.inner.type_int(width, signed as u32),
            Scalar::Float(width) => self.inner.type_float(width),
        };
        self.scalars.insert(key, id);
        id
    }

    pub fn type_bool(&mut self) -> Id {
        self.inner.type_bool()
    }

    pub fn type_int(&mut self, width: u32, signed: bool) -> Id {
        self.scalar(Scalar::Int(width, signed))
    }

    pub fn type_float(&mut self, width: u32) -> Id {
        self.scalar(Scalar::Float(width))
    }

    pub fn type_vector(&mut self, component: Id, count: u32) -> Id {
        self.inner.type_vector(component, count)
    }

    pub fn type_matrix(&mut self, column: Id, count: u32) -> Id {
        self.inner.type_matrix(column, count)
    }

    /// Declares a sampled 2D image.
    pub fn type_image(&mut self, sampled_type: Id) -> Id {
        self.inner.type_image(sampled_type, spv::Dim::Dim2D, 0, 0, 0, 1,
            spv::ImageFormat::Unknown, None)
    }

    pub fn type_sampler(&mut self) -> Id {
        self.inner.type_sampler()
    }

    pub fn type_sampled_image(&mut self, image: Id) -> Id {
        self.inner.type_sampled_image(image)
    }

    pub fn constant_u32(&mut self, value: u32) -> Id {
        let uint = self.type_int(32, false);
        self.inner.constant_u32(uint, value)
    }

    pub fn type_array(&mut self, elem: Id, length: u32) -> Id {
        let length = self.constant_u32(length);
        self.inner.type_array(elem, length)
    }

    pub fn type_runtime_array(&mut self, elem: Id) -> Id {
        self.inner.type_runtime_array(elem)
    }

    pub fn type_struct(&mut self, members: &[Id]) -> Id {
        self.inner.type_struct(members)
    }

    pub fn type_pointer(&mut self, class: spv::StorageClass, pointee: Id) ->
        Id
    {
        self.inner.type_pointer(None, class, pointee)
    }

    pub fn variable(&mut self, pointer: Id, class: spv::StorageClass) -> Id {
        self.inner.variable(pointer, None, class, None)
    }

    pub fn name(&mut self, target: Id, name: &str) {
        self.inner.name(target, name);
    }

    pub fn member_name(&mut self, target: Id, member: u32, name: &str) {
        self.inner.member_name(target, member, name);
    }

    pub fn decorate(
        &mut self,
        target: Id,
        decoration: spv::Decoration,
        values: &[u32],
    ) {
        self.inner.decorate(target, decoration, literals(values));
    }

    pub fn member_decorate(
        &mut self,
        target: Id,
        member: u32,
        decoration: spv::Decoration,
        values: &[u32],
    ) {
        self.inner.member_decorate(target, member, decoration,
            literals(values));
    }

    /// Declares an entry point. Every entry point shares one empty
    /// function body.
    pub fn entry_point(
        &mut self,
        model: spv::ExecutionModel,
        name: &str,
        interface: &[Id],
    ) {
        let function = match self.function {
            Some(id) => id,
            None => {
                let id = self.inner.id();
                self.function = Some(id);
                id
            },
        };
        self.inner.entry_point(model, function, name, interface);
    }

    fn function_body(&mut self, function: Id) -> Result<(), dr::Error> {
        let void = self.inner.type_void();
        let fn_type = self.inner.type_function(void, Vec::<Id>::new());
        self.inner.begin_function(void, Some(function),
            spv::FunctionControl::NONE, fn_type)?;
        self.inner.begin_block(None)?;
        self.inner.ret()?;
        self.inner.end_function()
    }

    pub fn finish(mut self) -> Vec<u32> {
        if let Some(function) = self.function {
            // Fresh builder state; none of these steps can fail.
            self.function_body(function)
                .expect("failed to emit entry point body");
        }
        self.inner.module().assemble()
    }

    /// Like [`finish`](Self::finish), encoded as little-endian bytes.
    pub fn finish_bytes(self) -> Vec<u8> {
        self.finish().iter().flat_map(|w| w.to_le_bytes().to_vec()).collect()
    }
}
