use spirv_headers as spv;

use crate::data::{self, DecorationSet, Id, Type, Version};
use crate::Module;

macro_rules! indexed_type {
    ($name:ident) => {
        indexed_type!($name, $name);
    };
    ($name:ident, $data_name:ident) => {
        #[derive(Clone, Copy, Debug)]
        pub struct $name<'m> {
            module: &'m Module,
            index: usize,
            inner: &'m data::$data_name,
        }

        impl<'m> $name<'m> {
            pub fn module(&self) -> &'m Module {
                self.module
            }

            /// Position in module declaration order.
            pub fn index(&self) -> usize {
                self.index
            }

            fn inner(&self) -> &'m data::$data_name {
                self.inner
            }
        }
    };
}

indexed_type!(Variable);
indexed_type!(EntryPoint);

impl Module {
    pub(crate) fn new(version: Version) -> Self {
        Self {
            version,
            names: Default::default(),
            member_names: Default::default(),
            decorations: Default::default(),
            member_decorations: Default::default(),
            types: Default::default(),
            constants: Default::default(),
            variables: Default::default(),
            entry_points: Default::default(),
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn entry_points(&self) ->
        impl ExactSizeIterator<Item = EntryPoint<'_>> + '_
    {
        self.entry_points.iter().enumerate().map(move |(index, inner)|
            EntryPoint { module: self, index, inner })
    }

    pub fn get_entry_point(
        &self,
        model: spv::ExecutionModel,
        name: &str,
    ) -> Option<EntryPoint<'_>> {
        self.entry_points()
            .find(|entry| entry.execution_model() == model
                && entry.name() == name)
    }

    pub fn variables(&self) ->
        impl ExactSizeIterator<Item = Variable<'_>> + '_
    {
        self.variables.iter().enumerate().map(move |(index, inner)|
            Variable { module: self, index, inner })
    }

    pub fn get_variable(&self, id: Id) -> Option<Variable<'_>> {
        self.variables().find(|var| var.id() == id)
    }

    pub(crate) fn name(&self, id: Id) -> Option<&str> {
        self.names.get(&id).map(|s| &s[..])
    }

    pub(crate) fn member_name(&self, id: Id, member: u32) -> Option<&str> {
        self.member_names.get(&(id, member)).map(|s| &s[..])
    }

    pub(crate) fn decorations(&self, id: Id) -> DecorationSet {
        self.decorations.get(&id).cloned().unwrap_or_default()
    }

    pub(crate) fn member_decorations(&self, id: Id, member: u32) ->
        data::MemberDecorationSet
    {
        self.member_decorations.get(&(id, member)).cloned()
            .unwrap_or_default()
    }

    pub(crate) fn get_type(&self, id: Id) -> Option<&Type> {
        self.types.get(&id)
    }

    pub(crate) fn constant(&self, id: Id) -> Option<u64> {
        self.constants.get(&id).copied()
    }
}

impl<'m> EntryPoint<'m> {
    pub fn name(&self) -> &'m str {
        &self.inner().name
    }

    pub fn execution_model(&self) -> spv::ExecutionModel {
        self.inner().execution_model
    }

    /// Variables listed in the entry point's interface, in module order.
    pub fn interface(&self) -> impl Iterator<Item = Variable<'m>> + 'm {
        let inner = self.inner();
        self.module().variables()
            .filter(move |var| inner.interface.contains(&var.id()))
    }

    pub fn inputs(&self) -> impl Iterator<Item = Variable<'m>> + 'm {
        self.interface()
            .filter(|var| var.storage_class() == spv::StorageClass::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = Variable<'m>> + 'm {
        self.interface()
            .filter(|var| var.storage_class() == spv::StorageClass::Output)
    }
}

impl<'m> Variable<'m> {
    pub fn id(&self) -> Id {
        self.inner().id
    }

    pub fn storage_class(&self) -> spv::StorageClass {
        self.inner().storage_class
    }

    pub fn name(&self) -> Option<&'m str> {
        self.module().name(self.id())
    }

    pub fn location(&self) -> Option<u32> {
        self.decorations().location
    }

    pub fn set(&self) -> Option<u32> {
        self.decorations().set
    }

    pub fn binding(&self) -> Option<u32> {
        self.decorations().binding
    }

    pub(crate) fn decorations(&self) -> DecorationSet {
        self.module().decorations(self.id())
    }

    /// The id of the type the variable's pointer points to.
    pub fn pointee(&self) -> Option<Id> {
        match self.module().get_type(self.inner().ty)? {
            &Type::Pointer { pointee, .. } => Some(pointee),
            _ => None,
        }
    }
}
