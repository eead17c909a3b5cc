use std::convert::TryFrom;
use std::sync::Arc;

use log::trace;

use crate::data::{Id, Type};
use crate::error::*;
use crate::resources::*;
use crate::types::*;
use crate::{spv, Module, Variable};

/// Extracts the stage interface and uniform declarations of one entry
/// point.
///
/// Fails without a partial result if any stage variable lacks a
/// location, any uniform lacks a binding or set, or any type has no
/// counterpart in the type model.
pub fn reflect(
    module: &Module,
    model: spv::ExecutionModel,
    entry_point: &str,
) -> ReflectResult<ShaderResources> {
    let entry = module.get_entry_point(model, entry_point)
        .ok_or_else(|| ReflectError::NoEntryPoint {
            model,
            name: entry_point.to_owned(),
        })?;
    let reflector = Reflector { module };

    let inputs = entry.inputs()
        .filter(|&var| !reflector.is_builtin(var))
        .map(|var| reflector.stage_variable(var))
        .collect::<ReflectResult<Vec<_>>>()?;
    let outputs = entry.outputs()
        .filter(|&var| !reflector.is_builtin(var))
        .map(|var| reflector.stage_variable(var))
        .collect::<ReflectResult<Vec<_>>>()?;

    let mut resource_sets: Vec<ResourceSet> = Vec::new();
    for &class in UniformClass::ALL.iter() {
        for var in module.variables() {
            if reflector.classify(var) != Some(class) { continue; }
            let uniform = reflector.uniform(var)?;
            trace!("reflected {:?} `{}` at set {} binding {}",
                class, uniform.name, uniform.set, uniform.source_binding);
            insert_uniform(&mut resource_sets, uniform);
        }
    }
    resource_sets.sort_by_key(|set| set.source_number);

    Ok(ShaderResources { inputs, outputs, resource_sets })
}

// The first uniform seen with a set number creates that set.
fn insert_uniform(sets: &mut Vec<ResourceSet>, uniform: ShaderUniform) {
    match sets.iter_mut().find(|set| set.source_number == uniform.set) {
        Some(set) => set.uniforms.push(uniform),
        None => sets.push(ResourceSet {
            source_number: uniform.set,
            backend_number: uniform.set,
            uniforms: vec![uniform],
        }),
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum UniformClass {
    UniformBuffer,
    SampledImage,
    SeparateImage,
    SeparateSampler,
}

impl UniformClass {
    // Order of discovery.
    const ALL: [UniformClass; 4] = [
        UniformClass::UniformBuffer,
        UniformClass::SampledImage,
        UniformClass::SeparateImage,
        UniformClass::SeparateSampler,
    ];
}

#[derive(Debug)]
struct Reflector<'m> {
    module: &'m Module,
}

impl<'m> Reflector<'m> {
    fn ty(&self, id: Id) -> ReflectResult<&'m Type> {
        self.module.get_type(id)
            .ok_or_else(|| ReflectError::invalid(format!("unknown type %{}", id)))
    }

    fn strip_arrays(&self, mut id: Id) -> ReflectResult<Id> {
        loop {
            match *self.ty(id)? {
                Type::Array { elem, .. } | Type::RuntimeArray { elem } =>
                    id = elem,
                _ => return Ok(id),
            }
        }
    }

    fn var_name(&self, var: Variable<'_>) -> String {
        var.name().unwrap_or_default().to_owned()
    }

    fn pointee(&self, var: Variable<'_>) -> ReflectResult<Id> {
        var.pointee().ok_or_else(|| ReflectError::invalid(
            format!("variable %{} is not a pointer", var.id())))
    }

    fn is_builtin(&self, var: Variable<'_>) -> bool {
        if var.decorations().builtin { return true; }
        let base = match self.pointee(var).and_then(|id| self.strip_arrays(id)) {
            Ok(base) => base,
            Err(_) => return false,
        };
        match self.module.get_type(base) {
            Some(Type::Struct { members }) => (0..members.len() as u32)
                .any(|i| self.module.member_decorations(base, i).builtin),
            _ => false,
        }
    }

    fn classify(&self, var: Variable<'_>) -> Option<UniformClass> {
        let base = self.pointee(var).and_then(|id| self.strip_arrays(id))
            .ok()?;
        match (var.storage_class(), self.module.get_type(base)?) {
            (spv::StorageClass::Uniform, Type::Struct { .. })
                if self.module.decorations(base).block =>
                Some(UniformClass::UniformBuffer),
            (spv::StorageClass::UniformConstant, Type::SampledImage) =>
                Some(UniformClass::SampledImage),
            (spv::StorageClass::UniformConstant, Type::Image) =>
                Some(UniformClass::SeparateImage),
            (spv::StorageClass::UniformConstant, Type::Sampler) =>
                Some(UniformClass::SeparateSampler),
            _ => None,
        }
    }

    fn stage_variable(&self, var: Variable<'_>) ->
        ReflectResult<ShaderVariable>
    {
        let name = self.var_name(var);
        let location = var.location().ok_or_else(||
            ReflectError::missing(&name, spv::Decoration::Location))?;
        let ty = self.variable_type(self.pointee(var)?, 0)?;
        trace!("reflected {:?} `{}` at location {}",
            var.storage_class(), name, location);
        Ok(ShaderVariable {
            id: var.id(),
            name,
            source_location: location,
            backend_location: location,
            ty,
        })
    }

    fn uniform(&self, var: Variable<'_>) -> ReflectResult<ShaderUniform> {
        let pointee = self.pointee(var)?;
        let name = var.name()
            .or_else(|| self.module.name(self.strip_arrays(pointee).ok()?))
            .unwrap_or_default()
            .to_owned();
        let binding = var.binding().ok_or_else(||
            ReflectError::missing(&name, spv::Decoration::Binding))?;
        let set = var.set().ok_or_else(||
            ReflectError::missing(&name, spv::Decoration::DescriptorSet))?;
        let ty = self.variable_type(pointee, 0)?;
        Ok(ShaderUniform {
            id: var.id(),
            name,
            source_binding: binding,
            backend_binding: binding,
            ty: Arc::new(ty),
            set,
        })
    }

    /// Array extents of a type, outermost first.
    fn array_sizes(&self, mut id: Id) -> ReflectResult<Vec<u32>> {
        let mut sizes = Vec::new();
        loop {
            match *self.ty(id)? {
                Type::Array { elem, length } => {
                    let len = self.module.constant(length)
                        .ok_or_else(|| ReflectError::UnsupportedType(
                            format!("array length %{} is not a constant",
                                length)))?;
                    let len = u32::try_from(len).map_err(|_|
                        ReflectError::UnsupportedType(format!(
                            "array length {} exceeds 32 bits", len)))?;
                    sizes.push(len);
                    id = elem;
                },
                Type::RuntimeArray { .. } => return Err(
                    ReflectError::UnsupportedType("runtime array".to_owned())),
                _ => return Ok(sizes),
            }
        }
    }

    fn scalar(&self, id: Id) -> ReflectResult<ScalarKind> {
        let ty = self.ty(id)?;
        let scalar = match *ty {
            Type::Int { width, signed } => ScalarKind::int(width, signed),
            Type::Float { width } => ScalarKind::float(width),
            _ => None,
        };
        scalar.ok_or_else(|| ReflectError::UnsupportedType(format!("{:?}", ty)))
    }

    fn numeric(&self, id: Id) -> ReflectResult<Option<NumericType>> {
        Ok(Some(match *self.ty(id)? {
            Type::Int { .. } | Type::Float { .. } | Type::Bool =>
                NumericType::new(self.scalar(id)?, Shape::Scalar),
            Type::Vector { component, count } =>
                NumericType::new(self.scalar(component)?, Shape::Vector(count)),
            Type::Matrix { column, count } => match *self.ty(column)? {
                Type::Vector { component, count: rows } => NumericType::new(
                    self.scalar(component)?,
                    Shape::Matrix { columns: count, rows },
                ),
                _ => return Err(ReflectError::invalid(
                    "matrix column is not a vector")),
            },
            _ => return Ok(None),
        }))
    }

    /// Builds the type of a variable or member whose storage begins at
    /// `base_offset` within the root variable.
    fn variable_type(&self, id: Id, base_offset: u32) ->
        ReflectResult<ShaderVariableType>
    {
        let array_sizes = self.array_sizes(id)?;
        let base = self.strip_arrays(id)?;
        let name = self.module.name(base).unwrap_or_default();

        if let Some(numeric) = self.numeric(base)? {
            return ShaderVariableType::numeric(name, numeric, array_sizes)
                .ok_or_else(|| too_large(name));
        }

        let ty = match self.ty(base)? {
            Type::Image => ShaderVariableType::opaque(
                name, BaseKind::Image, array_sizes),
            Type::Sampler => ShaderVariableType::opaque(
                name, BaseKind::Sampler, array_sizes),
            Type::SampledImage => ShaderVariableType::opaque(
                name, BaseKind::SampledImage, array_sizes),
            Type::Struct { members } if !members.is_empty() => {
                let members = self.struct_members(base, members, base_offset)?;
                let size = match members.last() {
                    Some(m) => end_of(m).ok_or_else(|| too_large(name))?,
                    None => 0,
                };
                ShaderVariableType::structure(
                    name, members, array_sizes, size)
            },
            other => return Err(
                ReflectError::UnsupportedType(format!("{:?}", other))),
        };
        ty.ok_or_else(|| too_large(name))
    }

    fn struct_members(&self, id: Id, members: &[Id], base_offset: u32) ->
        ReflectResult<Vec<StructMember>>
    {
        let mut result: Vec<StructMember> = Vec::with_capacity(members.len());
        for (i, &member_id) in members.iter().enumerate() {
            let index = i as u32;
            let decos = self.module.member_decorations(id, index);

            // Without an explicit offset, pack tightly after the previous
            // member.
            let name = self.module.member_name(id, index)
                .unwrap_or_default().to_owned();
            let member_offset = match (decos.offset, result.last()) {
                (Some(offset), _) => offset,
                (None, Some(prev)) =>
                    end_of(prev).ok_or_else(|| too_large(&name))?,
                (None, None) => 0,
            };
            let offset = base_offset.checked_add(member_offset)
                .ok_or_else(|| too_large(&name))?;
            let ty = self.variable_type(member_id, offset)?;

            let declared = self.declared_size(member_id, &ty, &decos)
                .ok_or_else(|| too_large(&name))?;
            let stride = match ty.element_count() {
                0 => 0,
                n => declared / n,
            };

            result.push(StructMember {
                name,
                ty,
                member_offset,
                offset,
                stride,
                row_major: decos.row_major,
            });
        }
        Ok(result)
    }

    // The size a member occupies according to layout decorations, which
    // may exceed its tightly packed size.
    fn declared_size(
        &self,
        id: Id,
        ty: &ShaderVariableType,
        decos: &crate::data::MemberDecorationSet,
    ) -> Option<u32> {
        if let Some(&outer) = ty.array_sizes.first() {
            return match self.module.decorations(id).array_stride {
                Some(stride) => stride.checked_mul(outer),
                None => Some(ty.size),
            };
        }
        match (ty.numeric, decos.matrix_stride) {
            (Some(NumericType {
                shape: Shape::Matrix { columns, rows }, ..
            }), Some(stride)) => {
                let vectors = if decos.row_major { rows } else { columns };
                stride.checked_mul(vectors)
            },
            _ => Some(ty.size),
        }
    }
}

fn end_of(member: &StructMember) -> Option<u32> {
    member.member_offset.checked_add(member.declared_size())
}

fn too_large(name: &str) -> ReflectError {
    ReflectError::UnsupportedType(format!("`{}` exceeds 32-bit size", name))
}
