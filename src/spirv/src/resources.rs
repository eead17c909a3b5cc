use std::sync::Arc;

use crate::{Id, ShaderVariableType};

/// A stage input or output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShaderVariable {
    pub id: Id,
    pub name: String,
    /// Location as written in the shader source.
    pub source_location: u32,
    /// Location after any backend renumbering. Not necessarily equal to
    /// `source_location`.
    pub backend_location: u32,
    pub ty: ShaderVariableType,
}

/// A uniform buffer, image, sampler or combined image sampler.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShaderUniform {
    pub id: Id,
    pub name: String,
    pub source_binding: u32,
    pub backend_binding: u32,
    pub ty: Arc<ShaderVariableType>,
    /// The declared descriptor set number.
    pub set: u32,
}

/// Uniforms sharing one set number within a single stage.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceSet {
    pub source_number: u32,
    pub backend_number: u32,
    /// Uniforms in discovery order.
    pub uniforms: Vec<ShaderUniform>,
}

/// Reflection output for one shader stage.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ShaderResources {
    pub inputs: Vec<ShaderVariable>,
    pub outputs: Vec<ShaderVariable>,
    /// Sorted by ascending `source_number`.
    pub resource_sets: Vec<ResourceSet>,
}

impl ResourceSet {
    pub fn uniform_by_binding(&self, binding: u32) -> Option<&ShaderUniform> {
        self.uniforms.iter().find(|u| u.source_binding == binding)
    }
}

impl ShaderResources {
    pub fn input_by_location(&self, location: u32) -> Option<&ShaderVariable> {
        self.inputs.iter().find(|var| var.source_location == location)
    }

    pub fn input_by_name(&self, name: &str) -> Option<&ShaderVariable> {
        self.inputs.iter().find(|var| var.name == name)
    }

    pub fn resource_set(&self, number: u32) -> Option<&ResourceSet> {
        self.resource_sets.iter().find(|set| set.source_number == number)
    }

    pub fn uniforms(&self) -> impl Iterator<Item = &ShaderUniform> + '_ {
        self.resource_sets.iter().flat_map(|set| set.uniforms.iter())
    }

    pub fn uniforms_mut(&mut self) ->
        impl Iterator<Item = &mut ShaderUniform> + '_
    {
        self.resource_sets.iter_mut().flat_map(|set| set.uniforms.iter_mut())
    }
}
