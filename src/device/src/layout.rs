//! Merging of per-stage reflection data into one pipeline-wide layout.

use std::collections::btree_map::{BTreeMap, Entry};
use std::sync::Arc;

use derive_more::Display;
use log::{debug, warn};
use shader::ShaderKind;
use smallvec::smallvec;

use crate::*;

/// Failure of a lookup into a merged layout.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum LookupError {
    #[display(fmt = "{} not found", _0)]
    NotFound(String),
    /// A name lookup resolved to more than one binding.
    #[display(fmt = "multiple matches for {}", _0)]
    MultipleMatches(String),
}

impl std::error::Error for LookupError {}

pub type LookupResult<T> = Result<T, LookupError>;

fn not_found(what: impl std::fmt::Display) -> LookupError {
    LookupError::NotFound(what.to_string())
}

/// Index of a stage within the layout it came from.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StageId(usize);

impl StageId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct AttributeRef {
    pub source_location: u32,
    pub backend_location: u32,
}

/// One binding in a merged set, shared by every stage that declares it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceBindingRef {
    pub source_binding: u32,
    pub backend_binding: u32,
    /// Type as declared by the first stage.
    pub ty: Arc<spv::ShaderVariableType>,
    /// Declaring stages, in stage order.
    pub stages: SmallVec<StageId, 2>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceSetRef {
    pub source_number: u32,
    pub backend_number: u32,
    /// Sorted by `source_binding`.
    pub resources: Vec<ResourceBindingRef>,
}

impl ResourceBindingRef {
    pub fn used_by(&self, stage: StageId) -> bool {
        self.stages.contains(&stage)
    }
}

impl ResourceSetRef {
    pub fn resource_by_binding(&self, binding: u32) ->
        LookupResult<&ResourceBindingRef>
    {
        self.resources.iter().find(|res| res.source_binding == binding)
            .ok_or_else(|| not_found(format_args!(
                "binding {} in set {}", binding, self.source_number)))
    }

    pub fn used_by(&self, stage: StageId) -> bool {
        self.resources.iter().any(|res| res.used_by(stage))
    }

    /// True if `binding` is one of this set's own bindings, as opposed
    /// to an equal binding taken from another layout.
    pub fn owns(&self, binding: &ResourceBindingRef) -> bool {
        self.resources.iter().any(|res| std::ptr::eq(res, binding))
    }
}

/// The union of the resources declared by a pipeline's stages, keyed by
/// source numbering. Immutable once built.
#[derive(Debug)]
pub struct ResourceLayout {
    stages: Vec<Arc<Shader>>,
    attributes: Vec<AttributeRef>,
    resource_sets: Vec<ResourceSetRef>,
}

type BindingMap = BTreeMap<u32, ResourceBindingRef>;

impl ResourceLayout {
    pub fn new(stages: Vec<Arc<Shader>>) -> Self {
        let mut attributes = Vec::new();
        let mut sets: BTreeMap<u32, (u32, BindingMap)> = BTreeMap::new();

        for (i, stage) in stages.iter().enumerate() {
            let id = StageId(i);
            let resources = stage.resources();

            attributes.extend(resources.inputs.iter().map(|var| AttributeRef {
                source_location: var.source_location,
                backend_location: var.backend_location,
            }));

            for set in resources.resource_sets.iter() {
                let (backend_number, bindings) = sets
                    .entry(set.source_number)
                    .or_insert_with(|| {
                        debug!("set {}: backend set {}",
                            set.source_number, set.backend_number);
                        (set.backend_number, BTreeMap::new())
                    });
                if *backend_number != set.backend_number {
                    warn!(
                        "set {}: stage {} uses backend set {}, keeping {}",
                        set.source_number, i, set.backend_number,
                        backend_number,
                    );
                }
                for uniform in set.uniforms.iter() {
                    merge_uniform(bindings, id, set.source_number, uniform);
                }
            }
        }

        let resource_sets = sets.into_iter()
            .map(|(source_number, (backend_number, bindings))|
                ResourceSetRef {
                    source_number,
                    backend_number,
                    resources: bindings.into_iter().map(|(_, b)| b).collect(),
                })
            .collect();

        Self { stages, attributes, resource_sets }
    }

    pub fn stages(&self) -> &[Arc<Shader>] {
        &self.stages
    }

    pub fn stage(&self, id: StageId) -> &Arc<Shader> {
        &self.stages[id.0]
    }

    pub fn stage_ids(&self) -> impl ExactSizeIterator<Item = StageId> {
        (0..self.stages.len()).map(StageId)
    }

    pub fn attributes(&self) -> &[AttributeRef] {
        &self.attributes
    }

    pub fn resource_sets(&self) -> &[ResourceSetRef] {
        &self.resource_sets
    }

    pub fn shader_by_kind(&self, kind: ShaderKind) -> LookupResult<&Arc<Shader>>
    {
        self.stages.iter().find(|stage| stage.kind() == kind)
            .ok_or_else(|| not_found(format_args!("{:?} stage", kind)))
    }

    pub fn stage_id_by_kind(&self, kind: ShaderKind) -> LookupResult<StageId> {
        self.stages.iter().position(|stage| stage.kind() == kind)
            .map(StageId)
            .ok_or_else(|| not_found(format_args!("{:?} stage", kind)))
    }

    pub fn vertex_shader(&self) -> LookupResult<&Arc<Shader>> {
        self.shader_by_kind(ShaderKind::Vertex)
    }

    pub fn fragment_shader(&self) -> LookupResult<&Arc<Shader>> {
        self.shader_by_kind(ShaderKind::Fragment)
    }

    pub fn attribute_by_location(&self, location: u32) ->
        LookupResult<&AttributeRef>
    {
        self.attributes.iter()
            .find(|attr| attr.source_location == location)
            .ok_or_else(|| not_found(format_args!(
                "attribute at location {}", location)))
    }

    /// Looks up a vertex stage input by name.
    pub fn attribute_by_name(&self, name: &str) -> LookupResult<&AttributeRef>
    {
        let input = self.vertex_shader()?.resources().input_by_name(name)
            .ok_or_else(|| not_found(format_args!("attribute `{}`", name)))?;
        self.attribute_by_location(input.source_location)
    }

    pub fn resource_set_by_number(&self, number: u32) ->
        LookupResult<&ResourceSetRef>
    {
        self.resource_sets.iter()
            .find(|set| set.source_number == number)
            .ok_or_else(|| not_found(format_args!("set {}", number)))
    }

    /// Finds a binding by uniform name. Every stage declaring the name in
    /// this set must agree on its binding.
    pub fn resource_by_name<'a>(&self, set: &'a ResourceSetRef, name: &str)
        -> LookupResult<&'a ResourceBindingRef>
    {
        let mut bindings = self.stages.iter()
            .filter_map(|stage| stage.resources()
                .resource_set(set.source_number))
            .flat_map(|stage_set| stage_set.uniforms.iter())
            .filter(|uniform| uniform.name == name)
            .map(|uniform| uniform.source_binding);

        let binding = bindings.next().ok_or_else(|| not_found(format_args!(
            "uniform `{}` in set {}", name, set.source_number)))?;
        if bindings.any(|other| other != binding) {
            return Err(LookupError::MultipleMatches(format!(
                "uniform `{}` in set {}", name, set.source_number)));
        }

        self.resource_by_binding(set, binding)
    }

    pub fn resource_by_binding<'a>(&self, set: &'a ResourceSetRef, binding: u32)
        -> LookupResult<&'a ResourceBindingRef>
    {
        set.resource_by_binding(binding)
    }

    pub fn binding_stages<'a>(&'a self, binding: &'a ResourceBindingRef) ->
        impl Iterator<Item = &'a Arc<Shader>> + 'a
    {
        binding.stages.iter().map(move |&id| self.stage(id))
    }
}

fn merge_uniform(
    bindings: &mut BindingMap,
    stage: StageId,
    set: u32,
    uniform: &spv::ShaderUniform,
) {
    match bindings.entry(uniform.source_binding) {
        Entry::Vacant(entry) => {
            debug!("set {}: binding {} (`{}`)", set, uniform.source_binding,
                uniform.name);
            entry.insert(ResourceBindingRef {
                source_binding: uniform.source_binding,
                backend_binding: uniform.backend_binding,
                ty: Arc::clone(&uniform.ty),
                stages: smallvec![stage],
            });
        },
        Entry::Occupied(mut entry) => {
            let binding = entry.get_mut();
            if *binding.ty != *uniform.ty {
                warn!(
                    "set {}: binding {} redeclared as `{}` with another type",
                    set, uniform.source_binding, uniform.name,
                );
            }
            if !binding.used_by(stage) {
                binding.stages.push(stage);
            }
        },
    }
}
