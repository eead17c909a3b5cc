//! Translation into Metal argument tables and vertex descriptors.

use fnv::FnvHashMap as HashMap;
use log::{debug, trace};
use shader::{Backend, ShaderKind};
use smallvec::smallvec;
use spv::BaseKind;

use crate::*;

#[derive(Clone, Copy, Debug, Default)]
pub struct Metal;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ArgumentKind {
    Buffer,
    Texture,
    Sampler,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ArgumentDescriptor {
    pub index: u32,
    pub kind: ArgumentKind,
    pub array_length: u32,
}

/// Arguments of one set as seen by one stage.
#[derive(Clone, Debug)]
pub struct ArgumentTable {
    pub stage: StageId,
    pub kind: ShaderKind,
    pub function: String,
    /// Sorted by index.
    pub arguments: Vec<ArgumentDescriptor>,
    // Source binding to this stage's first argument index.
    indices: HashMap<u32, u32>,
    bound: Vec<HashMap<u32, ResourceId>>,
}

impl ArgumentTable {
    /// The argument index this stage's function reads `source_binding`
    /// from.
    pub fn index_of(&self, source_binding: u32) -> Option<u32> {
        self.indices.get(&source_binding).copied()
    }

    fn first_index(&self, binding: &ResourceBindingRef) -> DeviceResult<u32> {
        self.index_of(binding.source_binding).ok_or_else(|| err_msg!(
            "`{}` has no argument for binding {}", self.function,
            binding.source_binding))
    }

    /// The resource encoded at `index` for `frame`.
    pub fn bound(&self, frame: u32, index: u32) -> Option<ResourceId> {
        self.bound.get(frame as usize)?.get(&index).copied()
    }

    fn encode(&mut self, index: u32, id: ResourceId) {
        trace!("`{}`: argument {} -> {:?}", self.function, index, id);
        for frame in self.bound.iter_mut() {
            frame.insert(index, id);
        }
    }
}

#[derive(Clone, Debug)]
pub struct MetalResourceSet {
    pub set: u32,
    /// One table per stage using the set, in stage order.
    pub tables: Vec<ArgumentTable>,
}

impl MetalResourceSet {
    pub fn table(&self, kind: ShaderKind) -> Option<&ArgumentTable> {
        self.tables.iter().find(|table| table.kind == kind)
    }

    fn tables_for<'a>(&'a mut self, binding: &'a ResourceBindingRef) ->
        impl Iterator<Item = &'a mut ArgumentTable> + 'a
    {
        self.tables.iter_mut().filter(move |table| binding.used_by(table.stage))
    }
}

/// `MTLVertexFormat` values for 32-bit components.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum VertexFormat {
    Float,
    Float2,
    Float3,
    Float4,
    Int,
    Int2,
    Int3,
    Int4,
    UInt,
    UInt2,
    UInt3,
    UInt4,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MetalVertexAttribute {
    pub index: u32,
    pub format: VertexFormat,
    pub offset: u32,
    pub buffer_index: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MetalVertexLayout {
    pub buffer_index: u32,
    pub stride: u32,
}

#[derive(Clone, Debug)]
pub struct MetalPipeline {
    pub vertex_function: String,
    pub fragment_function: String,
    pub vertex_attributes: Vec<MetalVertexAttribute>,
    pub vertex_layouts: Vec<MetalVertexLayout>,
    /// First buffer index after the vertex stage's argument buffers.
    pub vertex_buffer_index_offset: u32,
}

/// Arguments occupied by a binding starting at `index`. A combined image
/// sampler takes the texture index and the sampler index after it.
pub fn arguments(binding: &ResourceBindingRef, index: u32) ->
    DeviceResult<SmallVec<ArgumentDescriptor, 2>>
{
    let array_length = descriptor_count(&binding.ty);
    let arg = |index, kind| ArgumentDescriptor { index, kind, array_length };
    Ok(match binding.ty.base_kind {
        BaseKind::Struct => smallvec![arg(index, ArgumentKind::Buffer)],
        BaseKind::Image => smallvec![arg(index, ArgumentKind::Texture)],
        BaseKind::Sampler => smallvec![arg(index, ArgumentKind::Sampler)],
        BaseKind::SampledImage => smallvec![
            arg(index, ArgumentKind::Texture),
            arg(index + 1, ArgumentKind::Sampler),
        ],
        BaseKind::Numeric => return Err(err_msg!(
            "`{}`: numeric uniforms have no argument type", binding.ty.name)),
    })
}

pub fn mtl_vertex_format(
    format: AttributeFormat,
    dimension: AttributeDimension,
) -> DeviceResult<VertexFormat> {
    use AttributeDimension::*;
    use AttributeFormat::*;
    use VertexFormat as V;
    Ok(match (format, dimension) {
        (F32, Vec1) => V::Float,
        (F32, Vec2) => V::Float2,
        (F32, Vec3) => V::Float3,
        (F32, Vec4) => V::Float4,
        (I32, Vec1) => V::Int,
        (I32, Vec2) => V::Int2,
        (I32, Vec3) => V::Int3,
        (I32, Vec4) => V::Int4,
        (U32, Vec1) => V::UInt,
        (U32, Vec2) => V::UInt2,
        (U32, Vec3) => V::UInt3,
        (U32, Vec4) => V::UInt4,
        _ => return Err(err_msg!("unsupported vertex format {:?}", format)),
    })
}

/// The argument index `stage` was compiled with for `binding`. Stages are
/// cross-compiled separately, so a shared binding may sit at a different
/// index in each.
pub fn stage_argument_index(
    layout: &ResourceLayout,
    stage: StageId,
    set: &ResourceSetRef,
    binding: &ResourceBindingRef,
) -> DeviceResult<u32> {
    let shader = layout.stage(stage);
    shader.resources().resource_set(set.source_number)
        .and_then(|res| res.uniform_by_binding(binding.source_binding))
        .map(|uniform| uniform.backend_binding)
        .ok_or_else(|| err_msg!("`{}` does not declare set {} binding {}",
            shader.entry_point(), set.source_number, binding.source_binding))
}

/// Argument buffers of the vertex stage come first in its buffer table.
pub fn vertex_buffer_index_offset(layout: &ResourceLayout) -> u32 {
    let vertex = match layout.stage_id_by_kind(ShaderKind::Vertex) {
        Ok(id) => id,
        Err(_) => return 0,
    };
    layout.resource_sets().iter()
        .filter(|set| set.used_by(vertex))
        .map(|set| set.backend_number + 1)
        .max()
        .unwrap_or(0)
}

impl GraphicsBackend for Metal {
    type ResourceSet = MetalResourceSet;
    type Pipeline = MetalPipeline;

    fn backend() -> Backend {
        Backend::Metal
    }

    fn check_layout(&self, layout: &ResourceLayout) -> DeviceResult<()> {
        for set in layout.resource_sets().iter() {
            for res in set.resources.iter() {
                arguments(res, res.backend_binding)?;
            }
        }
        Ok(())
    }

    fn create_resource_set(
        &self,
        layout: &ResourceLayout,
        set: &ResourceSetRef,
        frames_in_flight: u32,
    ) -> DeviceResult<MetalResourceSet> {
        let mut tables = Vec::new();
        for id in layout.stage_ids().filter(|&id| set.used_by(id)) {
            let stage = layout.stage(id);
            let mut args = Vec::new();
            let mut indices = HashMap::default();
            for res in set.resources.iter().filter(|res| res.used_by(id)) {
                let index = stage_argument_index(layout, id, set, res)?;
                indices.insert(res.source_binding, index);
                args.extend(arguments(res, index)?);
            }
            args.sort_by_key(|arg| arg.index);
            debug!("set {}: {} arguments for `{}`", set.backend_number,
                args.len(), stage.entry_point());
            tables.push(ArgumentTable {
                stage: id,
                kind: stage.kind(),
                function: stage.entry_point().to_owned(),
                arguments: args,
                indices,
                bound: vec![HashMap::default(); frames_in_flight as usize],
            });
        }
        Ok(MetalResourceSet { set: set.backend_number, tables })
    }

    fn write_uniform_buffer(
        &self,
        native: &mut MetalResourceSet,
        _layout: &ResourceLayout,
        binding: &ResourceBindingRef,
        buffer: &UniformBuffer,
    ) -> DeviceResult<()> {
        if binding.ty.base_kind != BaseKind::Struct {
            return Err(err_msg!("binding {} is not a buffer",
                binding.source_binding));
        }
        for table in native.tables_for(binding) {
            let index = table.first_index(binding)?;
            table.encode(index, buffer.id());
        }
        Ok(())
    }

    fn write_sampled_image(
        &self,
        native: &mut MetalResourceSet,
        _layout: &ResourceLayout,
        binding: &ResourceBindingRef,
        image: &Image,
        sampler: &Sampler,
    ) -> DeviceResult<()> {
        if binding.ty.base_kind != BaseKind::SampledImage {
            return Err(err_msg!("binding {} is not a sampled image",
                binding.source_binding));
        }
        for table in native.tables_for(binding) {
            let index = table.first_index(binding)?;
            table.encode(index, image.id());
            table.encode(index + 1, sampler.id());
        }
        Ok(())
    }

    fn create_pipeline(&self, init: &PipelineInit) ->
        DeviceResult<MetalPipeline>
    {
        let layout = &init.layout;
        let offset = vertex_buffer_index_offset(layout);

        let mut vertex_attributes = Vec::new();
        let mut vertex_layouts = Vec::new();
        for (i, binding) in init.vertex_bindings.iter().enumerate() {
            let buffer_index = offset + i as u32;
            vertex_layouts.push(MetalVertexLayout {
                buffer_index,
                stride: binding.stride,
            });
            for attr in binding.attributes.iter() {
                vertex_attributes.push(MetalVertexAttribute {
                    index: attr.location.backend_location,
                    format: mtl_vertex_format(attr.format, attr.dimension)?,
                    offset: attr.offset,
                    buffer_index,
                });
            }
        }

        Ok(MetalPipeline {
            vertex_function: layout.vertex_shader()?.entry_point().to_owned(),
            fragment_function:
                layout.fragment_shader()?.entry_point().to_owned(),
            vertex_attributes,
            vertex_layouts,
            vertex_buffer_index_offset: offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use shader::testing::*;

    use super::*;
    use crate::testing::*;

    fn metal_layout() -> Arc<ResourceLayout> {
        Arc::new(ResourceLayout::new(vec![
            metal_shader(vertex_words(), ShaderKind::Vertex, 0),
            metal_shader(fragment_words(), ShaderKind::Fragment, 2),
        ]))
    }

    #[test]
    fn argument_tables() {
        init();
        let layout = metal_layout();
        let set = layout.resource_set_by_number(0).unwrap();
        let native = Metal.create_resource_set(&layout, set, 2).unwrap();
        assert_eq!(native.tables.len(), 2);

        let vert = native.table(ShaderKind::Vertex).unwrap();
        assert_eq!(vert.function, "main0");
        assert_eq!(vert.arguments, vec![ArgumentDescriptor {
            index: 0,
            kind: ArgumentKind::Buffer,
            array_length: 1,
        }]);

        // Each stage reads the shared binding at its own index.
        let frag = native.table(ShaderKind::Fragment).unwrap();
        let kinds: Vec<_> = frag.arguments.iter()
            .map(|arg| (arg.index, arg.kind))
            .collect();
        assert_eq!(kinds, vec![
            (2, ArgumentKind::Buffer),
            (3, ArgumentKind::Texture),
            (4, ArgumentKind::Sampler),
        ]);
        assert_eq!(vert.index_of(0), Some(0));
        assert_eq!(frag.index_of(0), Some(2));
        assert_eq!(vert.index_of(1), None);
    }

    #[test]
    fn shared_uniform_indices() {
        init();
        let layout = metal_layout();
        let set = layout.resource_set_by_number(0).unwrap();
        let mut native = Metal.create_resource_set(&layout, set, 2).unwrap();

        let binding = set.resource_by_binding(0).unwrap();
        assert_eq!(binding.backend_binding, 0);
        let frag = layout.stage_id_by_kind(ShaderKind::Fragment).unwrap();
        assert_eq!(stage_argument_index(&layout, frag, set, binding).unwrap(),
            2);

        let ty = Arc::clone(&binding.ty);
        let frames = Arc::new(FrameCounter::new(2));
        let buffer = UniformBuffer::new(ResourceId(9), ty, frames).unwrap();
        Metal.write_uniform_buffer(&mut native, &layout, binding, &buffer)
            .unwrap();

        let vert = native.table(ShaderKind::Vertex).unwrap();
        let frag = native.table(ShaderKind::Fragment).unwrap();
        for frame in 0..2 {
            assert_eq!(vert.bound(frame, 0), Some(ResourceId(9)));
            assert_eq!(frag.bound(frame, 2), Some(ResourceId(9)));
            assert_eq!(frag.bound(frame, 0), None);
        }
    }

    #[test]
    fn writes_follow_stages() {
        init();
        let layout = metal_layout();
        let set = layout.resource_set_by_number(0).unwrap();
        let mut native = Metal.create_resource_set(&layout, set, 2).unwrap();

        let binding = set.resource_by_binding(1).unwrap();
        let image = Image::new(ResourceId(5), 1, 1, ImageFormat::Rgba8Srgb)
            .unwrap();
        let sampler = Sampler::new(ResourceId(6), Default::default()).unwrap();
        Metal.write_sampled_image(&mut native, &layout, binding, &image,
            &sampler).unwrap();

        let frag = native.table(ShaderKind::Fragment).unwrap();
        for frame in 0..2 {
            assert_eq!(frag.bound(frame, 3), Some(ResourceId(5)));
            assert_eq!(frag.bound(frame, 4), Some(ResourceId(6)));
        }
        let vert = native.table(ShaderKind::Vertex).unwrap();
        assert_eq!(vert.bound(0, 3), None);
        assert_eq!(vert.bound(0, 4), None);
    }

    #[test]
    fn index_offset() {
        init();
        assert_eq!(vertex_buffer_index_offset(&metal_layout()), 1);
        let frag_only = ResourceLayout::new(vec![
            metal_shader(fragment_words(), ShaderKind::Fragment, 0),
        ]);
        assert_eq!(vertex_buffer_index_offset(&frag_only), 0);
    }

    #[test]
    fn vertex_formats() {
        use AttributeDimension::*;
        use AttributeFormat::*;
        assert_eq!(mtl_vertex_format(F32, Vec2).unwrap(), VertexFormat::Float2);
        assert_eq!(mtl_vertex_format(U32, Vec1).unwrap(), VertexFormat::UInt);
        assert_eq!(mtl_vertex_format(I32, Vec4).unwrap(), VertexFormat::Int4);
        assert!(mtl_vertex_format(I16, Vec2).is_err());
    }
}
