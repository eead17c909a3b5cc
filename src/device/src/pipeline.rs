use std::sync::Arc;

use crate::*;

/// Scalar type of a vertex attribute component.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AttributeFormat {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AttributeDimension {
    Vec1 = 1,
    Vec2 = 2,
    Vec3 = 3,
    Vec4 = 4,
}

impl AttributeDimension {
    pub fn components(self) -> u32 {
        self as u32
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Attribute {
    pub location: AttributeRef,
    pub format: AttributeFormat,
    pub dimension: AttributeDimension,
    /// Byte offset within a vertex.
    pub offset: u32,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VertexBinding {
    pub stride: u32,
    pub attributes: Vec<Attribute>,
}

#[derive(Clone, Debug)]
pub struct PipelineInit {
    pub layout: Arc<ResourceLayout>,
    /// Vertex buffers, numbered by position.
    pub vertex_bindings: Vec<VertexBinding>,
}

impl PipelineInit {
    pub fn new(layout: Arc<ResourceLayout>) -> Self {
        Self { layout, vertex_bindings: Vec::new() }
    }

    pub fn with_binding(mut self, binding: VertexBinding) -> Self {
        self.vertex_bindings.push(binding);
        self
    }

    /// Checks that both stages are present and that attributes fit
    /// within their vertex.
    pub(crate) fn validate(&self) -> DeviceResult<()> {
        self.layout.vertex_shader()?;
        self.layout.fragment_shader()?;
        for (i, binding) in self.vertex_bindings.iter().enumerate() {
            for attr in binding.attributes.iter() {
                self.layout.attribute_by_location(
                    attr.location.source_location)?;
                let size = attribute_size(attr.format, attr.dimension);
                if attr.offset.saturating_add(size) > binding.stride {
                    return Err(err_msg!(
                        "attribute at location {} overruns vertex binding {}",
                        attr.location.source_location, i,
                    ));
                }
            }
        }
        Ok(())
    }
}

pub fn attribute_size(format: AttributeFormat, dimension: AttributeDimension)
    -> u32
{
    use AttributeFormat::*;
    let scalar = match format {
        I8 | U8 => 1,
        I16 | U16 => 2,
        I32 | U32 | F32 => 4,
        I64 | U64 | F64 => 8,
    };
    scalar * dimension.components()
}

/// A graphics pipeline and its backend description.
#[derive(Debug)]
pub struct Pipeline<B: GraphicsBackend> {
    layout: Arc<ResourceLayout>,
    vertex_bindings: Vec<VertexBinding>,
    native: B::Pipeline,
}

impl<B: GraphicsBackend> Pipeline<B> {
    pub(crate) fn new(init: &PipelineInit, native: B::Pipeline) -> Self {
        Self {
            layout: Arc::clone(&init.layout),
            vertex_bindings: init.vertex_bindings.clone(),
            native,
        }
    }

    pub fn layout(&self) -> &Arc<ResourceLayout> {
        &self.layout
    }

    pub fn vertex_bindings(&self) -> &[VertexBinding] {
        &self.vertex_bindings
    }

    pub fn native(&self) -> &B::Pipeline {
        &self.native
    }
}
