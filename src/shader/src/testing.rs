//! Stand-in compiler collaborators and sample modules for tests.

use std::sync::Arc;

use fnv::FnvHashMap as HashMap;
use parking_lot::Mutex;
use spv::testing::ModuleBuilder;
use spv::{Decoration, ExecutionModel, StorageClass};

use crate::*;

// layout(location = 0) in vec3 in_pos;
// layout(location = 1) in vec2 in_texcoord;
// layout(location = 0) out vec2 out_texcoord;
// layout(set = 0, binding = 0) uniform Transform { mat4 model; } transform;
pub fn vertex_words() -> Vec<u32> {
    let mut b = ModuleBuilder::new();
    let float = b.type_float(32);
    let vec2 = b.type_vector(float, 2);
    let vec3 = b.type_vector(float, 3);
    let vec4 = b.type_vector(float, 4);
    let mat4 = b.type_matrix(vec4, 4);

    let block = b.type_struct(&[mat4]);
    b.name(block, "Transform");
    b.member_name(block, 0, "model");
    b.decorate(block, Decoration::Block, &[]);
    b.member_decorate(block, 0, Decoration::Offset, &[0]);
    b.member_decorate(block, 0, Decoration::MatrixStride, &[16]);
    let block_ptr = b.type_pointer(StorageClass::Uniform, block);
    let transform = b.variable(block_ptr, StorageClass::Uniform);
    b.name(transform, "transform");
    b.decorate(transform, Decoration::DescriptorSet, &[0]);
    b.decorate(transform, Decoration::Binding, &[0]);

    let in_vec3 = b.type_pointer(StorageClass::Input, vec3);
    let in_pos = b.variable(in_vec3, StorageClass::Input);
    b.name(in_pos, "in_pos");
    b.decorate(in_pos, Decoration::Location, &[0]);
    let in_vec2 = b.type_pointer(StorageClass::Input, vec2);
    let in_texcoord = b.variable(in_vec2, StorageClass::Input);
    b.name(in_texcoord, "in_texcoord");
    b.decorate(in_texcoord, Decoration::Location, &[1]);
    let out_vec2 = b.type_pointer(StorageClass::Output, vec2);
    let out_texcoord = b.variable(out_vec2, StorageClass::Output);
    b.name(out_texcoord, "out_texcoord");
    b.decorate(out_texcoord, Decoration::Location, &[0]);

    b.entry_point(ExecutionModel::Vertex, "main",
        &[in_pos, in_texcoord, out_texcoord]);
    b.finish()
}

// layout(location = 0) in vec2 in_texcoord;
// layout(location = 0) out vec4 out_color;
// layout(set = 0, binding = 0) uniform Material { vec4 tint; } material;
// layout(set = 0, binding = 1) uniform sampler2D albedo;
pub fn fragment_words() -> Vec<u32> {
    let mut b = ModuleBuilder::new();
    let float = b.type_float(32);
    let vec2 = b.type_vector(float, 2);
    let vec4 = b.type_vector(float, 4);

    let block = b.type_struct(&[vec4]);
    b.name(block, "Material");
    b.member_name(block, 0, "tint");
    b.decorate(block, Decoration::Block, &[]);
    b.member_decorate(block, 0, Decoration::Offset, &[0]);
    let block_ptr = b.type_pointer(StorageClass::Uniform, block);
    let material = b.variable(block_ptr, StorageClass::Uniform);
    b.name(material, "material");
    b.decorate(material, Decoration::DescriptorSet, &[0]);
    b.decorate(material, Decoration::Binding, &[0]);

    let image = b.type_image(float);
    let sampled = b.type_sampled_image(image);
    let sampled_ptr = b.type_pointer(StorageClass::UniformConstant, sampled);
    let albedo = b.variable(sampled_ptr, StorageClass::UniformConstant);
    b.name(albedo, "albedo");
    b.decorate(albedo, Decoration::DescriptorSet, &[0]);
    b.decorate(albedo, Decoration::Binding, &[1]);

    let in_vec2 = b.type_pointer(StorageClass::Input, vec2);
    let in_texcoord = b.variable(in_vec2, StorageClass::Input);
    b.name(in_texcoord, "in_texcoord");
    b.decorate(in_texcoord, Decoration::Location, &[0]);
    let out_vec4 = b.type_pointer(StorageClass::Output, vec4);
    let out_color = b.variable(out_vec4, StorageClass::Output);
    b.name(out_color, "out_color");
    b.decorate(out_color, Decoration::Location, &[0]);

    b.entry_point(ExecutionModel::Fragment, "main",
        &[in_texcoord, out_color]);
    b.finish()
}

#[derive(Debug, Default)]
struct SourceState {
    sources: Vec<String>,
    options: Option<CompileOptions>,
}

/// Returns fixed SPIR-V for any source, or a fixed diagnostic.
#[derive(Clone, Debug)]
pub struct FakeSourceCompiler {
    output: Result<Vec<u32>, CompileError>,
    state: Arc<Mutex<SourceState>>,
}

impl FakeSourceCompiler {
    pub fn new(words: Vec<u32>) -> Self {
        Self { output: Ok(words), state: Default::default() }
    }

    pub fn failing(diagnostic: &str) -> Self {
        Self {
            output: Err(CompileError::new(diagnostic)),
            state: Default::default(),
        }
    }

    pub fn sources(&self) -> Vec<String> {
        self.state.lock().sources.clone()
    }

    pub fn last_options(&self) -> Option<CompileOptions> {
        self.state.lock().options
    }
}

impl SourceCompiler for FakeSourceCompiler {
    fn compile_glsl(
        &self,
        source: &str,
        _info: &ShaderInfo,
        options: &CompileOptions,
    ) -> Result<Vec<u32>, CompileError> {
        let mut state = self.state.lock();
        state.sources.push(source.to_owned());
        state.options = Some(*options);
        self.output.clone()
    }
}

/// Renames the entry point and assigns bindings from a fixed table.
#[derive(Clone, Debug)]
pub struct FakeCrossCompiler {
    entry_point: String,
    bindings: HashMap<spv::Id, u32>,
}

impl FakeCrossCompiler {
    pub fn new(entry_point: &str) -> Self {
        Self {
            entry_point: entry_point.to_owned(),
            bindings: Default::default(),
        }
    }

    pub fn bind(mut self, id: spv::Id, binding: u32) -> Self {
        self.bindings.insert(id, binding);
        self
    }
}

impl CrossCompiler for FakeCrossCompiler {
    fn translate(&self, _words: &[u32], _info: &ShaderInfo) ->
        Result<Translation, CompileError>
    {
        Ok(Translation {
            code: format!("// translated {}", self.entry_point).into_bytes(),
            entry_point: self.entry_point.clone(),
            resource_bindings: self.bindings.clone(),
            locations: Default::default(),
        })
    }
}
