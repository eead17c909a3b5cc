use std::sync::Arc;

use shader::testing::*;
use shader::*;
use spv::testing::ModuleBuilder;
use spv::{Decoration, StorageClass};

use crate::*;

pub(crate) fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn info(kind: ShaderKind) -> ShaderInfo {
    ShaderInfo::new(kind, ShaderRepresentation::Spv)
}

pub(crate) fn vulkan_shader(words: Vec<u32>, kind: ShaderKind) -> Arc<Shader>
{
    let intermediate = IntermediateShader::from_words(words, info(kind));
    let binary = ShaderCompiler::default()
        .compile(&intermediate, Backend::Vulkan)
        .unwrap();
    Arc::new(Shader::new(binary))
}

pub(crate) fn vertex_shader() -> Arc<Shader> {
    vulkan_shader(vertex_words(), ShaderKind::Vertex)
}

pub(crate) fn fragment_shader() -> Arc<Shader> {
    vulkan_shader(fragment_words(), ShaderKind::Fragment)
}

/// Compiles for Metal, assigning each uniform the backend binding
/// `source binding + offset` and renaming the entry point to `main0`.
pub(crate) fn metal_shader(words: Vec<u32>, kind: ShaderKind, offset: u32)
    -> Arc<Shader>
{
    let module = spv::parse_words(&words).unwrap();
    let mut cross = FakeCrossCompiler::new("main0");
    for var in module.variables() {
        if let Some(binding) = var.binding() {
            cross = cross.bind(var.id(), binding + offset);
        }
    }
    let intermediate = IntermediateShader::from_words(words, info(kind));
    let binary = ShaderCompiler::default()
        .with_cross_compiler(cross)
        .compile(&intermediate, Backend::Metal)
        .unwrap();
    Arc::new(Shader::new(binary))
}

/// A stage declaring one `uniform Block { vecN value; }` per entry of
/// `uniforms`, given as `(name, set, binding)`.
pub(crate) fn uniform_words(
    kind: ShaderKind,
    components: u32,
    uniforms: &[(&str, u32, u32)],
) -> Vec<u32> {
    let mut b = ModuleBuilder::new();
    let float = b.type_float(32);
    let value = if components > 1 {
        b.type_vector(float, components)
    } else {
        float
    };
    let block = b.type_struct(&[value]);
    b.name(block, "Block");
    b.member_name(block, 0, "value");
    b.decorate(block, Decoration::Block, &[]);
    b.member_decorate(block, 0, Decoration::Offset, &[0]);
    let ptr = b.type_pointer(StorageClass::Uniform, block);

    for &(name, set, binding) in uniforms.iter() {
        let var = b.variable(ptr, StorageClass::Uniform);
        b.name(var, name);
        b.decorate(var, Decoration::DescriptorSet, &[set]);
        b.decorate(var, Decoration::Binding, &[binding]);
    }

    b.entry_point(kind.execution_model(), "main", &[]);
    b.finish()
}

pub(crate) fn uniform_stage(
    kind: ShaderKind,
    components: u32,
    uniforms: &[(&str, u32, u32)],
) -> Arc<Shader> {
    vulkan_shader(uniform_words(kind, components, uniforms), kind)
}

pub(crate) fn basic_layout() -> Arc<ResourceLayout> {
    Arc::new(ResourceLayout::new(vec![vertex_shader(), fragment_shader()]))
}
