use log::debug;

use crate::*;

/// GLSL front end backed by shaderc.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShadercCompiler;

impl ShadercCompiler {
    pub fn new() -> Self {
        Self
    }
}

fn shader_kind(kind: ShaderKind) -> ::shaderc::ShaderKind {
    match kind {
        ShaderKind::Vertex => ::shaderc::ShaderKind::Vertex,
        ShaderKind::Fragment => ::shaderc::ShaderKind::Fragment,
    }
}

impl SourceCompiler for ShadercCompiler {
    fn compile_glsl(
        &self,
        source: &str,
        info: &ShaderInfo,
        options: &CompileOptions,
    ) -> Result<Vec<u32>, CompileError> {
        // shaderc handles are neither `Send` nor `Sync`, so one is made
        // per compilation.
        let compiler = ::shaderc::Compiler::new()
            .ok_or_else(|| CompileError::new("failed to create shaderc compiler"))?;
        let mut opts = ::shaderc::CompileOptions::new()
            .ok_or_else(|| CompileError::new("failed to create shaderc options"))?;
        opts.set_source_language(::shaderc::SourceLanguage::GLSL);
        opts.set_optimization_level(match options.optimization {
            OptimizationLevel::Zero => ::shaderc::OptimizationLevel::Zero,
            OptimizationLevel::Performance =>
                ::shaderc::OptimizationLevel::Performance,
        });
        if options.debug_info { opts.set_generate_debug_info(); }

        debug!("shaderc: compiling `{}`", info.name);
        let artifact = compiler.compile_into_spirv(
            source,
            shader_kind(info.kind),
            &info.name,
            &info.entry_point,
            Some(&opts),
        ).map_err(|e| CompileError(e.to_string()))?;
        Ok(artifact.as_binary().to_vec())
    }
}
