use fnv::FnvHashMap as HashMap;
use log::{debug, trace};

use crate::*;

/// Compiles shading-language source into SPIR-V.
pub trait SourceCompiler: std::fmt::Debug + Send + Sync {
    fn compile_glsl(
        &self,
        source: &str,
        info: &ShaderInfo,
        options: &CompileOptions,
    ) -> Result<Vec<u32>, CompileError>;
}

/// Translates SPIR-V into a backend's native shading language.
pub trait CrossCompiler: std::fmt::Debug + Send + Sync {
    fn translate(&self, words: &[u32], info: &ShaderInfo) ->
        Result<Translation, CompileError>;
}

/// Output of a cross-compiler.
#[derive(Clone, Debug, Default)]
pub struct Translation {
    pub code: Vec<u8>,
    /// The entry point name in the translated code, which may differ
    /// from the source entry point.
    pub entry_point: String,
    /// Backend binding assigned to each uniform, by variable id.
    pub resource_bindings: HashMap<spv::Id, u32>,
    /// Backend locations of stage variables that were renumbered.
    pub locations: HashMap<spv::Id, u32>,
}

/// Compiles shaders for a particular backend, running reflection on
/// the result.
#[derive(Debug, Default)]
pub struct ShaderCompiler {
    options: CompileOptions,
    source: Option<Box<dyn SourceCompiler>>,
    cross: Option<Box<dyn CrossCompiler>>,
}

impl ShaderCompiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options, source: None, cross: None }
    }

    pub fn with_source_compiler(
        mut self,
        compiler: impl SourceCompiler + 'static,
    ) -> Self {
        self.source = Some(Box::new(compiler));
        self
    }

    pub fn with_cross_compiler(
        mut self,
        compiler: impl CrossCompiler + 'static,
    ) -> Self {
        self.cross = Some(Box::new(compiler));
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn intermediate(&self, data: &[u8], info: ShaderInfo) ->
        ShaderResult<IntermediateShader>
    {
        IntermediateShader::from(data, info, self.source.as_deref(),
            &self.options)
    }

    pub fn compile_source(
        &self,
        text: &str,
        info: ShaderInfo,
        backend: Backend,
    ) -> ShaderResult<ShaderBinary> {
        self.compile_bytes(text.as_bytes(), info, backend)
    }

    pub fn compile_bytes(
        &self,
        data: &[u8],
        info: ShaderInfo,
        backend: Backend,
    ) -> ShaderResult<ShaderBinary> {
        let intermediate = self.intermediate(data, info)?;
        self.compile(&intermediate, backend)
    }

    pub fn compile(
        &self,
        intermediate: &IntermediateShader,
        backend: Backend,
    ) -> ShaderResult<ShaderBinary> {
        debug!("compiling shader `{}` for {:?}",
            intermediate.info().name, backend);
        match backend {
            Backend::Vulkan => self.compile_vulkan(intermediate),
            Backend::Metal => self.compile_metal(intermediate),
        }
    }

    fn compile_vulkan(&self, intermediate: &IntermediateShader) ->
        ShaderResult<ShaderBinary>
    {
        let resources = intermediate.reflect()?;
        Ok(ShaderBinary::new(
            intermediate.to_bytes(),
            intermediate.info().clone(),
            resources,
            Backend::Vulkan,
        ))
    }

    fn compile_metal(&self, intermediate: &IntermediateShader) ->
        ShaderResult<ShaderBinary>
    {
        let cross = self.cross.as_ref()
            .ok_or(ShaderError::MissingCollaborator("cross-compiler"))?;
        let translation =
            cross.translate(intermediate.words(), intermediate.info())?;

        // Reflection describes the source numbering; the backend's
        // numbering comes from the translation.
        let mut resources = intermediate.reflect()?;
        for uniform in resources.uniforms_mut() {
            let binding = translation.resource_bindings.get(&uniform.id)
                .ok_or_else(|| ShaderError::MissingBackendBinding(
                    uniform.name.clone()))?;
            trace!("`{}`: binding {} -> {}",
                uniform.name, uniform.source_binding, binding);
            uniform.backend_binding = *binding;
        }
        for var in resources.inputs.iter_mut()
            .chain(resources.outputs.iter_mut())
        {
            if let Some(&location) = translation.locations.get(&var.id) {
                var.backend_location = location;
            }
        }

        let mut info = intermediate.info().clone();
        info.entry_point = translation.entry_point;
        Ok(ShaderBinary::new(translation.code, info, resources,
            Backend::Metal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn spv_info(kind: ShaderKind) -> ShaderInfo {
        ShaderInfo::new(kind, ShaderRepresentation::Spv)
    }

    #[test]
    fn vulkan_is_identity() {
        init();
        let compiler = ShaderCompiler::default();
        let bytes = bytes_from_words(&vertex_words());
        let binary = compiler
            .compile_bytes(&bytes, spv_info(ShaderKind::Vertex), Backend::Vulkan)
            .unwrap();
        assert_eq!(binary.data(), &bytes[..]);
        assert_eq!(binary.backend(), Backend::Vulkan);
        assert_eq!(binary.info().entry_point, "main");
        assert_eq!(binary.words().unwrap(), vertex_words());

        let res = binary.resources();
        assert_eq!(res.inputs.len(), 2);
        let uniform = &res.resource_sets[0].uniforms[0];
        assert_eq!(uniform.source_binding, uniform.backend_binding);
    }

    #[test]
    fn metal_renumbers_and_renames() {
        init();
        let module = spv::parse_words(&fragment_words()).unwrap();
        let ids: Vec<_> = module.variables()
            .filter(|var| var.binding().is_some())
            .map(|var| var.id())
            .collect();
        let cross = FakeCrossCompiler::new("main0")
            .bind(ids[0], 7)
            .bind(ids[1], 9);
        let compiler = ShaderCompiler::default().with_cross_compiler(cross);

        let intermediate = IntermediateShader::from_words(fragment_words(),
            spv_info(ShaderKind::Fragment));
        let binary = compiler.compile(&intermediate, Backend::Metal).unwrap();
        assert_eq!(binary.info().entry_point, "main0");
        assert_eq!(intermediate.info().entry_point, "main");
        assert_eq!(binary.data(), b"// translated main0");
        assert!(binary.words().is_none());

        let mut bindings: Vec<_> = binary.resources().uniforms()
            .map(|u| (u.source_binding, u.backend_binding))
            .collect();
        bindings.sort();
        assert_eq!(bindings, vec![(0, 7), (1, 9)]);
    }

    #[test]
    fn metal_missing_binding() {
        let compiler = ShaderCompiler::default()
            .with_cross_compiler(FakeCrossCompiler::new("main0"));
        let intermediate = IntermediateShader::from_words(fragment_words(),
            spv_info(ShaderKind::Fragment));
        let err = compiler.compile(&intermediate, Backend::Metal).unwrap_err();
        assert!(matches!(err, ShaderError::MissingBackendBinding(_)));
    }

    #[test]
    fn metal_needs_cross_compiler() {
        let intermediate = IntermediateShader::from_words(fragment_words(),
            spv_info(ShaderKind::Fragment));
        let err = ShaderCompiler::default()
            .compile(&intermediate, Backend::Metal)
            .unwrap_err();
        assert_eq!(err, ShaderError::MissingCollaborator("cross-compiler"));
    }

    #[test]
    fn reflection_failure_aborts() {
        // A vertex entry point does not exist in the fragment module.
        let intermediate = IntermediateShader::from_words(fragment_words(),
            spv_info(ShaderKind::Vertex));
        let err = ShaderCompiler::default()
            .compile(&intermediate, Backend::Vulkan)
            .unwrap_err();
        assert!(matches!(err, ShaderError::Reflect(_)));
    }

    #[test]
    fn source_compiler_sees_options() {
        let options = CompileOptions {
            optimization: OptimizationLevel::Performance,
            debug_info: false,
        };
        let source = FakeSourceCompiler::new(vertex_words());
        let compiler = ShaderCompiler::new(options)
            .with_source_compiler(source.clone());
        let info = ShaderInfo::new(ShaderKind::Vertex,
            ShaderRepresentation::Glsl);
        compiler.compile_source("#version 450", info, Backend::Vulkan)
            .unwrap();
        assert_eq!(source.last_options(), Some(options));
    }
}
