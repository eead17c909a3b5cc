use derivative::Derivative;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

impl ShaderKind {
    pub fn execution_model(self) -> spv::ExecutionModel {
        match self {
            ShaderKind::Vertex => spv::ExecutionModel::Vertex,
            ShaderKind::Fragment => spv::ExecutionModel::Fragment,
        }
    }
}

/// The encoding of shader code handed to the compiler.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ShaderRepresentation {
    Glsl,
    Hlsl,
    Msl,
    Spv,
}

#[derive(Clone, Debug, Derivative, Eq, PartialEq)]
#[derivative(Default)]
pub struct ShaderInfo {
    #[derivative(Default(value = "\"UnnamedShader\".to_owned()"))]
    pub name: String,
    #[derivative(Default(value = "\"main\".to_owned()"))]
    pub entry_point: String,
    #[derivative(Default(value = "ShaderKind::Vertex"))]
    pub kind: ShaderKind,
    #[derivative(Default(value = "ShaderRepresentation::Spv"))]
    pub source_rep: ShaderRepresentation,
}

impl ShaderInfo {
    pub fn new(kind: ShaderKind, source_rep: ShaderRepresentation) -> Self {
        Self { kind, source_rep, ..Default::default() }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }
}

/// Native graphics API a shader is compiled for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Backend {
    Vulkan,
    Metal,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OptimizationLevel {
    Zero,
    Performance,
}

/// Options forwarded to the source compiler.
#[derive(Clone, Copy, Debug, Derivative, Eq, PartialEq)]
#[derivative(Default)]
pub struct CompileOptions {
    #[derivative(Default(value = "default_optimization()"))]
    pub optimization: OptimizationLevel,
    #[derivative(Default(value = "cfg!(debug_assertions)"))]
    pub debug_info: bool,
}

fn default_optimization() -> OptimizationLevel {
    if cfg!(debug_assertions) {
        OptimizationLevel::Zero
    } else {
        OptimizationLevel::Performance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_defaults() {
        let info = ShaderInfo::default();
        assert_eq!(info.name, "UnnamedShader");
        assert_eq!(info.entry_point, "main");

        let info = ShaderInfo::new(ShaderKind::Fragment,
            ShaderRepresentation::Glsl).with_name("blit");
        assert_eq!(info.name, "blit");
        assert_eq!(info.entry_point, "main");
        assert_eq!(info.kind.execution_model(),
            spv::ExecutionModel::Fragment);
    }

    #[test]
    fn options_follow_build_profile() {
        let options = CompileOptions::default();
        assert_eq!(options.debug_info, cfg!(debug_assertions));
        assert_eq!(options.optimization == OptimizationLevel::Zero,
            cfg!(debug_assertions));
    }
}
