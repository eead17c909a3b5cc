use crate::*;

/// Backend-ready shader code together with its reflection data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShaderBinary {
    code: Vec<u8>,
    info: ShaderInfo,
    resources: spv::ShaderResources,
    backend: Backend,
}

impl ShaderBinary {
    pub fn new(
        code: Vec<u8>,
        info: ShaderInfo,
        resources: spv::ShaderResources,
        backend: Backend,
    ) -> Self {
        Self { code, info, resources, backend }
    }

    pub fn data(&self) -> &[u8] {
        &self.code
    }

    /// The code as SPIR-V words, if the backend consumes SPIR-V.
    pub fn words(&self) -> Option<Vec<u32>> {
        match self.backend {
            Backend::Vulkan => words_from_bytes(&self.code).ok(),
            Backend::Metal => None,
        }
    }

    /// Shader info as seen by the backend. The entry point may have been
    /// renamed by cross-compilation.
    pub fn info(&self) -> &ShaderInfo {
        &self.info
    }

    pub fn kind(&self) -> ShaderKind {
        self.info.kind
    }

    pub fn resources(&self) -> &spv::ShaderResources {
        &self.resources
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }
}
