use shader::{Backend, ShaderBinary, ShaderInfo, ShaderKind};

/// A compiled shader stage owned by a device.
#[derive(Debug)]
pub struct Shader {
    binary: ShaderBinary,
}

impl Shader {
    pub(crate) fn new(binary: ShaderBinary) -> Self {
        Self { binary }
    }

    pub fn binary(&self) -> &ShaderBinary {
        &self.binary
    }

    pub fn info(&self) -> &ShaderInfo {
        self.binary.info()
    }

    pub fn kind(&self) -> ShaderKind {
        self.binary.kind()
    }

    /// Entry point in the backend code, which may differ from the name
    /// in the source.
    pub fn entry_point(&self) -> &str {
        &self.binary.info().entry_point
    }

    pub fn resources(&self) -> &spv::ShaderResources {
        self.binary.resources()
    }

    pub fn backend(&self) -> Backend {
        self.binary.backend()
    }
}
