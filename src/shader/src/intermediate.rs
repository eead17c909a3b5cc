use byteorder::{ByteOrder, NativeEndian};
use log::debug;

use crate::*;

/// Shader code in the canonical intermediate form, which is SPIR-V.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IntermediateShader {
    words: Vec<u32>,
    info: ShaderInfo,
}

/// Reinterprets a byte stream as SPIR-V words.
pub fn words_from_bytes(bytes: &[u8]) -> ShaderResult<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return Err(ShaderError::MisalignedCode(bytes.len()));
    }
    let mut words = vec![0u32; bytes.len() / 4];
    NativeEndian::read_u32_into(bytes, &mut words);
    Ok(words)
}

pub fn bytes_from_words(words: &[u32]) -> Vec<u8> {
    let mut bytes = vec![0u8; words.len() * 4];
    NativeEndian::write_u32_into(words, &mut bytes);
    bytes
}

impl IntermediateShader {
    /// Builds an intermediate shader from code in the representation
    /// named by `info.source_rep`.
    pub fn from(
        data: &[u8],
        info: ShaderInfo,
        compiler: Option<&dyn SourceCompiler>,
        options: &CompileOptions,
    ) -> ShaderResult<Self> {
        match info.source_rep {
            ShaderRepresentation::Glsl => {
                let source = String::from_utf8_lossy(data);
                let compiler = compiler
                    .ok_or(ShaderError::MissingCollaborator("source compiler"))?;
                Self::from_glsl(&source, info, compiler, options)
            },
            ShaderRepresentation::Spv => Self::from_spv(data, info),
            rep => Err(ShaderError::UnsupportedRepresentation(rep)),
        }
    }

    pub fn from_glsl(
        source: &str,
        info: ShaderInfo,
        compiler: &dyn SourceCompiler,
        options: &CompileOptions,
    ) -> ShaderResult<Self> {
        debug!("compiling GLSL shader `{}`", info.name);
        let words = compiler.compile_glsl(source, &info, options)?;
        Ok(Self { words, info })
    }

    /// SPIR-V is already the intermediate form, so this only checks that
    /// the code is word-aligned.
    pub fn from_spv(data: &[u8], info: ShaderInfo) -> ShaderResult<Self> {
        let words = words_from_bytes(data)?;
        Ok(Self { words, info })
    }

    pub fn from_words(words: Vec<u32>, info: ShaderInfo) -> Self {
        Self { words, info }
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn info(&self) -> &ShaderInfo {
        &self.info
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        bytes_from_words(&self.words)
    }

    /// Parses and reflects the intermediate code.
    pub fn reflect(&self) -> ShaderResult<spv::ShaderResources> {
        let module = spv::parse_words(&self.words)?;
        let model = self.info.kind.execution_model();
        Ok(spv::reflect(&module, model, &self.info.entry_point)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn spv_passes_through() {
        let words = vertex_words();
        let bytes = bytes_from_words(&words);
        let info = ShaderInfo::new(ShaderKind::Vertex,
            ShaderRepresentation::Spv);
        let shader = IntermediateShader::from(&bytes, info, None,
            &Default::default()).unwrap();
        assert_eq!(shader.words(), &words[..]);
        assert_eq!(shader.to_bytes(), bytes);
    }

    #[test]
    fn misaligned_spv() {
        let info = ShaderInfo::default();
        let err = IntermediateShader::from_spv(&[1, 2, 3, 4, 5], info)
            .unwrap_err();
        assert_eq!(err, ShaderError::MisalignedCode(5));
    }

    #[test]
    fn unsupported_sources() {
        for &rep in [ShaderRepresentation::Hlsl, ShaderRepresentation::Msl]
            .iter()
        {
            let info = ShaderInfo::new(ShaderKind::Fragment, rep);
            let err = IntermediateShader::from(b"", info, None,
                &Default::default()).unwrap_err();
            assert_eq!(err, ShaderError::UnsupportedRepresentation(rep));
        }
    }

    #[test]
    fn glsl_needs_compiler() {
        let info = ShaderInfo::new(ShaderKind::Vertex,
            ShaderRepresentation::Glsl);
        let err = IntermediateShader::from(b"void main() {}", info.clone(),
            None, &Default::default()).unwrap_err();
        assert_eq!(err, ShaderError::MissingCollaborator("source compiler"));

        let compiler = FakeSourceCompiler::new(vertex_words());
        let shader = IntermediateShader::from(b"void main() {}", info,
            Some(&compiler), &Default::default()).unwrap();
        assert_eq!(shader.words(), &vertex_words()[..]);
        assert_eq!(compiler.sources(), vec!["void main() {}".to_owned()]);
    }

    #[test]
    fn glsl_diagnostics_pass_through() {
        let info = ShaderInfo::new(ShaderKind::Vertex,
            ShaderRepresentation::Glsl);
        let compiler = FakeSourceCompiler::failing("0:1: syntax error");
        let err = IntermediateShader::from(b"void", info, Some(&compiler),
            &Default::default()).unwrap_err();
        assert_eq!(err,
            ShaderError::Compile(CompileError::new("0:1: syntax error")));
        assert_eq!(err.to_string(), "compilation failed: 0:1: syntax error");
    }
}
