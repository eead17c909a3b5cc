use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use derivative::Derivative;
use log::debug;
use shader::{Backend, CompileOptions, CrossCompiler, ShaderBinary,
    ShaderCompiler, ShaderInfo, SourceCompiler};
use spv::ShaderVariableType;

use crate::*;

#[derive(Clone, Copy, Debug, Derivative, Eq, PartialEq)]
#[derivative(Default)]
pub struct DeviceConfig {
    #[derivative(Default(value = "Backend::Vulkan"))]
    pub backend: Backend,
    #[derivative(Default(value = "2"))]
    pub frames_in_flight: u32,
    pub compile_options: CompileOptions,
}

/// Entry point for creating shaders, layouts and resources on one
/// backend.
#[derive(Debug)]
pub struct Device<B: GraphicsBackend> {
    backend: B,
    config: DeviceConfig,
    compiler: ShaderCompiler,
    frames: Arc<FrameCounter>,
    next_id: AtomicU64,
}

impl<B: GraphicsBackend> Device<B> {
    pub fn new(config: DeviceConfig) -> DeviceResult<Self> {
        if config.backend != B::backend() {
            return Err(err_msg!("{:?} device configured for {:?}",
                B::backend(), config.backend));
        }
        if config.frames_in_flight == 0 {
            return Err(err_msg!("at least one frame must be in flight"));
        }
        debug!("creating {:?} device with {} frames in flight",
            config.backend, config.frames_in_flight);
        Ok(Self {
            backend: B::default(),
            config,
            compiler: ShaderCompiler::new(config.compile_options),
            frames: Arc::new(FrameCounter::new(config.frames_in_flight)),
            next_id: AtomicU64::new(0),
        })
    }

    pub fn with_source_compiler(
        mut self,
        compiler: impl SourceCompiler + 'static,
    ) -> Self {
        self.compiler = self.compiler.with_source_compiler(compiler);
        self
    }

    pub fn with_cross_compiler(
        mut self,
        compiler: impl CrossCompiler + 'static,
    ) -> Self {
        self.compiler = self.compiler.with_cross_compiler(compiler);
        self
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn compiler(&self) -> &ShaderCompiler {
        &self.compiler
    }

    pub fn current_frame(&self) -> u32 {
        self.frames.current()
    }

    pub fn advance_frame(&self) -> u32 {
        self.frames.advance()
    }

    fn next_id(&self) -> ResourceId {
        ResourceId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn create_shader(&self, binary: ShaderBinary) ->
        DeviceResult<Arc<Shader>>
    {
        if binary.backend() != B::backend() {
            return Err(err_msg!("shader `{}` was compiled for {:?}",
                binary.info().name, binary.backend()));
        }
        Ok(Arc::new(Shader::new(binary)))
    }

    /// Compiles source or SPIR-V code for this device's backend.
    pub fn compile_shader(&self, data: &[u8], info: ShaderInfo) ->
        DeviceResult<Arc<Shader>>
    {
        let binary = self.compiler.compile_bytes(data, info, B::backend())?;
        self.create_shader(binary)
    }

    pub fn create_resource_layout(&self, stages: &[Arc<Shader>]) ->
        DeviceResult<Arc<ResourceLayout>>
    {
        for stage in stages.iter() {
            if stage.backend() != B::backend() {
                return Err(err_msg!("shader `{}` was compiled for {:?}",
                    stage.info().name, stage.backend()));
            }
        }
        let layout = ResourceLayout::new(stages.to_vec());
        self.backend.check_layout(&layout)?;
        Ok(Arc::new(layout))
    }

    pub fn create_resource_set(
        &self,
        layout: &Arc<ResourceLayout>,
        set: &ResourceSetRef,
    ) -> DeviceResult<ResourceSet<B>> {
        ResourceSet::new(self.backend.clone(), Arc::clone(layout), set,
            self.config.frames_in_flight)
    }

    pub fn create_pipeline(&self, init: &PipelineInit) ->
        DeviceResult<Pipeline<B>>
    {
        init.validate()?;
        let native = self.backend.create_pipeline(init)?;
        Ok(Pipeline::new(init, native))
    }

    pub fn create_uniform_buffer(&self, ty: &Arc<ShaderVariableType>) ->
        DeviceResult<UniformBuffer>
    {
        UniformBuffer::new(self.next_id(), Arc::clone(ty),
            Arc::clone(&self.frames))
    }

    pub fn create_buffer(&self, usage: BufferUsage, size: u32) ->
        DeviceResult<Buffer>
    {
        Buffer::new(self.next_id(), usage, size)
    }

    pub fn create_image(&self, width: u32, height: u32, format: ImageFormat)
        -> DeviceResult<Image>
    {
        Image::new(self.next_id(), width, height, format)
    }

    pub fn create_sampler(&self, desc: &SamplerDesc) -> DeviceResult<Sampler> {
        Sampler::new(self.next_id(), *desc)
    }
}
