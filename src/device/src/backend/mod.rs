use shader::Backend;

use crate::*;

mod metal;
mod vulkan;

pub use metal::*;
pub use vulkan::*;

/// A native graphics API. Implementations translate merged layouts,
/// bound resources and pipeline descriptions into the API's own tables.
pub trait GraphicsBackend:
    std::fmt::Debug + Clone + Default + Send + Sync + 'static
{
    type ResourceSet: std::fmt::Debug;
    type Pipeline: std::fmt::Debug;

    fn backend() -> Backend;

    /// Checks that every binding in the layout has a native equivalent.
    fn check_layout(&self, layout: &ResourceLayout) -> DeviceResult<()>;

    fn create_resource_set(
        &self,
        layout: &ResourceLayout,
        set: &ResourceSetRef,
        frames_in_flight: u32,
    ) -> DeviceResult<Self::ResourceSet>;

    /// Records `buffer` at `binding` for every frame in flight.
    fn write_uniform_buffer(
        &self,
        native: &mut Self::ResourceSet,
        layout: &ResourceLayout,
        binding: &ResourceBindingRef,
        buffer: &UniformBuffer,
    ) -> DeviceResult<()>;

    fn write_sampled_image(
        &self,
        native: &mut Self::ResourceSet,
        layout: &ResourceLayout,
        binding: &ResourceBindingRef,
        image: &Image,
        sampler: &Sampler,
    ) -> DeviceResult<()>;

    fn create_pipeline(&self, init: &PipelineInit) ->
        DeviceResult<Self::Pipeline>;
}

/// Descriptor count of a binding: the outermost array extent, or 1.
pub fn descriptor_count(ty: &spv::ShaderVariableType) -> u32 {
    ty.array_sizes.first().copied().unwrap_or(1)
}
