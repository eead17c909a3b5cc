//! Translation into Vulkan descriptor set layouts, descriptor writes and
//! pipeline state.

use std::collections::btree_map::{BTreeMap, Entry};
use std::ffi::CString;

use log::{debug, trace};
use shader::{Backend, ShaderKind};
use spv::{BaseKind, ShaderVariableType};

use crate::*;

#[derive(Clone, Copy, Debug, Default)]
pub struct Vulkan;

#[derive(Clone, Debug)]
pub struct VulkanSetLayout {
    pub set: u32,
    pub bindings: Vec<vk::DescriptorSetLayoutBinding<'static>>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DescriptorInfo {
    /// Per-frame blocks are laid out back to back, so each frame's
    /// descriptor points at its own block.
    Buffer {
        buffer: ResourceId,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
    },
    Image {
        image: ResourceId,
        sampler: ResourceId,
        layout: vk::ImageLayout,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DescriptorWrite {
    pub frame: u32,
    pub dst_binding: u32,
    pub dst_array_element: u32,
    pub descriptor_count: u32,
    pub descriptor_type: vk::DescriptorType,
    pub info: DescriptorInfo,
}

/// Everything needed to allocate and update one descriptor set per
/// frame in flight.
#[derive(Clone, Debug)]
pub struct VulkanResourceSet {
    pub layout: VulkanSetLayout,
    pub pool_sizes: Vec<vk::DescriptorPoolSize>,
    pub max_sets: u32,
    writes: Vec<DescriptorWrite>,
}

impl VulkanResourceSet {
    /// Pending writes, latest per frame and binding.
    pub fn writes(&self) -> &[DescriptorWrite] {
        &self.writes
    }

    fn record(&mut self, write: DescriptorWrite) {
        trace!("frame {}: write {:?} at binding {}", write.frame,
            write.descriptor_type, write.dst_binding);
        self.writes.retain(|w|
            (w.frame, w.dst_binding) != (write.frame, write.dst_binding));
        self.writes.push(write);
    }
}

#[derive(Clone, Debug)]
pub struct VulkanStage {
    pub stage: vk::ShaderStageFlags,
    pub entry_point: CString,
    pub code: Vec<u32>,
}

#[derive(Clone, Debug)]
pub struct VulkanPipeline {
    pub stages: Vec<VulkanStage>,
    /// Indexed by set number. Numbers no stage uses get empty layouts.
    pub set_layouts: Vec<VulkanSetLayout>,
    pub vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
}

pub fn descriptor_type(ty: &ShaderVariableType) ->
    DeviceResult<vk::DescriptorType>
{
    Ok(match ty.base_kind {
        BaseKind::Image => vk::DescriptorType::SAMPLED_IMAGE,
        BaseKind::Sampler => vk::DescriptorType::SAMPLER,
        BaseKind::SampledImage => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        BaseKind::Struct => vk::DescriptorType::UNIFORM_BUFFER,
        BaseKind::Numeric => return Err(err_msg!(
            "`{}`: numeric uniforms have no descriptor type", ty.name)),
    })
}

pub fn shader_stage_flags(kind: ShaderKind) -> vk::ShaderStageFlags {
    match kind {
        ShaderKind::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderKind::Fragment => vk::ShaderStageFlags::FRAGMENT,
    }
}

pub fn set_layout(layout: &ResourceLayout, set: &ResourceSetRef) ->
    DeviceResult<VulkanSetLayout>
{
    let bindings = set.resources.iter().map(|res| -> DeviceResult<_> {
        let stage_flags = layout.binding_stages(res)
            .fold(vk::ShaderStageFlags::empty(),
                |flags, stage| flags | shader_stage_flags(stage.kind()));
        Ok(vk::DescriptorSetLayoutBinding::default()
            .binding(res.backend_binding)
            .descriptor_type(descriptor_type(&res.ty)?)
            .descriptor_count(descriptor_count(&res.ty))
            .stage_flags(stage_flags))
    }).collect::<DeviceResult<Vec<_>>>()?;
    Ok(VulkanSetLayout { set: set.backend_number, bindings })
}

/// Pipeline set layouts indexed by backend set number. Unused numbers
/// below the highest get empty layouts.
pub fn set_layouts(layout: &ResourceLayout, sets: &[ResourceSetRef]) ->
    DeviceResult<Vec<VulkanSetLayout>>
{
    let mut by_number = BTreeMap::new();
    for set in sets.iter() {
        let set_layout = set_layout(layout, set)?;
        match by_number.entry(set_layout.set) {
            Entry::Occupied(_) => return Err(err_msg!(
                "set {} reuses descriptor set number {}",
                set.source_number, set_layout.set)),
            Entry::Vacant(entry) => { entry.insert(set_layout); },
        }
    }
    let count = by_number.keys().next_back().map_or(0, |&n| n + 1);
    Ok((0..count)
        .map(|set| by_number.remove(&set).unwrap_or(VulkanSetLayout {
            set,
            bindings: Vec::new(),
        }))
        .collect())
}

/// Pool capacity for one set per frame in flight.
pub fn pool_sizes(
    bindings: &[vk::DescriptorSetLayoutBinding<'_>],
    frames_in_flight: u32,
) -> Vec<vk::DescriptorPoolSize> {
    let mut counts: BTreeMap<vk::DescriptorType, u32> = BTreeMap::new();
    for binding in bindings.iter() {
        *counts.entry(binding.descriptor_type).or_default() +=
            binding.descriptor_count * frames_in_flight;
    }
    counts.into_iter()
        .map(|(ty, descriptor_count)| vk::DescriptorPoolSize {
            ty,
            descriptor_count,
        })
        .collect()
}

/// Only 32-bit scalar components have a vertex format.
pub fn vk_vertex_format(
    format: AttributeFormat,
    dimension: AttributeDimension,
) -> DeviceResult<vk::Format> {
    let base = match format {
        AttributeFormat::F32 => vk::Format::R32_SFLOAT,
        AttributeFormat::I32 => vk::Format::R32_SINT,
        AttributeFormat::U32 => vk::Format::R32_UINT,
        _ => return Err(err_msg!("unsupported vertex format {:?}", format)),
    };
    // Wider formats of each kind are spaced 3 apart.
    let step = (dimension.components() as i32 - 1) * 3;
    Ok(vk::Format::from_raw(base.as_raw() + step))
}

pub fn sampler_create_info(desc: &SamplerDesc) ->
    vk::SamplerCreateInfo<'static>
{
    vk::SamplerCreateInfo::default()
        .mag_filter(desc.mag_filter.into())
        .min_filter(desc.min_filter.into())
        .address_mode_u(desc.address_mode_u.into())
        .address_mode_v(desc.address_mode_v.into())
        .address_mode_w(desc.address_mode_w.into())
        .anisotropy_enable(desc.anisotropy_enable)
        .max_anisotropy(desc.max_anisotropy)
}

fn check_binding(
    binding: &ResourceBindingRef,
    expected: vk::DescriptorType,
) -> DeviceResult<u32> {
    let ty = descriptor_type(&binding.ty)?;
    if ty != expected {
        return Err(err_msg!("binding {} is {:?}, not {:?}",
            binding.source_binding, ty, expected));
    }
    Ok(descriptor_count(&binding.ty))
}

impl GraphicsBackend for Vulkan {
    type ResourceSet = VulkanResourceSet;
    type Pipeline = VulkanPipeline;

    fn backend() -> Backend {
        Backend::Vulkan
    }

    fn check_layout(&self, layout: &ResourceLayout) -> DeviceResult<()> {
        set_layouts(layout, layout.resource_sets())?;
        Ok(())
    }

    fn create_resource_set(
        &self,
        layout: &ResourceLayout,
        set: &ResourceSetRef,
        frames_in_flight: u32,
    ) -> DeviceResult<VulkanResourceSet> {
        let set_layout = set_layout(layout, set)?;
        let pool_sizes = pool_sizes(&set_layout.bindings, frames_in_flight);
        debug!("set {}: {} bindings, {} pool sizes", set_layout.set,
            set_layout.bindings.len(), pool_sizes.len());
        Ok(VulkanResourceSet {
            layout: set_layout,
            pool_sizes,
            max_sets: frames_in_flight,
            writes: Vec::new(),
        })
    }

    fn write_uniform_buffer(
        &self,
        native: &mut VulkanResourceSet,
        _layout: &ResourceLayout,
        binding: &ResourceBindingRef,
        buffer: &UniformBuffer,
    ) -> DeviceResult<()> {
        let descriptor_type = vk::DescriptorType::UNIFORM_BUFFER;
        let descriptor_count = check_binding(binding, descriptor_type)?;
        let range = buffer.size() as vk::DeviceSize;
        for frame in 0..native.max_sets {
            native.record(DescriptorWrite {
                frame,
                dst_binding: binding.backend_binding,
                dst_array_element: 0,
                descriptor_count,
                descriptor_type,
                info: DescriptorInfo::Buffer {
                    buffer: buffer.id(),
                    offset: frame as vk::DeviceSize * range,
                    range,
                },
            });
        }
        Ok(())
    }

    fn write_sampled_image(
        &self,
        native: &mut VulkanResourceSet,
        _layout: &ResourceLayout,
        binding: &ResourceBindingRef,
        image: &Image,
        sampler: &Sampler,
    ) -> DeviceResult<()> {
        let descriptor_type = vk::DescriptorType::COMBINED_IMAGE_SAMPLER;
        let descriptor_count = check_binding(binding, descriptor_type)?;
        for frame in 0..native.max_sets {
            native.record(DescriptorWrite {
                frame,
                dst_binding: binding.backend_binding,
                dst_array_element: 0,
                descriptor_count,
                descriptor_type,
                info: DescriptorInfo::Image {
                    image: image.id(),
                    sampler: sampler.id(),
                    layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                },
            });
        }
        Ok(())
    }

    fn create_pipeline(&self, init: &PipelineInit) ->
        DeviceResult<VulkanPipeline>
    {
        let layout = &init.layout;

        let stages = layout.stages().iter().map(|stage| -> DeviceResult<_> {
            let code = stage.binary().words().ok_or_else(|| err_msg!(
                "`{}` is not SPIR-V", stage.info().name))?;
            let entry_point = CString::new(stage.entry_point())
                .map_err(|_| err_msg!("`{}`: bad entry point name",
                    stage.info().name))?;
            Ok(VulkanStage {
                stage: shader_stage_flags(stage.kind()),
                entry_point,
                code,
            })
        }).collect::<DeviceResult<Vec<_>>>()?;

        let set_layouts = set_layouts(layout, layout.resource_sets())?;

        let mut vertex_bindings = Vec::new();
        let mut vertex_attributes = Vec::new();
        for (i, binding) in init.vertex_bindings.iter().enumerate() {
            vertex_bindings.push(vk::VertexInputBindingDescription {
                binding: i as u32,
                stride: binding.stride,
                input_rate: vk::VertexInputRate::VERTEX,
            });
            for attr in binding.attributes.iter() {
                vertex_attributes.push(vk::VertexInputAttributeDescription {
                    location: attr.location.backend_location,
                    binding: i as u32,
                    format: vk_vertex_format(attr.format, attr.dimension)?,
                    offset: attr.offset,
                });
            }
        }

        Ok(VulkanPipeline {
            stages,
            set_layouts,
            vertex_bindings,
            vertex_attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use spv::{NumericType, ScalarKind, Shape};

    use super::*;
    use crate::testing::*;

    #[test]
    fn descriptor_types() {
        let kinds = [
            (BaseKind::Image, vk::DescriptorType::SAMPLED_IMAGE),
            (BaseKind::Sampler, vk::DescriptorType::SAMPLER),
            (BaseKind::SampledImage,
                vk::DescriptorType::COMBINED_IMAGE_SAMPLER),
        ];
        for &(kind, expected) in kinds.iter() {
            let ty = ShaderVariableType::opaque("tex", kind, vec![4, 2])
                .unwrap();
            assert_eq!(descriptor_type(&ty).unwrap(), expected);
            assert_eq!(descriptor_count(&ty), 4);
        }

        let num = NumericType::new(ScalarKind::F32, Shape::Scalar);
        let ty = ShaderVariableType::numeric("x", num, vec![]).unwrap();
        assert!(descriptor_type(&ty).is_err());
        assert_eq!(descriptor_count(&ty), 1);
    }

    #[test]
    fn vertex_formats() {
        use AttributeDimension::*;
        use AttributeFormat::*;
        assert_eq!(vk_vertex_format(F32, Vec1).unwrap(), vk::Format::R32_SFLOAT);
        assert_eq!(vk_vertex_format(F32, Vec3).unwrap(),
            vk::Format::R32G32B32_SFLOAT);
        assert_eq!(vk_vertex_format(I32, Vec2).unwrap(), vk::Format::R32G32_SINT);
        assert_eq!(vk_vertex_format(U32, Vec4).unwrap(),
            vk::Format::R32G32B32A32_UINT);
        assert!(vk_vertex_format(F64, Vec2).is_err());
        assert!(vk_vertex_format(U8, Vec4).is_err());
    }

    #[test]
    fn resource_set_tables() {
        init();
        let layout = basic_layout();
        let set = layout.resource_set_by_number(0).unwrap();
        let native = Vulkan.create_resource_set(&layout, set, 2).unwrap();

        assert_eq!(native.layout.set, 0);
        assert_eq!(native.max_sets, 2);
        let bindings = &native.layout.bindings;
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].descriptor_type,
            vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(bindings[0].stage_flags,
            vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT);
        assert_eq!(bindings[1].binding, 1);
        assert_eq!(bindings[1].descriptor_type,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        assert_eq!(bindings[1].stage_flags, vk::ShaderStageFlags::FRAGMENT);

        let sizes: Vec<_> = native.pool_sizes.iter()
            .map(|size| (size.ty, size.descriptor_count))
            .collect();
        assert_eq!(sizes, vec![
            (vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 2),
            (vk::DescriptorType::UNIFORM_BUFFER, 2),
        ]);
    }

    #[test]
    fn rejects_numeric_uniforms() {
        init();
        let num = NumericType::new(ScalarKind::F32, Shape::Scalar);
        let ty = ShaderVariableType::numeric("x", num, vec![]).unwrap();
        let layout = basic_layout();
        let mut set = layout.resource_sets()[0].clone();
        set.resources[0].ty = Arc::new(ty);
        assert!(set_layout(&layout, &set).is_err());
        assert!(Vulkan.check_layout(&layout).is_ok());
    }

    #[test]
    fn set_layout_numbering() {
        init();
        let layout = basic_layout();
        let mut set = layout.resource_sets()[0].clone();
        set.backend_number = 2;
        let layouts = set_layouts(&layout, &[set.clone()]).unwrap();
        let numbers: Vec<_> = layouts.iter()
            .map(|l| (l.set, l.bindings.len()))
            .collect();
        assert_eq!(numbers, vec![(0, 0), (1, 0), (2, 2)]);

        let mut other = set.clone();
        other.source_number = 1;
        assert!(set_layouts(&layout, &[set, other]).is_err());
    }

    #[test]
    fn sampler_info() {
        let desc = SamplerDesc {
            min_filter: Filter::Nearest,
            address_mode_v: SamplerAddressMode::ClampToEdge,
            ..Default::default()
        };
        let info = sampler_create_info(&desc);
        assert_eq!(info.min_filter, vk::Filter::NEAREST);
        assert_eq!(info.mag_filter, vk::Filter::LINEAR);
        assert_eq!(info.address_mode_u, vk::SamplerAddressMode::REPEAT);
        assert_eq!(info.address_mode_v, vk::SamplerAddressMode::CLAMP_TO_EDGE);
        assert_eq!(info.anisotropy_enable, vk::TRUE);
        assert_eq!(info.max_anisotropy, 1.0);
    }
}
