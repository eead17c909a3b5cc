use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use spv::BaseKind;

use crate::*;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BoundResource {
    UniformBuffer(ResourceId),
    SampledImage {
        image: ResourceId,
        sampler: ResourceId,
    },
}

/// Resources bound to one set of a layout, together with their backend
/// encoding.
#[derive(Debug)]
pub struct ResourceSet<B: GraphicsBackend> {
    backend: B,
    layout: Arc<ResourceLayout>,
    index: usize,
    bound: BTreeMap<u32, BoundResource>,
    native: B::ResourceSet,
}

impl<B: GraphicsBackend> ResourceSet<B> {
    pub(crate) fn new(
        backend: B,
        layout: Arc<ResourceLayout>,
        set: &ResourceSetRef,
        frames_in_flight: u32,
    ) -> DeviceResult<Self> {
        let index = layout.resource_sets().iter()
            .position(|other| std::ptr::eq(other, set))
            .ok_or_else(|| err_msg!(
                "set {} does not belong to the layout", set.source_number))?;
        let native = backend.create_resource_set(&layout, set,
            frames_in_flight)?;
        Ok(Self {
            backend,
            layout,
            index,
            bound: BTreeMap::new(),
            native,
        })
    }

    pub fn layout(&self) -> &Arc<ResourceLayout> {
        &self.layout
    }

    pub fn set_ref(&self) -> &ResourceSetRef {
        &self.layout.resource_sets()[self.index]
    }

    pub fn native(&self) -> &B::ResourceSet {
        &self.native
    }

    /// The resource bound at a source binding, if any.
    pub fn bound(&self, binding: u32) -> Option<BoundResource> {
        self.bound.get(&binding).copied()
    }

    pub fn bind_uniform_buffer(
        &mut self,
        binding: &ResourceBindingRef,
        buffer: &UniformBuffer,
    ) -> DeviceResult<()> {
        self.check_binding(binding, BaseKind::Struct)?;
        if *binding.ty != **buffer.ty() {
            return Err(err_msg!(
                "buffer of type `{}` does not match binding {} (`{}`)",
                buffer.ty().name, binding.source_binding, binding.ty.name,
            ));
        }
        self.backend.write_uniform_buffer(&mut self.native, &self.layout,
            binding, buffer)?;
        debug!("set {}: bound buffer {:?} at {}", self.set_ref().source_number,
            buffer.id(), binding.source_binding);
        self.bound.insert(binding.source_binding,
            BoundResource::UniformBuffer(buffer.id()));
        Ok(())
    }

    pub fn bind_sampled_image(
        &mut self,
        binding: &ResourceBindingRef,
        image: &Image,
        sampler: &Sampler,
    ) -> DeviceResult<()> {
        self.check_binding(binding, BaseKind::SampledImage)?;
        self.backend.write_sampled_image(&mut self.native, &self.layout,
            binding, image, sampler)?;
        debug!("set {}: bound image {:?} at {}", self.set_ref().source_number,
            image.id(), binding.source_binding);
        self.bound.insert(binding.source_binding, BoundResource::SampledImage {
            image: image.id(),
            sampler: sampler.id(),
        });
        Ok(())
    }

    fn check_binding(&self, binding: &ResourceBindingRef, kind: BaseKind) ->
        DeviceResult<()>
    {
        let set = self.set_ref();
        if !set.owns(binding) {
            return Err(err_msg!("binding {} is not part of set {}",
                binding.source_binding, set.source_number));
        }
        if binding.ty.base_kind != kind {
            return Err(err_msg!("binding {} holds {:?}, not {:?}",
                binding.source_binding, binding.ty.base_kind, kind));
        }
        Ok(())
    }
}
