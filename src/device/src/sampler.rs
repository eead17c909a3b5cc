use derivative::Derivative;

use crate::*;

#[derive(Clone, Copy, Debug, Derivative, PartialEq)]
#[derivative(Default)]
pub struct SamplerDesc {
    #[derivative(Default(value = "Filter::Linear"))]
    pub min_filter: Filter,
    #[derivative(Default(value = "Filter::Linear"))]
    pub mag_filter: Filter,
    pub address_mode_u: SamplerAddressMode,
    pub address_mode_v: SamplerAddressMode,
    pub address_mode_w: SamplerAddressMode,
    #[derivative(Default(value = "true"))]
    pub anisotropy_enable: bool,
    #[derivative(Default(value = "1.0"))]
    pub max_anisotropy: f32,
}

wrap_vk_enum! {
    #[derive(Derivative)]
    #[derivative(Default)]
    pub enum Filter {
        #[derivative(Default)]
        Nearest = NEAREST,
        Linear = LINEAR,
    }
}

wrap_vk_enum! {
    #[derive(Derivative)]
    #[derivative(Default)]
    pub enum SamplerAddressMode {
        #[derivative(Default)]
        Repeat = REPEAT,
        MirroredRepeat = MIRRORED_REPEAT,
        ClampToEdge = CLAMP_TO_EDGE,
        MirrorClampToEdge = MIRROR_CLAMP_TO_EDGE,
        ClampToBorder = CLAMP_TO_BORDER,
    }
}

#[derive(Debug)]
pub struct Sampler {
    id: ResourceId,
    desc: SamplerDesc,
}

impl Sampler {
    pub(crate) fn new(id: ResourceId, desc: SamplerDesc) -> DeviceResult<Self>
    {
        if !(desc.max_anisotropy >= 1.0) {
            return Err(err_msg!("max anisotropy {} is below 1",
                desc.max_anisotropy));
        }
        Ok(Self { id, desc })
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn desc(&self) -> &SamplerDesc {
        &self.desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let desc = SamplerDesc::default();
        assert_eq!(desc.min_filter, Filter::Linear);
        assert_eq!(desc.mag_filter, Filter::Linear);
        assert_eq!(desc.address_mode_u, SamplerAddressMode::Repeat);
        assert!(desc.anisotropy_enable);
        assert_eq!(desc.max_anisotropy, 1.0);
    }

    #[test]
    fn anisotropy_range() {
        let desc = SamplerDesc { max_anisotropy: 0.5, ..Default::default() };
        assert!(Sampler::new(ResourceId(0), desc).is_err());
        let desc = SamplerDesc { max_anisotropy: f32::NAN, ..desc };
        assert!(Sampler::new(ResourceId(0), desc).is_err());
    }
}
