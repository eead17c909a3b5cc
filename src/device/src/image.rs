use crate::*;

wrap_vk_enum! {
    pub enum ImageFormat as Format {
        Rgba8Srgb = R8G8B8A8_SRGB,
        Rgba8Unorm = R8G8B8A8_UNORM,
    }
}

impl ImageFormat {
    pub fn texel_size(self) -> u32 {
        match self {
            ImageFormat::Rgba8Srgb | ImageFormat::Rgba8Unorm => 4,
        }
    }
}

/// A 2D image and its host-side contents.
#[derive(Debug)]
pub struct Image {
    id: ResourceId,
    width: u32,
    height: u32,
    format: ImageFormat,
    data: Vec<u8>,
}

impl Image {
    pub(crate) fn new(
        id: ResourceId,
        width: u32,
        height: u32,
        format: ImageFormat,
    ) -> DeviceResult<Self> {
        let size = (width as u64) * (height as u64) *
            (format.texel_size() as u64);
        if width == 0 || height == 0 || size > u32::MAX as u64 {
            return Err(err_msg!("invalid image extent {}x{}", width, height));
        }
        Ok(Self { id, width, height, format, data: vec![0; size as usize] })
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn size(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replaces the whole image. `data` must cover every texel.
    pub fn write(&mut self, data: &[u8]) -> DeviceResult<()> {
        if data.len() != self.data.len() {
            return Err(err_msg!(
                "image write of {} bytes; image holds {}",
                data.len(), self.data.len(),
            ));
        }
        self.data.copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_whole_image() {
        let mut image = Image::new(ResourceId(3), 2, 2, ImageFormat::Rgba8Srgb)
            .unwrap();
        assert_eq!(image.size(), 16);
        assert!(image.write(&[0xff; 15]).is_err());
        image.write(&[0xff; 16]).unwrap();
        assert!(image.data().iter().all(|&b| b == 0xff));
        assert_eq!(vk::Format::from(image.format()), vk::Format::R8G8B8A8_SRGB);
    }

    #[test]
    fn empty_extent() {
        assert!(Image::new(ResourceId(0), 0, 4, ImageFormat::Rgba8Unorm)
            .is_err());
    }
}
