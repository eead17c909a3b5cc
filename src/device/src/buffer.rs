use bitflags::bitflags;

use crate::*;

bitflags! {
    #[derive(Default)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
    }
}

impl From<BufferUsage> for vk::BufferUsageFlags {
    fn from(usage: BufferUsage) -> Self {
        let mut flags = vk::BufferUsageFlags::empty();
        if usage.contains(BufferUsage::VERTEX) {
            flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
        }
        if usage.contains(BufferUsage::INDEX) {
            flags |= vk::BufferUsageFlags::INDEX_BUFFER;
        }
        flags
    }
}

/// A vertex or index buffer and its host-side contents.
#[derive(Debug)]
pub struct Buffer {
    id: ResourceId,
    usage: BufferUsage,
    data: Vec<u8>,
}

impl Buffer {
    pub(crate) fn new(id: ResourceId, usage: BufferUsage, size: u32) ->
        DeviceResult<Self>
    {
        if usage.is_empty() {
            return Err(err_msg!("buffer has no usage"));
        }
        Ok(Self { id, usage, data: vec![0; size as usize] })
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn size(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Writes `data` at the start of the buffer.
    pub fn write(&mut self, data: &[u8]) -> DeviceResult<()> {
        if data.len() > self.data.len() {
            return Err(err_msg!("write of {} bytes to a {} byte buffer",
                data.len(), self.data.len()));
        }
        self.data[..data.len()].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_flags() {
        let usage = BufferUsage::VERTEX | BufferUsage::INDEX;
        let flags = vk::BufferUsageFlags::from(usage);
        assert!(flags.contains(vk::BufferUsageFlags::VERTEX_BUFFER));
        assert!(flags.contains(vk::BufferUsageFlags::INDEX_BUFFER));
        assert!(Buffer::new(ResourceId(0), BufferUsage::empty(), 4).is_err());
    }

    #[test]
    fn partial_write() {
        let mut buf = Buffer::new(ResourceId(1), BufferUsage::VERTEX, 8)
            .unwrap();
        buf.write(&[1, 2, 3]).unwrap();
        assert_eq!(buf.data(), &[1, 2, 3, 0, 0, 0, 0, 0]);
        assert!(buf.write(&[0; 9]).is_err());
    }
}
