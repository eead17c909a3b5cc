use std::sync::Arc;

use byteorder::{ByteOrder, NativeEndian};
use derive_more::Display;
use log::trace;
use spv::{BaseKind, MemberPathError, NumericType, ScalarKind, Shape,
    ShaderVariableType};

use crate::*;

#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum UniformError {
    #[display(fmt = "{}", _0)]
    Path(MemberPathError),
    /// The member's declared type does not match the written value.
    #[display(fmt = "`{}` is {}, not {}", member, found, expected)]
    TypeMismatch {
        member: String,
        expected: String,
        found: String,
    },
    #[display(fmt = "write of {} bytes at offset {} exceeds buffer size {}",
        len, offset, size)]
    OutOfBounds {
        offset: u32,
        len: u32,
        size: u32,
    },
}

impl std::error::Error for UniformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UniformError::Path(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MemberPathError> for UniformError {
    fn from(err: MemberPathError) -> Self {
        Self::Path(err)
    }
}

pub type UniformResult<T> = Result<T, UniformError>;

/// A resolved uniform member, detached from the buffer's type so that it
/// can be held across writes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UniformMember {
    pub name: String,
    /// Absolute byte offset within the buffer.
    pub offset: u32,
    /// Bytes covered by the member, or by the indexed element.
    pub size: u32,
    /// Bytes per array element, including padding.
    pub stride: u32,
    pub numeric: Option<NumericType>,
    /// Elements covered; 1 unless the path stops at an array.
    pub element_count: u32,
    /// Matrix data is laid out row by row.
    pub row_major: bool,
}

/// Host-side uniform buffer contents: one block per frame in flight.
/// Writes land in the current frame's block.
#[derive(Debug)]
pub struct UniformBuffer {
    id: ResourceId,
    ty: Arc<ShaderVariableType>,
    frames: Arc<FrameCounter>,
    blocks: Vec<Vec<u8>>,
}

impl UniformBuffer {
    pub(crate) fn new(
        id: ResourceId,
        ty: Arc<ShaderVariableType>,
        frames: Arc<FrameCounter>,
    ) -> DeviceResult<Self> {
        if ty.base_kind != BaseKind::Struct {
            return Err(err_msg!("uniform buffer type `{}` is not a struct",
                ty.name));
        }
        let blocks = (0..frames.frames_in_flight())
            .map(|_| vec![0u8; ty.size as usize])
            .collect();
        Ok(Self { id, ty, frames, blocks })
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn ty(&self) -> &Arc<ShaderVariableType> {
        &self.ty
    }

    pub fn size(&self) -> u32 {
        self.ty.size
    }

    /// Contents of the block for `frame`, or `None` if `frame` is not a
    /// frame in flight.
    pub fn data(&self, frame: u32) -> Option<&[u8]> {
        self.blocks.get(frame as usize).map(|block| &block[..])
    }

    pub fn current_data(&self) -> &[u8] {
        self.data(self.frames.current()).unwrap_or_default()
    }

    pub fn member_by_name(&self, path: &str) -> UniformResult<UniformMember> {
        let member = spv::member_by_path(&self.ty, path)?;
        let stride = member.member.stride;
        Ok(UniformMember {
            name: path.to_owned(),
            offset: member.offset,
            size: member.size,
            stride,
            numeric: member.ty().numeric,
            element_count: if stride == 0 { 1 } else { member.size / stride },
            row_major: member.member.row_major,
        })
    }

    pub fn set_data(&mut self, offset: u32, data: &[u8]) -> UniformResult<()> {
        let size = self.size();
        let len = data.len() as u32;
        let end = offset.checked_add(len).filter(|&end| end <= size);
        if end.is_none() || data.len() > u32::MAX as usize {
            return Err(UniformError::OutOfBounds { offset, len, size });
        }
        trace!("uniform `{}`: writing {} bytes at {}", self.ty.name, len,
            offset);
        let frame = self.frames.current() as usize;
        let start = offset as usize;
        if let Some(block) = self.blocks.get_mut(frame) {
            block[start..start + data.len()].copy_from_slice(data);
        }
        Ok(())
    }

    pub fn set_mat4(&mut self, member: &UniformMember, value: &[f32; 16]) ->
        UniformResult<()>
    {
        let shape = Shape::Matrix { columns: 4, rows: 4 };
        self.set_matrix(member, shape, value)
    }

    /// Writes a column-major 3x3 matrix, honoring the member's matrix
    /// stride. Row-major members receive the transpose.
    pub fn set_mat3(&mut self, member: &UniformMember, value: &[f32; 9]) ->
        UniformResult<()>
    {
        let shape = Shape::Matrix { columns: 3, rows: 3 };
        self.set_matrix(member, shape, value)
    }

    pub fn set_vec4(&mut self, member: &UniformMember, value: &[f32; 4]) ->
        UniformResult<()>
    {
        self.set_floats(member, Shape::Vector(4), value)
    }

    pub fn set_vec3(&mut self, member: &UniformMember, value: &[f32; 3]) ->
        UniformResult<()>
    {
        self.set_floats(member, Shape::Vector(3), value)
    }

    pub fn set_vec2(&mut self, member: &UniformMember, value: &[f32; 2]) ->
        UniformResult<()>
    {
        self.set_floats(member, Shape::Vector(2), value)
    }

    pub fn set_float(&mut self, member: &UniformMember, value: f32) ->
        UniformResult<()>
    {
        self.set_floats(member, Shape::Scalar, &[value])
    }

    pub fn set_int(&mut self, member: &UniformMember, value: i32) ->
        UniformResult<()>
    {
        check_type(member, NumericType::new(ScalarKind::I32, Shape::Scalar))?;
        let mut bytes = [0u8; 4];
        NativeEndian::write_i32(&mut bytes, value);
        self.set_data(member.offset, &bytes)
    }

    pub fn set_uint(&mut self, member: &UniformMember, value: u32) ->
        UniformResult<()>
    {
        check_type(member, NumericType::new(ScalarKind::U32, Shape::Scalar))?;
        let mut bytes = [0u8; 4];
        NativeEndian::write_u32(&mut bytes, value);
        self.set_data(member.offset, &bytes)
    }

    fn set_floats(&mut self, member: &UniformMember, shape: Shape,
        value: &[f32]) -> UniformResult<()>
    {
        check_type(member, NumericType::new(ScalarKind::F32, shape))?;
        let mut bytes = vec![0u8; value.len() * 4];
        NativeEndian::write_f32_into(value, &mut bytes);
        self.set_data(member.offset, &bytes)
    }

    fn set_matrix(&mut self, member: &UniformMember, shape: Shape,
        value: &[f32]) -> UniformResult<()>
    {
        check_type(member, NumericType::new(ScalarKind::F32, shape))?;
        let (columns, rows) = match shape {
            Shape::Matrix { columns, rows } => (columns as usize, rows as usize),
            _ => (1, shape.components() as usize),
        };
        // `value` is column-major; each stored vector is a column, or a
        // row when the member is row-major.
        let (vectors, len) = if member.row_major {
            (rows, columns)
        } else {
            (columns, rows)
        };
        let vector_stride = member.size / vectors as u32;
        let mut vector = vec![0f32; len];
        for i in 0..vectors {
            for (j, elem) in vector.iter_mut().enumerate() {
                let (column, row) = if member.row_major { (j, i) } else { (i, j) };
                *elem = value[column * rows + row];
            }
            let mut bytes = vec![0u8; len * 4];
            NativeEndian::write_f32_into(&vector, &mut bytes);
            self.set_data(member.offset + i as u32 * vector_stride, &bytes)?;
        }
        Ok(())
    }
}

fn check_type(member: &UniformMember, expected: NumericType) ->
    UniformResult<()>
{
    let found = match member.numeric {
        Some(numeric) if member.element_count == 1 => numeric,
        Some(numeric) => return Err(mismatch(member, expected,
            format!("an array of {:?}", numeric))),
        None => return Err(mismatch(member, expected,
            "not numeric".to_owned())),
    };
    if found != expected {
        return Err(mismatch(member, expected, format!("{:?}", found)));
    }
    Ok(())
}

fn mismatch(member: &UniformMember, expected: NumericType, found: String) ->
    UniformError
{
    UniformError::TypeMismatch {
        member: member.name.clone(),
        expected: format!("{:?}", expected),
        found,
    }
}
