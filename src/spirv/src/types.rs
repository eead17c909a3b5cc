//! The shader variable type model.
//!
//! A [`ShaderVariableType`] describes the shape of one shader-visible
//! variable: its base kind, numeric layout or struct members, array
//! extents and total byte size. Types are built once by reflection and
//! never mutated afterwards.

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BaseKind {
    Numeric,
    Struct,
    Image,
    Sampler,
    SampledImage,
}

impl BaseKind {
    /// True for the opaque resource kinds, which occupy no buffer
    /// storage.
    pub fn is_opaque(self) -> bool {
        match self {
            BaseKind::Image | BaseKind::Sampler | BaseKind::SampledImage =>
                true,
            BaseKind::Numeric | BaseKind::Struct => false,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ScalarKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl ScalarKind {
    pub(crate) fn int(width: u32, signed: bool) -> Option<Self> {
        use ScalarKind::*;
        Some(match (width, signed) {
            (8, true) => I8,
            (16, true) => I16,
            (32, true) => I32,
            (64, true) => I64,
            (8, false) => U8,
            (16, false) => U16,
            (32, false) => U32,
            (64, false) => U64,
            _ => return None,
        })
    }

    pub(crate) fn float(width: u32) -> Option<Self> {
        match width {
            32 => Some(ScalarKind::F32),
            64 => Some(ScalarKind::F64),
            _ => None,
        }
    }

    /// Size in bytes.
    pub fn size(self) -> u32 {
        use ScalarKind::*;
        match self {
            I8 | U8 => 1,
            I16 | U16 => 2,
            I32 | U32 | F32 => 4,
            I64 | U64 | F64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        [ScalarKind::F32, ScalarKind::F64].contains(&self)
    }

    pub fn is_signed(self) -> bool {
        use ScalarKind::*;
        [I8, I16, I32, I64, F32, F64].contains(&self)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Shape {
    Scalar,
    Vector(u32),
    Matrix { columns: u32, rows: u32 },
}

impl Shape {
    pub fn components(self) -> u32 {
        match self {
            Shape::Scalar => 1,
            Shape::Vector(n) => n,
            Shape::Matrix { columns, rows } => columns * rows,
        }
    }

    pub fn checked_components(self) -> Option<u32> {
        match self {
            Shape::Matrix { columns, rows } => columns.checked_mul(rows),
            _ => Some(self.components()),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NumericType {
    pub scalar: ScalarKind,
    pub shape: Shape,
}

impl NumericType {
    pub fn new(scalar: ScalarKind, shape: Shape) -> Self {
        Self { scalar, shape }
    }

    /// Tightly packed size of one element.
    pub fn size(&self) -> u32 {
        self.scalar.size() * self.shape.components()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StructType {
    /// Members in declaration order; never empty.
    pub members: Vec<StructMember>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StructMember {
    pub name: String,
    pub ty: ShaderVariableType,
    /// Offset from the start of the enclosing struct.
    pub member_offset: u32,
    /// Offset from the start of the root variable.
    pub offset: u32,
    /// Byte distance between consecutive array elements, or the
    /// declared size of the member if it is not an array.
    pub stride: u32,
    /// Matrices are stored row by row rather than column by column.
    pub row_major: bool,
}

impl StructMember {
    /// Bytes the member occupies in its parent, padding included.
    pub fn declared_size(&self) -> u32 {
        self.stride * self.ty.element_count()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShaderVariableType {
    pub name: String,
    pub base_kind: BaseKind,
    /// Present iff `base_kind` is `Numeric`.
    pub numeric: Option<NumericType>,
    /// Present iff `base_kind` is `Struct`.
    pub structure: Option<StructType>,
    /// Array extents, outermost first.
    pub array_sizes: Vec<u32>,
    /// Total size including every array extent.
    pub size: u32,
}

fn checked_count(array_sizes: &[u32]) -> Option<u32> {
    array_sizes.iter().try_fold(1u32, |acc, &n| acc.checked_mul(n))
}

// The constructors return `None` when the element count or total size
// does not fit in 32 bits.
impl ShaderVariableType {
    pub fn numeric(
        name: impl Into<String>,
        numeric: NumericType,
        array_sizes: Vec<u32>,
    ) -> Option<Self> {
        let element_size = numeric.scalar.size()
            .checked_mul(numeric.shape.checked_components()?)?;
        let size = element_size.checked_mul(checked_count(&array_sizes)?)?;
        Some(Self {
            name: name.into(),
            base_kind: BaseKind::Numeric,
            numeric: Some(numeric),
            structure: None,
            array_sizes,
            size,
        })
    }

    /// Builds a struct type. `element_size` is the size of one element
    /// as reported by the shader's layout decorations.
    pub fn structure(
        name: impl Into<String>,
        members: Vec<StructMember>,
        array_sizes: Vec<u32>,
        element_size: u32,
    ) -> Option<Self> {
        assert!(!members.is_empty());
        let size = element_size.checked_mul(checked_count(&array_sizes)?)?;
        Some(Self {
            name: name.into(),
            base_kind: BaseKind::Struct,
            numeric: None,
            structure: Some(StructType { members }),
            array_sizes,
            size,
        })
    }

    pub fn opaque(
        name: impl Into<String>,
        base_kind: BaseKind,
        array_sizes: Vec<u32>,
    ) -> Option<Self> {
        assert!(base_kind.is_opaque());
        checked_count(&array_sizes)?;
        Some(Self {
            name: name.into(),
            base_kind,
            numeric: None,
            structure: None,
            array_sizes,
            size: 0,
        })
    }

    pub fn is_array(&self) -> bool {
        !self.array_sizes.is_empty()
    }

    /// Product of all array extents; 1 for non-arrays.
    pub fn element_count(&self) -> u32 {
        self.array_sizes.iter().product()
    }

    pub fn element_size(&self) -> u32 {
        match self.element_count() {
            0 => 0,
            n => self.size / n,
        }
    }

    pub fn members(&self) -> &[StructMember] {
        match self.structure {
            Some(ref structure) => &structure.members,
            None => &[],
        }
    }

    /// Looks up an immediate member by name.
    pub fn member_by_name(&self, name: &str) -> Option<&StructMember> {
        self.members().iter().find(|member| member.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec3() -> ShaderVariableType {
        let num = NumericType::new(ScalarKind::F32, Shape::Vector(3));
        ShaderVariableType::numeric("", num, vec![]).unwrap()
    }

    #[test]
    fn numeric_sizes() {
        let mat = NumericType::new(
            ScalarKind::F32,
            Shape::Matrix { columns: 4, rows: 4 },
        );
        assert_eq!(mat.size(), 64);
        assert_eq!(ShaderVariableType::numeric("", mat, vec![2, 3])
            .unwrap().size, 64 * 6);
        assert_eq!(vec3().size, 12);
        let d = NumericType::new(ScalarKind::F64, Shape::Vector(2));
        assert_eq!(d.size(), 16);
    }

    #[test]
    fn scalar_kinds() {
        assert_eq!(ScalarKind::int(16, false), Some(ScalarKind::U16));
        assert_eq!(ScalarKind::int(24, true), None);
        assert_eq!(ScalarKind::float(16), None);
        assert!(ScalarKind::F32.is_signed());
        assert!(!ScalarKind::U64.is_float());
    }

    #[test]
    fn struct_members() {
        let color = StructMember {
            name: "color".to_owned(),
            ty: vec3(),
            member_offset: 0,
            offset: 0,
            stride: 16,
            row_major: false,
        };
        let ty = ShaderVariableType::structure(
            "Light", vec![color], vec![4], 16).unwrap();
        assert_eq!(ty.size, 64);
        assert_eq!(ty.element_size(), 16);
        assert_eq!(ty.member_by_name("color").map(|m| m.declared_size()),
            Some(16));
        assert!(ty.member_by_name("intensity").is_none());
        assert!(vec3().members().is_empty());
    }

    #[test]
    fn opaque_has_no_size() {
        let ty = ShaderVariableType::opaque("", BaseKind::SampledImage,
            vec![3]).unwrap();
        assert_eq!(ty.size, 0);
        assert_eq!(ty.element_size(), 0);
        assert!(ty.is_array());
    }

    #[test]
    fn sizes_fit_in_u32() {
        let vec4 = NumericType::new(ScalarKind::F32, Shape::Vector(4));
        assert!(ShaderVariableType::numeric("", vec4, vec![0x1000_0000])
            .is_none());
        assert_eq!(ShaderVariableType::numeric("", vec4, vec![0x0fff_ffff])
            .map(|ty| ty.size), Some(0xffff_fff0));
        assert!(ShaderVariableType::opaque("", BaseKind::Image,
            vec![0x1_0000, 0x1_0000]).is_none());
        let huge = NumericType::new(ScalarKind::F64,
            Shape::Matrix { columns: 0x8000_0000, rows: 2 });
        assert!(ShaderVariableType::numeric("", huge, vec![]).is_none());
    }
}
