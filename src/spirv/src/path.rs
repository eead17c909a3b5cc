use crate::{MemberPathError, ShaderVariableType, StructMember};

/// A resolved member path: the final member plus the byte range it
/// covers within the root variable.
#[derive(Clone, Copy, Debug)]
pub struct MemberRef<'t> {
    pub member: &'t StructMember,
    pub offset: u32,
    pub size: u32,
}

impl<'t> MemberRef<'t> {
    pub fn ty(&self) -> &'t ShaderVariableType {
        &self.member.ty
    }
}

/// Resolves a dotted path such as `"transform.model"` against a struct
/// type. Numeric segments index into the preceding array member, as in
/// `"lights.2.intensity"`.
pub fn member_by_path<'t>(root: &'t ShaderVariableType, path: &str) ->
    Result<MemberRef<'t>, MemberPathError>
{
    if path.is_empty() { return Err(MemberPathError::EmptyPath); }

    let mut ty = root;
    let mut member: Option<&'t StructMember> = None;
    // Array dimensions of `member` already indexed into.
    let mut indexed = 0;
    let mut extra = 0;

    for segment in path.split('.') {
        if let Ok(index) = segment.parse::<u32>() {
            let current = member
                .ok_or_else(|| MemberPathError::NotAnArray(root.name.clone()))?;
            let dims = &current.ty.array_sizes;
            let len = *dims.get(indexed).ok_or_else(||
                MemberPathError::NotAnArray(current.name.clone()))?;
            if index >= len {
                return Err(MemberPathError::IndexOutOfRange {
                    name: current.name.clone(),
                    index,
                    len,
                });
            }
            let inner: u32 = dims[indexed + 1..].iter().product();
            extra += index * current.stride * inner;
            indexed += 1;
        } else {
            if ty.structure.is_none() {
                let name = member.map_or(&ty.name, |m| &m.name);
                return Err(MemberPathError::NotAStruct(name.clone()));
            }
            let next = ty.member_by_name(segment).ok_or_else(||
                MemberPathError::MemberNotFound(segment.to_owned()))?;
            member = Some(next);
            ty = &next.ty;
            indexed = 0;
        }
    }

    // A non-empty path always yields at least one segment, and the
    // first segment must name a member.
    let member = member
        .ok_or_else(|| MemberPathError::NotAnArray(root.name.clone()))?;
    let remaining: u32 = member.ty.array_sizes[indexed..].iter().product();
    Ok(MemberRef {
        member,
        offset: member.offset + extra,
        size: member.stride * remaining,
    })
}

#[cfg(test)]
mod tests {
    use crate::*;

    fn float(array_sizes: Vec<u32>) -> ShaderVariableType {
        let num = NumericType::new(ScalarKind::F32, Shape::Scalar);
        ShaderVariableType::numeric("float", num, array_sizes).unwrap()
    }

    fn member(name: &str, ty: ShaderVariableType, offset: u32, stride: u32)
        -> StructMember
    {
        StructMember {
            name: name.to_owned(),
            ty,
            member_offset: offset,
            offset,
            stride,
            row_major: false,
        }
    }

    // struct Light { vec3 pos; float intensity; }
    // struct Scene { float time; Light lights[3]; float weights[2][2]; }
    fn scene() -> ShaderVariableType {
        let vec3 = NumericType::new(ScalarKind::F32, Shape::Vector(3));
        let light = |base| ShaderVariableType::structure("Light", vec![
            StructMember {
                name: "pos".to_owned(),
                ty: ShaderVariableType::numeric("", vec3, vec![]).unwrap(),
                member_offset: 0,
                offset: base,
                stride: 12,
                row_major: false,
            },
            StructMember {
                name: "intensity".to_owned(),
                ty: float(vec![]),
                member_offset: 12,
                offset: base + 12,
                stride: 4,
                row_major: false,
            },
        ], vec![3], 16).unwrap();
        ShaderVariableType::structure("Scene", vec![
            member("time", float(vec![]), 0, 4),
            member("lights", light(16), 16, 16),
            member("weights", float(vec![2, 2]), 64, 16),
        ], vec![], 128).unwrap()
    }

    #[test]
    fn plain_member() {
        let scene = scene();
        let time = member_by_path(&scene, "time").unwrap();
        assert_eq!((time.offset, time.size), (0, 4));
        assert_eq!(time.member.name, "time");
    }

    #[test]
    fn array_elements() {
        let scene = scene();

        let lights = member_by_path(&scene, "lights").unwrap();
        assert_eq!((lights.offset, lights.size), (16, 48));

        let light = member_by_path(&scene, "lights.2").unwrap();
        assert_eq!((light.offset, light.size), (48, 16));

        let intensity = member_by_path(&scene, "lights.1.intensity").unwrap();
        assert_eq!((intensity.offset, intensity.size), (16 + 16 + 12, 4));

        let row = member_by_path(&scene, "weights.1").unwrap();
        assert_eq!((row.offset, row.size), (64 + 32, 32));
        let elem = member_by_path(&scene, "weights.1.1").unwrap();
        assert_eq!((elem.offset, elem.size), (64 + 32 + 16, 16));
    }

    #[test]
    fn errors() {
        let scene = scene();
        assert_eq!(member_by_path(&scene, "").unwrap_err(),
            MemberPathError::EmptyPath);
        assert_eq!(member_by_path(&scene, "lights.0.color").unwrap_err(),
            MemberPathError::MemberNotFound("color".to_owned()));
        assert_eq!(member_by_path(&scene, "time.x").unwrap_err(),
            MemberPathError::NotAStruct("time".to_owned()));
        assert_eq!(member_by_path(&scene, "time.0").unwrap_err(),
            MemberPathError::NotAnArray("time".to_owned()));
        assert_eq!(member_by_path(&scene, "0").unwrap_err(),
            MemberPathError::NotAnArray("Scene".to_owned()));
        assert_eq!(member_by_path(&scene, "lights.3").unwrap_err(),
            MemberPathError::IndexOutOfRange {
                name: "lights".to_owned(),
                index: 3,
                len: 3,
            });
    }

    #[test]
    fn missing_name_precedes_indexing() {
        let scene = scene();
        assert_eq!(member_by_path(&scene, "spots.0.intensity").unwrap_err(),
            MemberPathError::MemberNotFound("spots".to_owned()));
    }
}
