use rspirv::{self, dr};
use rspirv::binary::{Consumer, ParseAction};
use spirv_headers as spv;

use crate::data::{self, Module, Type};
use crate::{ReflectError as Error, ReflectResult as Result};

#[derive(Debug)]
struct RawModule {
    header: dr::ModuleHeader,
    instructions: Vec<dr::Instruction>,
}

impl RawModule {
    fn new() -> Self {
        Self {
            header: dr::ModuleHeader::new(0),
            instructions: Default::default(),
        }
    }

    #[inline]
    fn occurrences(&self, opcode: spv::Op) ->
        impl Iterator<Item = &'_ dr::Instruction> + '_
    {
        self.instructions.iter()
            .filter(move |inst| inst.class.opcode == opcode)
    }
}

macro_rules! parse_operand {
    ($operands:expr, $variant:ident) => {
        match $operands.next() {
            Some(dr::Operand::$variant(val)) => val.clone(),
            _ => return Err(Error::invalid(
                concat!("expected operand ", stringify!($variant)))),
        }
    };
    ($operands:expr, $variant:ident?) => {
        match $operands.next() {
            Some(dr::Operand::$variant(val)) => Some(val.clone()),
            _ => None,
        }
    };
    ($operands:expr, $variant:ident*) => {
        $operands.filter_map(|operand| match operand {
            dr::Operand::$variant(val) => Some(val.clone()),
            _ => None,
        }).collect::<Vec<_>>()
    };
}

fn result_id(inst: &dr::Instruction) -> Result<u32> {
    inst.result_id.ok_or_else(|| Error::invalid("missing result id"))
}

fn header_version(header: &dr::ModuleHeader) -> data::Version {
    let byte = |word: u32, n| ((word >> (8 * n)) & 0xffu32) as u8;
    (byte(header.version, 2), byte(header.version, 1))
}

fn raise_module(raw: &RawModule) -> Result<Module> {
    let mut module = Module::new(header_version(&raw.header));
    build_decoration_sets(&mut module, raw)?;
    raise_types(&mut module, raw)?;
    raise_variables(&mut module, raw)?;
    raise_entry_points(&mut module, raw)?;
    Ok(module)
}

fn build_decoration_sets(module: &mut Module, raw: &RawModule) -> Result<()> {
    for inst in raw.instructions.iter() {
        let operands = &inst.operands;
        match inst.class.opcode {
            spv::Op::Decorate => apply_decoration(module, operands)?,
            spv::Op::MemberDecorate =>
                apply_member_decoration(module, operands)?,
            spv::Op::Name => apply_name(module, operands)?,
            spv::Op::MemberName => apply_member_name(module, operands)?,
            _ => {},
        }
    }
    Ok(())
}

fn apply_decoration(module: &mut Module, operands: &[dr::Operand]) ->
    Result<()>
{
    let mut ops = operands.iter();
    let target = parse_operand!(ops, IdRef);
    let decoration = parse_operand!(ops, Decoration);
    let decos = module.decorations.entry(target).or_default();
    match decoration {
        spv::Decoration::Location => {
            decos.location = Some(parse_operand!(ops, LiteralInt32));
        },
        spv::Decoration::Binding => {
            decos.binding = Some(parse_operand!(ops, LiteralInt32));
        },
        spv::Decoration::DescriptorSet => {
            decos.set = Some(parse_operand!(ops, LiteralInt32));
        },
        spv::Decoration::ArrayStride => {
            decos.array_stride = Some(parse_operand!(ops, LiteralInt32));
        },
        spv::Decoration::Block => decos.block = true,
        spv::Decoration::BufferBlock => decos.buffer_block = true,
        spv::Decoration::BuiltIn => decos.builtin = true,
        _ => {},
    }
    Ok(())
}

fn apply_member_decoration(module: &mut Module, operands: &[dr::Operand]) ->
    Result<()>
{
    let mut ops = operands.iter();
    let target = parse_operand!(ops, IdRef);
    let member = parse_operand!(ops, LiteralInt32);
    let decoration = parse_operand!(ops, Decoration);
    let decos = module.member_decorations.entry((target, member))
        .or_default();
    match decoration {
        spv::Decoration::Offset => {
            decos.offset = Some(parse_operand!(ops, LiteralInt32));
        },
        spv::Decoration::MatrixStride => {
            decos.matrix_stride = Some(parse_operand!(ops, LiteralInt32));
        },
        spv::Decoration::RowMajor => decos.row_major = true,
        spv::Decoration::ColMajor => decos.row_major = false,
        spv::Decoration::BuiltIn => decos.builtin = true,
        _ => {},
    }
    Ok(())
}

fn apply_name(module: &mut Module, operands: &[dr::Operand]) -> Result<()> {
    let mut ops = operands.iter();
    let target = parse_operand!(ops, IdRef);
    let name = parse_operand!(ops, LiteralString);
    module.names.insert(target, name);
    Ok(())
}

fn apply_member_name(module: &mut Module, operands: &[dr::Operand]) ->
    Result<()>
{
    let mut ops = operands.iter();
    let target = parse_operand!(ops, IdRef);
    let member = parse_operand!(ops, LiteralInt32);
    let name = parse_operand!(ops, LiteralString);
    module.member_names.insert((target, member), name);
    Ok(())
}

fn raise_types(module: &mut Module, raw: &RawModule) -> Result<()> {
    for inst in raw.instructions.iter() {
        let mut ops = inst.operands.iter();
        let ty = match inst.class.opcode {
            spv::Op::TypeVoid => Type::Void,
            spv::Op::TypeBool => Type::Bool,
            spv::Op::TypeInt => {
                let width = parse_operand!(ops, LiteralInt32);
                let signed = parse_operand!(ops, LiteralInt32) != 0;
                Type::Int { width, signed }
            },
            spv::Op::TypeFloat => Type::Float {
                width: parse_operand!(ops, LiteralInt32),
            },
            spv::Op::TypeVector => {
                let component = parse_operand!(ops, IdRef);
                let count = parse_operand!(ops, LiteralInt32);
                Type::Vector { component, count }
            },
            spv::Op::TypeMatrix => {
                let column = parse_operand!(ops, IdRef);
                let count = parse_operand!(ops, LiteralInt32);
                Type::Matrix { column, count }
            },
            spv::Op::TypeImage => Type::Image,
            spv::Op::TypeSampler => Type::Sampler,
            spv::Op::TypeSampledImage => Type::SampledImage,
            spv::Op::TypeArray => {
                let elem = parse_operand!(ops, IdRef);
                let length = parse_operand!(ops, IdRef);
                Type::Array { elem, length }
            },
            spv::Op::TypeRuntimeArray => Type::RuntimeArray {
                elem: parse_operand!(ops, IdRef),
            },
            spv::Op::TypeStruct => Type::Struct {
                members: parse_operand!(ops, IdRef*),
            },
            spv::Op::TypePointer => {
                let storage_class = parse_operand!(ops, StorageClass);
                let pointee = parse_operand!(ops, IdRef);
                Type::Pointer { storage_class, pointee }
            },
            spv::Op::TypeFunction => Type::Function,
            spv::Op::Constant | spv::Op::SpecConstant => {
                raise_constant(module, inst)?;
                continue;
            },
            _ => continue,
        };
        module.types.insert(result_id(inst)?, ty);
    }
    Ok(())
}

// Only integer constants matter here: they size arrays.
fn raise_constant(module: &mut Module, inst: &dr::Instruction) -> Result<()> {
    let value = match inst.operands.first() {
        Some(&dr::Operand::LiteralInt32(val)) => val as u64,
        Some(&dr::Operand::LiteralInt64(val)) => val,
        _ => return Ok(()),
    };
    module.constants.insert(result_id(inst)?, value);
    Ok(())
}

fn raise_variables(module: &mut Module, raw: &RawModule) -> Result<()> {
    for inst in raw.occurrences(spv::Op::Variable) {
        raise_variable(module, inst)?;
    }
    Ok(())
}

fn raise_variable(module: &mut Module, inst: &dr::Instruction) -> Result<()> {
    let mut ops = inst.operands.iter();
    let id = result_id(inst)?;
    let ty = inst.result_type
        .ok_or_else(|| Error::invalid("variable without a type"))?;

    let storage_class = parse_operand!(ops, StorageClass);
    if storage_class == spv::StorageClass::Function { return Ok(()); }

    module.variables.push(data::Variable { id, ty, storage_class });
    Ok(())
}

fn raise_entry_points(module: &mut Module, raw: &RawModule) -> Result<()> {
    for inst in raw.occurrences(spv::Op::EntryPoint) {
        raise_entry_point(module, inst)?;
    }
    Ok(())
}

fn raise_entry_point(module: &mut Module, inst: &dr::Instruction) ->
    Result<()>
{
    let mut ops = inst.operands.iter();
    let execution_model = parse_operand!(ops, ExecutionModel);
    let _function = parse_operand!(ops, IdRef);
    let name = parse_operand!(ops, LiteralString);
    let interface = parse_operand!(ops, IdRef*);

    module.entry_points.push(data::EntryPoint {
        execution_model,
        name,
        interface,
    });
    Ok(())
}

impl Consumer for RawModule {
    fn initialize(&mut self) -> ParseAction {
        ParseAction::Continue
    }

    fn finalize(&mut self) -> ParseAction {
        ParseAction::Continue
    }

    fn consume_header(&mut self, header: dr::ModuleHeader) -> ParseAction {
        self.instructions.reserve(header.bound as usize);
        self.header = header;
        ParseAction::Continue
    }

    fn consume_instruction(&mut self, inst: dr::Instruction) -> ParseAction {
        self.instructions.push(inst);
        ParseAction::Continue
    }
}

/// Parses a module from a stream of SPIR-V words.
pub fn parse_words(words: &impl AsRef<[u32]>) -> Result<Module> {
    let mut raw = RawModule::new();
    rspirv::binary::parse_words(words, &mut raw)
        .map_err(|err| Error::invalid(format!("{:?}", err)))?;
    raise_module(&raw)
}

/// Parses a module from its byte encoding.
pub fn parse_bytes(bytes: &impl AsRef<[u8]>) -> Result<Module> {
    let mut raw = RawModule::new();
    rspirv::binary::parse_bytes(bytes, &mut raw)
        .map_err(|err| Error::invalid(format!("{:?}", err)))?;
    raise_module(&raw)
}
