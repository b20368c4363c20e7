//! Binary type/field descriptor file parsing.
//!
//! A descriptor file is the product of the offline metadata extractor: it mines a compiled
//! program's debug-symbol database once, at build time, and writes out every reflected
//! type's name, size, kind, fields and offsets. The registry consumes the file at startup;
//! after that the extractor plays no further role.
//!
//! # Wire format
//!
//! All integers are fixed-width little-endian; strings are bounded NUL-terminated ASCII.
//!
//! ```text
//! int32   numTypes
//! int32   numFieldEditInfos
//! FieldEditInfo[numFieldEditInfos]   { float min; float max; ASCIIZ help(<=63) }
//! Type[numTypes]:
//!   ASCIIZ name(<=511)
//!   uint32 size
//!   int32  reflectionKind
//!   if CLASS:
//!     uint32 baseClassId; uint16 baseClassOffset
//!     uint32 createInstanceAddr (extractor-relative, 0 = none)
//!     uint32 initDispatchAddr   (extractor-relative, 0 = none)
//!     int32  numFields
//!     Field[numFields]: uint32 typeId; uint16 offset; uint16 flags;
//!                       uint16 fieldEditIndex(0xFFFF = none); ASCIIZ name(<=127)
//!   if ENUM:
//!     int32 numConstants
//!     Constant[numConstants]: ASCIIZ name(<=127); int32 value
//!   if POINTER: uint32 pointedTypeId
//!   if ARRAY:   uint32 elementTypeId; int32 numElements
//! ```
//!
//! The hook address fields are relative to the extracted module's load address and are
//! meaningless inside another process; they are retained only as *declarations* (zero /
//! non-zero). Executable hooks are bound separately via
//! [`crate::TypeRegistry::bind_instance_hooks`].
//!
//! Declaration order carries no meaning: a class may reference a base or field type that
//! appears later in the file (or not at all, until a second descriptor is loaded).
//! Resolution happens in [`crate::TypeRegistry::post_init`].

use std::path::Path;
use std::sync::Arc;

use log::{debug, trace};

use crate::{
    file::parser::Parser,
    reflection::{
        BaseClass, EnumConstant, Field, FieldEditInfo, FieldFlags, ReflectionKind, Type,
        TypeClass, TypeRegistry, TypeTag,
    },
    File, Result,
};

/// Maximum type display name length in bytes, excluding the terminator.
pub const MAX_TYPE_NAME: usize = 511;
/// Maximum field and enum constant name length in bytes, excluding the terminator.
pub const MAX_FIELD_NAME: usize = 127;

/// Sentinel edit-info index marking "no edit info".
const INVALID_EDIT_INDEX: u16 = 0xFFFF;

/// Parse a descriptor image and register every type it declares.
///
/// Field edit infos are shared into the registry's side table. The registry is left in
/// the *building* state; run [`crate::TypeRegistry::post_init`] once all descriptors of
/// the session are loaded (or use [`load_descriptor_file`], which does it for you).
///
/// # Errors
/// [`crate::Error::Malformed`] / [`crate::Error::OutOfBounds`] for damaged input,
/// [`crate::Error::DuplicateType`] if a declared type is already registered.
pub fn load_descriptor(registry: &TypeRegistry, data: &[u8]) -> Result<()> {
    let mut parser = Parser::new(data);

    let num_types = read_count(&mut parser, "type")?;
    let num_edit_infos = read_count(&mut parser, "field edit info")?;

    let mut edit_infos = Vec::with_capacity(num_edit_infos);
    for _ in 0..num_edit_infos {
        let limit_min = parser.read_le::<f32>()?;
        let limit_max = parser.read_le::<f32>()?;
        let help = parser.read_asciiz(FieldEditInfo::MAX_HELP)?;
        edit_infos.push(Arc::new(FieldEditInfo {
            limit_min,
            limit_max,
            help,
        }));
    }

    for _ in 0..num_types {
        let ty = read_type(&mut parser, &edit_infos)?;
        trace!("descriptor type '{}' ({} bytes)", ty.name(), ty.size());
        registry.add_type(ty)?;
    }

    registry.add_field_edit_infos(edit_infos);
    debug!(
        "descriptor registered {} types, {} edit infos",
        num_types, num_edit_infos
    );
    Ok(())
}

/// Map a descriptor file, register its contents, and resolve the registry.
///
/// # Errors
/// [`crate::Error::Io`] for open/map failures, plus everything [`load_descriptor`]
/// and [`crate::TypeRegistry::post_init`] can report.
pub fn load_descriptor_file(registry: &TypeRegistry, path: &Path) -> Result<()> {
    let file = File::from_file(path)?;
    load_descriptor(registry, file.data())?;
    registry.post_init()
}

fn read_count(parser: &mut Parser<'_>, what: &str) -> Result<usize> {
    let count = parser.read_le::<i32>()?;
    usize::try_from(count).map_err(|_| malformed_error!("negative {} count {}", what, count))
}

fn read_type(parser: &mut Parser<'_>, edit_infos: &[Arc<FieldEditInfo>]) -> Result<Type> {
    let name = parser.read_asciiz(MAX_TYPE_NAME)?;
    let size = parser.read_le::<u32>()?;
    let kind_raw = parser.read_le::<i32>()?;
    let Some(kind) = ReflectionKind::from_repr(kind_raw) else {
        return Err(malformed_error!(
            "invalid reflection kind {} for type '{}'",
            kind_raw,
            name
        ));
    };

    match kind {
        ReflectionKind::Fundamental => Ok(Type::fundamental(name, size)),
        ReflectionKind::Class => read_class(parser, edit_infos, name, size),
        ReflectionKind::Enum => {
            let num_constants = read_count(parser, "enum constant")?;
            let mut constants = Vec::with_capacity(num_constants);
            for _ in 0..num_constants {
                let constant_name = parser.read_asciiz(MAX_FIELD_NAME)?;
                let value = parser.read_le::<i32>()?;
                constants.push(EnumConstant::new(constant_name, value));
            }
            Ok(Type::enumeration(name, size, constants))
        }
        ReflectionKind::Pointer => {
            let pointee = TypeTag::new(parser.read_le::<u32>()?);
            Ok(Type::pointer(name, size, pointee))
        }
        ReflectionKind::Array => {
            let element = TypeTag::new(parser.read_le::<u32>()?);
            let count = read_count(parser, "array element")?;
            let count = u32::try_from(count)
                .map_err(|_| malformed_error!("array element count {} out of range", count))?;
            Ok(Type::array(name, size, element, count))
        }
    }
}

fn read_class(
    parser: &mut Parser<'_>,
    edit_infos: &[Arc<FieldEditInfo>],
    name: String,
    size: u32,
) -> Result<Type> {
    let base_tag = TypeTag::new(parser.read_le::<u32>()?);
    let base_offset = parser.read_le::<u16>()?;
    let create_addr = parser.read_le::<u32>()?;
    let dispatch_addr = parser.read_le::<u32>()?;

    let owner = TypeTag::from_name(&name);
    let num_fields = read_count(parser, "field")?;
    let mut fields = Vec::with_capacity(num_fields);
    for _ in 0..num_fields {
        fields.push(read_field(parser, edit_infos, owner)?);
    }

    let base = (!base_tag.is_none()).then(|| BaseClass::new(base_tag, base_offset));
    let class = TypeClass::new(base, fields)
        .with_declared_hooks(create_addr != 0, dispatch_addr != 0);
    Ok(Type::class(name, size, class))
}

fn read_field(
    parser: &mut Parser<'_>,
    edit_infos: &[Arc<FieldEditInfo>],
    owner: TypeTag,
) -> Result<Field> {
    let type_tag = TypeTag::new(parser.read_le::<u32>()?);
    let offset = parser.read_le::<u16>()?;
    let flags = FieldFlags::from_bits_retain(parser.read_le::<u16>()?);
    let edit_index = parser.read_le::<u16>()?;
    let name = parser.read_asciiz(MAX_FIELD_NAME)?;

    let edit_info = if edit_index == INVALID_EDIT_INDEX {
        None
    } else {
        let Some(info) = edit_infos.get(usize::from(edit_index)) else {
            return Err(malformed_error!(
                "field '{}' references edit info {} of {}",
                name,
                edit_index,
                edit_infos.len()
            ));
        };
        Some(info.clone())
    };

    Ok(Field::new(name, type_tag, offset, owner, edit_info).with_flags(flags))
}
