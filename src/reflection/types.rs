//! The reflected type model.
//!
//! A [`Type`] is a tagged record describing one reflected type: its identity
//! ([`crate::TypeTag`]), display name, byte size and kind-specific payload. Types are pure
//! data - they carry no behavior beyond description, plus the two per-class instance hooks
//! the load-in-place engine needs ("construct a default instance" and "install the dispatch
//! table at an existing address").
//!
//! Cross-references between types (base classes, field types, pointees, array elements)
//! start out symbolic and are resolved into shared [`TypeRc`] records by
//! [`crate::TypeRegistry::post_init`], so declaration order never matters.
//!
//! # Key Components
//!
//! - [`ReflectionKind`] - the variant tag
//! - [`Type`] / [`TypeKind`] - the record and its kind payloads
//! - [`TypeClass`], [`BaseClass`] - class layout: base chain, ordered fields, hooks
//! - [`TypeEnum`], [`EnumConstant`] - named integer constants
//! - [`TypePointer`], [`TypeArray`] - pointee/element references
//!
//! # Examples
//!
//! ```rust
//! use typescope::{ReflectionKind, Type, TypeTag};
//!
//! let ty = Type::pointer("Sprite*", 8, TypeTag::from_name("Sprite"));
//! assert_eq!(ty.kind(), ReflectionKind::Pointer);
//! assert_eq!(ty.as_pointer().unwrap().pointee_tag(), TypeTag::from_name("Sprite"));
//! ```

use std::sync::OnceLock;

use crate::{
    reflection::{Field, TypeRegistry, TypeTag},
    Result,
};

/// Constructs a default instance on the heap and returns its address.
///
/// Ownership of the allocation transfers to the caller. The hook is expected to
/// allocate with the global allocator so the instance can be released generically.
pub type CreateInstanceFn = fn() -> *mut u8;

/// Installs the dispatch-table reference of a class at an existing address.
///
/// The hook must write only the stored dispatch slot(s) - it must not touch any other
/// byte and must not run any constructor logic. The load-in-place engine calls it on
/// memory whose fields were populated by a bulk byte copy.
///
/// # Safety
/// The address must point at storage of at least the class's registered size.
pub type InstallDispatchFn = unsafe fn(*mut u8);

/// The tag distinguishing the reflected type variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::FromRepr)]
#[repr(i32)]
pub enum ReflectionKind {
    /// Scalar built-in type (integers, floats, `bool`).
    Fundamental = 0,
    /// Composite type with fields, an optional base class, and optional hooks.
    Class = 1,
    /// Named integer constants.
    Enum = 2,
    /// Pointer to another reflected type.
    Pointer = 3,
    /// Fixed-size array of another reflected type.
    Array = 4,
}

/// A reflected type record.
///
/// Identity is the [`TypeTag`] (hash of the display name); records are owned exclusively
/// by the [`crate::TypeRegistry`] and shared as [`TypeRc`].
#[derive(Debug)]
pub struct Type {
    tag: TypeTag,
    name: String,
    size: u32,
    kind: TypeKind,
}

/// Kind-specific payload of a [`Type`].
#[derive(Debug)]
pub enum TypeKind {
    /// Scalar built-in; no payload.
    Fundamental,
    /// Class payload.
    Class(TypeClass),
    /// Enumeration payload.
    Enum(TypeEnum),
    /// Pointer payload.
    Pointer(TypePointer),
    /// Fixed-size array payload.
    Array(TypeArray),
}

impl Type {
    /// Create a fundamental scalar type record.
    #[must_use]
    pub fn fundamental(name: impl Into<String>, size: u32) -> Type {
        Type::with_kind(name, size, TypeKind::Fundamental)
    }

    /// Create a class type record.
    #[must_use]
    pub fn class(name: impl Into<String>, size: u32, class: TypeClass) -> Type {
        Type::with_kind(name, size, TypeKind::Class(class))
    }

    /// Create an enumeration type record.
    #[must_use]
    pub fn enumeration(name: impl Into<String>, size: u32, constants: Vec<EnumConstant>) -> Type {
        Type::with_kind(name, size, TypeKind::Enum(TypeEnum { constants }))
    }

    /// Create a pointer type record.
    ///
    /// `size` is the platform pointer width for in-process use; it is stored verbatim
    /// from descriptor files.
    #[must_use]
    pub fn pointer(name: impl Into<String>, size: u32, pointee: TypeTag) -> Type {
        Type::with_kind(
            name,
            size,
            TypeKind::Pointer(TypePointer {
                pointee_tag: pointee,
                pointee: OnceLock::new(),
            }),
        )
    }

    /// Create a fixed-size array type record.
    #[must_use]
    pub fn array(name: impl Into<String>, size: u32, element: TypeTag, count: u32) -> Type {
        Type::with_kind(
            name,
            size,
            TypeKind::Array(TypeArray {
                element_tag: element,
                count,
                element: OnceLock::new(),
            }),
        )
    }

    fn with_kind(name: impl Into<String>, size: u32, kind: TypeKind) -> Type {
        let name = name.into();
        Type {
            tag: TypeTag::from_name(&name),
            name,
            size,
            kind,
        }
    }

    /// The type's identity tag.
    #[must_use]
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// The type's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type's byte size.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// The reflection kind of this record.
    #[must_use]
    pub fn kind(&self) -> ReflectionKind {
        match &self.kind {
            TypeKind::Fundamental => ReflectionKind::Fundamental,
            TypeKind::Class(_) => ReflectionKind::Class,
            TypeKind::Enum(_) => ReflectionKind::Enum,
            TypeKind::Pointer(_) => ReflectionKind::Pointer,
            TypeKind::Array(_) => ReflectionKind::Array,
        }
    }

    /// The class payload, if this is a class type.
    #[must_use]
    pub fn as_class(&self) -> Option<&TypeClass> {
        match &self.kind {
            TypeKind::Class(class) => Some(class),
            _ => None,
        }
    }

    /// The enumeration payload, if this is an enum type.
    #[must_use]
    pub fn as_enum(&self) -> Option<&TypeEnum> {
        match &self.kind {
            TypeKind::Enum(te) => Some(te),
            _ => None,
        }
    }

    /// The pointer payload, if this is a pointer type.
    #[must_use]
    pub fn as_pointer(&self) -> Option<&TypePointer> {
        match &self.kind {
            TypeKind::Pointer(tp) => Some(tp),
            _ => None,
        }
    }

    /// The array payload, if this is an array type.
    #[must_use]
    pub fn as_array(&self) -> Option<&TypeArray> {
        match &self.kind {
            TypeKind::Array(ta) => Some(ta),
            _ => None,
        }
    }

    /// The class payload, or [`crate::Error::NotAClass`].
    pub fn expect_class(&self) -> Result<&TypeClass> {
        self.as_class()
            .ok_or_else(|| crate::Error::NotAClass(self.name.clone()))
    }

    /// The byte offset of an ancestor class's sub-object within this type's layout.
    ///
    /// Walks the base-class chain summing base offsets until `ancestor` is reached;
    /// zero if `ancestor` is this type itself.
    ///
    /// # Errors
    /// Fails if `ancestor` is not in the chain or the chain is unresolved.
    pub fn offset_from(&self, ancestor: TypeTag) -> Result<u32> {
        if self.tag == ancestor {
            return Ok(0);
        }
        let class = self.expect_class()?;
        match class.base() {
            Some(base) => {
                let base_ty = base.ty()?;
                Ok(u32::from(base.offset()) + base_ty.offset_from(ancestor)?)
            }
            None => Err(malformed_error!(
                "type '{}' does not derive from {}",
                self.name,
                ancestor
            )),
        }
    }

    /// Resolve all symbolic references in this record. Idempotent.
    pub(crate) fn resolve(&self, registry: &TypeRegistry) -> Result<()> {
        match &self.kind {
            TypeKind::Fundamental | TypeKind::Enum(_) => Ok(()),
            TypeKind::Class(class) => class.resolve(registry),
            TypeKind::Pointer(tp) => {
                let ty = registry
                    .find_type_by_tag(tp.pointee_tag)
                    .ok_or(crate::Error::UnresolvedType(tp.pointee_tag))?;
                let _ = tp.pointee.set(ty);
                Ok(())
            }
            TypeKind::Array(ta) => {
                let ty = registry
                    .find_type_by_tag(ta.element_tag)
                    .ok_or(crate::Error::UnresolvedType(ta.element_tag))?;
                let _ = ta.element.set(ty);
                Ok(())
            }
        }
    }
}

/// A shared, registry-owned type record.
pub type TypeRc = std::sync::Arc<Type>;

/// Reference to a class's base class.
///
/// Records the base's tag and the byte offset of the base sub-object within the derived
/// layout. The live reference is filled in by resolution.
#[derive(Debug)]
pub struct BaseClass {
    tag: TypeTag,
    offset: u16,
    ty: OnceLock<TypeRc>,
}

impl BaseClass {
    /// Create a symbolic base-class reference.
    #[must_use]
    pub fn new(tag: TypeTag, offset: u16) -> BaseClass {
        BaseClass {
            tag,
            offset,
            ty: OnceLock::new(),
        }
    }

    /// The base class's tag.
    #[must_use]
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// Byte offset of the base sub-object within the derived layout.
    #[must_use]
    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// The resolved base type record.
    ///
    /// # Errors
    /// [`crate::Error::UnresolvedType`] before resolution.
    pub fn ty(&self) -> Result<&TypeRc> {
        self.ty.get().ok_or(crate::Error::UnresolvedType(self.tag))
    }
}

/// Class payload: base chain, ordered fields, and instance hooks.
#[derive(Debug)]
pub struct TypeClass {
    base: Option<BaseClass>,
    fields: Vec<Field>,
    create_declared: bool,
    dispatch_declared: bool,
    create_fn: OnceLock<CreateInstanceFn>,
    dispatch_fn: OnceLock<InstallDispatchFn>,
}

impl TypeClass {
    /// Create a class payload from its base reference and ordered fields.
    #[must_use]
    pub fn new(base: Option<BaseClass>, fields: Vec<Field>) -> TypeClass {
        TypeClass {
            base,
            fields,
            create_declared: false,
            dispatch_declared: false,
            create_fn: OnceLock::new(),
            dispatch_fn: OnceLock::new(),
        }
    }

    /// Mark which instance hooks this class declares, builder-style.
    ///
    /// Descriptor files record hook *declarations* (the extractor saw the functions)
    /// separately from hook *bindings* (a live function attached in-process). A class
    /// that declares dispatch is treated as polymorphic by the save path even before
    /// a hook is bound.
    #[must_use]
    pub fn with_declared_hooks(mut self, create: bool, dispatch: bool) -> TypeClass {
        self.create_declared = create;
        self.dispatch_declared = dispatch;
        self
    }

    /// The base-class reference, if any.
    #[must_use]
    pub fn base(&self) -> Option<&BaseClass> {
        self.base.as_ref()
    }

    /// The class's own (non-inherited) fields, in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The own field at `index`.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Number of own fields.
    #[must_use]
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Look a field up by name: own fields first, then the base chain.
    ///
    /// Returns fields declared on resolved base classes as well, which is what makes
    /// by-name access through a derived static type work.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<&Field> {
        if let Some(field) = self.fields.iter().find(|f| f.name() == name) {
            return Some(field);
        }
        let base = self.base.as_ref()?.ty.get()?;
        base.as_class()?.find_field(name)
    }

    /// Returns `true` if this class carries dispatch behavior - either declared by
    /// its metadata or implied by a bound install hook.
    #[must_use]
    pub fn has_dispatch(&self) -> bool {
        self.dispatch_declared || self.dispatch_fn.get().is_some()
    }

    /// Returns `true` if the class's metadata declares a dispatch install hook.
    #[must_use]
    pub fn declares_dispatch(&self) -> bool {
        self.dispatch_declared
    }

    /// Returns `true` if the class's metadata declares a create hook.
    #[must_use]
    pub fn declares_create(&self) -> bool {
        self.create_declared
    }

    /// The bound create hook, if any.
    #[must_use]
    pub fn create_hook(&self) -> Option<CreateInstanceFn> {
        self.create_fn.get().copied()
    }

    /// The bound dispatch install hook, if any.
    #[must_use]
    pub fn dispatch_hook(&self) -> Option<InstallDispatchFn> {
        self.dispatch_fn.get().copied()
    }

    /// Bind hooks; first binding wins, later bindings are ignored.
    pub(crate) fn bind_hooks(
        &self,
        create: Option<CreateInstanceFn>,
        dispatch: Option<InstallDispatchFn>,
    ) {
        if let Some(f) = create {
            let _ = self.create_fn.set(f);
        }
        if let Some(f) = dispatch {
            let _ = self.dispatch_fn.set(f);
        }
    }

    fn resolve(&self, registry: &TypeRegistry) -> Result<()> {
        if let Some(base) = &self.base {
            let ty = registry
                .find_type_by_tag(base.tag)
                .ok_or(crate::Error::UnresolvedType(base.tag))?;
            let _ = base.ty.set(ty);
        }
        for field in &self.fields {
            field.resolve(registry)?;
        }
        Ok(())
    }
}

/// Enumeration payload: ordered named integer constants.
#[derive(Debug)]
pub struct TypeEnum {
    constants: Vec<EnumConstant>,
}

impl TypeEnum {
    /// The constants in declaration order.
    #[must_use]
    pub fn constants(&self) -> &[EnumConstant] {
        &self.constants
    }

    /// The value of a constant by name.
    #[must_use]
    pub fn find_constant(&self, name: &str) -> Option<i32> {
        self.constants
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value)
    }

    /// The first constant name carrying `value`.
    #[must_use]
    pub fn constant_name(&self, value: i32) -> Option<&str> {
        self.constants
            .iter()
            .find(|c| c.value == value)
            .map(|c| c.name.as_str())
    }
}

/// One named enumeration constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    /// Constant display name.
    pub name: String,
    /// Constant integer value.
    pub value: i32,
}

impl EnumConstant {
    /// Create a constant record.
    #[must_use]
    pub fn new(name: impl Into<String>, value: i32) -> EnumConstant {
        EnumConstant {
            name: name.into(),
            value,
        }
    }
}

/// Pointer payload: the pointee reference.
#[derive(Debug)]
pub struct TypePointer {
    pointee_tag: TypeTag,
    pointee: OnceLock<TypeRc>,
}

impl TypePointer {
    /// The pointee's symbolic tag.
    #[must_use]
    pub fn pointee_tag(&self) -> TypeTag {
        self.pointee_tag
    }

    /// The resolved pointee type record.
    ///
    /// # Errors
    /// [`crate::Error::UnresolvedType`] before resolution.
    pub fn pointee(&self) -> Result<&TypeRc> {
        self.pointee
            .get()
            .ok_or(crate::Error::UnresolvedType(self.pointee_tag))
    }
}

/// Fixed-size array payload: element reference and count.
#[derive(Debug)]
pub struct TypeArray {
    element_tag: TypeTag,
    count: u32,
    element: OnceLock<TypeRc>,
}

impl TypeArray {
    /// The element type's symbolic tag.
    #[must_use]
    pub fn element_tag(&self) -> TypeTag {
        self.element_tag
    }

    /// The element count.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// The resolved element type record.
    ///
    /// # Errors
    /// [`crate::Error::UnresolvedType`] before resolution.
    pub fn element(&self) -> Result<&TypeRc> {
        self.element
            .get()
            .ok_or(crate::Error::UnresolvedType(self.element_tag))
    }
}
