//! Reflected class members and cached-address access to them.
//!
//! A [`Field`] is a named, typed, offset member of a class type. Its offset is relative to
//! the *declaring* class; reaching the field through a derived instance's static type adds
//! the base-class offset chain on top (see [`Field::raw_data_ptr`]). A [`FieldAccessor`]
//! resolves that address once and caches it for repeated access.
//!
//! Field type references are symbolic ([`crate::TypeTag`]) until the registry's
//! [`crate::TypeRegistry::post_init`] pass replaces them with live type records; metadata
//! produced by an offline extractor carries no ordering guarantees, so resolution cannot
//! happen at registration time.
//!
//! # Examples
//!
//! ```rust
//! use typescope::prelude::*;
//!
//! # fn main() -> typescope::Result<()> {
//! let registry = TypeRegistry::new();
//! ClassBuilder::new("Point", 8)
//!     .field("x", "f32", 0)
//!     .field("y", "f32", 4)
//!     .register(&registry)?;
//! registry.post_init()?;
//!
//! let point = registry.find_type("Point").unwrap();
//! let mut data = [0.0f32; 2];
//!
//! let accessor = FieldAccessor::by_name(data.as_mut_ptr().cast(), &point, "y")?;
//! unsafe { accessor.set(2.5f32) };
//! assert_eq!(data[1], 2.5);
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, OnceLock};

use bitflags::bitflags;

use crate::{
    reflection::{ReflectionKind, Type, TypeRc, TypeRegistry, TypeTag},
    Result,
};

bitflags! {
    /// Per-field attribute flags.
    ///
    /// Stored verbatim in descriptor files; unknown bits are retained so newer
    /// extractors remain loadable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FieldFlags: u16 {
        /// Not shown by editing/inspection tooling.
        const HIDDEN = 1 << 0;
        /// Excluded from serialization; a class carrying such a field cannot be
        /// captured load-in-place.
        const NO_SERIALIZE = 1 << 1;
        /// Value is constrained to the limits of the field's edit info.
        const BOUNDED = 1 << 2;
    }
}

/// Optional per-field editing metadata.
///
/// Shared by index into a side table owned by the registry; most fields carry none.
/// Absence is not an error - accessors simply report no edit info.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEditInfo {
    /// Inclusive lower bound for numeric editing.
    pub limit_min: f32,
    /// Inclusive upper bound for numeric editing.
    pub limit_max: f32,
    /// Short help text (at most [`FieldEditInfo::MAX_HELP`] bytes).
    pub help: String,
}

impl FieldEditInfo {
    /// Maximum help text length in bytes, excluding the terminator.
    pub const MAX_HELP: usize = 63;
}

impl Default for FieldEditInfo {
    fn default() -> Self {
        FieldEditInfo {
            limit_min: 0.0,
            limit_max: 0.0,
            help: String::new(),
        }
    }
}

/// A named, typed, offset member of a class type.
///
/// The field's type reference starts symbolic and is resolved by
/// [`crate::TypeRegistry::post_init`]; [`Field::ty`] reports
/// [`crate::Error::UnresolvedType`] until then.
#[derive(Debug)]
pub struct Field {
    name: String,
    /// Tag of the declaring class.
    owner: TypeTag,
    type_tag: TypeTag,
    offset: u16,
    flags: FieldFlags,
    edit_info: Option<Arc<FieldEditInfo>>,
    ty: OnceLock<TypeRc>,
}

impl Field {
    /// Create a field record.
    ///
    /// # Arguments
    /// * `name` - Field display name
    /// * `type_tag` - Symbolic tag of the field's type
    /// * `offset` - Byte offset relative to the declaring class
    /// * `owner` - Tag of the declaring class
    /// * `edit_info` - Optional shared editing metadata
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        type_tag: TypeTag,
        offset: u16,
        owner: TypeTag,
        edit_info: Option<Arc<FieldEditInfo>>,
    ) -> Field {
        Field {
            name: name.into(),
            owner,
            type_tag,
            offset,
            flags: FieldFlags::empty(),
            edit_info,
            ty: OnceLock::new(),
        }
    }

    /// Attach attribute flags, builder-style.
    #[must_use]
    pub fn with_flags(mut self, flags: FieldFlags) -> Field {
        self.flags = flags;
        self
    }

    /// The field's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte offset relative to the declaring class.
    #[must_use]
    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// The field's attribute flags.
    #[must_use]
    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    /// Tag of the declaring class.
    #[must_use]
    pub fn owner(&self) -> TypeTag {
        self.owner
    }

    /// Symbolic tag of the field's type.
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    /// Optional shared editing metadata.
    #[must_use]
    pub fn edit_info(&self) -> Option<&Arc<FieldEditInfo>> {
        self.edit_info.as_ref()
    }

    /// The resolved type record.
    ///
    /// # Errors
    /// [`crate::Error::UnresolvedType`] before [`crate::TypeRegistry::post_init`] has run.
    pub fn ty(&self) -> Result<&TypeRc> {
        self.ty
            .get()
            .ok_or(crate::Error::UnresolvedType(self.type_tag))
    }

    /// The resolved type's reflection kind.
    ///
    /// # Errors
    /// [`crate::Error::UnresolvedType`] before resolution.
    pub fn kind(&self) -> Result<ReflectionKind> {
        Ok(self.ty()?.kind())
    }

    /// Resolve the symbolic type tag against the registry. Idempotent.
    pub(crate) fn resolve(&self, registry: &TypeRegistry) -> Result<()> {
        let ty = registry
            .find_type_by_tag(self.type_tag)
            .ok_or(crate::Error::UnresolvedType(self.type_tag))?;
        let _ = self.ty.set(ty);
        Ok(())
    }

    /// Compute the field's address within an instance.
    ///
    /// The result is `object + inherited-offset adjustment + field offset`, where the
    /// adjustment sums the base-class offsets from `object_type` down to the declaring
    /// class. The two types differ exactly when a base-class field is reached through a
    /// derived instance's static type.
    ///
    /// The returned pointer is only valid as long as the underlying object is.
    ///
    /// # Errors
    /// Fails if `object_type`'s base chain does not contain the declaring class, or if
    /// the chain is unresolved.
    pub fn raw_data_ptr(&self, object: *mut u8, object_type: &Type) -> Result<*mut u8> {
        let mut offset = u32::from(self.offset);
        if object_type.tag() != self.owner {
            offset += object_type.offset_from(self.owner)?;
        }
        Ok(object.wrapping_add(offset as usize))
    }

    /// Typed read of the field's value.
    ///
    /// See also [`FieldAccessor`] for a more effective way, where the offset is not
    /// calculated for every access.
    ///
    /// # Safety
    /// `object` must point at a live instance whose layout matches `object_type`'s
    /// registered metadata, and `T` must be the field's actual type. No kind checking
    /// is performed.
    ///
    /// # Errors
    /// Fails if the declaring class is not in `object_type`'s base chain.
    pub unsafe fn get<T: Copy>(&self, object: *mut u8, object_type: &Type) -> Result<T> {
        let ptr = self.raw_data_ptr(object, object_type)?;
        Ok(std::ptr::read_unaligned(ptr as *const T))
    }

    /// Typed write of the field's value.
    ///
    /// # Safety
    /// Same contract as [`Field::get`].
    ///
    /// # Errors
    /// Fails if the declaring class is not in `object_type`'s base chain.
    pub unsafe fn set<T>(&self, object: *mut u8, object_type: &Type, value: T) -> Result<()> {
        let ptr = self.raw_data_ptr(object, object_type)?;
        std::ptr::write_unaligned(ptr as *mut T, value);
        Ok(())
    }
}

/// Cached-address access to a single field of a single instance.
///
/// A `FieldAccessor` trades a one-time address resolution for O(1) subsequent reads and
/// writes. It is an ephemeral value: it holds no ownership and is only valid as long as
/// the underlying object is.
///
/// No kind checking is performed at access time - callers supply the correct type.
pub struct FieldAccessor {
    ptr: *mut u8,
}

impl FieldAccessor {
    /// Resolve the address of `field` within `object`.
    ///
    /// # Errors
    /// Fails if the field's declaring class is not in `object_type`'s base chain.
    pub fn new(object: *mut u8, object_type: &Type, field: &Field) -> Result<FieldAccessor> {
        Ok(FieldAccessor {
            ptr: field.raw_data_ptr(object, object_type)?,
        })
    }

    /// Look a field up by name (own fields first, then the base chain) and resolve
    /// its address.
    ///
    /// # Errors
    /// [`crate::Error::NotAClass`] if `object_type` is not a class,
    /// [`crate::Error::FieldNotFound`] if no field of that name exists.
    pub fn by_name(object: *mut u8, object_type: &Type, name: &str) -> Result<FieldAccessor> {
        let class = object_type
            .as_class()
            .ok_or_else(|| crate::Error::NotAClass(object_type.name().to_string()))?;
        let field = class
            .find_field(name)
            .ok_or_else(|| crate::Error::FieldNotFound(name.to_string()))?;
        FieldAccessor::new(object, object_type, field)
    }

    /// The cached raw address. Use with care.
    #[must_use]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Typed read through the cached address.
    ///
    /// # Safety
    /// The underlying object must still be live and `T` must be the field's actual type.
    #[must_use]
    pub unsafe fn get<T: Copy>(&self) -> T {
        std::ptr::read_unaligned(self.ptr as *const T)
    }

    /// Typed write through the cached address.
    ///
    /// # Safety
    /// Same contract as [`FieldAccessor::get`].
    pub unsafe fn set<T>(&self, value: T) {
        std::ptr::write_unaligned(self.ptr as *mut T, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_roundtrip_raw_bits() {
        let flags = FieldFlags::from_bits_retain(0b111);
        assert!(flags.contains(FieldFlags::HIDDEN));
        assert!(flags.contains(FieldFlags::NO_SERIALIZE));
        assert!(flags.contains(FieldFlags::BOUNDED));

        // Unknown bits survive a round trip.
        let raw = FieldFlags::from_bits_retain(0x8001);
        assert_eq!(raw.bits(), 0x8001);
    }

    #[test]
    fn field_unresolved_until_post_init() {
        let field = Field::new("x", TypeTag::from_name("f32"), 0, TypeTag::from_name("P"), None);
        assert!(matches!(
            field.ty(),
            Err(crate::Error::UnresolvedType(_))
        ));
    }

    #[test]
    fn edit_info_default() {
        let info = FieldEditInfo::default();
        assert_eq!(info.limit_min, 0.0);
        assert_eq!(info.limit_max, 0.0);
        assert!(info.help.is_empty());
    }
}
