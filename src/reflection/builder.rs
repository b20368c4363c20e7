//! Fluent programmatic type registration.
//!
//! Most registries are populated from descriptor files produced by the offline metadata
//! extractor, but tests, tools and hand-maintained object models register types directly.
//! The builders here assemble the same [`crate::Type`] records the descriptor loader
//! produces.
//!
//! # Examples
//!
//! ```rust
//! use typescope::prelude::*;
//!
//! # fn main() -> typescope::Result<()> {
//! let registry = TypeRegistry::new();
//!
//! ClassBuilder::new("Transform", 40)
//!     .field("x", "f64", 0)
//!     .field("y", "f64", 8)
//!     .field("z", "f64", 16)
//!     .field("flags", "u32", 24)
//!     .register(&registry)?;
//!
//! EnumBuilder::new("Space", 4)
//!     .constant("Local", 0)
//!     .constant("World", 1)
//!     .register(&registry)?;
//!
//! registry.post_init()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::{
    reflection::{
        BaseClass, CreateInstanceFn, EnumConstant, Field, FieldEditInfo, FieldFlags,
        InstallDispatchFn, Type, TypeClass, TypeRc, TypeRegistry, TypeTag,
    },
    Result,
};

/// Pending field record inside a [`ClassBuilder`].
struct FieldSpec {
    name: String,
    type_tag: TypeTag,
    offset: u16,
    flags: FieldFlags,
    edit_info: Option<Arc<FieldEditInfo>>,
}

/// Builder for class type records.
///
/// Field type references are symbolic; the referenced types may be registered before
/// or after the class, as long as everything is present when
/// [`crate::TypeRegistry::post_init`] runs.
pub struct ClassBuilder {
    name: String,
    size: u32,
    base: Option<(TypeTag, u16)>,
    fields: Vec<FieldSpec>,
    create: Option<CreateInstanceFn>,
    dispatch: Option<InstallDispatchFn>,
}

impl ClassBuilder {
    /// Start building a class with the given display name and byte size.
    #[must_use]
    pub fn new(name: impl Into<String>, size: u32) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            size,
            base: None,
            fields: Vec::new(),
            create: None,
            dispatch: None,
        }
    }

    /// Set the base class by name, with the base sub-object's byte offset within the
    /// derived layout.
    #[must_use]
    pub fn base(mut self, base_name: &str, offset: u16) -> ClassBuilder {
        self.base = Some((TypeTag::from_name(base_name), offset));
        self
    }

    /// Append a field. Offsets are relative to this class.
    #[must_use]
    pub fn field(self, name: &str, type_name: &str, offset: u16) -> ClassBuilder {
        self.flagged_field(name, type_name, offset, FieldFlags::empty())
    }

    /// Append a field carrying attribute flags.
    #[must_use]
    pub fn flagged_field(
        mut self,
        name: &str,
        type_name: &str,
        offset: u16,
        flags: FieldFlags,
    ) -> ClassBuilder {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            type_tag: TypeTag::from_name(type_name),
            offset,
            flags,
            edit_info: None,
        });
        self
    }

    /// Append a field carrying shared editing metadata.
    #[must_use]
    pub fn edited_field(
        mut self,
        name: &str,
        type_name: &str,
        offset: u16,
        edit_info: Arc<FieldEditInfo>,
    ) -> ClassBuilder {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            type_tag: TypeTag::from_name(type_name),
            offset,
            flags: FieldFlags::BOUNDED,
            edit_info: Some(edit_info),
        });
        self
    }

    /// Attach instance hooks. Classes with a dispatch hook are treated as polymorphic
    /// by the save path.
    ///
    /// # Safety
    /// The caller vouches that the hooks match the class's actual layout: `create`
    /// must allocate an instance of at least `size` bytes with the global allocator,
    /// and `dispatch` must write only the dispatch slot(s) of such an allocation.
    #[must_use]
    pub unsafe fn hooks(
        mut self,
        create: Option<CreateInstanceFn>,
        dispatch: Option<InstallDispatchFn>,
    ) -> ClassBuilder {
        self.create = create;
        self.dispatch = dispatch;
        self
    }

    /// Assemble the record and register it.
    ///
    /// # Errors
    /// [`crate::Error::DuplicateType`] if the name hash is already registered.
    pub fn register(self, registry: &TypeRegistry) -> Result<TypeRc> {
        let owner = TypeTag::from_name(&self.name);
        let fields = self
            .fields
            .into_iter()
            .map(|spec| {
                Field::new(spec.name, spec.type_tag, spec.offset, owner, spec.edit_info)
                    .with_flags(spec.flags)
            })
            .collect();

        let class = TypeClass::new(
            self.base.map(|(tag, offset)| BaseClass::new(tag, offset)),
            fields,
        )
        .with_declared_hooks(self.create.is_some(), self.dispatch.is_some());
        class.bind_hooks(self.create, self.dispatch);

        registry.add_type(Type::class(self.name, self.size, class))
    }
}

/// Builder for enumeration type records.
pub struct EnumBuilder {
    name: String,
    size: u32,
    constants: Vec<EnumConstant>,
}

impl EnumBuilder {
    /// Start building an enumeration with the given display name and storage size.
    #[must_use]
    pub fn new(name: impl Into<String>, size: u32) -> EnumBuilder {
        EnumBuilder {
            name: name.into(),
            size,
            constants: Vec::new(),
        }
    }

    /// Append a named constant.
    #[must_use]
    pub fn constant(mut self, name: &str, value: i32) -> EnumBuilder {
        self.constants.push(EnumConstant::new(name, value));
        self
    }

    /// Assemble the record and register it.
    ///
    /// # Errors
    /// [`crate::Error::DuplicateType`] if the name hash is already registered.
    pub fn register(self, registry: &TypeRegistry) -> Result<TypeRc> {
        registry.add_type(Type::enumeration(self.name, self.size, self.constants))
    }
}
