//! The reflection type model, registry and descriptor loading.
//!
//! This module is the description layer the load-in-place engine is built on. A program
//! (or the offline metadata extractor, via descriptor files) describes the shape of its
//! types once - fields, offsets, base classes, instance hooks - and the
//! [`TypeRegistry`] owns those descriptions for the lifetime of the session.
//!
//! # Key Components
//!
//! ## Type model
//! - [`Type`] / [`TypeKind`] - tagged records: fundamental, class, enum, pointer, array
//! - [`TypeTag`] - 32-bit name-hash identity
//! - [`ReflectionKind`] - the variant tag
//! - [`TypeClass`] / [`BaseClass`] - class layout, base chain and instance hooks
//! - [`TypeEnum`] / [`EnumConstant`], [`TypePointer`], [`TypeArray`]
//!
//! ## Fields
//! - [`Field`] - named, typed, offset member (offsets relative to the declaring class)
//! - [`FieldAccessor`] - cached-address access to one field of one instance
//! - [`FieldFlags`] / [`FieldEditInfo`] - attributes and optional editing metadata
//!
//! ## Registry
//! - [`TypeRegistry`] - tag-keyed ownership, uniqueness, two-phase resolution
//! - [`ClassBuilder`] / [`EnumBuilder`] - programmatic registration
//! - [`load_descriptor`] / [`load_descriptor_file`] - descriptor file consumption
//!
//! # Two-phase resolution
//!
//! Cross-references between types are symbolic [`TypeTag`]s until
//! [`TypeRegistry::post_init`] resolves them into live, shared [`TypeRc`] records.
//! This is what makes declaration order irrelevant - a descriptor may list a derived
//! class before its base, or a field before its field type.

pub(crate) mod builder;
pub(crate) mod descriptor;
pub(crate) mod field;
pub(crate) mod registry;
pub(crate) mod tag;
pub(crate) mod types;

pub use builder::{ClassBuilder, EnumBuilder};
pub use descriptor::{load_descriptor, load_descriptor_file, MAX_FIELD_NAME, MAX_TYPE_NAME};
pub use field::{Field, FieldAccessor, FieldEditInfo, FieldFlags};
pub use registry::TypeRegistry;
pub use tag::TypeTag;
pub use types::{
    BaseClass, CreateInstanceFn, EnumConstant, InstallDispatchFn, ReflectionKind, Type,
    TypeArray, TypeClass, TypeEnum, TypeKind, TypePointer, TypeRc,
};
