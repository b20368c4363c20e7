//! # typescope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the typescope library. Import this module to get quick access to the essential
//! types for describing object models and round-tripping object graphs.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all typescope operations
pub use crate::Error;

/// The result type used throughout typescope
pub use crate::Result;

// ================================================================================================
// Low-Level Plumbing
// ================================================================================================

/// Binary backing and bounds-checked parsing utilities
pub use crate::{File, Parser};

// ================================================================================================
// Reflection Type Model
// ================================================================================================

/// Type identity and the reflected type records
pub use crate::reflection::{ReflectionKind, Type, TypeKind, TypeRc, TypeTag};

/// Class internals: base chain, fields, enum constants, kind payloads
pub use crate::reflection::{
    BaseClass, EnumConstant, Field, FieldAccessor, FieldEditInfo, FieldFlags, TypeArray,
    TypeClass, TypeEnum, TypePointer,
};

/// Instance hook signatures
pub use crate::reflection::{CreateInstanceFn, InstallDispatchFn};

// ================================================================================================
// Registry and Registration
// ================================================================================================

/// Tag-keyed owner of all type records
pub use crate::reflection::TypeRegistry;

/// Programmatic registration builders
pub use crate::reflection::{ClassBuilder, EnumBuilder};

/// Descriptor file consumption
pub use crate::reflection::{load_descriptor, load_descriptor_file};

// ================================================================================================
// Load-In-Place Engine
// ================================================================================================

/// The save/load engine and its owned results
pub use crate::lip::{LipBox, LipEngine, LipObject};

/// The image format records
pub use crate::lip::{ImageHeader, PointerFixup};

/// Marker trait tying Rust types to registered metadata
pub use crate::lip::Reflected;
