//! Central registry for reflected type records.
//!
//! The `TypeRegistry` owns every [`crate::Type`] of a session, keyed by
//! [`crate::TypeTag`]. It enforces uniqueness on registration, resolves symbolic
//! cross-references in a second pass ([`TypeRegistry::post_init`]), and provides lookup,
//! enumeration and default-instance creation through registered hooks.
//!
//! # The build-then-read-only protocol
//!
//! Registration is a two-phase protocol with a checked state machine:
//!
//! 1. **Building** - types are registered (programmatically or from a descriptor file).
//!    Field, base, pointee and element references are symbolic tags; descriptor order
//!    does not guarantee dependency order, so nothing is resolved yet.
//! 2. **Resolved** - after [`TypeRegistry::post_init`], every symbolic tag has been
//!    replaced by a live shared record. Save, load and instance creation require this
//!    state and fail with [`crate::Error::RegistryNotResolved`] before it.
//!
//! Adding a type drops the registry back to *Building*; re-running `post_init` is safe
//! and simply re-resolves.
//!
//! # Thread Safety
//!
//! Construction is single-writer. Once `post_init` completes, concurrent read-only
//! lookups from multiple threads are safe; concurrent mutation is not supported. No
//! locking is provided or required beyond this phase ordering.
//!
//! # Examples
//!
//! ```rust
//! use typescope::prelude::*;
//!
//! # fn main() -> typescope::Result<()> {
//! let registry = TypeRegistry::new();
//!
//! // Fundamentals are pre-registered, process-wide constants.
//! assert!(registry.find_type("i32").is_some());
//!
//! ClassBuilder::new("Pair", 8)
//!     .field("a", "i32", 0)
//!     .field("b", "i32", 4)
//!     .register(&registry)?;
//! registry.post_init()?;
//!
//! let pair = registry.find_type("Pair").unwrap();
//! assert_eq!(pair.as_class().unwrap().num_fields(), 2);
//! # Ok(())
//! # }
//! ```

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, RwLock,
};

use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    reflection::{
        CreateInstanceFn, EnumConstant, Field, FieldEditInfo, InstallDispatchFn, ReflectionKind,
        Type, TypeRc, TypeTag,
    },
    Result,
};

/// The fundamental scalar types every registry starts with.
const FUNDAMENTALS: &[(&str, u32)] = &[
    ("bool", 1),
    ("u8", 1),
    ("i8", 1),
    ("u16", 2),
    ("i16", 2),
    ("u32", 4),
    ("i32", 4),
    ("u64", 8),
    ("i64", 8),
    ("f32", 4),
    ("f64", 8),
    ("usize", std::mem::size_of::<usize>() as u32),
    ("isize", std::mem::size_of::<isize>() as u32),
];

/// Tag-keyed owner of all reflected type records of a session.
///
/// See the [module documentation](self) for the registration protocol.
pub struct TypeRegistry {
    /// All registered types, keyed by name-hash tag.
    types: DashMap<TypeTag, TypeRc>,
    /// Shared side table of optional field editing metadata.
    edit_infos: RwLock<Vec<Arc<FieldEditInfo>>>,
    /// Set by a successful `post_init`, cleared by registration.
    resolved: AtomicBool,
}

impl TypeRegistry {
    /// Create a registry pre-populated with the fundamental scalar types.
    #[must_use]
    pub fn new() -> TypeRegistry {
        let registry = TypeRegistry {
            types: DashMap::new(),
            edit_infos: RwLock::new(Vec::new()),
            resolved: AtomicBool::new(false),
        };
        for &(name, size) in FUNDAMENTALS {
            let ty: TypeRc = Arc::new(Type::fundamental(name, size));
            registry.types.insert(ty.tag(), ty);
        }
        registry
    }

    /// Register a type.
    ///
    /// Drops the registry back to the building state; call [`TypeRegistry::post_init`]
    /// again once the batch is complete.
    ///
    /// # Errors
    /// [`crate::Error::DuplicateType`] if a type with the same name hash is already
    /// registered; the registry is left unchanged.
    pub fn add_type(&self, ty: Type) -> Result<TypeRc> {
        match self.types.entry(ty.tag()) {
            Entry::Occupied(_) => Err(crate::Error::DuplicateType(ty.name().to_string())),
            Entry::Vacant(entry) => {
                let rc: TypeRc = Arc::new(ty);
                entry.insert(rc.clone());
                self.resolved.store(false, Ordering::Release);
                Ok(rc)
            }
        }
    }

    /// Look a type up by display name.
    #[must_use]
    pub fn find_type(&self, name: &str) -> Option<TypeRc> {
        self.find_type_by_tag(TypeTag::from_name(name))
    }

    /// Look a type up by tag.
    #[must_use]
    pub fn find_type_by_tag(&self, tag: TypeTag) -> Option<TypeRc> {
        self.types.get(&tag).map(|entry| entry.value().clone())
    }

    /// Unregister a type by display name.
    ///
    /// Does not cascade to dependents: types whose resolved references point at the
    /// removed record keep their shared copy alive, and re-resolution after
    /// re-registration is the caller's responsibility.
    pub fn remove_type(&self, name: &str) {
        self.remove_type_by_tag(TypeTag::from_name(name));
    }

    /// Unregister a type by tag. See [`TypeRegistry::remove_type`].
    pub fn remove_type_by_tag(&self, tag: TypeTag) {
        self.types.remove(&tag);
    }

    /// Resolve every symbolic cross-reference into a live type record.
    ///
    /// Must be invoked once after bulk registration and before any save, load or
    /// instance creation. Iterates every class's fields and base-class reference and
    /// every pointer/array pointee, independent of declaration order. Idempotent;
    /// re-invocation after adding more types simply re-resolves.
    ///
    /// # Errors
    /// [`crate::Error::UnresolvedType`] if any reference names an unregistered tag.
    /// The registry stays in the building state in that case.
    pub fn post_init(&self) -> Result<()> {
        let snapshot: Vec<TypeRc> = self.types.iter().map(|e| e.value().clone()).collect();
        for ty in &snapshot {
            ty.resolve(self)?;
        }
        self.resolved.store(true, Ordering::Release);
        log::debug!("type registry resolved, {} types", snapshot.len());
        Ok(())
    }

    /// Returns `true` if the registry is in the resolved state.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    /// Guard for operations that require resolved cross-references.
    pub(crate) fn ensure_resolved(&self) -> Result<()> {
        if self.is_resolved() {
            Ok(())
        } else {
            Err(crate::Error::RegistryNotResolved)
        }
    }

    /// Read-only iteration over every registered type, for diagnostics and tooling.
    pub fn enumerate_types(&self, mut visitor: impl FnMut(&TypeRc)) {
        for entry in self.types.iter() {
            visitor(entry.value());
        }
    }

    /// Number of registered types, including the fundamentals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no types are registered. Never true in practice, since
    /// fundamentals are registered at construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Take shared ownership of a batch of field edit infos.
    ///
    /// The descriptor loader calls this with the side table it parsed; individual
    /// fields hold `Arc` clones of their entries.
    pub fn add_field_edit_infos(&self, infos: Vec<Arc<FieldEditInfo>>) {
        write_lock!(self.edit_infos).extend(infos);
    }

    /// The edit info at `index` in the shared side table.
    #[must_use]
    pub fn field_edit_info(&self, index: usize) -> Option<Arc<FieldEditInfo>> {
        read_lock!(self.edit_infos).get(index).cloned()
    }

    /// Create a default instance of a class by display name.
    ///
    /// Invokes the registered create hook. Ownership of the returned allocation
    /// transfers to the caller.
    ///
    /// # Errors
    /// [`crate::Error::RegistryNotResolved`] before `post_init`,
    /// [`crate::Error::TypeNotFound`] / [`crate::Error::NotAClass`] for bad names,
    /// [`crate::Error::HookUnbound`] if no create hook is bound.
    pub fn create_instance(&self, name: &str) -> Result<*mut u8> {
        self.create_instance_by_tag(TypeTag::from_name(name))
    }

    /// Create a default instance of a class by tag. See [`TypeRegistry::create_instance`].
    ///
    /// # Errors
    /// Same conditions as [`TypeRegistry::create_instance`].
    pub fn create_instance_by_tag(&self, tag: TypeTag) -> Result<*mut u8> {
        self.ensure_resolved()?;
        let ty = self
            .find_type_by_tag(tag)
            .ok_or(crate::Error::TypeNotFound(tag))?;
        let class = ty.expect_class()?;
        let create = class
            .create_hook()
            .ok_or_else(|| crate::Error::HookUnbound(ty.name().to_string()))?;
        Ok(create())
    }

    /// Bind executable instance hooks to a registered class.
    ///
    /// Descriptor files carry hook *declarations* only - the extractor's code
    /// addresses are meaningless in-process - so live functions are attached here.
    /// The first binding of each hook wins; later bindings are ignored.
    ///
    /// # Safety
    /// The caller vouches that the hooks match the class's registered layout:
    /// `create` must allocate an instance of at least the registered size with the
    /// global allocator, and `install_dispatch` must write only the dispatch slot(s)
    /// of an allocation of at least the registered size.
    ///
    /// # Errors
    /// [`crate::Error::TypeNotFound`] / [`crate::Error::NotAClass`] for bad names.
    pub unsafe fn bind_instance_hooks(
        &self,
        name: &str,
        create: Option<CreateInstanceFn>,
        install_dispatch: Option<InstallDispatchFn>,
    ) -> Result<()> {
        let tag = TypeTag::from_name(name);
        let ty = self
            .find_type_by_tag(tag)
            .ok_or(crate::Error::TypeNotFound(tag))?;
        ty.expect_class()?.bind_hooks(create, install_dispatch);
        Ok(())
    }

    /// Rough byte accounting of the registered records, for diagnostics.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        let mut usage = 0;
        self.enumerate_types(|ty| {
            usage += std::mem::size_of::<Type>();
            match ty.kind() {
                ReflectionKind::Class => {
                    if let Some(class) = ty.as_class() {
                        usage += class.num_fields() * std::mem::size_of::<Field>();
                    }
                }
                ReflectionKind::Enum => {
                    if let Some(te) = ty.as_enum() {
                        usage += te.constants().len() * std::mem::size_of::<EnumConstant>();
                    }
                }
                _ => {}
            }
        });
        usage
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        TypeRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::{BaseClass, TypeClass};

    #[test]
    fn fundamentals_preregistered() {
        let registry = TypeRegistry::new();
        for &(name, size) in FUNDAMENTALS {
            let ty = registry.find_type(name).expect(name);
            assert_eq!(ty.size(), size);
            assert_eq!(ty.kind(), ReflectionKind::Fundamental);
        }
    }

    #[test]
    fn duplicate_rejected_registry_unchanged() {
        let registry = TypeRegistry::new();
        let count = registry.len();

        registry
            .add_type(Type::class("Thing", 4, TypeClass::new(None, Vec::new())))
            .unwrap();
        assert_eq!(registry.len(), count + 1);

        let err = registry
            .add_type(Type::class("Thing", 8, TypeClass::new(None, Vec::new())))
            .unwrap_err();
        assert!(matches!(err, crate::Error::DuplicateType(name) if name == "Thing"));

        // Still the first registration.
        assert_eq!(registry.find_type("Thing").unwrap().size(), 4);
        assert_eq!(registry.len(), count + 1);
    }

    #[test]
    fn remove_type_unregisters() {
        let registry = TypeRegistry::new();
        registry
            .add_type(Type::class("Gone", 4, TypeClass::new(None, Vec::new())))
            .unwrap();
        assert!(registry.find_type("Gone").is_some());

        registry.remove_type("Gone");
        assert!(registry.find_type("Gone").is_none());
    }

    #[test]
    fn post_init_resolves_out_of_order() {
        let registry = TypeRegistry::new();

        // Derived registered before its base.
        registry
            .add_type(Type::class(
                "Derived",
                16,
                TypeClass::new(Some(BaseClass::new(TypeTag::from_name("Base"), 0)), Vec::new()),
            ))
            .unwrap();
        registry
            .add_type(Type::class("Base", 8, TypeClass::new(None, Vec::new())))
            .unwrap();

        registry.post_init().unwrap();

        let derived = registry.find_type("Derived").unwrap();
        let base_ref = derived.as_class().unwrap().base().unwrap();
        assert_eq!(base_ref.ty().unwrap().name(), "Base");
    }

    #[test]
    fn post_init_fails_on_dangling_reference() {
        let registry = TypeRegistry::new();
        registry
            .add_type(Type::pointer(
                "Missing*",
                8,
                TypeTag::from_name("Missing"),
            ))
            .unwrap();

        assert!(matches!(
            registry.post_init(),
            Err(crate::Error::UnresolvedType(_))
        ));
        assert!(!registry.is_resolved());
    }

    #[test]
    fn state_machine_gates_instance_creation() {
        let registry = TypeRegistry::new();
        registry
            .add_type(Type::class("C", 4, TypeClass::new(None, Vec::new())))
            .unwrap();

        assert!(matches!(
            registry.create_instance("C"),
            Err(crate::Error::RegistryNotResolved)
        ));

        registry.post_init().unwrap();
        // Resolved, but no hook bound.
        assert!(matches!(
            registry.create_instance("C"),
            Err(crate::Error::HookUnbound(_))
        ));

        // Adding a type drops back to building.
        registry
            .add_type(Type::class("D", 4, TypeClass::new(None, Vec::new())))
            .unwrap();
        assert!(!registry.is_resolved());
        registry.post_init().unwrap();
        assert!(registry.is_resolved());
    }

    #[test]
    fn create_instance_through_hook() {
        fn make() -> *mut u8 {
            Box::into_raw(Box::new(0u32)).cast()
        }

        let registry = TypeRegistry::new();
        registry
            .add_type(Type::class("Counter", 4, TypeClass::new(None, Vec::new())))
            .unwrap();
        registry.post_init().unwrap();

        unsafe {
            registry
                .bind_instance_hooks("Counter", Some(make), None)
                .unwrap();
        }

        let instance = registry.create_instance("Counter").unwrap();
        assert!(!instance.is_null());
        unsafe { drop(Box::from_raw(instance.cast::<u32>())) };
    }

    #[test]
    fn enumerate_visits_everything() {
        let registry = TypeRegistry::new();
        let mut seen = 0;
        registry.enumerate_types(|_| seen += 1);
        assert_eq!(seen, registry.len());
    }

    #[test]
    fn edit_info_side_table() {
        let registry = TypeRegistry::new();
        registry.add_field_edit_infos(vec![Arc::new(FieldEditInfo {
            limit_min: 0.0,
            limit_max: 10.0,
            help: "scale factor".to_string(),
        })]);

        let info = registry.field_edit_info(0).unwrap();
        assert_eq!(info.limit_max, 10.0);
        assert!(registry.field_edit_info(1).is_none());
    }

    #[test]
    fn memory_usage_nonzero() {
        let registry = TypeRegistry::new();
        assert!(registry.memory_usage() > 0);
    }
}
