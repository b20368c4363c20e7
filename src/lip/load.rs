//! Image reconstruction.
//!
//! Loading reverses capture in one pass over the stream:
//!
//! 1. Read and gate the header (version, root type).
//! 2. Read the fixup table and validate every offset against the image's byte range -
//!    before anything is dereferenced.
//! 3. Allocate exactly `size` raw bytes and bulk-copy the stream into them; this single
//!    copy reconstructs the entire flattened graph's contents at once.
//! 4. Install the root class's dispatch table (only the dispatch slot is written - no
//!    constructor logic runs).
//! 5. Patch every pointer slot to `base + target offset`, reinstalling dispatch tables
//!    at fixup targets that carry a dispatch tag.
//!
//! Failure never leaves a half-initialized object reachable: every early return releases
//! the allocation, and nothing is returned until the full reconstruction succeeded.
//!
//! The reconstructed object was never constructed, so it must never be destructed:
//! [`LipObject`] and [`LipBox`] release the raw allocation on drop without invoking any
//! field teardown logic.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::io::Read;
use std::marker::PhantomData;
use std::ptr::NonNull;

use log::debug;

use crate::{
    lip::{
        image::{read_exact_checked, ImageHeader, PointerFixup, IMAGE_ALIGN},
        LipEngine, Reflected,
    },
    reflection::{TypeClass, TypeRc, TypeTag},
    Result,
};

/// Owns the raw image allocation until reconstruction either succeeds or fails.
struct AllocGuard {
    ptr: *mut u8,
    layout: Layout,
}

impl AllocGuard {
    fn release(mut self) -> *mut u8 {
        let ptr = self.ptr;
        self.ptr = std::ptr::null_mut();
        ptr
    }
}

impl Drop for AllocGuard {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // Reconstruction failed; nothing was handed out.
            unsafe { dealloc(self.ptr, self.layout) };
        }
    }
}

/// An owned, reconstructed object graph.
///
/// The allocation holds the root object at its base followed by everything the root
/// transitively points to; all internal pointers have been patched to point into the
/// same allocation. Because the contents were reconstructed by byte copy rather than
/// construction, dropping a `LipObject` deallocates the raw bytes without running any
/// destructor logic.
pub struct LipObject {
    ptr: NonNull<u8>,
    layout: Layout,
    ty: TypeRc,
}

impl LipObject {
    /// Base address of the reconstructed root object.
    #[must_use]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Total byte size of the reconstructed image.
    #[must_use]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// The root object's type record.
    #[must_use]
    pub fn ty(&self) -> &TypeRc {
        &self.ty
    }

    /// Borrow the root object as `T`.
    ///
    /// # Safety
    /// `T`'s layout must match the root class's registered metadata.
    #[must_use]
    pub unsafe fn cast<T>(&self) -> &T {
        &*(self.ptr.as_ptr() as *const T)
    }

    /// Release ownership of the allocation.
    ///
    /// The caller becomes responsible for deallocating with the global allocator,
    /// using the returned size and [`crate::lip::IMAGE_ALIGN`] - and for never running
    /// destructor logic on the contents.
    #[must_use]
    pub fn into_raw(self) -> (*mut u8, usize) {
        let parts = (self.ptr.as_ptr(), self.layout.size());
        std::mem::forget(self);
        parts
    }
}

impl Drop for LipObject {
    fn drop(&mut self) {
        // Raw deallocation only: the contents were never constructed.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

/// A [`LipObject`] with a typed view of its root.
///
/// Dereferences to `T`. Dropping releases the raw allocation; `T`'s `Drop` (if any)
/// is deliberately never invoked, because the object's fields were populated by byte
/// copy rather than construction.
pub struct LipBox<T> {
    object: LipObject,
    _marker: PhantomData<*mut T>,
}

impl<T> LipBox<T> {
    pub(crate) fn new(object: LipObject) -> LipBox<T> {
        LipBox {
            object,
            _marker: PhantomData,
        }
    }

    /// Base address of the reconstructed root object.
    #[must_use]
    pub fn as_ptr(&self) -> *mut T {
        self.object.as_ptr() as *mut T
    }

    /// The untyped view of the allocation.
    #[must_use]
    pub fn as_object(&self) -> &LipObject {
        &self.object
    }
}

impl<T> std::ops::Deref for LipBox<T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*(self.object.as_ptr() as *const T) }
    }
}

impl<T> std::ops::DerefMut for LipBox<T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *(self.object.as_ptr() as *mut T) }
    }
}

impl<'r> LipEngine<'r> {
    /// Reconstruct an object image, returning a typed view of the root.
    ///
    /// In addition to everything [`LipEngine::load_raw`] checks, the image's stored
    /// root tag must equal `T`'s tag ([`crate::Error::TypeMismatch`] otherwise; nothing
    /// is allocated in that case).
    ///
    /// # Safety
    /// `T`'s layout must match the registered metadata of the image's root class.
    ///
    /// # Errors
    /// Same conditions as [`LipEngine::load_raw`], plus [`crate::Error::TypeMismatch`].
    pub unsafe fn load<T: Reflected, R: Read>(
        &self,
        input: &mut R,
        expected_version: u32,
    ) -> Result<LipBox<T>> {
        let object = self.load_impl(input, expected_version, Some(T::type_tag()))?;
        Ok(LipBox::new(object))
    }

    /// Reconstruct an object image.
    ///
    /// Reads header, fixup table and raw bytes from `input`, rebuilds the flattened
    /// graph in a single fresh allocation, patches every pointer slot and reinstalls
    /// dispatch tables. Ownership of the reconstruction transfers to the caller via
    /// the returned [`LipObject`].
    ///
    /// `expected_version` of 0 disables the version gate.
    ///
    /// # Errors
    /// - [`crate::Error::RegistryNotResolved`] before `post_init`
    /// - [`crate::Error::VersionMismatch`] on a failed version gate; nothing allocated
    /// - [`crate::Error::TypeNotFound`] / [`crate::Error::NotAClass`] for an unknown or
    ///   non-class tag (root or dispatch)
    /// - [`crate::Error::Malformed`] for fixup offsets outside the image, an image
    ///   smaller than its root type, or a stream that ends before the declared size
    /// - [`crate::Error::HookUnbound`] if a needed dispatch class has no bound hook
    /// - [`crate::Error::Io`] for underlying stream failures
    pub fn load_raw<R: Read>(&self, input: &mut R, expected_version: u32) -> Result<LipObject> {
        self.load_impl(input, expected_version, None)
    }

    fn load_impl<R: Read>(
        &self,
        input: &mut R,
        expected_version: u32,
        expected_tag: Option<TypeTag>,
    ) -> Result<LipObject> {
        self.registry().ensure_resolved()?;

        let header = ImageHeader::read_from(input)?;
        if expected_version != 0 && header.version != expected_version {
            return Err(crate::Error::VersionMismatch {
                expected: expected_version,
                actual: header.version,
            });
        }
        if let Some(expected) = expected_tag {
            if header.type_tag != expected {
                return Err(crate::Error::TypeMismatch {
                    expected,
                    actual: header.type_tag,
                });
            }
        }

        let ty = self
            .registry()
            .find_type_by_tag(header.type_tag)
            .ok_or(crate::Error::TypeNotFound(header.type_tag))?;
        let class = ty.expect_class()?;
        if header.size == 0 {
            return Err(malformed_error!("image declares zero bytes"));
        }
        if header.size < ty.size() {
            return Err(malformed_error!(
                "image of {} bytes cannot hold root type '{}' of {} bytes",
                header.size,
                ty.name(),
                ty.size()
            ));
        }

        let mut fixups = Vec::with_capacity(usize::from(header.num_fixups));
        for _ in 0..header.num_fixups {
            let fixup = PointerFixup::read_from(input)?;
            fixup.validate(header.size)?;
            fixups.push(fixup);
        }

        let Ok(layout) = Layout::from_size_align(header.size as usize, IMAGE_ALIGN) else {
            return Err(malformed_error!(
                "image size {} exceeds allocatable range",
                header.size
            ));
        };
        let base = unsafe { alloc(layout) };
        if base.is_null() {
            handle_alloc_error(layout);
        }
        let guard = AllocGuard { ptr: base, layout };

        // One bulk copy reconstructs the entire flattened graph's contents.
        let image = unsafe { std::slice::from_raw_parts_mut(base, header.size as usize) };
        read_exact_checked(input, image, "object data")?;

        // The root's dispatch table first; fixups reinstall everything else.
        unsafe { install_dispatch(class, ty.name(), base)? };

        for fixup in &fixups {
            let target = base.wrapping_add(fixup.pointer_value_offset as usize);
            unsafe {
                let slot = base.wrapping_add(fixup.pointer_offset as usize) as *mut *mut u8;
                std::ptr::write_unaligned(slot, target);
            }
            if !fixup.dispatch_tag.is_none() && !std::ptr::eq(target, base) {
                let dispatch_ty = self
                    .registry()
                    .find_type_by_tag(fixup.dispatch_tag)
                    .ok_or(crate::Error::TypeNotFound(fixup.dispatch_tag))?;
                unsafe {
                    install_dispatch(dispatch_ty.expect_class()?, dispatch_ty.name(), target)?;
                }
            }
        }

        debug!(
            "reconstructed '{}': {} bytes, {} fixups",
            ty.name(),
            header.size,
            fixups.len()
        );

        let ptr = guard.release();
        Ok(LipObject {
            // Null was excluded right after allocation.
            ptr: unsafe { NonNull::new_unchecked(ptr) },
            layout,
            ty,
        })
    }
}

/// Install a class's dispatch table at `mem`, if the class carries one.
///
/// # Safety
/// `mem` must point at storage of at least the class's registered size.
unsafe fn install_dispatch(class: &TypeClass, name: &str, mem: *mut u8) -> Result<()> {
    match class.dispatch_hook() {
        Some(hook) => {
            hook(mem);
            Ok(())
        }
        None if class.declares_dispatch() => Err(crate::Error::HookUnbound(name.to_string())),
        None => Ok(()),
    }
}
