//! Object-graph capture and image emission.
//!
//! Saving is a two-phase operation. The *capture* phase walks the object graph guided by
//! reflected field metadata, recording every distinct pointee as a region of the future
//! image and every pointer slot as a fixup - without touching the output stream. The
//! *emit* phase then writes header, fixup table and raw region bytes in one pass, so a
//! failed capture never commits a single byte.
//!
//! # Capture state
//!
//! - **Captured regions** - (source address, byte length, assigned image offset), in
//!   discovery order; the root object occupies offset 0.
//! - **Fixup list** - index 0 is a reserved identity placeholder that is never written;
//!   it keeps "points at the root" representable as target offset 0.
//! - **Frame stack** - traversal uses an explicit stack of work frames instead of call
//!   recursion, so auxiliary memory is bounded by the graph's nesting depth rather than
//!   the runtime call-stack limit.
//! - **Counters** - the running data size excludes the root until capture completes
//!   (the root is emitted first, separately); the pointer-storage cursor starts past the
//!   root and assigns every new region its image offset.
//!
//! Only pointer and class kind fields are traversed. Fundamental, enum and fixed-array
//! fields need no graph logic - their bytes are already part of whichever region
//! contains them.
//!
//! # Pointer identity
//!
//! Each non-null pointer is checked against the already-captured regions by source
//! address. A hit records a fixup to the existing region and does not recurse - this is
//! what terminates cycles and preserves shared-pointer identity. The check is a linear
//! scan per pointer, quadratic in the number of distinct pointees; a deliberate
//! simplicity tradeoff for the small graphs this engine targets, replaceable by a
//! hashed lookup without changing observable behavior.
//!
//! # Dynamically-sized sequences
//!
//! A class whose display name matches the engine's sequence prefix (after skipping one
//! leading `ns::` qualifier) is treated as a pointer pair delimiting a contiguous run of
//! elements: the raw byte range between the two pointers is captured as one region, the
//! two delimiting slots get fixups to its start and end, and pointer/class elements are
//! traversed through synthetic frames that carry image offsets only.

use std::io::Write;

use log::{debug, trace};

use crate::{
    lip::{
        image::{ImageHeader, PointerFixup, POINTER_SIZE},
        LipEngine, Reflected,
    },
    reflection::{FieldFlags, ReflectionKind, TypeRc, TypeTag},
    Result,
};

/// One captured byte range of the future image.
struct Region {
    /// Live source address the bytes are copied from at emit time.
    src: *const u8,
    /// Byte length.
    size: u32,
    /// Assigned offset within the image.
    image_offset: u32,
}

/// One pending traversal step.
#[derive(Clone)]
enum WorkItem {
    /// A pointer slot to examine.
    Pointer {
        /// Address of the slot in the live object.
        slot: *const u8,
        /// Offset of the slot within the image.
        slot_offset: u32,
        /// The slot's pointer type record.
        ty: TypeRc,
    },
    /// A class sub-object to expand.
    Class {
        /// Address of the sub-object in the live object (or captured storage).
        base: *const u8,
        /// Offset of the sub-object within the image.
        image_offset: u32,
        /// The sub-object's class type record.
        ty: TypeRc,
    },
}

/// One frame of the explicit traversal stack.
struct Frame {
    items: Vec<WorkItem>,
    next: usize,
}

/// Capture state for one save operation.
struct Collector<'e, 'r> {
    engine: &'e LipEngine<'r>,
    regions: Vec<Region>,
    fixups: Vec<PointerFixup>,
    frames: Vec<Frame>,
    /// Captured bytes so far, excluding the root object.
    data_size: u32,
    /// Image offset the next captured region will be assigned.
    cursor: u32,
}

impl<'r> LipEngine<'r> {
    /// Capture an object graph and emit it as a load-in-place image.
    ///
    /// Typed convenience over [`LipEngine::save_raw`]; the root type is taken from the
    /// [`Reflected`] implementation.
    ///
    /// # Safety
    /// Same contract as [`LipEngine::save_raw`]: `object`'s actual layout, and that of
    /// every object transitively reachable through registered pointer fields, must
    /// match the registered metadata.
    ///
    /// # Errors
    /// Same conditions as [`LipEngine::save_raw`].
    pub unsafe fn save<T: Reflected, W: Write>(
        &self,
        object: &T,
        version: u32,
        out: &mut W,
    ) -> Result<()> {
        self.save_raw((object as *const T).cast(), T::type_tag(), version, out)
    }

    /// Capture the object graph rooted at `object` and emit it as an image.
    ///
    /// `object` must be an instance of the class registered under `tag`. The whole
    /// capture runs before the first byte is written; on error the stream is untouched.
    ///
    /// # Safety
    /// The caller vouches that `object` points at a live instance whose layout matches
    /// the registered metadata for `tag`, that every non-null registered pointer field
    /// in the reachable graph points at a live instance of its registered pointee type,
    /// and that sequence classes delimit valid contiguous storage. Capture reads memory
    /// through exactly those descriptions.
    ///
    /// # Errors
    /// - [`crate::Error::RegistryNotResolved`] before `post_init`
    /// - [`crate::Error::TypeNotFound`] / [`crate::Error::NotAClass`] for a bad root tag
    /// - [`crate::Error::NotSerializable`] if a traversed class has a `NO_SERIALIZE` field
    /// - [`crate::Error::FixupOverflow`] if the graph needs more than 65535 fixups
    /// - [`crate::Error::Malformed`] for inconsistent sequence ranges
    /// - [`crate::Error::Io`] if emitting to the stream fails
    pub unsafe fn save_raw<W: Write>(
        &self,
        object: *const u8,
        tag: TypeTag,
        version: u32,
        out: &mut W,
    ) -> Result<()> {
        self.registry().ensure_resolved()?;
        let root = self
            .registry()
            .find_type_by_tag(tag)
            .ok_or(crate::Error::TypeNotFound(tag))?;
        root.expect_class()?;
        ensure_serializable(&root)?;

        let mut collector = Collector {
            engine: self,
            regions: Vec::new(),
            fixups: Vec::new(),
            frames: Vec::new(),
            data_size: 0,
            // Pointer data is stored after the root object.
            cursor: root.size(),
        };

        // The root is region 0, in case something in the graph points back at it,
        // paired with the reserved identity fixup.
        collector.regions.push(Region {
            src: object,
            size: root.size(),
            image_offset: 0,
        });
        collector.fixups.push(PointerFixup::default());

        collector.push_class_frame(object, 0, &root)?;
        collector.run()?;

        let num_fixups = collector.fixups.len() - 1;
        if num_fixups > usize::from(u16::MAX) {
            return Err(crate::Error::FixupOverflow(num_fixups));
        }
        let total_size = collector
            .data_size
            .checked_add(root.size())
            .ok_or_else(|| malformed_error!("image size overflow"))?;

        debug!(
            "captured '{}': {} bytes, {} regions, {} fixups",
            root.name(),
            total_size,
            collector.regions.len(),
            num_fixups
        );

        let header = ImageHeader {
            type_tag: tag,
            size: total_size,
            version,
            num_fixups: num_fixups as u16,
        };
        header.write_to(out)?;
        // The reserved identity entry at index 0 is not part of the table.
        for fixup in &collector.fixups[1..] {
            fixup.write_to(out)?;
        }
        for region in &collector.regions {
            let bytes = std::slice::from_raw_parts(region.src, region.size as usize);
            out.write_all(bytes)?;
        }
        Ok(())
    }
}

impl Collector<'_, '_> {
    /// Drain the frame stack, depth-first.
    ///
    /// Frames pushed while processing an item are drained before the remaining items
    /// of the current frame, which reproduces discovery order: a pointee's own
    /// pointers are captured before its discoverer's later fields.
    fn run(&mut self) -> Result<()> {
        loop {
            let item = {
                let Some(frame) = self.frames.last_mut() else {
                    break;
                };
                if frame.next >= frame.items.len() {
                    self.frames.pop();
                    continue;
                }
                let item = frame.items[frame.next].clone();
                frame.next += 1;
                item
            };

            match item {
                WorkItem::Pointer {
                    slot,
                    slot_offset,
                    ty,
                } => self.collect_pointer(slot, slot_offset, &ty)?,
                WorkItem::Class {
                    base,
                    image_offset,
                    ty,
                } => self.collect_class(base, image_offset, &ty)?,
            }
        }
        Ok(())
    }

    /// Handle a class sub-object at `image_offset`: sequences get raw-range capture,
    /// ordinary classes get their pointer/class fields expanded in place.
    fn collect_class(&mut self, base: *const u8, image_offset: u32, ty: &TypeRc) -> Result<()> {
        if self.engine.is_sequence_class(ty.name()) {
            return self.collect_sequence(base, image_offset, ty);
        }
        ensure_serializable(ty)?;
        self.push_class_frame(base, image_offset, ty)
    }

    /// Expand a class's traversable fields (own and inherited) into a new frame.
    ///
    /// An embedded class shares its parent's memory, so no new region is captured;
    /// items carry effective offsets that already include the base-offset chain.
    fn push_class_frame(&mut self, base: *const u8, image_offset: u32, ty: &TypeRc) -> Result<()> {
        let mut items = Vec::new();
        self.gather_items(ty, base, image_offset, &mut items)?;
        if !items.is_empty() {
            self.frames.push(Frame { items, next: 0 });
        }
        Ok(())
    }

    fn gather_items(
        &self,
        ty: &TypeRc,
        base: *const u8,
        image_offset: u32,
        items: &mut Vec<WorkItem>,
    ) -> Result<()> {
        let class = ty.expect_class()?;
        if let Some(base_ref) = class.base() {
            let base_ty = base_ref.ty()?;
            let base_offset = usize::from(base_ref.offset());
            self.gather_items(
                base_ty,
                base.wrapping_add(base_offset),
                image_offset + base_offset as u32,
                items,
            )?;
        }
        for field in class.fields() {
            let field_ty = field.ty()?;
            let offset = u32::from(field.offset());
            match field_ty.kind() {
                ReflectionKind::Pointer => items.push(WorkItem::Pointer {
                    slot: base.wrapping_add(offset as usize),
                    slot_offset: image_offset + offset,
                    ty: field_ty.clone(),
                }),
                ReflectionKind::Class => items.push(WorkItem::Class {
                    base: base.wrapping_add(offset as usize),
                    image_offset: image_offset + offset,
                    ty: field_ty.clone(),
                }),
                _ => {}
            }
        }
        Ok(())
    }

    /// Handle one pointer slot: dedup against captured regions, or capture the
    /// pointee as a new region and traverse into it on first discovery.
    fn collect_pointer(&mut self, slot: *const u8, slot_offset: u32, ty: &TypeRc) -> Result<()> {
        // Null pointers need no fixup; the raw copy already carries the zero.
        let value = unsafe { std::ptr::read_unaligned(slot as *const *const u8) };
        if value.is_null() {
            return Ok(());
        }

        let pointer = ty
            .as_pointer()
            .ok_or_else(|| malformed_error!("field type '{}' is not a pointer", ty.name()))?;
        let pointee = pointer.pointee()?.clone();
        let dispatch_tag = match pointee.as_class() {
            Some(class) if class.has_dispatch() => pointee.tag(),
            _ => TypeTag::NONE,
        };

        if let Some(region) = self.regions.iter().find(|r| std::ptr::eq(r.src, value)) {
            // Aliased or cyclic pointer: reuse the existing region, do not recurse.
            trace!(
                "fixup slot {} -> shared region at {}",
                slot_offset,
                region.image_offset
            );
            self.fixups.push(PointerFixup {
                pointer_offset: slot_offset,
                pointer_value_offset: region.image_offset,
                dispatch_tag,
            });
            return Ok(());
        }

        let image_offset = self.cursor;
        self.regions.push(Region {
            src: value,
            size: pointee.size(),
            image_offset,
        });
        self.grow(pointee.size())?;
        trace!(
            "fixup slot {} -> new region at {} ({} bytes of '{}')",
            slot_offset,
            image_offset,
            pointee.size(),
            pointee.name()
        );
        self.fixups.push(PointerFixup {
            pointer_offset: slot_offset,
            pointer_value_offset: image_offset,
            dispatch_tag,
        });

        if pointee.kind() == ReflectionKind::Class {
            self.collect_class(value, image_offset, &pointee)?;
        }
        Ok(())
    }

    /// Handle a sequence class: capture the delimited byte range as one region and
    /// fix up the two delimiting pointers; traverse pointer/class elements through a
    /// synthetic frame over the captured range.
    fn collect_sequence(&mut self, base: *const u8, image_offset: u32, ty: &TypeRc) -> Result<()> {
        let class = ty.expect_class()?;
        let (Some(begin_field), Some(end_field)) = (class.field(0), class.field(1)) else {
            return Err(malformed_error!(
                "sequence class '{}' needs two delimiting pointer fields",
                ty.name()
            ));
        };
        let begin_ty = begin_field.ty()?;
        let element = begin_ty
            .as_pointer()
            .ok_or_else(|| {
                malformed_error!(
                    "sequence class '{}' first field is not a pointer",
                    ty.name()
                )
            })?
            .pointee()?
            .clone();

        let begin = unsafe {
            std::ptr::read_unaligned(
                base.wrapping_add(usize::from(begin_field.offset())) as *const *const u8
            )
        };
        let end = unsafe {
            std::ptr::read_unaligned(
                base.wrapping_add(usize::from(end_field.offset())) as *const *const u8
            )
        };
        if begin == end {
            // Empty sequence; the delimiting slots are left as raw-copied.
            return Ok(());
        }
        if (end as usize) < (begin as usize) {
            return Err(malformed_error!(
                "sequence '{}' delimiters are inverted",
                ty.name()
            ));
        }
        let num_bytes = u32::try_from(end as usize - begin as usize)
            .map_err(|_| malformed_error!("sequence '{}' exceeds image range", ty.name()))?;

        let start = self.cursor;
        self.regions.push(Region {
            src: begin,
            size: num_bytes,
            image_offset: start,
        });
        self.grow(num_bytes)?;
        trace!(
            "sequence '{}': {} bytes captured at {}",
            ty.name(),
            num_bytes,
            start
        );

        self.fixups.push(PointerFixup {
            pointer_offset: image_offset + u32::from(begin_field.offset()),
            pointer_value_offset: start,
            dispatch_tag: TypeTag::NONE,
        });
        self.fixups.push(PointerFixup {
            pointer_offset: image_offset + u32::from(end_field.offset()),
            pointer_value_offset: start + num_bytes,
            dispatch_tag: TypeTag::NONE,
        });

        // Pointer or class elements still need their own capture, driven by a
        // synthetic frame over the newly captured storage.
        match element.kind() {
            ReflectionKind::Pointer => {
                let stride = POINTER_SIZE as u32;
                if num_bytes % stride != 0 {
                    return Err(malformed_error!(
                        "sequence '{}' range is not a multiple of the pointer width",
                        ty.name()
                    ));
                }
                let items = (0..num_bytes / stride)
                    .map(|i| WorkItem::Pointer {
                        slot: begin.wrapping_add((i * stride) as usize),
                        slot_offset: start + i * stride,
                        ty: element.clone(),
                    })
                    .collect();
                self.frames.push(Frame { items, next: 0 });
            }
            ReflectionKind::Class => {
                let stride = element.size();
                if stride == 0 || num_bytes % stride != 0 {
                    return Err(malformed_error!(
                        "sequence '{}' range is not a multiple of the element size",
                        ty.name()
                    ));
                }
                let items = (0..num_bytes / stride)
                    .map(|i| WorkItem::Class {
                        base: begin.wrapping_add((i * stride) as usize),
                        image_offset: start + i * stride,
                        ty: element.clone(),
                    })
                    .collect();
                self.frames.push(Frame { items, next: 0 });
            }
            _ => {}
        }
        Ok(())
    }

    fn grow(&mut self, size: u32) -> Result<()> {
        self.data_size = self
            .data_size
            .checked_add(size)
            .ok_or_else(|| malformed_error!("image size overflow"))?;
        self.cursor = self
            .cursor
            .checked_add(size)
            .ok_or_else(|| malformed_error!("image size overflow"))?;
        Ok(())
    }
}

/// A load-in-place class cannot carry non-serializable fields, anywhere in its chain.
fn ensure_serializable(ty: &TypeRc) -> Result<()> {
    let mut current = ty.clone();
    loop {
        let class = current.expect_class()?;
        if class
            .fields()
            .iter()
            .any(|f| f.flags().contains(FieldFlags::NO_SERIALIZE))
        {
            return Err(crate::Error::NotSerializable(ty.name().to_string()));
        }
        match class.base() {
            Some(base) => current = base.ty()?.clone(),
            None => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lip::image::{FIXUP_SIZE, HEADER_SIZE},
        reflection::{ClassBuilder, FieldFlags, TypeRegistry},
        test::fixtures::{node_registry, Node},
        Error,
    };

    fn ptr_width() -> u32 {
        POINTER_SIZE as u32
    }

    #[test]
    fn null_graph_has_no_fixups() {
        let registry = node_registry();
        let engine = LipEngine::new(&registry);

        let node = Node {
            next: std::ptr::null_mut(),
            val: 5,
        };
        let mut image = Vec::new();
        unsafe {
            engine
                .save_raw(
                    (&node as *const Node).cast(),
                    TypeTag::from_name("Node"),
                    1,
                    &mut image,
                )
                .unwrap();
        }

        let node_size = std::mem::size_of::<Node>();
        assert_eq!(image.len(), HEADER_SIZE + node_size);

        let header = ImageHeader::read_from(&mut image.as_slice()).unwrap();
        assert_eq!(header.type_tag, TypeTag::from_name("Node"));
        assert_eq!(header.size as usize, node_size);
        assert_eq!(header.version, 1);
        assert_eq!(header.num_fixups, 0);
    }

    #[test]
    fn chain_assigns_sequential_offsets() {
        let registry = node_registry();
        let engine = LipEngine::new(&registry);

        let mut c = Node {
            next: std::ptr::null_mut(),
            val: 3,
        };
        let mut b = Node {
            next: &mut c,
            val: 2,
        };
        let a = Node {
            next: &mut b,
            val: 1,
        };

        let mut image = Vec::new();
        unsafe {
            engine
                .save_raw(
                    (&a as *const Node).cast(),
                    TypeTag::from_name("Node"),
                    1,
                    &mut image,
                )
                .unwrap();
        }

        let node_size = std::mem::size_of::<Node>() as u32;
        let header = ImageHeader::read_from(&mut image.as_slice()).unwrap();
        assert_eq!(header.size, 3 * node_size);
        assert_eq!(header.num_fixups, 2);

        let mut rest = &image[HEADER_SIZE..];
        let first = PointerFixup::read_from(&mut rest).unwrap();
        assert_eq!(first.pointer_offset, 0);
        assert_eq!(first.pointer_value_offset, node_size);

        let second = PointerFixup::read_from(&mut rest).unwrap();
        // b's own `next` slot lives inside b's region.
        assert_eq!(second.pointer_offset, node_size);
        assert_eq!(second.pointer_value_offset, 2 * node_size);
    }

    #[test]
    fn cycle_terminates_with_backreference() {
        let registry = node_registry();
        let engine = LipEngine::new(&registry);

        let mut b = Node {
            next: std::ptr::null_mut(),
            val: 2,
        };
        let mut a = Node {
            next: &mut b,
            val: 1,
        };
        b.next = &mut a;

        let mut image = Vec::new();
        unsafe {
            engine
                .save_raw(
                    (&a as *const Node).cast(),
                    TypeTag::from_name("Node"),
                    1,
                    &mut image,
                )
                .unwrap();
        }

        let node_size = std::mem::size_of::<Node>() as u32;
        let header = ImageHeader::read_from(&mut image.as_slice()).unwrap();
        assert_eq!(header.size, 2 * node_size);
        assert_eq!(header.num_fixups, 2);

        let mut rest = &image[HEADER_SIZE..];
        let _forward = PointerFixup::read_from(&mut rest).unwrap();
        let back = PointerFixup::read_from(&mut rest).unwrap();
        // The cycle closes by pointing back at the root region.
        assert_eq!(back.pointer_offset, node_size);
        assert_eq!(back.pointer_value_offset, 0);
    }

    #[test]
    fn aliased_pointers_share_one_region() {
        #[repr(C)]
        struct Pair {
            first: *mut Node,
            second: *mut Node,
        }

        let registry = node_registry();
        let width = ptr_width();
        ClassBuilder::new("Pair", std::mem::size_of::<Pair>() as u32)
            .field("first", "Node*", 0)
            .field("second", "Node*", width as u16)
            .register(&registry)
            .unwrap();
        registry.post_init().unwrap();

        let engine = LipEngine::new(&registry);
        let mut shared = Node {
            next: std::ptr::null_mut(),
            val: 9,
        };
        let pair = Pair {
            first: &mut shared,
            second: &mut shared,
        };

        let mut image = Vec::new();
        unsafe {
            engine
                .save_raw(
                    (&pair as *const Pair).cast(),
                    TypeTag::from_name("Pair"),
                    1,
                    &mut image,
                )
                .unwrap();
        }

        let pair_size = std::mem::size_of::<Pair>() as u32;
        let node_size = std::mem::size_of::<Node>() as u32;
        let header = ImageHeader::read_from(&mut image.as_slice()).unwrap();
        // One shared region, two fixups at the same target.
        assert_eq!(header.size, pair_size + node_size);
        assert_eq!(header.num_fixups, 2);

        let mut rest = &image[HEADER_SIZE..];
        let first = PointerFixup::read_from(&mut rest).unwrap();
        let second = PointerFixup::read_from(&mut rest).unwrap();
        assert_eq!(first.pointer_value_offset, pair_size);
        assert_eq!(second.pointer_value_offset, pair_size);
        assert_eq!(second.pointer_offset, width);
    }

    #[test]
    fn emit_layout_is_header_fixups_regions() {
        let registry = node_registry();
        let engine = LipEngine::new(&registry);

        let mut b = Node {
            next: std::ptr::null_mut(),
            val: 0x2222,
        };
        let a = Node {
            next: &mut b,
            val: 0x1111,
        };

        let mut image = Vec::new();
        unsafe {
            engine
                .save_raw(
                    (&a as *const Node).cast(),
                    TypeTag::from_name("Node"),
                    7,
                    &mut image,
                )
                .unwrap();
        }

        let node_size = std::mem::size_of::<Node>();
        assert_eq!(image.len(), HEADER_SIZE + FIXUP_SIZE + 2 * node_size);

        // Root region starts right after the fixup table and holds a's bytes,
        // including the raw (unpatched) pointer value.
        let raw = &image[HEADER_SIZE + FIXUP_SIZE..];
        let val_off = std::mem::offset_of!(Node, val);
        assert_eq!(
            &raw[val_off..val_off + 8],
            &0x1111i64.to_le_bytes()
        );
        assert_eq!(
            &raw[node_size + val_off..node_size + val_off + 8],
            &0x2222i64.to_le_bytes()
        );
    }

    #[test]
    fn unresolved_registry_is_rejected() {
        let registry = node_registry();
        // Drop back to the building state.
        ClassBuilder::new("Late", 4).register(&registry).unwrap();

        let engine = LipEngine::new(&registry);
        let node = Node {
            next: std::ptr::null_mut(),
            val: 0,
        };
        let mut out = Vec::new();
        let err = unsafe {
            engine.save_raw(
                (&node as *const Node).cast(),
                TypeTag::from_name("Node"),
                1,
                &mut out,
            )
        };
        assert!(matches!(err, Err(Error::RegistryNotResolved)));
        assert!(out.is_empty());
    }

    #[test]
    fn non_class_root_is_rejected() {
        let registry = node_registry();
        let engine = LipEngine::new(&registry);

        let value = 5u32;
        let mut out = Vec::new();
        let err = unsafe {
            engine.save_raw(
                (&value as *const u32).cast(),
                TypeTag::from_name("u32"),
                1,
                &mut out,
            )
        };
        assert!(matches!(err, Err(Error::NotAClass(_))));
    }

    #[test]
    fn unknown_root_is_rejected() {
        let registry = node_registry();
        let engine = LipEngine::new(&registry);
        let mut out = Vec::new();
        let err = unsafe {
            engine.save_raw(
                std::ptr::null(),
                TypeTag::from_name("Nope"),
                1,
                &mut out,
            )
        };
        assert!(matches!(err, Err(Error::TypeNotFound(_))));
    }

    #[test]
    fn no_serialize_field_is_rejected() {
        let registry = TypeRegistry::new();
        ClassBuilder::new("Transient", 8)
            .flagged_field("cache", "u64", 0, FieldFlags::NO_SERIALIZE)
            .register(&registry)
            .unwrap();
        registry.post_init().unwrap();

        let engine = LipEngine::new(&registry);
        let data = 0u64;
        let mut out = Vec::new();
        let err = unsafe {
            engine.save_raw(
                (&data as *const u64).cast(),
                TypeTag::from_name("Transient"),
                1,
                &mut out,
            )
        };
        assert!(matches!(err, Err(Error::NotSerializable(_))));
        assert!(out.is_empty());
    }
}
