//! Shared helpers for integration tests: sample reflected types and a descriptor
//! image writer mirroring the extractor's output format.
#![allow(dead_code)]

use std::mem::{offset_of, size_of};

use typescope::prelude::*;

/// Minimal linkable node: one pointer, one value.
#[repr(C)]
pub struct Node {
    pub next: *mut Node,
    pub val: i64,
}

unsafe impl Reflected for Node {
    const TYPE_NAME: &'static str = "Node";
}

/// Polymorphic instance with an explicit dispatch-table reference field.
#[repr(C)]
pub struct Widget {
    /// Dispatch-table reference; deliberately not a registered field.
    pub vtable: *const WidgetVtable,
    pub id: u64,
    pub peer: *mut Widget,
}

#[repr(C)]
pub struct WidgetVtable {
    pub describe: unsafe fn(*const Widget) -> u64,
}

unsafe fn widget_describe(this: *const Widget) -> u64 {
    (*this).id * 10
}

pub static WIDGET_VTABLE: WidgetVtable = WidgetVtable {
    describe: widget_describe,
};

unsafe impl Reflected for Widget {
    const TYPE_NAME: &'static str = "Widget";
}

impl Widget {
    pub fn new(id: u64) -> Widget {
        Widget {
            vtable: &WIDGET_VTABLE,
            id,
            peer: std::ptr::null_mut(),
        }
    }
}

pub fn create_widget() -> *mut u8 {
    Box::into_raw(Box::new(Widget::new(0))).cast()
}

pub unsafe fn install_widget_dispatch(mem: *mut u8) {
    std::ptr::write(mem as *mut *const WidgetVtable, &WIDGET_VTABLE);
}

/// Invoke the polymorphic operation through the instance's dispatch table.
pub unsafe fn describe(this: *const Widget) -> u64 {
    ((*(*this).vtable).describe)(this)
}

/// Builds descriptor file images byte by byte.
#[derive(Default)]
pub struct DescriptorWriter {
    num_types: i32,
    types: Vec<u8>,
    num_edit_infos: i32,
    edit_infos: Vec<u8>,
}

fn push_asciiz(buf: &mut Vec<u8>, text: &str) {
    buf.extend_from_slice(text.as_bytes());
    buf.push(0);
}

impl DescriptorWriter {
    pub fn new() -> DescriptorWriter {
        DescriptorWriter::default()
    }

    pub fn edit_info(&mut self, min: f32, max: f32, help: &str) {
        self.edit_infos.extend_from_slice(&min.to_le_bytes());
        self.edit_infos.extend_from_slice(&max.to_le_bytes());
        push_asciiz(&mut self.edit_infos, help);
        self.num_edit_infos += 1;
    }

    /// Emit a class record. `fields` entries are (name, type tag, offset, flags, edit index).
    #[allow(clippy::too_many_arguments)]
    pub fn class(
        &mut self,
        name: &str,
        size: u32,
        base_id: u32,
        base_offset: u16,
        create_addr: u32,
        dispatch_addr: u32,
        fields: &[(&str, u32, u16, u16, u16)],
    ) {
        push_asciiz(&mut self.types, name);
        self.types.extend_from_slice(&size.to_le_bytes());
        self.types.extend_from_slice(&1i32.to_le_bytes());
        self.types.extend_from_slice(&base_id.to_le_bytes());
        self.types.extend_from_slice(&base_offset.to_le_bytes());
        self.types.extend_from_slice(&create_addr.to_le_bytes());
        self.types.extend_from_slice(&dispatch_addr.to_le_bytes());
        self.types
            .extend_from_slice(&(fields.len() as i32).to_le_bytes());
        for &(field_name, type_id, offset, flags, edit_index) in fields {
            self.types.extend_from_slice(&type_id.to_le_bytes());
            self.types.extend_from_slice(&offset.to_le_bytes());
            self.types.extend_from_slice(&flags.to_le_bytes());
            self.types.extend_from_slice(&edit_index.to_le_bytes());
            push_asciiz(&mut self.types, field_name);
        }
        self.num_types += 1;
    }

    pub fn enumeration(&mut self, name: &str, size: u32, constants: &[(&str, i32)]) {
        push_asciiz(&mut self.types, name);
        self.types.extend_from_slice(&size.to_le_bytes());
        self.types.extend_from_slice(&2i32.to_le_bytes());
        self.types
            .extend_from_slice(&(constants.len() as i32).to_le_bytes());
        for &(constant_name, value) in constants {
            push_asciiz(&mut self.types, constant_name);
            self.types.extend_from_slice(&value.to_le_bytes());
        }
        self.num_types += 1;
    }

    pub fn pointer(&mut self, name: &str, pointee_id: u32) {
        push_asciiz(&mut self.types, name);
        self.types
            .extend_from_slice(&(size_of::<usize>() as u32).to_le_bytes());
        self.types.extend_from_slice(&3i32.to_le_bytes());
        self.types.extend_from_slice(&pointee_id.to_le_bytes());
        self.num_types += 1;
    }

    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.num_types.to_le_bytes());
        out.extend_from_slice(&self.num_edit_infos.to_le_bytes());
        out.extend_from_slice(&self.edit_infos);
        out.extend_from_slice(&self.types);
        out
    }
}

const NO_EDIT: u16 = 0xFFFF;

/// A descriptor image declaring `Node` and `Node*` - pointer listed first, so the
/// class it points at appears later in the file.
pub fn node_descriptor() -> Vec<u8> {
    let mut writer = DescriptorWriter::new();
    writer.pointer("Node*", TypeTag::from_name("Node").value());
    writer.class(
        "Node",
        size_of::<Node>() as u32,
        0,
        0,
        0,
        0,
        &[
            (
                "next",
                TypeTag::from_name("Node*").value(),
                offset_of!(Node, next) as u16,
                0,
                NO_EDIT,
            ),
            (
                "val",
                TypeTag::from_name("i64").value(),
                offset_of!(Node, val) as u16,
                0,
                NO_EDIT,
            ),
        ],
    );
    writer.finish()
}

/// A registry populated from [`node_descriptor`], resolved and ready for save/load.
pub fn node_registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
    load_descriptor(&registry, &node_descriptor()).unwrap();
    registry.post_init().unwrap();
    registry
}

/// A registry describing [`Widget`] with bound instance hooks.
pub fn widget_registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
    registry
        .add_type(Type::pointer(
            "Widget*",
            size_of::<usize>() as u32,
            TypeTag::from_name("Widget"),
        ))
        .unwrap();
    let builder = ClassBuilder::new("Widget", size_of::<Widget>() as u32)
        .field("id", "u64", offset_of!(Widget, id) as u16)
        .field("peer", "Widget*", offset_of!(Widget, peer) as u16);
    unsafe { builder.hooks(Some(create_widget), Some(install_widget_dispatch)) }
        .register(&registry)
        .unwrap();
    registry.post_init().unwrap();
    registry
}
