//! Shared functionality for unit tests: descriptor byte-image crafting and reflected
//! sample types with registries describing them.


/// Builds descriptor file images byte by byte, mirroring the extractor's output format.
///
/// Class records buffer their fields between [`DescriptorImage::begin_class`] and
/// [`DescriptorImage::end_class`] so the field count can be emitted in front of them.
pub(crate) struct DescriptorImage {
    num_types: i32,
    types: Vec<u8>,
    num_edit_infos: i32,
    edit_infos: Vec<u8>,
    class: Option<ClassInProgress>,
}

struct ClassInProgress {
    header: Vec<u8>,
    num_fields: i32,
    fields: Vec<u8>,
}

fn push_asciiz(buf: &mut Vec<u8>, text: &str) {
    buf.extend_from_slice(text.as_bytes());
    buf.push(0);
}

impl DescriptorImage {
    pub(crate) fn new() -> DescriptorImage {
        DescriptorImage {
            num_types: 0,
            types: Vec::new(),
            num_edit_infos: 0,
            edit_infos: Vec::new(),
            class: None,
        }
    }

    pub(crate) fn edit_info(&mut self, min: f32, max: f32, help: &str) {
        self.edit_infos.extend_from_slice(&min.to_le_bytes());
        self.edit_infos.extend_from_slice(&max.to_le_bytes());
        push_asciiz(&mut self.edit_infos, help);
        self.num_edit_infos += 1;
    }

    pub(crate) fn begin_class(
        &mut self,
        name: &str,
        size: u32,
        base_id: u32,
        base_offset: u16,
        create_addr: u32,
        dispatch_addr: u32,
    ) {
        assert!(self.class.is_none(), "unbalanced begin_class");
        let mut header = Vec::new();
        push_asciiz(&mut header, name);
        header.extend_from_slice(&size.to_le_bytes());
        header.extend_from_slice(&1i32.to_le_bytes()); // ReflectionKind::Class
        header.extend_from_slice(&base_id.to_le_bytes());
        header.extend_from_slice(&base_offset.to_le_bytes());
        header.extend_from_slice(&create_addr.to_le_bytes());
        header.extend_from_slice(&dispatch_addr.to_le_bytes());
        self.class = Some(ClassInProgress {
            header,
            num_fields: 0,
            fields: Vec::new(),
        });
    }

    pub(crate) fn field(
        &mut self,
        type_id: u32,
        offset: u16,
        flags: u16,
        edit_index: u16,
        name: &str,
    ) {
        let class = self.class.as_mut().expect("field outside class");
        class.fields.extend_from_slice(&type_id.to_le_bytes());
        class.fields.extend_from_slice(&offset.to_le_bytes());
        class.fields.extend_from_slice(&flags.to_le_bytes());
        class.fields.extend_from_slice(&edit_index.to_le_bytes());
        push_asciiz(&mut class.fields, name);
        class.num_fields += 1;
    }

    pub(crate) fn end_class(&mut self) {
        let class = self.class.take().expect("unbalanced end_class");
        self.types.extend_from_slice(&class.header);
        self.types.extend_from_slice(&class.num_fields.to_le_bytes());
        self.types.extend_from_slice(&class.fields);
        self.num_types += 1;
    }

    pub(crate) fn enumeration(&mut self, name: &str, size: u32, constants: &[(&str, i32)]) {
        push_asciiz(&mut self.types, name);
        self.types.extend_from_slice(&size.to_le_bytes());
        self.types.extend_from_slice(&2i32.to_le_bytes()); // ReflectionKind::Enum
        self.types
            .extend_from_slice(&(constants.len() as i32).to_le_bytes());
        for &(constant_name, value) in constants {
            push_asciiz(&mut self.types, constant_name);
            self.types.extend_from_slice(&value.to_le_bytes());
        }
        self.num_types += 1;
    }

    pub(crate) fn pointer(&mut self, name: &str, pointee_id: u32) {
        push_asciiz(&mut self.types, name);
        self.types
            .extend_from_slice(&(std::mem::size_of::<usize>() as u32).to_le_bytes());
        self.types.extend_from_slice(&3i32.to_le_bytes()); // ReflectionKind::Pointer
        self.types.extend_from_slice(&pointee_id.to_le_bytes());
        self.num_types += 1;
    }

    pub(crate) fn array(&mut self, name: &str, size: u32, element_id: u32, count: i32) {
        push_asciiz(&mut self.types, name);
        self.types.extend_from_slice(&size.to_le_bytes());
        self.types.extend_from_slice(&4i32.to_le_bytes()); // ReflectionKind::Array
        self.types.extend_from_slice(&element_id.to_le_bytes());
        self.types.extend_from_slice(&count.to_le_bytes());
        self.num_types += 1;
    }

    /// A bare name/size/kind triple with no payload, for malformed-kind tests.
    pub(crate) fn raw_type_header(&mut self, name: &str, size: u32, kind: i32) {
        push_asciiz(&mut self.types, name);
        self.types.extend_from_slice(&size.to_le_bytes());
        self.types.extend_from_slice(&kind.to_le_bytes());
        self.num_types += 1;
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        assert!(self.class.is_none(), "unbalanced begin_class at finish");
        let mut out = Vec::new();
        out.extend_from_slice(&self.num_types.to_le_bytes());
        out.extend_from_slice(&self.num_edit_infos.to_le_bytes());
        out.extend_from_slice(&self.edit_infos);
        out.extend_from_slice(&self.types);
        out
    }
}
