//! DWARF constant tables.
//!
//! Tags, attributes and forms are newtypes over the raw code so values that
//! are not listed here (vendor extensions, newer standards) stay
//! representable and print as their number.

use std::fmt;

macro_rules! dw_table {
    ($(#[$meta:meta])* $name:ident { $($konst:ident = $value:expr => $dwarf_name:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u64);

        $(pub const $konst: $name = $name($value);)+

        impl $name {
            /// The DWARF name of this code, if it is a known one.
            pub fn static_name(self) -> Option<&'static str> {
                match self {
                    $($konst => Some($dwarf_name),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.static_name() {
                    Some(s) => f.write_str(s),
                    None => write!(f, "{}({:#x})", stringify!($name), self.0),
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }
    };
}

dw_table! {
    /// Tag of a debugging information entry.
    DwTag {
        DW_TAG_NULL = 0x00 => "DW_TAG_null",
        DW_TAG_ARRAY_TYPE = 0x01 => "DW_TAG_array_type",
        DW_TAG_CLASS_TYPE = 0x02 => "DW_TAG_class_type",
        DW_TAG_ENTRY_POINT = 0x03 => "DW_TAG_entry_point",
        DW_TAG_ENUMERATION_TYPE = 0x04 => "DW_TAG_enumeration_type",
        DW_TAG_FORMAL_PARAMETER = 0x05 => "DW_TAG_formal_parameter",
        DW_TAG_IMPORTED_DECLARATION = 0x08 => "DW_TAG_imported_declaration",
        DW_TAG_LABEL = 0x0a => "DW_TAG_label",
        DW_TAG_LEXICAL_BLOCK = 0x0b => "DW_TAG_lexical_block",
        DW_TAG_MEMBER = 0x0d => "DW_TAG_member",
        DW_TAG_POINTER_TYPE = 0x0f => "DW_TAG_pointer_type",
        DW_TAG_REFERENCE_TYPE = 0x10 => "DW_TAG_reference_type",
        DW_TAG_COMPILE_UNIT = 0x11 => "DW_TAG_compile_unit",
        DW_TAG_STRING_TYPE = 0x12 => "DW_TAG_string_type",
        DW_TAG_STRUCTURE_TYPE = 0x13 => "DW_TAG_structure_type",
        DW_TAG_SUBROUTINE_TYPE = 0x15 => "DW_TAG_subroutine_type",
        DW_TAG_TYPEDEF = 0x16 => "DW_TAG_typedef",
        DW_TAG_UNION_TYPE = 0x17 => "DW_TAG_union_type",
        DW_TAG_UNSPECIFIED_PARAMETERS = 0x18 => "DW_TAG_unspecified_parameters",
        DW_TAG_VARIANT = 0x19 => "DW_TAG_variant",
        DW_TAG_COMMON_BLOCK = 0x1a => "DW_TAG_common_block",
        DW_TAG_COMMON_INCLUSION = 0x1b => "DW_TAG_common_inclusion",
        DW_TAG_INHERITANCE = 0x1c => "DW_TAG_inheritance",
        DW_TAG_INLINED_SUBROUTINE = 0x1d => "DW_TAG_inlined_subroutine",
        DW_TAG_MODULE = 0x1e => "DW_TAG_module",
        DW_TAG_PTR_TO_MEMBER_TYPE = 0x1f => "DW_TAG_ptr_to_member_type",
        DW_TAG_SET_TYPE = 0x20 => "DW_TAG_set_type",
        DW_TAG_SUBRANGE_TYPE = 0x21 => "DW_TAG_subrange_type",
        DW_TAG_WITH_STMT = 0x22 => "DW_TAG_with_stmt",
        DW_TAG_ACCESS_DECLARATION = 0x23 => "DW_TAG_access_declaration",
        DW_TAG_BASE_TYPE = 0x24 => "DW_TAG_base_type",
        DW_TAG_CATCH_BLOCK = 0x25 => "DW_TAG_catch_block",
        DW_TAG_CONST_TYPE = 0x26 => "DW_TAG_const_type",
        DW_TAG_CONSTANT = 0x27 => "DW_TAG_constant",
        DW_TAG_ENUMERATOR = 0x28 => "DW_TAG_enumerator",
        DW_TAG_FILE_TYPE = 0x29 => "DW_TAG_file_type",
        DW_TAG_FRIEND = 0x2a => "DW_TAG_friend",
        DW_TAG_NAMELIST = 0x2b => "DW_TAG_namelist",
        DW_TAG_NAMELIST_ITEM = 0x2c => "DW_TAG_namelist_item",
        DW_TAG_PACKED_TYPE = 0x2d => "DW_TAG_packed_type",
        DW_TAG_SUBPROGRAM = 0x2e => "DW_TAG_subprogram",
        DW_TAG_TEMPLATE_TYPE_PARAMETER = 0x2f => "DW_TAG_template_type_parameter",
        DW_TAG_TEMPLATE_VALUE_PARAMETER = 0x30 => "DW_TAG_template_value_parameter",
        DW_TAG_THROWN_TYPE = 0x31 => "DW_TAG_thrown_type",
        DW_TAG_TRY_BLOCK = 0x32 => "DW_TAG_try_block",
        DW_TAG_VARIANT_PART = 0x33 => "DW_TAG_variant_part",
        DW_TAG_VARIABLE = 0x34 => "DW_TAG_variable",
        DW_TAG_VOLATILE_TYPE = 0x35 => "DW_TAG_volatile_type",
        DW_TAG_DWARF_PROCEDURE = 0x36 => "DW_TAG_dwarf_procedure",
        DW_TAG_RESTRICT_TYPE = 0x37 => "DW_TAG_restrict_type",
        DW_TAG_INTERFACE_TYPE = 0x38 => "DW_TAG_interface_type",
        DW_TAG_NAMESPACE = 0x39 => "DW_TAG_namespace",
        DW_TAG_IMPORTED_MODULE = 0x3a => "DW_TAG_imported_module",
        DW_TAG_UNSPECIFIED_TYPE = 0x3b => "DW_TAG_unspecified_type",
        DW_TAG_PARTIAL_UNIT = 0x3c => "DW_TAG_partial_unit",
        DW_TAG_IMPORTED_UNIT = 0x3d => "DW_TAG_imported_unit",
        DW_TAG_CONDITION = 0x3f => "DW_TAG_condition",
        DW_TAG_SHARED_TYPE = 0x40 => "DW_TAG_shared_type",
        DW_TAG_TYPE_UNIT = 0x41 => "DW_TAG_type_unit",
        DW_TAG_RVALUE_REFERENCE_TYPE = 0x42 => "DW_TAG_rvalue_reference_type",
        DW_TAG_TEMPLATE_ALIAS = 0x43 => "DW_TAG_template_alias",
        DW_TAG_LO_USER = 0x4080 => "DW_TAG_lo_user",
        DW_TAG_HI_USER = 0xffff => "DW_TAG_hi_user",
    }
}

dw_table! {
    /// Attribute name.
    DwAt {
        DW_AT_NULL = 0x00 => "DW_AT_null",
        DW_AT_SIBLING = 0x01 => "DW_AT_sibling",
        DW_AT_LOCATION = 0x02 => "DW_AT_location",
        DW_AT_NAME = 0x03 => "DW_AT_name",
        DW_AT_ORDERING = 0x09 => "DW_AT_ordering",
        DW_AT_BYTE_SIZE = 0x0b => "DW_AT_byte_size",
        DW_AT_BIT_OFFSET = 0x0c => "DW_AT_bit_offset",
        DW_AT_BIT_SIZE = 0x0d => "DW_AT_bit_size",
        DW_AT_STMT_LIST = 0x10 => "DW_AT_stmt_list",
        DW_AT_LOW_PC = 0x11 => "DW_AT_low_pc",
        DW_AT_HIGH_PC = 0x12 => "DW_AT_high_pc",
        DW_AT_LANGUAGE = 0x13 => "DW_AT_language",
        DW_AT_DISCR = 0x15 => "DW_AT_discr",
        DW_AT_DISCR_VALUE = 0x16 => "DW_AT_discr_value",
        DW_AT_VISIBILITY = 0x17 => "DW_AT_visibility",
        DW_AT_IMPORT = 0x18 => "DW_AT_import",
        DW_AT_STRING_LENGTH = 0x19 => "DW_AT_string_length",
        DW_AT_COMMON_REFERENCE = 0x1a => "DW_AT_common_reference",
        DW_AT_COMP_DIR = 0x1b => "DW_AT_comp_dir",
        DW_AT_CONST_VALUE = 0x1c => "DW_AT_const_value",
        DW_AT_CONTAINING_TYPE = 0x1d => "DW_AT_containing_type",
        DW_AT_DEFAULT_VALUE = 0x1e => "DW_AT_default_value",
        DW_AT_INLINE = 0x20 => "DW_AT_inline",
        DW_AT_IS_OPTIONAL = 0x21 => "DW_AT_is_optional",
        DW_AT_LOWER_BOUND = 0x22 => "DW_AT_lower_bound",
        DW_AT_PRODUCER = 0x25 => "DW_AT_producer",
        DW_AT_PROTOTYPED = 0x27 => "DW_AT_prototyped",
        DW_AT_RETURN_ADDR = 0x2a => "DW_AT_return_addr",
        DW_AT_START_SCOPE = 0x2c => "DW_AT_start_scope",
        DW_AT_BIT_STRIDE = 0x2e => "DW_AT_bit_stride",
        DW_AT_UPPER_BOUND = 0x2f => "DW_AT_upper_bound",
        DW_AT_ABSTRACT_ORIGIN = 0x31 => "DW_AT_abstract_origin",
        DW_AT_ACCESSIBILITY = 0x32 => "DW_AT_accessibility",
        DW_AT_ADDRESS_CLASS = 0x33 => "DW_AT_address_class",
        DW_AT_ARTIFICIAL = 0x34 => "DW_AT_artificial",
        DW_AT_BASE_TYPES = 0x35 => "DW_AT_base_types",
        DW_AT_CALLING_CONVENTION = 0x36 => "DW_AT_calling_convention",
        DW_AT_COUNT = 0x37 => "DW_AT_count",
        DW_AT_DATA_MEMBER_LOCATION = 0x38 => "DW_AT_data_member_location",
        DW_AT_DECL_COLUMN = 0x39 => "DW_AT_decl_column",
        DW_AT_DECL_FILE = 0x3a => "DW_AT_decl_file",
        DW_AT_DECL_LINE = 0x3b => "DW_AT_decl_line",
        DW_AT_DECLARATION = 0x3c => "DW_AT_declaration",
        DW_AT_DISCR_LIST = 0x3d => "DW_AT_discr_list",
        DW_AT_ENCODING = 0x3e => "DW_AT_encoding",
        DW_AT_EXTERNAL = 0x3f => "DW_AT_external",
        DW_AT_FRAME_BASE = 0x40 => "DW_AT_frame_base",
        DW_AT_FRIEND = 0x41 => "DW_AT_friend",
        DW_AT_IDENTIFIER_CASE = 0x42 => "DW_AT_identifier_case",
        DW_AT_MACRO_INFO = 0x43 => "DW_AT_macro_info",
        DW_AT_NAMELIST_ITEM = 0x44 => "DW_AT_namelist_item",
        DW_AT_PRIORITY = 0x45 => "DW_AT_priority",
        DW_AT_SEGMENT = 0x46 => "DW_AT_segment",
        DW_AT_SPECIFICATION = 0x47 => "DW_AT_specification",
        DW_AT_STATIC_LINK = 0x48 => "DW_AT_static_link",
        DW_AT_TYPE = 0x49 => "DW_AT_type",
        DW_AT_USE_LOCATION = 0x4a => "DW_AT_use_location",
        DW_AT_VARIABLE_PARAMETER = 0x4b => "DW_AT_variable_parameter",
        DW_AT_VIRTUALITY = 0x4c => "DW_AT_virtuality",
        DW_AT_VTABLE_ELEM_LOCATION = 0x4d => "DW_AT_vtable_elem_location",
        DW_AT_ALLOCATED = 0x4e => "DW_AT_allocated",
        DW_AT_ASSOCIATED = 0x4f => "DW_AT_associated",
        DW_AT_DATA_LOCATION = 0x50 => "DW_AT_data_location",
        DW_AT_BYTE_STRIDE = 0x51 => "DW_AT_byte_stride",
        DW_AT_ENTRY_PC = 0x52 => "DW_AT_entry_pc",
        DW_AT_USE_UTF8 = 0x53 => "DW_AT_use_UTF8",
        DW_AT_EXTENSION = 0x54 => "DW_AT_extension",
        DW_AT_RANGES = 0x55 => "DW_AT_ranges",
        DW_AT_TRAMPOLINE = 0x56 => "DW_AT_trampoline",
        DW_AT_CALL_COLUMN = 0x57 => "DW_AT_call_column",
        DW_AT_CALL_FILE = 0x58 => "DW_AT_call_file",
        DW_AT_CALL_LINE = 0x59 => "DW_AT_call_line",
        DW_AT_DESCRIPTION = 0x5a => "DW_AT_description",
        DW_AT_BINARY_SCALE = 0x5b => "DW_AT_binary_scale",
        DW_AT_DECIMAL_SCALE = 0x5c => "DW_AT_decimal_scale",
        DW_AT_SMALL = 0x5d => "DW_AT_small",
        DW_AT_DECIMAL_SIGN = 0x5e => "DW_AT_decimal_sign",
        DW_AT_DIGIT_COUNT = 0x5f => "DW_AT_digit_count",
        DW_AT_PICTURE_STRING = 0x60 => "DW_AT_picture_string",
        DW_AT_MUTABLE = 0x61 => "DW_AT_mutable",
        DW_AT_THREADS_SCALED = 0x62 => "DW_AT_threads_scaled",
        DW_AT_EXPLICIT = 0x63 => "DW_AT_explicit",
        DW_AT_OBJECT_POINTER = 0x64 => "DW_AT_object_pointer",
        DW_AT_ENDIANITY = 0x65 => "DW_AT_endianity",
        DW_AT_ELEMENTAL = 0x66 => "DW_AT_elemental",
        DW_AT_PURE = 0x67 => "DW_AT_pure",
        DW_AT_RECURSIVE = 0x68 => "DW_AT_recursive",
        DW_AT_SIGNATURE = 0x69 => "DW_AT_signature",
        DW_AT_MAIN_SUBPROGRAM = 0x6a => "DW_AT_main_subprogram",
        DW_AT_DATA_BIT_OFFSET = 0x6b => "DW_AT_data_bit_offset",
        DW_AT_CONST_EXPR = 0x6c => "DW_AT_const_expr",
        DW_AT_ENUM_CLASS = 0x6d => "DW_AT_enum_class",
        DW_AT_LINKAGE_NAME = 0x6e => "DW_AT_linkage_name",
        DW_AT_LO_USER = 0x2000 => "DW_AT_lo_user",
        DW_AT_MIPS_LINKAGE_NAME = 0x2007 => "DW_AT_MIPS_linkage_name",
        DW_AT_HI_USER = 0x3fff => "DW_AT_hi_user",
    }
}

dw_table! {
    /// Attribute encoding.
    DwForm {
        DW_FORM_NULL = 0x00 => "DW_FORM_null",
        DW_FORM_ADDR = 0x01 => "DW_FORM_addr",
        DW_FORM_BLOCK2 = 0x03 => "DW_FORM_block2",
        DW_FORM_BLOCK4 = 0x04 => "DW_FORM_block4",
        DW_FORM_DATA2 = 0x05 => "DW_FORM_data2",
        DW_FORM_DATA4 = 0x06 => "DW_FORM_data4",
        DW_FORM_DATA8 = 0x07 => "DW_FORM_data8",
        DW_FORM_STRING = 0x08 => "DW_FORM_string",
        DW_FORM_BLOCK = 0x09 => "DW_FORM_block",
        DW_FORM_BLOCK1 = 0x0a => "DW_FORM_block1",
        DW_FORM_DATA1 = 0x0b => "DW_FORM_data1",
        DW_FORM_FLAG = 0x0c => "DW_FORM_flag",
        DW_FORM_SDATA = 0x0d => "DW_FORM_sdata",
        DW_FORM_STRP = 0x0e => "DW_FORM_strp",
        DW_FORM_UDATA = 0x0f => "DW_FORM_udata",
        DW_FORM_REF_ADDR = 0x10 => "DW_FORM_ref_addr",
        DW_FORM_REF1 = 0x11 => "DW_FORM_ref1",
        DW_FORM_REF2 = 0x12 => "DW_FORM_ref2",
        DW_FORM_REF4 = 0x13 => "DW_FORM_ref4",
        DW_FORM_REF8 = 0x14 => "DW_FORM_ref8",
        DW_FORM_REF_UDATA = 0x15 => "DW_FORM_ref_udata",
        DW_FORM_INDIRECT = 0x16 => "DW_FORM_indirect",
        DW_FORM_SEC_OFFSET = 0x17 => "DW_FORM_sec_offset",
        DW_FORM_EXPRLOC = 0x18 => "DW_FORM_exprloc",
        DW_FORM_FLAG_PRESENT = 0x19 => "DW_FORM_flag_present",
        DW_FORM_REF_SIG8 = 0x20 => "DW_FORM_ref_sig8",
    }
}

/// The class of values a form can encode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormClass {
    Address,
    Block,
    Constant,
    String,
    Flag,
    Reference,
    /// lineptr, loclistptr, macptr or rangelistptr.
    SecOffset,
    Exprloc,
    Indirect,
}

impl DwForm {
    pub fn class(self) -> Option<FormClass> {
        Some(match self {
            DW_FORM_ADDR => FormClass::Address,
            DW_FORM_BLOCK1 | DW_FORM_BLOCK2 | DW_FORM_BLOCK4 | DW_FORM_BLOCK => FormClass::Block,
            DW_FORM_DATA1 | DW_FORM_DATA2 | DW_FORM_DATA4 | DW_FORM_DATA8 | DW_FORM_SDATA
            | DW_FORM_UDATA => FormClass::Constant,
            DW_FORM_STRING | DW_FORM_STRP => FormClass::String,
            DW_FORM_FLAG | DW_FORM_FLAG_PRESENT => FormClass::Flag,
            DW_FORM_REF_ADDR | DW_FORM_REF1 | DW_FORM_REF2 | DW_FORM_REF4 | DW_FORM_REF8
            | DW_FORM_REF_UDATA | DW_FORM_REF_SIG8 => FormClass::Reference,
            DW_FORM_SEC_OFFSET => FormClass::SecOffset,
            DW_FORM_EXPRLOC => FormClass::Exprloc,
            DW_FORM_INDIRECT => FormClass::Indirect,
            _ => return None,
        })
    }
}

// Standard line-number opcodes.
pub const DW_LNS_COPY: u8 = 0x01;
pub const DW_LNS_ADVANCE_PC: u8 = 0x02;
pub const DW_LNS_ADVANCE_LINE: u8 = 0x03;
pub const DW_LNS_SET_FILE: u8 = 0x04;
pub const DW_LNS_SET_COLUMN: u8 = 0x05;
pub const DW_LNS_NEGATE_STMT: u8 = 0x06;
pub const DW_LNS_SET_BASIC_BLOCK: u8 = 0x07;
pub const DW_LNS_CONST_ADD_PC: u8 = 0x08;
pub const DW_LNS_FIXED_ADVANCE_PC: u8 = 0x09;
pub const DW_LNS_SET_PROLOGUE_END: u8 = 0x0a;
pub const DW_LNS_SET_EPILOGUE_BEGIN: u8 = 0x0b;
pub const DW_LNS_SET_ISA: u8 = 0x0c;

// Extended line-number opcodes.
pub const DW_LNE_END_SEQUENCE: u8 = 0x01;
pub const DW_LNE_SET_ADDRESS: u8 = 0x02;
pub const DW_LNE_DEFINE_FILE: u8 = 0x03;
pub const DW_LNE_SET_DISCRIMINATOR: u8 = 0x04;
pub const DW_LNE_LO_USER: u8 = 0x80;
pub const DW_LNE_HI_USER: u8 = 0xff;

pub const DW_CHILDREN_NO: u8 = 0x00;
pub const DW_CHILDREN_YES: u8 = 0x01;
