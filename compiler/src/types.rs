use std::collections::HashMap;

use infobuf_schema::{field_index_to_offset, padding_bytes};
use serde::{Serialize, Serializer};

/// The closed set of wire types. Scalars run from `UType` through `Double`;
/// `String`, `Vector`, `Struct` and `Union` occupy one offset inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum BaseType {
    None,
    UType,
    Bool,
    Byte,
    UByte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    String,
    Vector,
    Struct,
    Union,
}

impl BaseType {
    pub const ALL: [BaseType; 17] = [
        BaseType::None,
        BaseType::UType,
        BaseType::Bool,
        BaseType::Byte,
        BaseType::UByte,
        BaseType::Short,
        BaseType::UShort,
        BaseType::Int,
        BaseType::UInt,
        BaseType::Long,
        BaseType::ULong,
        BaseType::Float,
        BaseType::Double,
        BaseType::String,
        BaseType::Vector,
        BaseType::Struct,
        BaseType::Union,
    ];

    /// Name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            BaseType::None => "none",
            BaseType::UType => "utype",
            BaseType::Bool => "bool",
            BaseType::Byte => "byte",
            BaseType::UByte => "ubyte",
            BaseType::Short => "short",
            BaseType::UShort => "ushort",
            BaseType::Int => "int",
            BaseType::UInt => "uint",
            BaseType::Long => "long",
            BaseType::ULong => "ulong",
            BaseType::Float => "float",
            BaseType::Double => "double",
            BaseType::String => "string",
            BaseType::Vector => "vector",
            BaseType::Struct => "struct",
            BaseType::Union => "union",
        }
    }

    /// True for the names a schema may spell out as a field type.
    pub fn is_keyword(self) -> bool {
        self >= BaseType::Bool && self <= BaseType::String
    }

    /// Inline size in bytes; pointer-like types occupy one offset.
    pub fn size(self) -> usize {
        match self {
            BaseType::None | BaseType::UType | BaseType::Bool | BaseType::Byte | BaseType::UByte => 1,
            BaseType::Short | BaseType::UShort => 2,
            BaseType::Long | BaseType::ULong | BaseType::Double => 8,
            _ => 4,
        }
    }

    pub fn is_scalar(self) -> bool {
        self >= BaseType::UType && self <= BaseType::Double
    }

    pub fn is_integer(self) -> bool {
        self >= BaseType::UType && self <= BaseType::ULong
    }

    pub fn is_float(self) -> bool {
        matches!(self, BaseType::Float | BaseType::Double)
    }
}

/// A use of a type: base kind, element kind for vectors, and arena indices
/// for any referenced struct or enum. Indices stay stable for the lifetime
/// of one parse, so cross-references never dangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Type {
    pub base: BaseType,
    pub element: BaseType,
    pub struct_ref: Option<usize>,
    pub enum_ref: Option<usize>,
}

impl Type {
    pub fn new(base: BaseType) -> Type {
        Type {
            base,
            element: BaseType::None,
            struct_ref: None,
            enum_ref: None,
        }
    }

    /// The element of a vector, viewed as a full type.
    pub fn vector_type(&self) -> Type {
        Type {
            base: self.element,
            element: BaseType::None,
            struct_ref: self.struct_ref,
            enum_ref: None,
        }
    }
}

impl Default for Type {
    fn default() -> Type {
        Type::new(BaseType::None)
    }
}

/// A typed constant. The constant is carried as text until emission so
/// defaults, parsed literals and resolved offsets share one representation
/// and the default-elision comparison stays exact. `offset` is the vtable
/// slot for table fields and the running byte offset for struct fields.
#[derive(Debug, Clone, Serialize)]
pub struct Value {
    pub ty: Type,
    pub constant: String,
    pub offset: u32,
}

impl Default for Value {
    fn default() -> Value {
        Value {
            ty: Type::default(),
            constant: "0".to_string(),
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldDef {
    pub name: String,
    pub value: Value,
    /// Zero bytes emitted before this field when its owner is serialized.
    pub padding: usize,
    pub deprecated: bool,
    pub doc_comment: String,
    pub attributes: SymbolTable<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructDef {
    pub name: String,
    pub fields: SymbolTable<FieldDef>,
    /// Fixed structs are packed inline with mandatory fields; infos are
    /// vtable-backed with optional, defaultable fields.
    pub fixed: bool,
    /// Referenced before being declared; must be cleared by end of parse.
    pub predecl: bool,
    pub sortbysize: bool,
    pub minalign: usize,
    pub bytesize: usize,
    pub attributes: SymbolTable<Value>,
    pub doc_comment: String,
}

impl StructDef {
    pub fn new(name: &str) -> StructDef {
        StructDef {
            name: name.to_string(),
            fields: SymbolTable::new(),
            fixed: false,
            predecl: true,
            sortbysize: true,
            minalign: 1,
            bytesize: 0,
            attributes: SymbolTable::new(),
            doc_comment: String::new(),
        }
    }

    /// Grow `bytesize` to a multiple of `align`, charging the slack to the
    /// most recent field.
    pub fn pad_last_field(&mut self, align: usize) {
        let padding = padding_bytes(self.bytesize, align);
        self.bytesize += padding;
        if let Some(last) = self.fields.vec.last_mut() {
            last.padding = padding;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumVal {
    pub name: String,
    pub value: i64,
    /// Union members reference the info they select.
    pub struct_ref: Option<usize>,
    pub doc_comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumDef {
    pub name: String,
    pub is_union: bool,
    pub underlying: Type,
    pub vals: SymbolTable<EnumVal>,
    pub attributes: SymbolTable<Value>,
    pub doc_comment: String,
}

impl EnumDef {
    /// Find the member carrying `value`.
    pub fn reverse_lookup(&self, value: i64) -> Option<&EnumVal> {
        self.vals.iter().find(|v| v.value == value)
    }
}

/// An insertion-ordered map. Entries are never removed, so positions double
/// as stable handles.
#[derive(Debug, Clone)]
pub struct SymbolTable<T> {
    pub vec: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> SymbolTable<T> {
    pub fn new() -> SymbolTable<T> {
        SymbolTable {
            vec: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert under `name`. Returns false when the name is already taken.
    pub fn add(&mut self, name: &str, value: T) -> bool {
        if self.index.contains_key(name) {
            return false;
        }
        self.index.insert(name.to_string(), self.vec.len());
        self.vec.push(value);
        true
    }

    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&i| &self.vec[i])
    }

    pub fn lookup_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.vec.iter()
    }
}

impl<T> Default for SymbolTable<T> {
    fn default() -> SymbolTable<T> {
        SymbolTable::new()
    }
}

impl<T: Serialize> Serialize for SymbolTable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.vec.serialize(serializer)
    }
}

/// Everything one parse produced: the two definition arenas, the namespace
/// path, and the designated root info.
#[derive(Debug, Serialize)]
pub struct Schema {
    pub structs: SymbolTable<StructDef>,
    pub enums: SymbolTable<EnumDef>,
    pub namespaces: Vec<String>,
    pub root: Option<usize>,
    /// Struct arena indices in declaration order. Predeclared entries take
    /// their position when actually declared.
    pub decl_order: Vec<usize>,
}

/// True when `ty` names a fixed struct (as opposed to an info reference,
/// which is offset-valued).
pub fn is_struct(ty: &Type, structs: &SymbolTable<StructDef>) -> bool {
    ty.base == BaseType::Struct && ty.struct_ref.map_or(false, |i| structs.vec[i].fixed)
}

/// Bytes `ty` occupies inline within a table, struct or vector.
pub fn inline_size(ty: &Type, structs: &SymbolTable<StructDef>) -> usize {
    match ty.struct_ref {
        Some(i) if is_struct(ty, structs) => structs.vec[i].bytesize,
        _ => ty.base.size(),
    }
}

/// Alignment of `ty` when stored inline.
pub fn inline_alignment(ty: &Type, structs: &SymbolTable<StructDef>) -> usize {
    match ty.struct_ref {
        Some(i) if is_struct(ty, structs) => structs.vec[i].minalign,
        _ => ty.base.size(),
    }
}

/// Slot offset assigned to the next field of a table.
pub fn next_field_offset(def: &StructDef) -> u32 {
    field_index_to_offset(def.fields.len() as u16) as u32
}
