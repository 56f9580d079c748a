use infobuf_schema::{Builder, UOffset, VOffset};

use crate::error::InfoError;
use crate::lexer::{Lexer, Token};
use crate::types::{
    inline_alignment, inline_size, is_struct, next_field_offset, BaseType, EnumDef, EnumVal,
    FieldDef, Schema, StructDef, SymbolTable, Type, Value,
};
use crate::utils::quote;
use crate::verifier;

/// Widest scalar the emitter sorts by.
const MAX_SCALAR_SIZE: usize = 8;

/// One parse transaction: the token stream, the definition arenas, and the
/// encoder state for the single root value. Nothing is shared between
/// parser instances, so parses can proceed independently.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    token: Token,
    structs: SymbolTable<StructDef>,
    enums: SymbolTable<EnumDef>,
    namespaces: Vec<String>,
    decl_order: Vec<usize>,
    root: Option<usize>,
    builder: Builder,
    /// Values collected for the table, struct or vector currently being
    /// parsed, newest last.
    field_stack: Vec<(Value, Option<FieldDef>)>,
    /// Side buffer holding finished fixed-struct bytes until their parent
    /// splices them in.
    struct_stack: Vec<u8>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Parser<'a> {
        Parser {
            lexer: Lexer::new(source),
            token: Token::Eof,
            structs: SymbolTable::new(),
            enums: SymbolTable::new(),
            namespaces: Vec::new(),
            decl_order: Vec::new(),
            root: None,
            builder: Builder::new(),
            field_stack: Vec::new(),
            struct_stack: Vec::new(),
        }
    }

    /// Run the whole transaction: declarations, the optional root value,
    /// and end-of-parse verification.
    pub fn parse(&mut self) -> Result<(), InfoError> {
        self.next()?;
        while self.token != Token::Eof {
            match self.token {
                Token::Namespace => {
                    self.next()?;
                    loop {
                        self.namespaces.push(self.lexer.attribute.clone());
                        self.expect(Token::Identifier)?;
                        if !self.is_next(Token::Dot)? {
                            break;
                        }
                    }
                    self.expect(Token::Semicolon)?;
                }
                Token::LBrace => {
                    let root = self
                        .root
                        .ok_or_else(|| self.err("No main type set to parse a value with"))?;
                    if self.builder.size() != 0 {
                        return Err(self.err("Cannot have more than one root value in a file"));
                    }
                    let offset = self.parse_info(root)?;
                    self.builder.finish(offset);
                }
                Token::Enum => self.parse_enum(false)?,
                Token::Union => self.parse_enum(true)?,
                Token::Main => {
                    self.next()?;
                    let name = self.lexer.attribute.clone();
                    self.expect(Token::Identifier)?;
                    self.expect(Token::Semicolon)?;
                    let index = self
                        .structs
                        .lookup_index(&name)
                        .ok_or_else(|| self.err(format!("Unknown main type: {}", name)))?;
                    if self.structs.vec[index].fixed {
                        return Err(self.err("Main type must be an info"));
                    }
                    self.root = Some(index);
                }
                _ => self.parse_decl()?,
            }
        }
        verifier::verify(&self.structs, &self.enums).map_err(|msg| self.err(msg))?;
        debug_assert!(self.struct_stack.is_empty());
        Ok(())
    }

    /// Hand over the schema and the encoded root value (empty when the
    /// source contained none).
    pub fn into_parts(self) -> (Schema, Vec<u8>) {
        let buffer = if self.builder.is_finished() {
            self.builder.data()
        } else {
            Vec::new()
        };
        let schema = Schema {
            structs: self.structs,
            enums: self.enums,
            namespaces: self.namespaces,
            root: self.root,
            decl_order: self.decl_order,
        };
        (schema, buffer)
    }

    fn err(&self, msg: impl Into<String>) -> InfoError {
        InfoError::Parse {
            msg: msg.into(),
            line: self.lexer.line,
        }
    }

    fn next(&mut self) -> Result<(), InfoError> {
        self.token = self.lexer.next_token()?;
        Ok(())
    }

    fn is_next(&mut self, token: Token) -> Result<bool, InfoError> {
        if self.token == token {
            self.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), InfoError> {
        if self.token != token {
            return Err(self.err(format!(
                "Expecting: {} instead got: {}",
                token.describe(),
                self.token.describe()
            )));
        }
        self.next()
    }

    // ---------------------------------------------------------------
    // Schema side
    // ---------------------------------------------------------------

    /// Return the arena index for `name`, predeclaring an empty struct if
    /// it has not been mentioned before. Forward and circular references
    /// resolve once the real declaration arrives.
    fn lookup_create_struct(&mut self, name: &str) -> usize {
        if let Some(index) = self.structs.lookup_index(name) {
            return index;
        }
        let index = self.structs.len();
        self.structs.add(name, StructDef::new(name));
        index
    }

    fn parse_type(&mut self) -> Result<Type, InfoError> {
        let ty = match self.token {
            Token::BaseType(base) => Type::new(base),
            Token::Identifier => {
                let name = self.lexer.attribute.clone();
                if let Some(index) = self.enums.lookup_index(&name) {
                    let mut ty = self.enums.vec[index].underlying;
                    ty.enum_ref = Some(index);
                    if self.enums.vec[index].is_union {
                        ty.base = BaseType::Union;
                    }
                    ty
                } else {
                    let mut ty = Type::new(BaseType::Struct);
                    ty.struct_ref = Some(self.lookup_create_struct(&name));
                    ty
                }
            }
            Token::LBracket => {
                self.next()?;
                let element = self.parse_type()?;
                if element.base == BaseType::Vector {
                    return Err(self.err("Nested vector types not supported (wrap in an info first)"));
                }
                if element.base == BaseType::Union {
                    return Err(self.err("Vector of union types not supported (wrap in an info first)"));
                }
                let mut ty = Type::new(BaseType::Vector);
                ty.element = element.base;
                ty.struct_ref = element.struct_ref;
                self.expect(Token::RBracket)?;
                return Ok(ty);
            }
            _ => return Err(self.err("Illegal type syntax")),
        };
        self.next()?;
        Ok(ty)
    }

    /// Append a field to `struct_index`, assigning its vtable slot or, for
    /// fixed structs, its running byte offset plus interior padding.
    fn add_field(&mut self, struct_index: usize, name: &str, ty: Type) -> Result<usize, InfoError> {
        if self.structs.vec[struct_index].fields.lookup(name).is_some() {
            return Err(self.err(format!("Field already exists: {}", name)));
        }
        let fixed = self.structs.vec[struct_index].fixed;
        let (size, alignment) = if fixed {
            (inline_size(&ty, &self.structs), inline_alignment(&ty, &self.structs))
        } else {
            (0, 0)
        };

        let mut field = FieldDef {
            name: name.to_string(),
            value: Value {
                ty,
                constant: "0".to_string(),
                offset: 0,
            },
            padding: 0,
            deprecated: false,
            doc_comment: String::new(),
            attributes: SymbolTable::new(),
        };
        let def = &mut self.structs.vec[struct_index];
        field.value.offset = next_field_offset(def);
        if def.fixed {
            def.minalign = std::cmp::max(def.minalign, alignment);
            def.pad_last_field(alignment);
            field.value.offset = def.bytesize as u32;
            def.bytesize += size;
        }
        let index = def.fields.len();
        def.fields.add(name, field);
        Ok(index)
    }

    fn parse_field(&mut self, struct_index: usize) -> Result<(), InfoError> {
        let name = self.lexer.attribute.clone();
        let doc_comment = self.lexer.doc_comment.clone();
        self.expect(Token::Identifier)?;
        self.expect(Token::Colon)?;
        let ty = self.parse_type()?;

        let fixed = self.structs.vec[struct_index].fixed;
        if fixed && !ty.base.is_scalar() && !is_struct(&ty, &self.structs) {
            return Err(self.err("Structs may contain only scalar or struct fields"));
        }

        if ty.base == BaseType::Union {
            // The hidden companion holds the discriminator and owns the
            // vtable slot just before the union offset itself.
            let enum_index = ty
                .enum_ref
                .ok_or_else(|| self.err("Illegal type syntax"))?;
            let discriminator = self.enums.vec[enum_index].underlying;
            self.add_field(struct_index, &format!("{}_type", name), discriminator)?;
        }

        let field_index = self.add_field(struct_index, &name, ty)?;

        if self.token == Token::Equals {
            self.next()?;
            let mut default = self.structs.vec[struct_index].fields.vec[field_index]
                .value
                .clone();
            self.parse_single_value(&mut default)?;
            self.structs.vec[struct_index].fields.vec[field_index].value = default;
        }

        let attributes = self.parse_metadata()?;
        let deprecated = attributes.lookup("deprecated").is_some();
        if deprecated && fixed {
            return Err(self.err("Cannot deprecate fields in a struct"));
        }
        let field = &mut self.structs.vec[struct_index].fields.vec[field_index];
        field.doc_comment = doc_comment;
        field.attributes = attributes;
        field.deprecated = deprecated;
        self.expect(Token::Semicolon)
    }

    fn parse_metadata(&mut self) -> Result<SymbolTable<Value>, InfoError> {
        let mut attributes = SymbolTable::new();
        if self.is_next(Token::LParen)? {
            loop {
                let name = self.lexer.attribute.clone();
                self.expect(Token::Identifier)?;
                let mut entry = Value::default();
                if self.is_next(Token::Colon)? {
                    self.parse_single_value(&mut entry)?;
                }
                if !attributes.add(&name, entry) {
                    return Err(self.err(format!("Attribute already exists: {}", name)));
                }
                if self.is_next(Token::RParen)? {
                    break;
                }
                self.expect(Token::Comma)?;
            }
        }
        Ok(attributes)
    }

    fn parse_enum(&mut self, is_union: bool) -> Result<(), InfoError> {
        let doc_comment = self.lexer.doc_comment.clone();
        self.next()?;
        let name = self.lexer.attribute.clone();
        self.expect(Token::Identifier)?;
        if self.enums.lookup(&name).is_some() {
            return Err(self.err(format!("Enum already exists: {}", name)));
        }
        let enum_index = self.enums.len();
        self.enums.add(
            &name,
            EnumDef {
                name: name.clone(),
                is_union,
                // Short is the default underlying type; unions always
                // discriminate through a utype byte.
                underlying: Type::new(BaseType::Short),
                vals: SymbolTable::new(),
                attributes: SymbolTable::new(),
                doc_comment,
            },
        );
        if is_union {
            let mut underlying = Type::new(BaseType::UType);
            underlying.enum_ref = Some(enum_index);
            self.enums.vec[enum_index].underlying = underlying;
        } else if self.is_next(Token::Colon)? {
            let underlying = self.parse_type()?;
            if !underlying.base.is_integer() {
                return Err(self.err("Underlying enum type must be integral"));
            }
            self.enums.vec[enum_index].underlying = underlying;
        }
        let attributes = self.parse_metadata()?;
        self.enums.vec[enum_index].attributes = attributes;
        self.expect(Token::LBrace)?;
        if is_union {
            self.enums.vec[enum_index].vals.add(
                "NONE",
                EnumVal {
                    name: "NONE".to_string(),
                    value: 0,
                    struct_ref: None,
                    doc_comment: String::new(),
                },
            );
        }
        loop {
            let val_name = self.lexer.attribute.clone();
            let val_doc = self.lexer.doc_comment.clone();
            self.expect(Token::Identifier)?;
            let previous = self.enums.vec[enum_index].vals.vec.last().map(|v| v.value);
            let struct_ref = if is_union {
                Some(self.lookup_create_struct(&val_name))
            } else {
                None
            };
            let added = self.enums.vec[enum_index].vals.add(
                &val_name,
                EnumVal {
                    name: val_name.clone(),
                    value: previous.map_or(0, |v| v + 1),
                    struct_ref,
                    doc_comment: val_doc,
                },
            );
            if !added {
                return Err(self.err(format!("Enum value already exists: {}", val_name)));
            }
            if self.is_next(Token::Equals)? {
                let value: i64 = self
                    .lexer
                    .attribute
                    .parse()
                    .map_err(|_| self.err(format!("Invalid integer: {}", self.lexer.attribute)))?;
                self.expect(Token::IntegerConstant)?;
                if let Some(previous) = previous {
                    if previous >= value {
                        return Err(self.err("Enum values must be specified in ascending order"));
                    }
                }
                if let Some(last) = self.enums.vec[enum_index].vals.vec.last_mut() {
                    last.value = value;
                }
            }
            if !self.is_next(Token::Comma)? {
                break;
            }
            if self.token == Token::RBrace {
                break;
            }
        }
        self.expect(Token::RBrace)
    }

    fn parse_decl(&mut self) -> Result<(), InfoError> {
        let doc_comment = self.lexer.doc_comment.clone();
        let fixed = self.is_next(Token::Struct)?;
        if !fixed {
            self.expect(Token::Info)?;
        }
        let name = self.lexer.attribute.clone();
        self.expect(Token::Identifier)?;
        let struct_index = self.lookup_create_struct(&name);
        if !self.structs.vec[struct_index].predecl {
            return Err(self.err(format!("Datatype already exists: {}", name)));
        }
        {
            let def = &mut self.structs.vec[struct_index];
            def.predecl = false;
            def.fixed = fixed;
            def.doc_comment = doc_comment;
        }
        // Predeclared entries take their declaration-order position here.
        self.decl_order.push(struct_index);
        let attributes = self.parse_metadata()?;
        let sortbysize = attributes.lookup("Original_order").is_none() && !fixed;
        self.structs.vec[struct_index].attributes = attributes;
        self.structs.vec[struct_index].sortbysize = sortbysize;
        self.expect(Token::LBrace)?;
        while self.token != Token::RBrace {
            self.parse_field(struct_index)?;
        }
        let minalign = self.structs.vec[struct_index].minalign;
        self.structs.vec[struct_index].pad_last_field(minalign);
        self.expect(Token::RBrace)?;

        let force_align = self.structs.vec[struct_index]
            .attributes
            .lookup("Force_align")
            .cloned();
        if let (true, Some(force)) = (fixed, force_align) {
            let align: usize = force.constant.parse().unwrap_or(0);
            let natural = self.structs.vec[struct_index].minalign;
            if force.ty.base != BaseType::Int
                || align < natural
                || align > 256
                || !align.is_power_of_two()
            {
                return Err(self.err(
                    "Force_align must be a power of two integer ranging from the struct's \
                     natural alignment to 256",
                ));
            }
            self.structs.vec[struct_index].minalign = align;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Value side
    // ---------------------------------------------------------------

    fn parse_int_checked(&self, text: &str, bits: u32) -> Result<i64, InfoError> {
        let value: i64 = text
            .parse()
            .map_err(|_| self.err(format!("Invalid integer: {}", quote(text))))?;
        if bits < 64 {
            let mask: i64 = (1i64 << bits) - 1;
            if (value & !mask) != 0 && (value | mask) != -1 {
                return Err(self.err(format!("Constant does not fit in a {}-bit field", bits)));
            }
        }
        Ok(value)
    }

    fn parse_float(&self, text: &str) -> Result<f64, InfoError> {
        text.parse()
            .map_err(|_| self.err(format!("Invalid float: {}", quote(text))))
    }

    fn parse_uoffset(&self, text: &str) -> Result<UOffset, InfoError> {
        text.parse()
            .map_err(|_| self.err(format!("Invalid offset: {}", quote(text))))
    }

    fn try_typed_value(
        &mut self,
        token: Token,
        check: bool,
        value: &mut Value,
        required: BaseType,
    ) -> Result<bool, InfoError> {
        let matched = self.token == token;
        if matched {
            value.constant = self.lexer.attribute.clone();
            if !check {
                if value.ty.base == BaseType::None {
                    value.ty.base = required;
                } else {
                    return Err(self.err(format!(
                        "Type mismatch: expecting: {}, found: {}",
                        value.ty.base.name(),
                        required.name()
                    )));
                }
            }
            self.next()?;
        }
        Ok(matched)
    }

    /// Parse one scalar, string or enum-identifier literal into `value`.
    fn parse_single_value(&mut self, value: &mut Value) -> Result<(), InfoError> {
        if self.try_typed_value(
            Token::IntegerConstant,
            value.ty.base.is_scalar(),
            value,
            BaseType::Int,
        )? || self.try_typed_value(
            Token::FloatConstant,
            value.ty.base.is_float(),
            value,
            BaseType::Float,
        )? || self.try_typed_value(
            Token::StringConstant,
            value.ty.base == BaseType::String,
            value,
            BaseType::String,
        )? {
            Ok(())
        } else if self.token == Token::Identifier {
            let name = self.lexer.attribute.clone();
            let mut resolved = None;
            for enum_def in self.enums.iter() {
                if let Some(val) = enum_def.vals.lookup(&name) {
                    resolved = Some(val.value);
                    break;
                }
            }
            match resolved {
                Some(resolved) => {
                    self.lexer.attribute = resolved.to_string();
                    self.try_typed_value(
                        Token::Identifier,
                        value.ty.base.is_integer(),
                        value,
                        BaseType::Int,
                    )?;
                    Ok(())
                }
                None => Err(self.err(format!("Not a valid enum value: {}", name))),
            }
        } else {
            Err(self.err(format!(
                "Cannot parse value starting with: {}",
                self.token.describe()
            )))
        }
    }

    /// Parse any value of `value.ty`, leaving its encoded form (or resolved
    /// offset) in `value.constant`.
    fn parse_any_value(
        &mut self,
        value: &mut Value,
        field: Option<&FieldDef>,
    ) -> Result<(), InfoError> {
        match value.ty.base {
            BaseType::Union => {
                let field_name = field.map(|f| f.name.clone()).unwrap_or_default();
                // The discriminator must already be on the stack: it names
                // the member table this value is parsed against.
                let discriminator = match self.field_stack.last() {
                    Some((v, Some(f))) if f.value.ty.base == BaseType::UType => v.constant.clone(),
                    _ => {
                        return Err(self.err(format!(
                            "Missing type field before this union value: {}",
                            field_name
                        )))
                    }
                };
                let id = self.parse_int_checked(&discriminator, 8)?;
                let enum_index = value
                    .ty
                    .enum_ref
                    .ok_or_else(|| self.err("Illegal type syntax"))?;
                let member = self.enums.vec[enum_index]
                    .reverse_lookup(id)
                    .and_then(|val| val.struct_ref);
                let struct_index = match member {
                    Some(index) => index,
                    None => {
                        return Err(
                            self.err(format!("Illegal type id for: {}", field_name))
                        )
                    }
                };
                value.constant = self.parse_info(struct_index)?.to_string();
            }
            BaseType::Struct => {
                let struct_index = value
                    .ty
                    .struct_ref
                    .ok_or_else(|| self.err("Illegal type syntax"))?;
                value.constant = self.parse_info(struct_index)?.to_string();
            }
            BaseType::String => {
                let text = self.lexer.attribute.clone();
                self.expect(Token::StringConstant)?;
                value.constant = self.builder.create_string(&text).to_string();
            }
            BaseType::Vector => {
                self.expect(Token::LBracket)?;
                let element = value.ty.vector_type();
                value.constant = self.parse_vector(&element)?.to_string();
            }
            _ => self.parse_single_value(value)?,
        }
        Ok(())
    }

    /// Parse `{ name: value, ... }` against `struct_index` and emit it.
    /// Returns the table's buffer offset, or the side-buffer offset for a
    /// fixed struct.
    fn parse_info(&mut self, struct_index: usize) -> Result<UOffset, InfoError> {
        self.expect(Token::LBrace)?;
        let fixed = self.structs.vec[struct_index].fixed;
        let mut fieldn = 0usize;
        let mut closed = self.is_next(Token::RBrace)?;
        while !closed {
            let name = self.lexer.attribute.clone();
            if !self.is_next(Token::StringConstant)? {
                self.expect(Token::Identifier)?;
            }
            let (field_index, field) = {
                let def = &self.structs.vec[struct_index];
                match def.fields.lookup_index(&name) {
                    Some(index) => (index, def.fields.vec[index].clone()),
                    None => return Err(self.err(format!("Unknown field: {}", name))),
                }
            };
            if fixed && field_index != fieldn {
                return Err(self.err(format!("Struct field appearing out of order: {}", name)));
            }
            self.expect(Token::Colon)?;
            let mut value = field.value.clone();
            self.parse_any_value(&mut value, Some(&field))?;
            self.field_stack.push((value, Some(field)));
            fieldn += 1;
            if self.is_next(Token::RBrace)? {
                closed = true;
            } else {
                self.expect(Token::Comma)?;
            }
        }

        let num_fields = self.structs.vec[struct_index].fields.len();
        if fixed && fieldn != num_fields {
            return Err(self.err(format!(
                "Incomplete struct initialization: {}",
                self.structs.vec[struct_index].name
            )));
        }
        let (minalign, bytesize, sortbysize) = {
            let def = &self.structs.vec[struct_index];
            (def.minalign, def.bytesize, def.sortbysize)
        };
        let start = if fixed {
            self.builder.start_struct(minalign)
        } else {
            self.builder.start_table()
        };

        // Emit collected fields newest-first (the buffer grows backwards),
        // one size class at a time so every scalar lands naturally aligned.
        let base = self.field_stack.len() - fieldn;
        let mut size = if sortbysize { MAX_SCALAR_SIZE } else { 1 };
        while size > 0 {
            for index in (base..self.field_stack.len()).rev() {
                let (value, field) = self.field_stack[index].clone();
                let field = match field {
                    Some(field) => field,
                    None => continue,
                };
                if !sortbysize || size == value.ty.base.size() {
                    self.emit_field(&value, &field, fixed)?;
                }
            }
            size /= 2;
        }
        self.field_stack.truncate(base);

        if fixed {
            self.builder.clear_offsets();
            self.builder.end_struct();
            // Stage the struct off-buffer; it is spliced back in when the
            // parent emits the owning field.
            let offset = self.struct_stack.len();
            let bytes = self.builder.front_bytes(bytesize).to_vec();
            self.struct_stack.extend_from_slice(&bytes);
            self.builder.pop_bytes(bytesize);
            Ok(offset as UOffset)
        } else {
            Ok(self.builder.end_table(start, num_fields as VOffset))
        }
    }

    /// Copy staged fixed-struct bytes into the parent's contiguous region
    /// and record the owning slot.
    fn serialize_struct(&mut self, value: &Value) -> Result<(), InfoError> {
        let struct_index = value
            .ty
            .struct_ref
            .ok_or_else(|| self.err("Illegal type syntax"))?;
        let (minalign, bytesize) = {
            let def = &self.structs.vec[struct_index];
            (def.minalign, def.bytesize)
        };
        let offset: usize = value
            .constant
            .parse()
            .map_err(|_| self.err(format!("Invalid offset: {}", quote(&value.constant))))?;
        debug_assert_eq!(self.struct_stack.len() - offset, bytesize);
        self.builder.align(minalign);
        self.builder
            .push_bytes(&self.struct_stack[offset..offset + bytesize]);
        self.struct_stack.truncate(offset);
        let position = self.builder.size();
        self.builder.add_struct(value.offset as VOffset, position);
        Ok(())
    }

    fn emit_int<T: infobuf_schema::Scalar>(
        &mut self,
        value: &Value,
        slot: Option<(u32, &Value)>,
        bits: u32,
        convert: fn(i64) -> T,
    ) -> Result<(), InfoError> {
        let parsed = convert(self.parse_int_checked(&value.constant, bits)?);
        match slot {
            Some((offset, default)) => {
                let default = convert(self.parse_int_checked(&default.constant, bits)?);
                self.builder.add_scalar(offset as VOffset, parsed, default);
            }
            None => {
                self.builder.push(parsed);
            }
        }
        Ok(())
    }

    fn emit_real<T: infobuf_schema::Scalar>(
        &mut self,
        value: &Value,
        slot: Option<(u32, &Value)>,
        convert: fn(f64) -> T,
    ) -> Result<(), InfoError> {
        let parsed = convert(self.parse_float(&value.constant)?);
        match slot {
            Some((offset, default)) => {
                let default = convert(self.parse_float(&default.constant)?);
                self.builder.add_scalar(offset as VOffset, parsed, default);
            }
            None => {
                self.builder.push(parsed);
            }
        }
        Ok(())
    }

    /// Emit one scalar: into a vtable slot with default elision when `slot`
    /// is given, or unconditionally (struct members, vector elements)
    /// otherwise.
    fn emit_scalar(&mut self, value: &Value, slot: Option<(u32, &Value)>) -> Result<(), InfoError> {
        match value.ty.base {
            BaseType::None | BaseType::UType | BaseType::Bool | BaseType::UByte => {
                self.emit_int(value, slot, 8, |v| v as u8)
            }
            BaseType::Byte => self.emit_int(value, slot, 8, |v| v as i8),
            BaseType::Short => self.emit_int(value, slot, 16, |v| v as i16),
            BaseType::UShort => self.emit_int(value, slot, 16, |v| v as u16),
            BaseType::Int => self.emit_int(value, slot, 32, |v| v as i32),
            BaseType::UInt => self.emit_int(value, slot, 32, |v| v as u32),
            BaseType::Long => self.emit_int(value, slot, 64, |v| v),
            BaseType::ULong => self.emit_int(value, slot, 64, |v| v as u64),
            BaseType::Float => self.emit_real(value, slot, |v| v as f32),
            BaseType::Double => self.emit_real(value, slot, |v| v),
            _ => Err(self.err("Illegal type syntax")),
        }
    }

    /// Emit one collected table or struct field.
    fn emit_field(
        &mut self,
        value: &Value,
        field: &FieldDef,
        in_fixed: bool,
    ) -> Result<(), InfoError> {
        self.builder.pad(field.padding);
        match value.ty.base {
            BaseType::String | BaseType::Vector | BaseType::Struct | BaseType::Union => {
                if is_struct(&value.ty, &self.structs) {
                    self.serialize_struct(value)
                } else {
                    let referenced = self.parse_uoffset(&value.constant)?;
                    self.builder.add_offset(value.offset as VOffset, referenced);
                    Ok(())
                }
            }
            _ => {
                let slot = if in_fixed {
                    None
                } else {
                    Some((value.offset, &field.value))
                };
                self.emit_scalar(value, slot)
            }
        }
    }

    /// Emit one vector element.
    fn push_element(&mut self, value: &Value) -> Result<(), InfoError> {
        match value.ty.base {
            BaseType::String | BaseType::Vector | BaseType::Struct | BaseType::Union => {
                if is_struct(&value.ty, &self.structs) {
                    self.serialize_struct(value)
                } else {
                    let referenced = self.parse_uoffset(&value.constant)?;
                    self.builder.push_offset_element(referenced);
                    Ok(())
                }
            }
            _ => self.emit_scalar(value, None),
        }
    }

    /// Parse `v, ... ]` (the opening bracket is already consumed) and emit
    /// the elements in reverse index order.
    fn parse_vector(&mut self, element: &Type) -> Result<UOffset, InfoError> {
        let mut count = 0usize;
        if self.token != Token::RBracket {
            loop {
                let mut value = Value {
                    ty: *element,
                    constant: "0".to_string(),
                    offset: 0,
                };
                self.parse_any_value(&mut value, None)?;
                self.field_stack.push((value, None));
                count += 1;
                if self.token == Token::RBracket {
                    break;
                }
                self.expect(Token::Comma)?;
            }
        }
        self.next()?;

        let elem_size = inline_size(element, &self.structs);
        let alignment = inline_alignment(element, &self.structs);
        self.builder.start_vector(count, elem_size, alignment);
        for _ in 0..count {
            let value = match self.field_stack.pop() {
                Some((value, _)) => value,
                None => break,
            };
            self.push_element(&value)?;
        }
        self.builder.clear_offsets();
        Ok(self.builder.end_vector(count))
    }
}
