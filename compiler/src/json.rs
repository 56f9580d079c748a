//! Dynamic decoding of finished payloads back to JSON, driven by a parsed
//! [`Schema`]. This is the read-side mirror of the value encoder: absent
//! table scalars report their declared defaults, unions resolve through
//! their discriminator, and fixed structs are walked inline.

use infobuf_schema::{Reader, TableReader};
use serde_json::{json, Map, Number, Value as Json};

use crate::error::InfoError;
use crate::types::{inline_size, is_struct, BaseType, Schema, StructDef, Type};

fn truncated() -> InfoError {
    InfoError::Decode("unexpected end of buffer".to_string())
}

/// Decode the root value of `buffer` against `schema`.
pub fn decode_buffer(schema: &Schema, buffer: &[u8]) -> Result<Json, InfoError> {
    let root = schema
        .root
        .ok_or_else(|| InfoError::Decode("schema does not declare a Main type".to_string()))?;
    let reader = Reader::new(buffer);
    let pos = reader.root().map_err(|_| truncated())?;
    decode_info(schema, &reader, root, pos)
}

/// Render a parsed schema as JSON, structs in declaration order.
pub fn schema_json(schema: &Schema) -> Json {
    let structs: Vec<&StructDef> = schema
        .decl_order
        .iter()
        .map(|&index| &schema.structs.vec[index])
        .collect();
    json!({
        "namespaces": schema.namespaces,
        "structs": structs,
        "enums": schema.enums,
        "main": schema.root.map(|index| schema.structs.vec[index].name.clone()),
    })
}

fn float_json(value: f64) -> Json {
    match Number::from_f64(value) {
        Some(number) => Json::Number(number),
        None => Json::Null,
    }
}

/// The declared default of a scalar field, as JSON.
fn default_json(ty: &Type, constant: &str) -> Result<Json, InfoError> {
    let bad = || InfoError::Decode(format!("invalid default constant: {}", constant));
    Ok(match ty.base {
        BaseType::Bool => Json::Bool(constant.parse::<i64>().map_err(|_| bad())? != 0),
        BaseType::Float | BaseType::Double => {
            float_json(constant.parse::<f64>().map_err(|_| bad())?)
        }
        _ => Json::Number(Number::from(constant.parse::<i64>().map_err(|_| bad())?)),
    })
}

/// Decode the scalar of type `ty` stored at `pos`.
fn scalar_json(reader: &Reader, ty: &Type, pos: usize) -> Result<Json, InfoError> {
    let out = match ty.base {
        BaseType::Bool => Json::Bool(reader.read::<u8>(pos).map_err(|_| truncated())? != 0),
        BaseType::None | BaseType::UType | BaseType::UByte => {
            Json::Number(Number::from(reader.read::<u8>(pos).map_err(|_| truncated())?))
        }
        BaseType::Byte => Json::Number(Number::from(reader.read::<i8>(pos).map_err(|_| truncated())?)),
        BaseType::Short => Json::Number(Number::from(reader.read::<i16>(pos).map_err(|_| truncated())?)),
        BaseType::UShort => Json::Number(Number::from(reader.read::<u16>(pos).map_err(|_| truncated())?)),
        BaseType::Int => Json::Number(Number::from(reader.read::<i32>(pos).map_err(|_| truncated())?)),
        BaseType::UInt => Json::Number(Number::from(reader.read::<u32>(pos).map_err(|_| truncated())?)),
        BaseType::Long => Json::Number(Number::from(reader.read::<i64>(pos).map_err(|_| truncated())?)),
        BaseType::ULong => Json::Number(Number::from(reader.read::<u64>(pos).map_err(|_| truncated())?)),
        BaseType::Float => float_json(reader.read::<f32>(pos).map_err(|_| truncated())? as f64),
        BaseType::Double => float_json(reader.read::<f64>(pos).map_err(|_| truncated())?),
        _ => return Err(InfoError::Decode(format!("not a scalar: {}", ty.base.name()))),
    };
    Ok(out)
}

/// Decode the value of type `ty` whose inline storage is at `pos`.
fn decode_inline(schema: &Schema, reader: &Reader, ty: &Type, pos: usize) -> Result<Json, InfoError> {
    match ty.base {
        BaseType::String => {
            let target = reader.indirect(pos).map_err(|_| truncated())?;
            let text = reader.string_at(target).map_err(|_| truncated())?;
            Ok(Json::String(text.into_owned()))
        }
        BaseType::Vector => {
            let target = reader.indirect(pos).map_err(|_| truncated())?;
            decode_vector(schema, reader, &ty.vector_type(), target)
        }
        BaseType::Struct => {
            let struct_index = ty
                .struct_ref
                .ok_or_else(|| InfoError::Decode("dangling struct reference".to_string()))?;
            if is_struct(ty, &schema.structs) {
                decode_info(schema, reader, struct_index, pos)
            } else {
                let target = reader.indirect(pos).map_err(|_| truncated())?;
                decode_info(schema, reader, struct_index, target)
            }
        }
        _ => scalar_json(reader, ty, pos),
    }
}

fn decode_vector(
    schema: &Schema,
    reader: &Reader,
    element: &Type,
    pos: usize,
) -> Result<Json, InfoError> {
    let (count, start) = reader.vector_at(pos).map_err(|_| truncated())?;
    let stride = inline_size(element, &schema.structs);
    let mut out = Vec::with_capacity(count);
    for index in 0..count {
        out.push(decode_inline(schema, reader, element, start + index * stride)?);
    }
    Ok(Json::Array(out))
}

/// Decode one info (via its vtable) or fixed struct (inline) at `pos`.
fn decode_info(
    schema: &Schema,
    reader: &Reader,
    struct_index: usize,
    pos: usize,
) -> Result<Json, InfoError> {
    let def = &schema.structs.vec[struct_index];
    let mut out = Map::new();

    if def.fixed {
        for field in def.fields.iter() {
            let field_pos = pos + field.value.offset as usize;
            out.insert(
                field.name.clone(),
                decode_inline(schema, reader, &field.value.ty, field_pos)?,
            );
        }
        return Ok(Json::Object(out));
    }

    let table = reader.table_at(pos);
    for (index, field) in def.fields.iter().enumerate() {
        if field.deprecated {
            continue;
        }
        let slot = field.value.offset as u16;
        match field.value.ty.base {
            BaseType::Union => {
                let discriminator = union_discriminator(def, index, &table)?;
                if discriminator == 0 {
                    continue;
                }
                let field_pos = match table.field(slot).map_err(|_| truncated())? {
                    Some(field_pos) => field_pos,
                    None => continue,
                };
                let enum_index = field.value.ty.enum_ref.ok_or_else(|| {
                    InfoError::Decode("dangling union reference".to_string())
                })?;
                let member = schema.enums.vec[enum_index]
                    .reverse_lookup(discriminator as i64)
                    .and_then(|val| val.struct_ref)
                    .ok_or_else(|| {
                        InfoError::Decode(format!("bad union discriminator: {}", discriminator))
                    })?;
                let target = reader.indirect(field_pos).map_err(|_| truncated())?;
                out.insert(field.name.clone(), decode_info(schema, reader, member, target)?);
            }
            base if base.is_scalar() => {
                let value = match table.field(slot).map_err(|_| truncated())? {
                    Some(field_pos) => scalar_json(reader, &field.value.ty, field_pos)?,
                    None => default_json(&field.value.ty, &field.value.constant)?,
                };
                out.insert(field.name.clone(), value);
            }
            _ => {
                if let Some(field_pos) = table.field(slot).map_err(|_| truncated())? {
                    out.insert(
                        field.name.clone(),
                        decode_inline(schema, reader, &field.value.ty, field_pos)?,
                    );
                }
            }
        }
    }
    Ok(Json::Object(out))
}

/// Read the hidden `_type` companion immediately preceding a union field.
fn union_discriminator(
    def: &StructDef,
    union_index: usize,
    table: &TableReader,
) -> Result<u8, InfoError> {
    if union_index == 0 {
        return Err(InfoError::Decode(
            "union field has no discriminator".to_string(),
        ));
    }
    let companion = &def.fields.vec[union_index - 1];
    let slot = companion.value.offset as u16;
    Ok(table.scalar::<u8>(slot).map_err(|_| truncated())?.unwrap_or(0))
}
