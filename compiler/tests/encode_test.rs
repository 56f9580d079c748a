#![cfg(test)]

use infobuf_compiler::{compile_source, decode_buffer, schema_json};
use infobuf_schema::Reader;
use serde_json::json;

fn compile(input: &str) -> Vec<u8> {
    let (_schema, bin) = compile_source(input).expect("compile_source failed");
    assert!(!bin.is_empty(), "source produced no root value");
    bin
}

fn read_i32(data: &[u8], pos: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&data[pos..pos + 4]);
    i32::from_le_bytes(raw)
}

#[test]
fn scalars_equal_to_defaults_are_elided() {
    let bin = compile("info T { a:int=0; b:int=7; } Main T; { a:0, b:7 }");
    // Root offset, shared all-defaults vtable, empty table.
    assert_eq!(
        bin,
        [12, 0, 0, 0, 8, 0, 4, 0, 0, 0, 0, 0, 8, 0, 0, 0]
    );
    let reader = Reader::new(&bin);
    let table = reader.table_at(reader.root().unwrap());
    assert_eq!(table.scalar::<i32>(4), Ok(None));
    assert_eq!(table.scalar::<i32>(6), Ok(None));
}

#[test]
fn strings_are_length_prefixed_and_terminated() {
    let bin = compile("info T { s:string; } Main T; { s:\"hi\" }");
    assert_eq!(
        bin,
        [
            12, 0, 0, 0, // root offset
            0, 0, // alignment padding
            6, 0, 8, 0, 4, 0, // vtable
            6, 0, 0, 0, // vtable back-offset
            4, 0, 0, 0, // offset to the string
            2, 0, 0, 0, 104, 105, 0, 0, // [len]["hi"][NUL][pad]
        ]
    );
    let reader = Reader::new(&bin);
    let table = reader.table_at(reader.root().unwrap());
    let pos = table.indirect(4).unwrap().unwrap();
    assert_eq!(reader.string_at(pos).unwrap(), "hi");
}

#[test]
fn fixed_structs_are_spliced_inline() {
    let input = "struct P { x:float; y:float; } info R { p:P; } Main R; { p: { x:1.0, y:2.0 } }";
    let bin = compile(input);
    assert_eq!(
        bin,
        [
            12, 0, 0, 0, // root offset
            0, 0, // alignment padding
            6, 0, 12, 0, 4, 0, // vtable
            6, 0, 0, 0, // vtable back-offset
            0, 0, 128, 63, // x = 1.0f32
            0, 0, 0, 64, // y = 2.0f32
        ]
    );
    let reader = Reader::new(&bin);
    let table = reader.table_at(reader.root().unwrap());
    let pos = table.field(4).unwrap().unwrap();
    // The struct sits inline in its parent, naturally aligned.
    assert_eq!(pos % 4, 0);
    assert_eq!(reader.read::<f32>(pos), Ok(1.0));
    assert_eq!(reader.read::<f32>(pos + 4), Ok(2.0));
}

#[test]
fn union_values_follow_their_discriminator() {
    let input = "\
        union U { A, B } \
        info A { x:int; } \
        info B { y:int; } \
        info R { u:U; } \
        Main R; \
        { u_type: A, u: { x: 5 } }";
    let bin = compile(input);
    let reader = Reader::new(&bin);
    let table = reader.table_at(reader.root().unwrap());
    assert_eq!(table.scalar::<u8>(4), Ok(Some(1)));
    let member = reader.table_at(table.indirect(6).unwrap().unwrap());
    assert_eq!(member.scalar::<i32>(4), Ok(Some(5)));

    let (schema, bin) = compile_source(input).unwrap();
    let decoded = decode_buffer(&schema, &bin).unwrap();
    assert_eq!(decoded, json!({ "u_type": 1, "u": { "x": 5 } }));
}

#[test]
fn vectors_keep_index_order() {
    let bin = compile("info R { v:[int]; } Main R; { v: [3, 1, 4, 1, 5] }");
    assert_eq!(
        bin,
        [
            12, 0, 0, 0, // root offset
            0, 0, // alignment padding
            6, 0, 8, 0, 4, 0, // vtable
            6, 0, 0, 0, // vtable back-offset
            4, 0, 0, 0, // offset to the vector
            5, 0, 0, 0, // element count
            3, 0, 0, 0, 1, 0, 0, 0, 4, 0, 0, 0, 1, 0, 0, 0, 5, 0, 0, 0,
        ]
    );
    let reader = Reader::new(&bin);
    let table = reader.table_at(reader.root().unwrap());
    let pos = table.indirect(4).unwrap().unwrap();
    let (count, start) = reader.vector_at(pos).unwrap();
    assert_eq!(count, 5);
    let elements: Vec<i32> = (0..count)
        .map(|i| reader.read::<i32>(start + i * 4).unwrap())
        .collect();
    assert_eq!(elements, [3, 1, 4, 1, 5]);
}

#[test]
fn enum_fields_encode_their_member_value() {
    let input = "enum E : byte { X = 1, Y = 3 } info R { e:E = X; } Main R;";
    let bin = compile(&format!("{} {{ e: Y }}", input));
    let reader = Reader::new(&bin);
    let table = reader.table_at(reader.root().unwrap());
    assert_eq!(table.scalar::<i8>(4), Ok(Some(3)));

    // A value equal to the declared default is elided, and decoding
    // restores it.
    let (schema, bin) = compile_source(&format!("{} {{ e: X }}", input)).unwrap();
    let reader = Reader::new(&bin);
    let table = reader.table_at(reader.root().unwrap());
    assert_eq!(table.scalar::<i8>(4), Ok(None));
    let decoded = decode_buffer(&schema, &bin).unwrap();
    assert_eq!(decoded, json!({ "e": 1 }));
}

#[test]
fn identical_table_layouts_share_one_vtable() {
    let input = "\
        info T { a:int=0; b:int=0; } \
        info R { x:T; y:T; } \
        Main R; \
        { x: { a:0, b:0 }, y: { a:0, b:0 } }";
    let bin = compile(input);
    let reader = Reader::new(&bin);
    let root = reader.table_at(reader.root().unwrap());
    let first = root.indirect(4).unwrap().unwrap();
    let second = root.indirect(6).unwrap().unwrap();
    assert_ne!(first, second);
    let first_vtable = first as i64 - read_i32(&bin, first) as i64;
    let second_vtable = second as i64 - read_i32(&bin, second) as i64;
    assert_eq!(first_vtable, second_vtable);
}

#[test]
fn size_class_sorting_vs_original_order() {
    // Size-class sorting lets the byte ride in the slack before the int.
    let bin = compile("info A { a:int; b:byte; } Main A; { a:1, b:2 }");
    let reader = Reader::new(&bin);
    let table = reader.table_at(reader.root().unwrap());
    let base = table.pos();
    assert_eq!(table.field(4).unwrap().unwrap() - base, 8);
    assert_eq!(table.field(6).unwrap().unwrap() - base, 7);
    assert_eq!(table.field(4).unwrap().unwrap() % 4, 0);

    // Original_order keeps declaration order on the wire.
    let bin = compile(
        "info A (Original_order) { a:int; b:byte; } Main A; { a:1, b:2 }",
    );
    let reader = Reader::new(&bin);
    let table = reader.table_at(reader.root().unwrap());
    let base = table.pos();
    assert_eq!(table.field(4).unwrap().unwrap() - base, 4);
    assert_eq!(table.field(6).unwrap().unwrap() - base, 11);
    assert_eq!(table.field(4).unwrap().unwrap() % 4, 0);
}

#[test]
fn empty_root_object_encodes_an_empty_table() {
    let (schema, bin) = compile_source("info T { x:int=5; } Main T; { }").unwrap();
    let reader = Reader::new(&bin);
    let table = reader.table_at(reader.root().unwrap());
    assert_eq!(table.scalar::<i32>(4), Ok(None));
    let decoded = decode_buffer(&schema, &bin).unwrap();
    assert_eq!(decoded, json!({ "x": 5 }));
}

#[test]
fn compilation_is_deterministic() {
    let input = "\
        info T { a:int; s:string; v:[short]; } \
        Main T; \
        { a: 9, s: \"x\", v: [1, 2, 3] }";
    assert_eq!(compile(input), compile(input));
}

#[test]
fn quoted_keys_match_bare_keys() {
    let bare = compile("info T { a:int; } Main T; { a: 1 }");
    let quoted = compile("info T { a:int; } Main T; { \"a\": 1 }");
    assert_eq!(bare, quoted);
}

#[test]
fn booleans_are_integers_on_the_wire() {
    let input = "info T { on:bool = false; } Main T; { on: true }";
    let (schema, bin) = compile_source(input).unwrap();
    let reader = Reader::new(&bin);
    let table = reader.table_at(reader.root().unwrap());
    assert_eq!(table.scalar::<u8>(4), Ok(Some(1)));
    let decoded = decode_buffer(&schema, &bin).unwrap();
    assert_eq!(decoded, json!({ "on": true }));
}

#[test]
fn long_scalars_align_to_eight_bytes() {
    let input = "info T { tag:byte; big:long; } Main T; { tag: 1, big: 77 }";
    let (schema, bin) = compile_source(input).unwrap();
    let reader = Reader::new(&bin);
    let table = reader.table_at(reader.root().unwrap());
    let pos = table.field(6).unwrap().unwrap();
    assert_eq!(pos % 8, 0);
    assert_eq!(reader.read::<i64>(pos), Ok(77));
    let decoded = decode_buffer(&schema, &bin).unwrap();
    assert_eq!(decoded, json!({ "tag": 1, "big": 77 }));
}

#[test]
fn sprite_roundtrip() {
    let input = r#"
    namespace demo.gfx;

    /// The shape of a sprite's corners.
    enum Corner : byte { FLAT = 1, ROUND = 2, POINTED = 4 }

    union Shape { Circle, Rect }

    info Circle { radius:double; }
    info Rect { w:int; h:int; }

    struct Vec2 {
      x:float;
      y:float;
    }

    info Sprite {
      name:string;
      pos:Vec2;
      corner:Corner = FLAT;
      visible:bool = true;
      layer:short = 5;
      old_id:int (deprecated);
      tags:[string];
      points:[Vec2];
      shape:Shape;
    }

    Main Sprite;

    {
      name: "hero",
      pos: { x: 1.5, y: -2.5 },
      corner: POINTED,
      visible: false,
      tags: ["a", "b"],
      points: [ { x: 1.0, y: 2.0 }, { x: 3.0, y: 4.0 } ],
      shape_type: Rect,
      shape: { w: 3, h: 4 }
    }
    "#;

    let (schema, bin) = compile_source(input).expect("compile_source failed");
    let decoded = decode_buffer(&schema, &bin).expect("decode_buffer failed");
    assert_eq!(
        decoded,
        json!({
            "name": "hero",
            "pos": { "x": 1.5, "y": -2.5 },
            "corner": 4,
            "visible": false,
            "layer": 5,
            "tags": ["a", "b"],
            "points": [ { "x": 1.0, "y": 2.0 }, { "x": 3.0, "y": 4.0 } ],
            "shape_type": 2,
            "shape": { "w": 3, "h": 4 }
        })
    );
}

#[test]
fn schema_json_lists_structs_in_declaration_order() {
    let input = "info Outer { inner:Inner; } info Inner { x:int; } Main Outer;";
    let (schema, _bin) = compile_source(input).unwrap();
    let dumped = schema_json(&schema);
    assert_eq!(dumped["main"], json!("Outer"));
    assert_eq!(dumped["structs"][0]["name"], json!("Outer"));
    assert_eq!(dumped["structs"][1]["name"], json!("Inner"));
}
