// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end export tests
//!
//! Drives the full pipeline from metadata to generated text and checks the
//! reconstructed layouts, derives and diagnostics.

use structgen::metadata::{FieldMetadata, FunctionBinding, FunctionMetadata, Scalar, Shape};
use structgen::structs::MemberKind;
use structgen::{export, Diagnostic, ExportConfig, Exporter, TypeDecl, TypeLibrary, TypeMetadata};

fn config() -> ExportConfig {
    ExportConfig::for_namespace("App", &["app"])
}

fn int32(name: &str, offset: usize) -> FieldMetadata {
    FieldMetadata::new(name, Shape::scalar(Scalar::Int32), offset)
}

#[test]
fn test_struct_with_trailing_padding() {
    let library = TypeLibrary::new(vec![TypeMetadata::new_struct("App.Point", 0x10).with_fields(
        vec![
            int32("A", 0),
            FieldMetadata::new("B", Shape::scalar(Scalar::Single), 0xC),
        ],
    )]);

    let output = export(&library, &config()).expect("export");
    let expected = "\
pub mod app {
    #[repr(C)]
    #[derive(Copy, Clone)]
    pub struct Point { /* Size=0x10 */
        /* 0x00 */ pub a: i32,
        /* 0x04 */ _gap_0x4: [u8; 0x8],
        /* 0x0C */ pub b: f32,
    }
}
";
    assert!(output.text.contains(expected), "{}", output.text);
    assert!(output.report.diagnostics.is_empty());
}

#[test]
fn test_shared_offset_synthesizes_union() {
    let library = TypeLibrary::new(vec![TypeMetadata::new_struct("App.Slot", 0x10).with_fields(
        vec![
            FieldMetadata::new("A", Shape::scalar(Scalar::UInt64), 0),
            int32("X", 8),
            FieldMetadata::new("Y", Shape::scalar(Scalar::Double), 8),
        ],
    )]);

    let output = export(&library, &config()).expect("export");
    assert!(output
        .text
        .contains("/* 0x08 */ pub _union_0x8: crate::app::Slot_Union,"));
    assert!(output.text.contains("pub union Slot_Union { /* Size=0x8 */"));

    let y = output.text.find("pub y: f64").expect("y");
    let x = output.text.find("pub x: i32").expect("x");
    assert!(y < x, "union members should be ordered widest first");
}

#[test]
fn test_member_extents_cover_declared_size() {
    let mut rng = fastrand::Rng::with_seed(7);
    for round in 0..32 {
        let size = 0x40;
        let mut fields = Vec::new();
        let mut offset = rng.usize(0..4);
        let mut idx = 0;
        while offset + 8 <= size {
            let (scalar, width) = match rng.u8(0..3) {
                0 => (Scalar::Byte, 1),
                1 => (Scalar::Int32, 4),
                _ => (Scalar::UInt64, 8),
            };
            fields.push(FieldMetadata::new(format!("F{idx}"), Shape::scalar(scalar), offset));
            idx += 1;
            offset += width + rng.usize(0..6);
        }

        let name = format!("App.Random{round}");
        let library = TypeLibrary::new(vec![TypeMetadata::new_struct(&name, size).with_fields(fields)]);
        let config = config();
        let ctx = Exporter::new(&library, &config).build().expect("build");

        let key = format!("crate::app::Random{round}");
        let decl = ctx.registry.get(&key).and_then(TypeDecl::as_struct).expect("decl");
        let total: usize = decl.members().iter().map(|m| m.size).sum();
        assert_eq!(total, size, "round {round}");

        let mut cursor = 0;
        for member in decl.members() {
            assert_eq!(member.offset, cursor, "round {round}: {}", member.name);
            cursor += member.size;
        }
    }
}

#[test]
fn test_same_named_arguments_get_distinct_instantiations() {
    let mut open = TypeMetadata::new_struct("App.Box`1", 0);
    open.generic_params = vec!["T".into()];
    let boxed = |arg: &str, size| {
        let mut closed = TypeMetadata::new_struct("App.Box`1", size)
            .with_fields(vec![FieldMetadata::new("Value", Shape::named(arg), 0)]);
        closed.args = vec![Shape::named(arg)];
        closed
    };
    let holder = TypeMetadata::new_struct("App.Holder", 0x28).with_fields(vec![
        FieldMetadata::new("Small", Shape::generic("App.Box`1", vec![Shape::named("App.A.Foo")]), 0),
        FieldMetadata::new("Large", Shape::generic("App.Box`1", vec![Shape::named("App.B.Foo")]), 8),
    ]);
    let library = TypeLibrary::new(vec![
        open,
        TypeMetadata::new_struct("App.A.Foo", 4),
        TypeMetadata::new_struct("App.B.Foo", 0x20),
        boxed("App.A.Foo", 4),
        boxed("App.B.Foo", 0x20),
        holder,
    ]);
    let config = config();
    let ctx = Exporter::new(&library, &config).build().expect("build");

    let size_of = |key: &str| {
        ctx.registry
            .get(key)
            .and_then(TypeDecl::as_struct)
            .map(|decl| decl.size())
            .expect(key)
    };
    assert_eq!(size_of("crate::app::Box_app_a_Foo"), 4);
    assert_eq!(size_of("crate::app::Box_app_b_Foo"), 0x20);

    let holder = ctx
        .registry
        .get("crate::app::Holder")
        .and_then(TypeDecl::as_struct)
        .expect("holder");
    let fields: Vec<(String, usize)> = holder
        .members()
        .iter()
        .filter(|m| m.kind == MemberKind::Field)
        .map(|m| (m.ty.to_string(), m.size))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("crate::app::Box_app_a_Foo".to_string(), 4),
            ("crate::app::Box_app_b_Foo".to_string(), 0x20),
        ]
    );
}

#[test]
fn test_declared_union_is_padded_to_declared_size() {
    let mut meta = TypeMetadata::new("App.Small", structgen::metadata::TypeCategory::Union, 0x10);
    meta.fields = vec![
        FieldMetadata::new("Lo", Shape::scalar(Scalar::Byte), 0),
        FieldMetadata::new("Word", Shape::scalar(Scalar::UInt16), 0),
    ];
    let library = TypeLibrary::new(vec![meta]);
    let config = config();
    let ctx = Exporter::new(&library, &config).build().expect("build");

    let decl = ctx
        .registry
        .get("crate::app::Small")
        .and_then(TypeDecl::as_struct)
        .expect("union");
    assert!(decl.is_union());
    assert_eq!(decl.size(), 0x10);
    assert_eq!(decl.members()[0].name, "word");
    assert!(decl.members().iter().all(|m| m.offset == 0));
    let padding = decl.members().last().expect("padding");
    assert_eq!(padding.kind, MemberKind::Gap);
    assert_eq!(padding.size, 0x10);
}

#[test]
fn test_overrun_is_reported_and_output_still_produced() {
    let library = TypeLibrary::new(vec![TypeMetadata::new_struct("App.Broken", 0x10).with_fields(
        vec![
            FieldMetadata::new("Wide", Shape::scalar(Scalar::UInt64), 0),
            int32("Inside", 4),
        ],
    )]);

    let output = export(&library, &config()).expect("export");
    assert_eq!(
        output.report.diagnostics,
        vec![Diagnostic::LayoutOverrun {
            type_name: "crate::app::Broken".into(),
            field: "Inside".into(),
            cursor: 8,
            offset: 4,
        }]
    );
    assert!(output.text.contains("/* 0x08 */ _gap_0x8: [u8; 0x8],"));
    assert!(!output.text.contains("inside"));
}

#[test]
fn test_malformed_enum_is_emitted_without_variants() {
    let good = TypeMetadata::new_enum("App.Kind", Scalar::Byte, vec![("None", 0), ("Some", 1)]);
    let bad = TypeMetadata::new_enum("App.Flags", Scalar::Byte, vec![("Huge", 300)]);
    let library = TypeLibrary::new(vec![good, bad]);

    let output = export(&library, &config()).expect("export");
    assert_eq!(output.report.diagnostics.len(), 1);
    assert_eq!(output.report.diagnostics[0].type_name(), "crate::app::Flags");
    assert!(output.text.contains("#[derive(Copy, Clone, Debug)]\n    pub enum Kind {"));
    assert!(output.text.contains("pub enum Flags {\n        // enum metadata unavailable:"));
}

#[test]
fn test_ensure_is_idempotent() {
    let library = TypeLibrary::new(vec![
        TypeMetadata::new_struct("App.Leaf", 4).with_fields(vec![int32("V", 0)]),
        TypeMetadata::new_struct("App.Root", 8).with_fields(vec![
            FieldMetadata::new("Leaf", Shape::named("App.Leaf"), 0),
            FieldMetadata::new("Again", Shape::named("App.Leaf"), 4),
        ]),
    ]);
    let config = config();
    let exporter = Exporter::new(&library, &config);

    let first = exporter.run().expect("first run");
    let second = exporter.run().expect("second run");
    assert_eq!(first.text, second.text);
    assert_eq!(first.text.matches("pub struct Leaf ").count(), 1);

    let ctx = exporter.build().expect("build");
    let leaves = ctx
        .registry
        .iter()
        .filter(|d| d.key() == "crate::app::Leaf")
        .count();
    assert_eq!(leaves, 1);
}

#[test]
fn test_functions_and_resolution_module() {
    let library = TypeLibrary::new(vec![TypeMetadata::new_struct("App.Actor", 8)
        .with_fields(vec![int32("Id", 0)])
        .with_functions(vec![
            FunctionMetadata {
                name: "GetName".into(),
                params: Vec::new(),
                returns: Shape::pointer(Shape::scalar(Scalar::Byte)),
                is_static: false,
                deprecated: false,
                binding: Some(FunctionBinding::MemberFunction {
                    signature: "48 8B ?? E8".into(),
                }),
            },
            FunctionMetadata {
                name: "Update".into(),
                params: Vec::new(),
                returns: Shape::Void,
                is_static: false,
                deprecated: false,
                binding: Some(FunctionBinding::VirtualFunction { index: 3 }),
            },
            FunctionMetadata {
                name: "Managed".into(),
                params: Vec::new(),
                returns: Shape::Void,
                is_static: false,
                deprecated: false,
                binding: None,
            },
        ])]);

    let output = export(&library, &config()).expect("export");
    assert!(output.text.contains("pub struct Actor_Fn_GetName;"));
    assert!(output.text.contains("pub struct Actor_Fn_Update;"));
    assert!(!output.text.contains("Managed"));
    assert!(output.text.contains("pub mod resolution {"));
    assert!(output.text.contains("ACTOR_VTABLE"));
}
