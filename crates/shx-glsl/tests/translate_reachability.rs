//! Reference analysis: only declarations reachable from the entry point are
//! emitted, and forward declarations follow their implementations.

mod common;

use common::{assert_contains, assert_not_contains, base, translate_ok};
use shx_ast::ast::NodeFlags;
use shx_ast::builder::*;
use shx_ast::{DataType, ShaderTarget};
use shx_glsl::OutputVersion;

#[test]
fn unreferenced_functions_are_skipped() {
    let mut b = ProgramBuilder::new();
    let used = b.function(
        "brighten",
        base(DataType::Float4),
        None,
        vec![],
        block(vec![ret(Some(constructor(
            DataType::Float4,
            vec![lit_int(1)],
        )))]),
    );
    b.function(
        "unusedHelper",
        base(DataType::Float),
        None,
        vec![],
        block(vec![ret(Some(lit_float("0.0")))]),
    );
    b.entry_point(
        "PS",
        base(DataType::Float4),
        Some("SV_Target"),
        vec![],
        block(vec![ret(Some(function_call("brighten", used, vec![])))]),
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Fragment,
        "PS",
        OutputVersion::Glsl130,
    );

    assert_contains(&translation.glsl, "vec4 brighten()");
    assert_contains(&translation.glsl, "SV_Target = brighten();");
    assert_not_contains(&translation.glsl, "unusedHelper");
}

#[test]
fn forward_declarations_follow_their_implementation() {
    let mut b = ProgramBuilder::new();
    let implementation = b.function(
        "luminance",
        base(DataType::Float),
        None,
        vec![],
        block(vec![ret(Some(lit_float("1.0")))]),
    );
    let forward = b.forward_decl(implementation);
    b.entry_point(
        "PS",
        base(DataType::Float4),
        Some("SV_Target"),
        vec![],
        block(vec![ret(Some(constructor(
            DataType::Float4,
            vec![function_call("luminance", implementation, vec![])],
        )))]),
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Fragment,
        "PS",
        OutputVersion::Glsl130,
    );

    // Both the implementation and its forward declaration are reachable.
    assert!(program.functions[implementation]
        .flags
        .contains(NodeFlags::REACHABLE));
    assert!(program.functions[forward]
        .flags
        .contains(NodeFlags::REACHABLE));
    assert_contains(&translation.glsl, "float luminance();");
    assert_contains(&translation.glsl, "float luminance()\n{");
}

#[test]
fn conversion_never_unmarks_reachability() {
    let mut b = ProgramBuilder::new();
    let coord = b.var("coord", base(DataType::Float3), Some("COORD"));
    let entry = b.entry_point(
        "VS",
        base(DataType::Float4),
        Some("SV_Position"),
        vec![coord],
        block(vec![ret(Some(constructor(
            DataType::Float4,
            vec![var_expr("coord", coord), lit_int(1)],
        )))]),
    );
    let mut program = b.finish();
    translate_ok(
        &mut program,
        ShaderTarget::Vertex,
        "VS",
        OutputVersion::Glsl130,
    );
    let marked_before: Vec<bool> = program
        .functions
        .handles()
        .map(|h| program.functions[h].flags.contains(NodeFlags::REACHABLE))
        .collect();
    assert!(program.functions[entry].flags.contains(NodeFlags::REACHABLE));

    // A second run over the already-converted program keeps every mark.
    translate_ok(
        &mut program,
        ShaderTarget::Vertex,
        "VS",
        OutputVersion::Glsl130,
    );
    let marked_after: Vec<bool> = program
        .functions
        .handles()
        .map(|h| program.functions[h].flags.contains(NodeFlags::REACHABLE))
        .collect();
    assert_eq!(marked_before, marked_after);
}
