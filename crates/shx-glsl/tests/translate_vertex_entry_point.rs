//! Vertex-stage entry-point translation: signature restructuring, input
//! promotion and the `mul` rewrite.

mod common;

use common::{assert_contains, assert_not_contains, base, translate_ok};
use pretty_assertions::assert_eq;
use shx_ast::builder::*;
use shx_ast::ast::{BinaryOp, TypeSpecifier};
use shx_ast::{DataType, Intrinsic, Program, ShaderTarget};
use shx_glsl::{translate, Formatting, OutputVersion, ShaderInput, ShaderOutput};

/// `float4 VertexMain(float3 coord : COORD) : SV_Position { return float4(coord, 1); }`
fn minimal_vertex_shader() -> Program {
    let mut b = ProgramBuilder::new();
    let coord = b.var("coord", base(DataType::Float3), Some("COORD"));
    b.entry_point(
        "VertexMain",
        base(DataType::Float4),
        Some("SV_Position"),
        vec![coord],
        block(vec![ret(Some(constructor(
            DataType::Float4,
            vec![var_expr("coord", coord), lit_int(1)],
        )))]),
    );
    b.finish()
}

#[test]
fn minimal_vertex_shader_translates() {
    let mut program = minimal_vertex_shader();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Vertex,
        "VertexMain",
        OutputVersion::Glsl130,
    );

    assert_contains(&translation.glsl, "#version 130");
    assert_contains(&translation.glsl, "in vec3 coord;");
    assert_contains(&translation.glsl, "void main()");
    assert_contains(&translation.glsl, "gl_Position = vec4(coord, 1);");
    // The entry point is renamed to main; no definition keeps the HLSL name.
    assert_not_contains(&translation.glsl, "VertexMain(");
}

#[test]
fn mul_rewrite_brackets_composite_operands() {
    let mut b = ProgramBuilder::new();
    let w_matrix = b.global_var(
        "wMatrix",
        TypeSpecifier::new(base(DataType::Float4x4)),
        None,
    );
    let pos = b.var("pos", base(DataType::Float4), Some("POSITION"));
    let offset = constructor(
        DataType::Float4,
        vec![lit_int(0), lit_int(1), lit_int(0), lit_int(0)],
    );
    let sum = binary(var_expr("pos", pos), BinaryOp::Add, offset);
    b.entry_point(
        "VS",
        base(DataType::Float4),
        Some("SV_Position"),
        vec![pos],
        block(vec![ret(Some(intrinsic_call(
            Intrinsic::Mul,
            vec![var_expr("wMatrix", w_matrix), sum],
        )))]),
    );
    let mut program = b.finish();

    let translation = translate_ok(
        &mut program,
        ShaderTarget::Vertex,
        "VS",
        OutputVersion::Glsl130,
    );
    assert_contains(
        &translation.glsl,
        "(wMatrix * (pos + vec4(0, 1, 0, 0)))",
    );
    // The recorded usage keeps the observed argument base types.
    let usage = program.intrinsic_usage(Intrinsic::Mul).expect("mul usage");
    assert!(usage
        .arg_lists
        .contains(&vec![DataType::Float4x4, DataType::Float4]));
}

#[test]
fn translation_is_idempotent_over_reruns() {
    let mut program = minimal_vertex_shader();
    let input = ShaderInput::new(ShaderTarget::Vertex, "VertexMain");
    let mut output = ShaderOutput::new(OutputVersion::Glsl130);
    // The banner carries a timestamp; disable comments for a stable diff.
    output.format = Formatting {
        comments: false,
        ..Formatting::default()
    };

    let first = translate(&mut program, &input, &output).expect("first run");
    let second = translate(&mut program, &input, &output).expect("second run");
    assert_eq!(first.glsl, second.glsl);
}

#[test]
fn missing_entry_point_is_reported() {
    let mut program = minimal_vertex_shader();
    let err = translate(
        &mut program,
        &ShaderInput::new(ShaderTarget::Vertex, "NoSuchEntry"),
        &ShaderOutput::new(OutputVersion::Glsl130),
    )
    .unwrap_err();
    assert_eq!(err.severity, shx_ast::Severity::Error);
    assert!(err.message.contains("NoSuchEntry"));
}
