//! Compute-stage layout emission and the extension agent's version gates.

mod common;

use common::{assert_contains, base, translate_ok, translate_with_extensions};
use shx_ast::builder::*;
use shx_ast::ast::{Attribute, AttributeKind, TypeSpecifier};
use shx_ast::{DataType, ShaderTarget, TypeDenoter};
use shx_glsl::{translate, OutputVersion, ShaderInput, ShaderOutput};

#[test]
fn numthreads_becomes_a_local_size_layout() {
    let mut b = ProgramBuilder::new();
    let entry = b.entry_point(
        "CSMain",
        TypeDenoter::Void,
        None,
        vec![],
        block(vec![ret(None)]),
    );
    b.attribs(
        entry,
        vec![Attribute::new(
            AttributeKind::NumThreads,
            vec![lit_int(8), lit_int(8), lit_int(1)],
        )],
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Compute,
        "CSMain",
        OutputVersion::Glsl430,
    );
    assert_contains(
        &translation.glsl,
        "layout(local_size_x = 8, local_size_y = 8, local_size_z = 1) in;",
    );
    // The layout precedes the main body.
    let layout_pos = translation.glsl.find("local_size_x").unwrap();
    let main_pos = translation.glsl.find("void main()").unwrap();
    assert!(layout_pos < main_pos);
}

#[test]
fn numthreads_with_wrong_arity_is_rejected() {
    let mut b = ProgramBuilder::new();
    let entry = b.entry_point(
        "CSMain",
        TypeDenoter::Void,
        None,
        vec![],
        block(vec![ret(None)]),
    );
    b.attribs(
        entry,
        vec![Attribute::new(
            AttributeKind::NumThreads,
            vec![lit_int(8), lit_int(8)],
        )],
    );
    let mut program = b.finish();
    let err = translate(
        &mut program,
        &ShaderInput::new(ShaderTarget::Compute, "CSMain"),
        &ShaderOutput::new(OutputVersion::Glsl430),
    )
    .unwrap_err();
    assert!(err.message.contains("numthreads"), "got: {}", err.message);
}

#[test]
fn early_depth_stencil_emits_early_fragment_tests() {
    let mut b = ProgramBuilder::new();
    let entry = b.entry_point(
        "PS",
        base(DataType::Float4),
        Some("SV_Target"),
        vec![],
        block(vec![ret(Some(constructor(
            DataType::Float4,
            vec![lit_int(1)],
        )))]),
    );
    b.attribs(
        entry,
        vec![Attribute::new(AttributeKind::EarlyDepthStencil, vec![])],
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Fragment,
        "PS",
        OutputVersion::Glsl450,
    );
    assert_contains(&translation.glsl, "layout(early_fragment_tests) in;");
}

#[test]
fn double_precision_below_400_needs_fp64() {
    let make_program = || {
        let mut b = ProgramBuilder::new();
        let d = b.global_var("bigValue", TypeSpecifier::new(base(DataType::Double)), None);
        b.entry_point(
            "VS",
            base(DataType::Float4),
            Some("SV_Position"),
            vec![],
            block(vec![ret(Some(constructor(
                DataType::Float4,
                vec![
                    shx_ast::builder::binary(
                        var_expr("bigValue", d),
                        shx_ast::ast::BinaryOp::Mul,
                        lit_float("0.0"),
                    ),
                    lit_int(0),
                    lit_int(0),
                    lit_int(1),
                ],
            )))]),
        );
        b.finish()
    };

    let mut program = make_program();
    let translation = translate_with_extensions(
        &mut program,
        ShaderTarget::Vertex,
        "VS",
        OutputVersion::Glsl130,
    );
    assert_contains(
        &translation.glsl,
        "#extension GL_ARB_gpu_shader_fp64 : enable",
    );

    let mut program = make_program();
    let err = translate(
        &mut program,
        &ShaderInput::new(ShaderTarget::Vertex, "VS"),
        &ShaderOutput::new(OutputVersion::Glsl130),
    )
    .unwrap_err();
    assert!(err.message.contains("400"), "got: {}", err.message);
}

#[test]
fn texture_arrays_below_150_need_the_array_extension() {
    let mut b = ProgramBuilder::new();
    let tex = b.texture("layers", shx_ast::BufferType::Texture2DArray, None);
    let uv = b.var("uv", base(DataType::Float3), Some("TEXCOORD0"));
    let sample = texture_call(
        ("layers", tex),
        shx_ast::Intrinsic::TextureSample,
        vec![var_expr("uv", uv)],
    );
    b.entry_point(
        "PS",
        base(DataType::Float4),
        Some("SV_Target"),
        vec![uv],
        block(vec![ret(Some(sample))]),
    );
    let mut program = b.finish();
    let translation = translate_with_extensions(
        &mut program,
        ShaderTarget::Fragment,
        "PS",
        OutputVersion::Glsl130,
    );
    assert_contains(
        &translation.glsl,
        "#extension GL_EXT_texture_array : enable",
    );
    assert_contains(&translation.glsl, "uniform sampler2DArray layers;");
}

#[test]
fn essl_version_lines_carry_the_es_suffix() {
    let mut b = ProgramBuilder::new();
    let coord = b.var("coord", base(DataType::Float3), Some("COORD"));
    b.entry_point(
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
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Vertex,
        "VS",
        OutputVersion::Essl300,
    );
    assert_contains(&translation.glsl, "#version 300 es");
}
