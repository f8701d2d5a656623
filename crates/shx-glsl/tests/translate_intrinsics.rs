//! Intrinsic rewrites: `clip` helper emission, `rcp`, atomics, `saturate`
//! and arity validation.

mod common;

use common::{assert_contains, base, translate_ok};
use shx_ast::builder::*;
use shx_ast::ast::TypeSpecifier;
use shx_ast::{DataType, Intrinsic, ShaderTarget};
use shx_glsl::{translate, OutputVersion, ShaderInput, ShaderOutput};

#[test]
fn clip_helper_is_emitted_once_per_type() {
    let mut b = ProgramBuilder::new();
    let v = b.var("v", base(DataType::Float3), Some("TEXCOORD0"));
    b.entry_point(
        "PS",
        base(DataType::Float4),
        Some("SV_Target"),
        vec![v],
        block(vec![
            // Two call sites with the same argument type.
            expr_stmt(intrinsic_call(Intrinsic::Clip, vec![var_expr("v", v)])),
            expr_stmt(intrinsic_call(Intrinsic::Clip, vec![var_expr("v", v)])),
            ret(Some(constructor(DataType::Float4, vec![lit_int(1)]))),
        ]),
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Fragment,
        "PS",
        OutputVersion::Glsl130,
    );

    let helper = "void clip(vec3 x) { if (any(lessThan(x, vec3(0.0)))) discard; }";
    assert_contains(&translation.glsl, helper);
    assert_eq!(
        translation.glsl.matches(helper).count(),
        1,
        "helper must be emitted once regardless of call count"
    );
    // Call sites stay plain calls.
    assert_contains(&translation.glsl, "clip(v);");
}

#[test]
fn rcp_becomes_a_typed_division() {
    let mut b = ProgramBuilder::new();
    let x = b.var("x", base(DataType::Float), Some("TEXCOORD0"));
    b.entry_point(
        "PS",
        base(DataType::Float4),
        Some("SV_Target"),
        vec![x],
        block(vec![ret(Some(constructor(
            DataType::Float4,
            vec![intrinsic_call(Intrinsic::Rcp, vec![var_expr("x", x)])],
        )))]),
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Fragment,
        "PS",
        OutputVersion::Glsl130,
    );
    assert_contains(&translation.glsl, "(float(1) / (x))");
}

#[test]
fn atomic_with_original_value_becomes_an_assignment() {
    let mut b = ProgramBuilder::new();
    let counter = b.global_var("counter", TypeSpecifier::new(base(DataType::Int)), None);
    let (orig_stmt, orig) = b.local_var("orig", base(DataType::Int), None);
    b.entry_point(
        "CS",
        shx_ast::TypeDenoter::Void,
        None,
        vec![],
        block(vec![
            orig_stmt,
            expr_stmt(intrinsic_call(
                Intrinsic::InterlockedAdd,
                vec![
                    var_expr("counter", counter),
                    lit_int(1),
                    var_expr("orig", orig),
                ],
            )),
            ret(None),
        ]),
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Compute,
        "CS",
        OutputVersion::Glsl430,
    );
    assert_contains(&translation.glsl, "orig = atomicAdd(counter, 1);");
}

#[test]
fn atomic_without_original_value_stays_a_plain_call() {
    let mut b = ProgramBuilder::new();
    let counter = b.global_var("counter", TypeSpecifier::new(base(DataType::Int)), None);
    b.entry_point(
        "CS",
        shx_ast::TypeDenoter::Void,
        None,
        vec![],
        block(vec![
            expr_stmt(intrinsic_call(
                Intrinsic::InterlockedXor,
                vec![var_expr("counter", counter), lit_int(255)],
            )),
            ret(None),
        ]),
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Compute,
        "CS",
        OutputVersion::Glsl430,
    );
    assert_contains(&translation.glsl, "atomicXor(counter, 255);");
}

#[test]
fn saturate_becomes_clamp() {
    let mut b = ProgramBuilder::new();
    let x = b.var("x", base(DataType::Float), Some("TEXCOORD0"));
    b.entry_point(
        "PS",
        base(DataType::Float4),
        Some("SV_Target"),
        vec![x],
        block(vec![ret(Some(constructor(
            DataType::Float4,
            vec![intrinsic_call(Intrinsic::Saturate, vec![var_expr("x", x)])],
        )))]),
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Fragment,
        "PS",
        OutputVersion::Glsl130,
    );
    assert_contains(&translation.glsl, "clamp(x, 0.0, 1.0)");
}

#[test]
fn wrong_intrinsic_arity_is_rejected() {
    let mut b = ProgramBuilder::new();
    let x = b.var("x", base(DataType::Float4), Some("TEXCOORD0"));
    b.entry_point(
        "PS",
        base(DataType::Float4),
        Some("SV_Target"),
        vec![x],
        block(vec![ret(Some(intrinsic_call(
            Intrinsic::Mul,
            vec![var_expr("x", x)],
        )))]),
    );
    let mut program = b.finish();
    let err = translate(
        &mut program,
        &ShaderInput::new(ShaderTarget::Fragment, "PS"),
        &ShaderOutput::new(OutputVersion::Glsl130),
    )
    .unwrap_err();
    assert!(err.message.contains("mul"), "got: {}", err.message);
    assert!(err.message.contains('1'), "got: {}", err.message);
}

#[test]
fn lerp_and_frac_use_glsl_spellings() {
    let mut b = ProgramBuilder::new();
    let x = b.var("x", base(DataType::Float3), Some("TEXCOORD0"));
    let lerp = intrinsic_call(
        Intrinsic::Lerp,
        vec![
            var_expr("x", x),
            intrinsic_call(Intrinsic::Frac, vec![var_expr("x", x)]),
            lit_float("0.5"),
        ],
    );
    b.entry_point(
        "PS",
        base(DataType::Float4),
        Some("SV_Target"),
        vec![x],
        block(vec![ret(Some(constructor(
            DataType::Float4,
            vec![lerp, lit_int(1)],
        )))]),
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Fragment,
        "PS",
        OutputVersion::Glsl130,
    );
    assert_contains(&translation.glsl, "mix(x, fract(x), 0.5)");
}
