//! Shader-I/O structures: interface blocks, flattening per stage policy,
//! inheritance order and system-value substitution through member chains.

mod common;

use common::{assert_contains, assert_not_contains, base, translate_ok};
use shx_ast::ast::SymbolRef;
use shx_ast::builder::*;
use shx_ast::{DataType, ShaderTarget, TypeDenoter};
use shx_glsl::OutputVersion;

#[test]
fn vertex_output_struct_becomes_an_interface_block() {
    let mut b = ProgramBuilder::new();
    let (vs_out, _) = b.struct_decl(
        "VsOut",
        &[
            ("position", base(DataType::Float4), Some("SV_Position")),
            ("uv", base(DataType::Float2), Some("TEXCOORD0")),
        ],
    );
    let coord = b.var("coord", base(DataType::Float3), Some("COORD"));
    let (local_stmt, local) = b.local_var("o", TypeDenoter::Struct(vs_out), None);
    b.entry_point(
        "VS",
        TypeDenoter::Struct(vs_out),
        None,
        vec![coord],
        block(vec![
            local_stmt,
            // o.position = float4(coord, 1);
            expr_stmt({
                let mut access = chain_expr("o", SymbolRef::Var(local), &["position"]);
                if let shx_ast::ast::ExprKind::Var(var_access) = &mut access.kind {
                    var_access.assign_op = Some(shx_ast::ast::AssignOp::Set);
                    var_access.assign_expr = Some(Box::new(constructor(
                        DataType::Float4,
                        vec![var_expr("coord", coord), lit_int(1)],
                    )));
                }
                access
            }),
            ret(Some(var_expr("o", local))),
        ]),
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Vertex,
        "VS",
        OutputVersion::Glsl150,
    );

    // Plain declaration plus the output interface block.
    assert_contains(&translation.glsl, "struct VsOut");
    assert_contains(&translation.glsl, "out _IVsOut");
    assert_contains(&translation.glsl, "outVsOut;");
    // System-value member accesses substitute the built-in.
    assert_contains(&translation.glsl, "gl_Position = vec4(coord, 1);");
    // The return is rewritten into member-wise output assignments.
    assert_contains(&translation.glsl, "VsOut shx_output = o;");
    assert_contains(&translation.glsl, "gl_Position = shx_output.position;");
    assert_contains(&translation.glsl, "outVsOut.uv = shx_output.uv;");
    // The system value never appears inside the block.
    let block_start = translation.glsl.find("out _IVsOut").unwrap();
    let block_end = translation.glsl[block_start..].find('}').unwrap() + block_start;
    assert!(!translation.glsl[block_start..block_end].contains("position"));
}

#[test]
fn vertex_input_struct_is_flattened_into_globals() {
    let mut b = ProgramBuilder::new();
    let (vs_in, _) = b.struct_decl(
        "VsIn",
        &[
            ("pos", base(DataType::Float3), Some("POSITION")),
            ("uv", base(DataType::Float2), Some("TEXCOORD0")),
        ],
    );
    let input = b.var("input", TypeDenoter::Struct(vs_in), None);
    b.entry_point(
        "VS",
        base(DataType::Float4),
        Some("SV_Position"),
        vec![input],
        block(vec![ret(Some(constructor(
            DataType::Float4,
            vec![chain_expr("input", SymbolRef::Var(input), &["pos"]), lit_int(1)],
        )))]),
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Vertex,
        "VS",
        OutputVersion::Glsl150,
    );

    // Vertex shaders cannot take input blocks: members become globals.
    assert_contains(&translation.glsl, "in vec3 pos;");
    assert_contains(&translation.glsl, "in vec2 uv;");
    assert_not_contains(&translation.glsl, "in _IVsIn");
    // Accesses drop the parameter prefix.
    assert_contains(&translation.glsl, "gl_Position = vec4(pos, 1);");
    assert_not_contains(&translation.glsl, "input.pos");
}

#[test]
fn fragment_input_struct_keeps_the_block_and_frag_coord() {
    let mut b = ProgramBuilder::new();
    let (vs_out, _) = b.struct_decl(
        "VsOut",
        &[
            ("position", base(DataType::Float4), Some("SV_Position")),
            ("uv", base(DataType::Float2), Some("TEXCOORD0")),
        ],
    );
    let input = b.var("inp", TypeDenoter::Struct(vs_out), None);
    b.entry_point(
        "PS",
        base(DataType::Float4),
        Some("SV_Target"),
        vec![input],
        block(vec![ret(Some(constructor(
            DataType::Float4,
            vec![
                chain_expr("inp", SymbolRef::Var(input), &["position", "xy"]),
                chain_expr("inp", SymbolRef::Var(input), &["uv"]),
            ],
        )))]),
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Fragment,
        "PS",
        OutputVersion::Glsl150,
    );

    // Fragment shaders may take input blocks; the instance name is the
    // parameter name.
    assert_contains(&translation.glsl, "in _IVsOut");
    assert_contains(&translation.glsl, "inp;");
    // SV_Position reads substitute gl_FragCoord with the subscript kept.
    assert_contains(&translation.glsl, "gl_FragCoord.xy");
    assert_contains(&translation.glsl, "inp.uv");
}

#[test]
fn inherited_members_are_emitted_base_first() {
    let mut b = ProgramBuilder::new();
    let (base_struct, _) = b.struct_decl(
        "BaseOut",
        &[("color", base(DataType::Float4), Some("COLOR0"))],
    );
    let (derived, _) = b.struct_decl_with_base(
        "DerivedOut",
        Some(base_struct),
        &[("uv", base(DataType::Float2), Some("TEXCOORD0"))],
    );
    let coord = b.var("coord", base(DataType::Float3), Some("COORD"));
    let (local_stmt, local) = b.local_var("o", TypeDenoter::Struct(derived), None);
    b.entry_point(
        "VS",
        TypeDenoter::Struct(derived),
        None,
        vec![coord],
        block(vec![local_stmt, ret(Some(var_expr("o", local)))]),
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Vertex,
        "VS",
        OutputVersion::Glsl150,
    );

    // Base members precede derived members in every emitted form.
    let color_pos = translation.glsl.find("vec4 color;").expect("base member");
    let uv_pos = translation.glsl.find("vec2 uv;").expect("derived member");
    assert!(color_pos < uv_pos);
    assert_contains(&translation.glsl, "outDerivedOut.color = shx_output.color;");
    assert_contains(&translation.glsl, "outDerivedOut.uv = shx_output.uv;");
}
