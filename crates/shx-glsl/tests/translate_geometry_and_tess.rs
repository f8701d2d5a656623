//! Geometry and tessellation stage layouts: primitive/`max_vertices`
//! qualifiers, `vertices = N`, domain/partitioning/topology, and the
//! patch-constant function.

mod common;

use common::{assert_contains, base, translate_ok};
use shx_ast::ast::{Attribute, AttributeKind, PrimitiveType};
use shx_ast::builder::*;
use shx_ast::{BufferType, DataType, ShaderTarget, TypeDenoter};
use shx_glsl::OutputVersion;

#[test]
fn geometry_layout_emits_primitive_and_max_vertices() {
    let mut b = ProgramBuilder::new();
    let stream = b.var(
        "stream",
        TypeDenoter::Buffer {
            buffer_type: BufferType::TriangleStream,
            elem: None,
        },
        None,
    );
    let entry = b.entry_point(
        "GS",
        TypeDenoter::Void,
        None,
        vec![stream],
        block(vec![ret(None)]),
    );
    b.attribs(
        entry,
        vec![Attribute::new(
            AttributeKind::MaxVertexCount,
            vec![lit_int(6)],
        )],
    );
    let mut program = b.finish();
    // The input primitive comes from the parameter's primitive modifier,
    // which only the front end sees.
    program.layout_geometry.input_primitive = Some(PrimitiveType::Triangle);

    let translation = translate_ok(
        &mut program,
        ShaderTarget::Geometry,
        "GS",
        OutputVersion::Glsl150,
    );
    assert_contains(&translation.glsl, "layout(triangles) in;");
    assert_contains(&translation.glsl, "layout(triangle_strip, max_vertices = 6) out;");
    let layout_pos = translation.glsl.find("max_vertices").unwrap();
    let main_pos = translation.glsl.find("void main()").unwrap();
    assert!(layout_pos < main_pos);
}

#[test]
fn tess_control_emits_vertices_and_keeps_the_patch_function() {
    let mut b = ProgramBuilder::new();
    let patch = b.function(
        "PatchConstants",
        base(DataType::Float),
        None,
        vec![],
        block(vec![ret(Some(lit_float("1.0")))]),
    );
    let entry = b.entry_point(
        "HS",
        TypeDenoter::Void,
        None,
        vec![],
        block(vec![ret(None)]),
    );
    b.attribs(
        entry,
        vec![
            Attribute::new(AttributeKind::OutputControlPoints, vec![lit_int(3)]),
            Attribute::new(
                AttributeKind::PatchConstantFunc,
                vec![lit_str("PatchConstants")],
            ),
            Attribute::new(AttributeKind::MaxTessFactor, vec![lit_float("64.0")]),
        ],
    );
    let mut program = b.finish();

    let translation = translate_ok(
        &mut program,
        ShaderTarget::TessControl,
        "HS",
        OutputVersion::Glsl450,
    );
    assert_contains(&translation.glsl, "layout(vertices = 3) out;");
    // The patch-constant function is reachable through the layout record.
    assert_eq!(program.layout_tess_control.patch_const_function, Some(patch));
    assert_contains(&translation.glsl, "float PatchConstants()");
    assert_eq!(program.layout_tess_control.max_tess_factor, 64.0);
}

#[test]
fn tess_evaluation_emits_domain_spacing_and_winding() {
    let mut b = ProgramBuilder::new();
    let entry = b.entry_point(
        "DS",
        base(DataType::Float4),
        Some("SV_Position"),
        vec![],
        block(vec![ret(Some(constructor(
            DataType::Float4,
            vec![lit_int(0), lit_int(0), lit_int(0), lit_int(1)],
        )))]),
    );
    b.attribs(
        entry,
        vec![
            Attribute::new(AttributeKind::Domain, vec![lit_str("tri")]),
            Attribute::new(AttributeKind::Partitioning, vec![lit_str("fractional_odd")]),
            Attribute::new(AttributeKind::OutputTopology, vec![lit_str("triangle_cw")]),
        ],
    );
    let mut program = b.finish();

    let translation = translate_ok(
        &mut program,
        ShaderTarget::TessEvaluation,
        "DS",
        OutputVersion::Glsl450,
    );
    assert_contains(
        &translation.glsl,
        "layout(triangles, fractional_odd_spacing, cw) in;",
    );
    assert_contains(&translation.glsl, "gl_Position = vec4(0, 0, 0, 1);");
}

#[test]
fn unknown_attribute_values_only_warn() {
    let mut b = ProgramBuilder::new();
    let entry = b.entry_point(
        "DS",
        base(DataType::Float4),
        Some("SV_Position"),
        vec![],
        block(vec![ret(Some(constructor(
            DataType::Float4,
            vec![lit_int(1)],
        )))]),
    );
    b.attribs(
        entry,
        vec![Attribute::new(
            AttributeKind::Domain,
            vec![lit_str("hexagon")],
        )],
    );
    let mut program = b.finish();

    let translation = translate_ok(
        &mut program,
        ShaderTarget::TessEvaluation,
        "DS",
        OutputVersion::Glsl450,
    );
    assert!(!translation.glsl.contains("layout(hexagon"));
    assert!(
        translation
            .warnings
            .iter()
            .any(|w| w.message.contains("hexagon")),
        "expected a warning about the unknown domain"
    );
}
