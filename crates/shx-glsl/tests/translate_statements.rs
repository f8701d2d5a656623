//! Statement emission shapes: `for` headers, `if`/`else` cascades,
//! `switch`/`case` and control transfer.

mod common;

use common::{assert_contains, base, translate_ok};
use shx_ast::ast::{
    BinaryOp, CtrlTransfer, Expr, ExprKind, Stmt, StmtKind, SwitchCase, UnaryOp,
};
use shx_ast::builder::*;
use shx_ast::{DataType, ShaderTarget, SourceArea};
use shx_glsl::OutputVersion;

fn post_inc(expr: Expr) -> Expr {
    Expr::new(
        ExprKind::PostUnary {
            expr: Box::new(expr),
            op: UnaryOp::Inc,
        },
        SourceArea::default(),
    )
}

#[test]
fn for_loop_header_keeps_single_line_shape() {
    let mut b = ProgramBuilder::new();
    let x = b.var("x", base(DataType::Float), Some("TEXCOORD0"));
    let (init_stmt, i) = b.local_var("i", base(DataType::Int), Some(lit_int(0)));
    let body = Stmt::new(
        StmtKind::Expr(assign_expr("x", x, binary(var_expr("x", x), BinaryOp::Add, lit_float("1.0")))),
        SourceArea::default(),
    );
    let for_stmt = Stmt::new(
        StmtKind::For {
            init: Box::new(init_stmt),
            condition: Some(binary(var_expr("i", i), BinaryOp::Less, lit_int(4))),
            iteration: Some(post_inc(var_expr("i", i))),
            body: Box::new(body),
        },
        SourceArea::default(),
    );
    b.entry_point(
        "PS",
        base(DataType::Float4),
        Some("SV_Target"),
        vec![x],
        block(vec![
            for_stmt,
            ret(Some(constructor(DataType::Float4, vec![var_expr("x", x)]))),
        ]),
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Fragment,
        "PS",
        OutputVersion::Glsl130,
    );
    assert_contains(&translation.glsl, "for (int i = 0; i < 4; i++)");
    assert_contains(&translation.glsl, "x = x + 1.0;");
}

#[test]
fn else_if_cascades_stay_on_one_line() {
    let mut b = ProgramBuilder::new();
    let x = b.var("x", base(DataType::Float), Some("TEXCOORD0"));
    let else_if = Stmt::new(
        StmtKind::If {
            condition: binary(var_expr("x", x), BinaryOp::Less, lit_float("0.5")),
            body: Box::new(Stmt::new(
                StmtKind::CtrlTransfer(CtrlTransfer::Discard),
                SourceArea::default(),
            )),
            else_branch: Some(Box::new(Stmt::new(
                StmtKind::Expr(assign_expr("x", x, lit_float("1.0"))),
                SourceArea::default(),
            ))),
        },
        SourceArea::default(),
    );
    let if_stmt = Stmt::new(
        StmtKind::If {
            condition: binary(var_expr("x", x), BinaryOp::Less, lit_float("0.0")),
            body: Box::new(Stmt::new(
                StmtKind::CtrlTransfer(CtrlTransfer::Discard),
                SourceArea::default(),
            )),
            else_branch: Some(Box::new(else_if)),
        },
        SourceArea::default(),
    );
    b.entry_point(
        "PS",
        base(DataType::Float4),
        Some("SV_Target"),
        vec![x],
        block(vec![
            if_stmt,
            ret(Some(constructor(DataType::Float4, vec![var_expr("x", x)]))),
        ]),
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Fragment,
        "PS",
        OutputVersion::Glsl130,
    );
    assert_contains(&translation.glsl, "if (x < 0.0)");
    assert_contains(&translation.glsl, "else if (x < 0.5)");
    assert_contains(&translation.glsl, "discard;");
}

#[test]
fn switch_cases_are_indented_inside_the_scope() {
    let mut b = ProgramBuilder::new();
    let sel = b.var("sel", base(DataType::Int), Some("TEXCOORD0"));
    let x = b.var("x", base(DataType::Float), Some("TEXCOORD1"));
    let switch_stmt = Stmt::new(
        StmtKind::Switch {
            selector: var_expr("sel", sel),
            cases: vec![
                SwitchCase {
                    expr: Some(lit_int(0)),
                    stmts: vec![Stmt::new(
                        StmtKind::CtrlTransfer(CtrlTransfer::Break),
                        SourceArea::default(),
                    )],
                    area: SourceArea::default(),
                },
                SwitchCase {
                    expr: None,
                    stmts: vec![Stmt::new(
                        StmtKind::CtrlTransfer(CtrlTransfer::Break),
                        SourceArea::default(),
                    )],
                    area: SourceArea::default(),
                },
            ],
        },
        SourceArea::default(),
    );
    b.entry_point(
        "PS",
        base(DataType::Float4),
        Some("SV_Target"),
        vec![sel, x],
        block(vec![
            switch_stmt,
            ret(Some(constructor(DataType::Float4, vec![var_expr("x", x)]))),
        ]),
    );
    let mut program = b.finish();
    let translation = translate_ok(
        &mut program,
        ShaderTarget::Fragment,
        "PS",
        OutputVersion::Glsl130,
    );
    assert_contains(&translation.glsl, "switch (sel)");
    assert_contains(&translation.glsl, "case 0:");
    assert_contains(&translation.glsl, "default:");
    assert_contains(&translation.glsl, "break;");
}
