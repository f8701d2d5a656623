//! HLSL→GLSL AST conversion.
//!
//! An ordered sequence of idempotent passes over the analyzed program:
//! entry-point I/O promotion, stage layout capture, intrinsic validation and
//! disabling of constructs with no GLSL equivalent. The expression-level
//! rewrites (`mul`, `rcp`, atomics, texture methods, system-value
//! substitution) are routed at emission time by the generator, which keeps
//! re-running the converter from changing the emitted text.

use tracing::debug;

use shx_ast::ast::{
    Attribute, AttributeKind, AttributeValue, Expr, ExprKind, FunctionDecl, FunctionFlags,
    NodeFlags, ShaderTarget, Stmt, StmtKind, StructDecl, StructFlags, SymbolRef, VarDecl,
    VarFlags,
};
use shx_ast::ty::TypeDenoter;
use shx_ast::{Error, ErrorKind, Handle, Program, Report, Semantic};

use crate::keywords::intrinsic_arity;

/// Runs all conversion passes; returns non-fatal warnings.
pub fn convert(program: &mut Program, target: ShaderTarget) -> Result<Vec<Report>, Error> {
    let mut warnings = Vec::new();
    promote_entry_point_io(program, target, &mut warnings)?;
    capture_stage_layout(program, target, &mut warnings)?;
    validate_intrinsics(program)?;
    disable_unsupported(program, &mut warnings);
    debug!(warnings = warnings.len(), "conversion finished");
    Ok(warnings)
}

/// Interface-block restriction policy: vertex shaders cannot take `in`
/// blocks, fragment shaders cannot produce `out` blocks, and compute
/// shaders take neither, so such structures are flattened into globals.
pub fn must_resolve_struct(target: ShaderTarget, decl: &StructDecl) -> bool {
    match target {
        ShaderTarget::Vertex => decl.struct_flags.contains(StructFlags::SHADER_INPUT),
        ShaderTarget::Fragment => decl.struct_flags.contains(StructFlags::SHADER_OUTPUT),
        ShaderTarget::Compute => decl.is_shader_io(),
        _ => false,
    }
}

fn promote_entry_point_io(
    program: &mut Program,
    target: ShaderTarget,
    warnings: &mut Vec<Report>,
) -> Result<(), Error> {
    let entry = program
        .entry_point
        .ok_or_else(|| Error::missing_reference("entry point not found"))?;

    let params = program.functions[entry].parameters.clone();
    program.entry_io.inputs = params.clone();

    let mut flattened = Vec::new();
    for param in params {
        let denoter = program.var_decls[param].type_spec.denoter.clone();
        match program.resolved_type(&denoter)? {
            TypeDenoter::Struct(s) => {
                let param_ident = program.var_decls[param].ident.clone();
                let decl = &mut program.struct_decls[s];
                decl.struct_flags |= StructFlags::SHADER_INPUT;
                if decl.alias_name.is_empty() {
                    // The block instance name is the parameter name, so
                    // member accesses stay valid without rewriting.
                    decl.alias_name = param_ident;
                }
                mark_io_members(program, s, VarFlags::SHADER_INPUT);
                if must_resolve_struct(target, &program.struct_decls[s]) {
                    flattened.push((param, s));
                }
            }
            TypeDenoter::Buffer { buffer_type, .. } if buffer_type.is_stream() => {
                // A geometry stream-output parameter fixes the output
                // primitive.
                program.layout_geometry.output_primitive = Some(buffer_type);
            }
            _ => {
                let var = &mut program.var_decls[param];
                var.var_flags |= VarFlags::SHADER_INPUT;
                if var.has_system_value_semantic() {
                    var.var_flags |= VarFlags::SYSTEM_VALUE;
                }
            }
        }
    }

    let (return_denoter, semantic) = {
        let func = &program.functions[entry];
        (func.return_type.denoter.clone(), func.semantic.clone())
    };
    match program.resolved_type(&return_denoter)? {
        TypeDenoter::Struct(s) => {
            program.entry_io.output_struct = Some(s);
            let decl = &mut program.struct_decls[s];
            decl.struct_flags |= StructFlags::SHADER_OUTPUT;
            if decl.alias_name.is_empty() {
                decl.alias_name = format!("out{}", decl.ident);
            }
            mark_io_members(program, s, VarFlags::SHADER_OUTPUT);
        }
        TypeDenoter::Void => {}
        _ => {
            program.entry_io.return_semantic = semantic;
        }
    }

    if !flattened.is_empty() {
        rewrite_flattened_params(program, entry, &flattened, warnings);
    }
    Ok(())
}

fn mark_io_members(program: &mut Program, s: Handle<StructDecl>, direction: VarFlags) {
    for member in program.struct_members_base_first(s) {
        let var = &mut program.var_decls[member];
        var.var_flags |= direction;
        if var.has_system_value_semantic() {
            var.var_flags |= VarFlags::SYSTEM_VALUE;
        }
    }
}

/// Rewrites `param.member...` accesses of flattened I/O structures to start
/// at the member itself, which the generator emits as a global.
fn rewrite_flattened_params(
    program: &mut Program,
    entry: Handle<FunctionDecl>,
    flattened: &[(Handle<VarDecl>, Handle<StructDecl>)],
    warnings: &mut Vec<Report>,
) {
    let mut body = program.functions[entry].body.take();
    if let Some(block) = &mut body {
        for stmt in &mut block.stmts {
            rewrite_stmt(program, stmt, flattened, warnings);
        }
    }
    program.functions[entry].body = body;

    // Local declarations keep their initializers in the arena; rewrite those
    // too.
    let handles: Vec<_> = program.var_decls.handles().collect();
    for handle in handles {
        let mut initializer = program.var_decls[handle].initializer.take();
        if let Some(init) = &mut initializer {
            rewrite_expr(program, init, flattened, warnings);
        }
        program.var_decls[handle].initializer = initializer;
    }
}

fn rewrite_stmt(
    program: &Program,
    stmt: &mut Stmt,
    flattened: &[(Handle<VarDecl>, Handle<StructDecl>)],
    warnings: &mut Vec<Report>,
) {
    match &mut stmt.kind {
        StmtKind::Block(block) => {
            for stmt in &mut block.stmts {
                rewrite_stmt(program, stmt, flattened, warnings);
            }
        }
        StmtKind::For {
            init,
            condition,
            iteration,
            body,
        } => {
            rewrite_stmt(program, init, flattened, warnings);
            if let Some(condition) = condition {
                rewrite_expr(program, condition, flattened, warnings);
            }
            if let Some(iteration) = iteration {
                rewrite_expr(program, iteration, flattened, warnings);
            }
            rewrite_stmt(program, body, flattened, warnings);
        }
        StmtKind::While { condition, body } => {
            rewrite_expr(program, condition, flattened, warnings);
            rewrite_stmt(program, body, flattened, warnings);
        }
        StmtKind::DoWhile { body, condition } => {
            rewrite_stmt(program, body, flattened, warnings);
            rewrite_expr(program, condition, flattened, warnings);
        }
        StmtKind::If {
            condition,
            body,
            else_branch,
        } => {
            rewrite_expr(program, condition, flattened, warnings);
            rewrite_stmt(program, body, flattened, warnings);
            if let Some(else_branch) = else_branch {
                rewrite_stmt(program, else_branch, flattened, warnings);
            }
        }
        StmtKind::Switch { selector, cases } => {
            rewrite_expr(program, selector, flattened, warnings);
            for case in cases {
                if let Some(expr) = &mut case.expr {
                    rewrite_expr(program, expr, flattened, warnings);
                }
                for stmt in &mut case.stmts {
                    rewrite_stmt(program, stmt, flattened, warnings);
                }
            }
        }
        StmtKind::Expr(expr) => rewrite_expr(program, expr, flattened, warnings),
        StmtKind::Return { expr: Some(expr) } => rewrite_expr(program, expr, flattened, warnings),
        _ => {}
    }
}

fn rewrite_expr(
    program: &Program,
    expr: &mut Expr,
    flattened: &[(Handle<VarDecl>, Handle<StructDecl>)],
    warnings: &mut Vec<Report>,
) {
    let mut rewritten = false;
    match &mut expr.kind {
        ExprKind::Var(access) => {
            let ident = &mut access.ident;
            if let Some(SymbolRef::Var(root)) = ident.symbol {
                if let Some(&(_, s)) = flattened.iter().find(|(param, _)| *param == root) {
                    match ident.next.as_deref() {
                        Some(next) => {
                            let member = program.struct_member(s, &next.ident);
                            ident.pop_front();
                            ident.symbol = member.map(SymbolRef::Var);
                            rewritten = true;
                        }
                        None => warnings.push(Report::warning(
                            format!(
                                "flattened entry-point parameter '{}' is used as a whole",
                                ident.ident
                            ),
                            Some(ident.area),
                        )),
                    }
                }
            }
            for index in chain_indices_mut(ident) {
                rewrite_expr(program, index, flattened, warnings);
            }
            if let Some(assign) = &mut access.assign_expr {
                rewrite_expr(program, assign, flattened, warnings);
            }
        }
        ExprKind::Ternary {
            cond,
            then_expr,
            else_expr,
        } => {
            rewrite_expr(program, cond, flattened, warnings);
            rewrite_expr(program, then_expr, flattened, warnings);
            rewrite_expr(program, else_expr, flattened, warnings);
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            rewrite_expr(program, lhs, flattened, warnings);
            rewrite_expr(program, rhs, flattened, warnings);
        }
        ExprKind::Unary { expr, .. } | ExprKind::PostUnary { expr, .. } => {
            rewrite_expr(program, expr, flattened, warnings);
        }
        ExprKind::Bracket(inner) => rewrite_expr(program, inner, flattened, warnings),
        ExprKind::Suffix { expr, .. } => rewrite_expr(program, expr, flattened, warnings),
        ExprKind::ArrayAccess { expr, indices } => {
            rewrite_expr(program, expr, flattened, warnings);
            for index in indices {
                rewrite_expr(program, index, flattened, warnings);
            }
        }
        ExprKind::Cast { expr, .. } => rewrite_expr(program, expr, flattened, warnings),
        ExprKind::InitializerList(exprs) => {
            for expr in exprs {
                rewrite_expr(program, expr, flattened, warnings);
            }
        }
        ExprKind::Call(call) => {
            for arg in &mut call.args {
                rewrite_expr(program, arg, flattened, warnings);
            }
        }
        ExprKind::Null | ExprKind::Literal { .. } => {}
    }
    if rewritten {
        expr.ty.reset();
    }
}

fn chain_indices_mut(ident: &mut shx_ast::ast::VarIdent) -> impl Iterator<Item = &mut Expr> {
    // Collect mutable references link by link; chains are short.
    let mut indices = Vec::new();
    let mut link = Some(ident);
    while let Some(current) = link {
        indices.extend(current.array_indices.iter_mut());
        link = current.next.as_deref_mut();
    }
    indices.into_iter()
}

fn capture_stage_layout(
    program: &mut Program,
    target: ShaderTarget,
    warnings: &mut Vec<Report>,
) -> Result<(), Error> {
    let entry = program
        .entry_point
        .ok_or_else(|| Error::missing_reference("entry point not found"))?;

    // HLSL puts the tessellation attributes on the hull-shader entry, so
    // the secondary entry point's attributes count as well.
    let mut attribs = program.functions[entry].attribs.clone();
    for (handle, func) in program.functions.iter() {
        if handle != entry
            && func
                .fn_flags
                .contains(FunctionFlags::SECONDARY_ENTRY_POINT)
        {
            attribs.extend(func.attribs.iter().cloned());
        }
    }

    for attrib in &attribs {
        match attrib.kind {
            AttributeKind::NumThreads => {
                if attrib.args.len() != 3 {
                    return Err(Error::at(
                        ErrorKind::InvalidNumArgs {
                            intrinsic: "numthreads",
                            got: attrib.args.len(),
                            min: 3,
                            max: 3,
                        },
                        attrib.area,
                    ));
                }
                let mut threads = [0u32; 3];
                for (slot, arg) in threads.iter_mut().zip(&attrib.args) {
                    *slot = eval_int(arg).ok_or_else(|| {
                        Error::invalid_argument(
                            "'numthreads' arguments must be integer literals",
                        )
                        .with_area(arg.area)
                    })?;
                }
                program.layout_compute.num_threads = threads;
            }
            AttributeKind::EarlyDepthStencil => {
                program.layout_fragment.early_depth_stencil = true;
            }
            AttributeKind::MaxVertexCount => {
                if let Some(count) = attrib.args.first().and_then(eval_int) {
                    program.layout_geometry.max_vertices = count;
                }
            }
            AttributeKind::Domain => {
                if let Some(value) = attribute_value(attrib, AttributeValue::domain, warnings) {
                    program.layout_tess_evaluation.domain = Some(value);
                }
            }
            AttributeKind::Partitioning => {
                if let Some(value) =
                    attribute_value(attrib, AttributeValue::partitioning, warnings)
                {
                    program.layout_tess_evaluation.partitioning = Some(value);
                }
            }
            AttributeKind::OutputTopology => {
                if let Some(value) =
                    attribute_value(attrib, AttributeValue::output_topology, warnings)
                {
                    program.layout_tess_evaluation.output_topology = Some(value);
                }
            }
            AttributeKind::OutputControlPoints => {
                if let Some(points) = attrib.args.first().and_then(eval_int) {
                    program.layout_tess_control.output_control_points = points;
                }
            }
            AttributeKind::MaxTessFactor => {
                // No GLSL counterpart; kept as program metadata.
                if let Some(factor) = attrib.args.first().and_then(eval_float) {
                    program.layout_tess_control.max_tess_factor = factor;
                }
            }
            // Resolved before reference analysis; see the entry-point
            // resolution in the crate root.
            AttributeKind::PatchConstantFunc => {}
            _ => {}
        }
    }

    // A fragment-stage SV_Position input reads gl_FragCoord.
    if target == ShaderTarget::Fragment {
        for &param in &program.entry_io.inputs.clone() {
            if entry_input_uses_position(program, param)? {
                program.layout_fragment.frag_coord_used = true;
            }
        }
    }
    Ok(())
}

fn entry_input_uses_position(program: &Program, param: Handle<VarDecl>) -> Result<bool, Error> {
    let var = &program.var_decls[param];
    if matches!(
        var.semantic.as_ref().map(|s| &s.semantic),
        Some(Semantic::Position)
    ) {
        return Ok(true);
    }
    if let TypeDenoter::Struct(s) = program.resolved_type(&var.type_spec.denoter)? {
        for member in program.struct_members_base_first(s) {
            if matches!(
                program.var_decls[member].semantic.as_ref().map(|s| &s.semantic),
                Some(Semantic::Position)
            ) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn eval_int(expr: &Expr) -> Option<u32> {
    match &expr.kind {
        ExprKind::Literal { value, .. } => value.trim_end_matches(['u', 'U']).parse().ok(),
        ExprKind::Bracket(inner) => eval_int(inner),
        _ => None,
    }
}

fn eval_float(expr: &Expr) -> Option<f32> {
    match &expr.kind {
        ExprKind::Literal { value, .. } => value.trim_end_matches(['f', 'F']).parse().ok(),
        ExprKind::Bracket(inner) => eval_float(inner),
        _ => None,
    }
}

/// The string payload of an attribute argument (`[domain("tri")]` → `tri`).
pub(crate) fn attribute_string(expr: &Expr) -> Option<&str> {
    match &expr.kind {
        ExprKind::Literal { value, .. } => Some(value.trim_matches('"')),
        ExprKind::Bracket(inner) => attribute_string(inner),
        _ => None,
    }
}

fn attribute_value(
    attrib: &Attribute,
    parse: fn(&str) -> Option<AttributeValue>,
    warnings: &mut Vec<Report>,
) -> Option<AttributeValue> {
    let value = attrib.args.first().and_then(attribute_string)?;
    let parsed = parse(value);
    if parsed.is_none() {
        warnings.push(Report::warning(
            format!("unknown attribute value '{value}'"),
            attrib.area.is_valid().then_some(attrib.area),
        ));
    }
    parsed
}

/// Checks the arity of every reachable intrinsic call site.
fn validate_intrinsics(program: &Program) -> Result<(), Error> {
    for (_, func) in program.functions.iter() {
        if !func.flags.contains(NodeFlags::REACHABLE) {
            continue;
        }
        if let Some(body) = &func.body {
            for stmt in &body.stmts {
                validate_stmt(stmt)?;
            }
        }
    }
    Ok(())
}

fn validate_stmt(stmt: &Stmt) -> Result<(), Error> {
    match &stmt.kind {
        StmtKind::Block(block) => {
            for stmt in &block.stmts {
                validate_stmt(stmt)?;
            }
        }
        StmtKind::For {
            init,
            condition,
            iteration,
            body,
        } => {
            validate_stmt(init)?;
            if let Some(condition) = condition {
                validate_expr(condition)?;
            }
            if let Some(iteration) = iteration {
                validate_expr(iteration)?;
            }
            validate_stmt(body)?;
        }
        StmtKind::While { condition, body } => {
            validate_expr(condition)?;
            validate_stmt(body)?;
        }
        StmtKind::DoWhile { body, condition } => {
            validate_stmt(body)?;
            validate_expr(condition)?;
        }
        StmtKind::If {
            condition,
            body,
            else_branch,
        } => {
            validate_expr(condition)?;
            validate_stmt(body)?;
            if let Some(else_branch) = else_branch {
                validate_stmt(else_branch)?;
            }
        }
        StmtKind::Switch { selector, cases } => {
            validate_expr(selector)?;
            for case in cases {
                if let Some(expr) = &case.expr {
                    validate_expr(expr)?;
                }
                for stmt in &case.stmts {
                    validate_stmt(stmt)?;
                }
            }
        }
        StmtKind::Expr(expr) => validate_expr(expr)?,
        StmtKind::Return { expr: Some(expr) } => validate_expr(expr)?,
        _ => {}
    }
    Ok(())
}

fn validate_expr(expr: &Expr) -> Result<(), Error> {
    match &expr.kind {
        ExprKind::Ternary {
            cond,
            then_expr,
            else_expr,
        } => {
            validate_expr(cond)?;
            validate_expr(then_expr)?;
            validate_expr(else_expr)?;
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            validate_expr(lhs)?;
            validate_expr(rhs)?;
        }
        ExprKind::Unary { expr, .. }
        | ExprKind::PostUnary { expr, .. }
        | ExprKind::Bracket(expr)
        | ExprKind::Cast { expr, .. }
        | ExprKind::Suffix { expr, .. } => validate_expr(expr)?,
        ExprKind::ArrayAccess { expr, indices } => {
            validate_expr(expr)?;
            for index in indices {
                validate_expr(index)?;
            }
        }
        ExprKind::InitializerList(exprs) => {
            for expr in exprs {
                validate_expr(expr)?;
            }
        }
        ExprKind::Var(access) => {
            if let Some(assign) = &access.assign_expr {
                validate_expr(assign)?;
            }
        }
        ExprKind::Call(call) => {
            if let Some(intrinsic) = call.intrinsic {
                if let Some((min, max)) = intrinsic_arity(intrinsic) {
                    let got = call.args.len();
                    if got < min || got > max {
                        return Err(Error::at(
                            ErrorKind::InvalidNumArgs {
                                intrinsic: intrinsic.hlsl_name(),
                                got,
                                min,
                                max,
                            },
                            expr.area,
                        ));
                    }
                }
            }
            for arg in &call.args {
                validate_expr(arg)?;
            }
        }
        ExprKind::Null | ExprKind::Literal { .. } => {}
    }
    Ok(())
}

/// Flags constructs without a GLSL equivalent so the generator skips them.
fn disable_unsupported(program: &mut Program, warnings: &mut Vec<Report>) {
    let mut disabled_samplers = Vec::new();
    for (handle, sampler) in program.sampler_decls.iter_mut() {
        let mut newly_disabled = false;
        for value in &mut sampler.sampler_values {
            if !value.flags.contains(NodeFlags::DISABLE_CODEGEN) {
                value.flags |= NodeFlags::DISABLE_CODEGEN;
                newly_disabled = true;
            }
        }
        if newly_disabled {
            disabled_samplers.push(handle);
        }
    }
    for handle in disabled_samplers {
        let sampler = &program.sampler_decls[handle];
        if sampler.flags.contains(NodeFlags::REACHABLE) {
            warnings.push(Report::warning(
                format!(
                    "sampler state values of '{}' have no GLSL equivalent",
                    sampler.ident
                ),
                Some(sampler.area),
            ));
        }
    }

    for (_, var) in program.var_decls.iter_mut() {
        for annotation in &mut var.annotations {
            annotation.flags |= NodeFlags::DISABLE_CODEGEN;
        }
    }

    for (_, func) in program.functions.iter_mut() {
        for attrib in &mut func.attribs {
            if matches!(
                attrib.kind,
                AttributeKind::Unroll
                    | AttributeKind::Loop
                    | AttributeKind::Branch
                    | AttributeKind::Flatten
                    | AttributeKind::Unknown(_)
            ) {
                attrib.flags |= NodeFlags::DISABLE_CODEGEN;
            }
        }
    }
}
