//! Reference analyzer: marks the subset of the AST reachable from the entry
//! point and records every intrinsic usage it encounters.
//!
//! The traversal is a worklist walk over declaration handles with a visited
//! set, so cycles formed by back-references (struct bases, forward
//! declarations, parent buffers) cannot cause reentry. Only `REACHABLE`
//! flags and `Program::used_intrinsics` are mutated.

use std::collections::HashSet;

use tracing::debug;

use shx_ast::ast::{
    AliasDecl, BufferDecl, Expr, ExprKind, FunctionDecl, NodeFlags, SamplerDecl, Stmt, StmtKind,
    StructDecl, SymbolRef, UniformBufferDecl, VarDecl, VarIdent,
};
use shx_ast::ty::TypeDenoter;
use shx_ast::{DataType, Error, Handle, Intrinsic, Program};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DeclKey {
    Var(Handle<VarDecl>),
    Buffer(Handle<BufferDecl>),
    Sampler(Handle<SamplerDecl>),
    Struct(Handle<StructDecl>),
    Alias(Handle<AliasDecl>),
    Function(Handle<FunctionDecl>),
    UniformBuffer(Handle<UniformBufferDecl>),
}

#[derive(Debug, Default)]
struct Refs {
    keys: Vec<DeclKey>,
    usages: Vec<(Intrinsic, Vec<DataType>)>,
}

/// Marks every declaration transitively referenced by the entry point.
pub fn analyze(program: &mut Program) -> Result<(), Error> {
    let entry = program
        .entry_point
        .ok_or_else(|| Error::missing_reference("entry point not found"))?;

    let mut visited: HashSet<DeclKey> = HashSet::new();
    let mut pending = vec![DeclKey::Function(entry)];
    // Secondary entry points (e.g. patch-constant functions) are roots too.
    pending.extend(
        program
            .functions
            .iter()
            .filter(|(_, func)| {
                func.fn_flags
                    .contains(shx_ast::ast::FunctionFlags::SECONDARY_ENTRY_POINT)
            })
            .map(|(handle, _)| DeclKey::Function(handle)),
    );
    if let Some(patch_fn) = program.layout_tess_control.patch_const_function {
        pending.push(DeclKey::Function(patch_fn));
    }

    while let Some(key) = pending.pop() {
        if !visited.insert(key) {
            continue;
        }
        mark(program, key);

        let mut refs = Refs::default();
        collect(program, key, &mut refs)?;
        for (intrinsic, arg_types) in refs.usages {
            program.register_intrinsic_usage(intrinsic, arg_types);
        }
        pending.extend(refs.keys);
    }

    debug!(
        reachable = visited.len(),
        intrinsics = program.used_intrinsics.len(),
        "reference analysis finished"
    );
    Ok(())
}

fn mark(program: &mut Program, key: DeclKey) {
    let flags = match key {
        DeclKey::Var(h) => &mut program.var_decls[h].flags,
        DeclKey::Buffer(h) => &mut program.buffer_decls[h].flags,
        DeclKey::Sampler(h) => &mut program.sampler_decls[h].flags,
        DeclKey::Struct(h) => &mut program.struct_decls[h].flags,
        DeclKey::Alias(h) => &mut program.alias_decls[h].flags,
        DeclKey::Function(h) => &mut program.functions[h].flags,
        DeclKey::UniformBuffer(h) => &mut program.uniform_buffers[h].flags,
    };
    *flags |= NodeFlags::REACHABLE;
}

fn collect(program: &Program, key: DeclKey, refs: &mut Refs) -> Result<(), Error> {
    match key {
        DeclKey::Function(h) => {
            let func = &program.functions[h];
            type_refs(&func.return_type.denoter, refs);
            refs.keys
                .extend(func.parameters.iter().map(|&p| DeclKey::Var(p)));
            // Forwards reach their implementation and vice versa.
            refs.keys
                .extend(func.forward_decls.iter().map(|&f| DeclKey::Function(f)));
            if let Some(implementation) = func.impl_decl {
                refs.keys.push(DeclKey::Function(implementation));
            }
            // A member function pulls in its containing structure.
            if let Some(owner) = func.struct_decl {
                refs.keys.push(DeclKey::Struct(owner));
            }
            for attrib in &func.attribs {
                for arg in &attrib.args {
                    walk_expr(program, arg, refs)?;
                }
            }
            if let Some(body) = &func.body {
                for stmt in &body.stmts {
                    walk_stmt(program, stmt, refs)?;
                }
            }
        }
        DeclKey::Var(h) => {
            let var = &program.var_decls[h];
            type_refs(&var.type_spec.denoter, refs);
            if let Some(init) = &var.initializer {
                walk_expr(program, init, refs)?;
            }
            // Referencing one member keeps its whole constant buffer alive.
            if let Some(buffer) = var.uniform_buffer {
                refs.keys.push(DeclKey::UniformBuffer(buffer));
            }
        }
        DeclKey::Struct(h) => {
            let decl = &program.struct_decls[h];
            if let Some(base) = decl.base_struct {
                refs.keys.push(DeclKey::Struct(base));
            }
            // Referencing a structure marks all of its members.
            refs.keys.extend(decl.members.iter().map(|&m| DeclKey::Var(m)));
        }
        DeclKey::Alias(h) => type_refs(&program.alias_decls[h].denoter, refs),
        DeclKey::UniformBuffer(h) => {
            refs.keys.extend(
                program.uniform_buffers[h]
                    .members
                    .iter()
                    .map(|&m| DeclKey::Var(m)),
            );
        }
        DeclKey::Buffer(h) => {
            if let Some(elem) = &program.buffer_decls[h].elem {
                type_refs(elem, refs);
            }
        }
        DeclKey::Sampler(_) => {}
    }
    Ok(())
}

fn type_refs(ty: &TypeDenoter, refs: &mut Refs) {
    match ty {
        TypeDenoter::Struct(h) => refs.keys.push(DeclKey::Struct(*h)),
        TypeDenoter::Alias(h) => refs.keys.push(DeclKey::Alias(*h)),
        TypeDenoter::Texture { decl: Some(h), .. } => refs.keys.push(DeclKey::Buffer(*h)),
        TypeDenoter::Array { base, .. } => type_refs(base, refs),
        TypeDenoter::Buffer {
            elem: Some(elem), ..
        } => type_refs(elem, refs),
        _ => {}
    }
}

fn walk_stmt(program: &Program, stmt: &Stmt, refs: &mut Refs) -> Result<(), Error> {
    for attrib in &stmt.attribs {
        for arg in &attrib.args {
            walk_expr(program, arg, refs)?;
        }
    }
    match &stmt.kind {
        StmtKind::Null | StmtKind::CtrlTransfer(_) => {}
        StmtKind::Block(block) => {
            for stmt in &block.stmts {
                walk_stmt(program, stmt, refs)?;
            }
        }
        StmtKind::VarDecl(decl_stmt) => {
            refs.keys
                .extend(decl_stmt.vars.iter().map(|&v| DeclKey::Var(v)));
        }
        StmtKind::BufferDecls(decl_stmt) => {
            refs.keys
                .extend(decl_stmt.decls.iter().map(|&d| DeclKey::Buffer(d)));
        }
        StmtKind::SamplerDecls(decl_stmt) => {
            refs.keys
                .extend(decl_stmt.decls.iter().map(|&d| DeclKey::Sampler(d)));
        }
        StmtKind::Struct(h) => refs.keys.push(DeclKey::Struct(*h)),
        StmtKind::Alias(handles) => {
            refs.keys.extend(handles.iter().map(|&h| DeclKey::Alias(h)));
        }
        StmtKind::Function(h) => refs.keys.push(DeclKey::Function(*h)),
        StmtKind::UniformBuffer(h) => refs.keys.push(DeclKey::UniformBuffer(*h)),
        StmtKind::For {
            init,
            condition,
            iteration,
            body,
        } => {
            walk_stmt(program, init, refs)?;
            if let Some(condition) = condition {
                walk_expr(program, condition, refs)?;
            }
            if let Some(iteration) = iteration {
                walk_expr(program, iteration, refs)?;
            }
            walk_stmt(program, body, refs)?;
        }
        StmtKind::While { condition, body } => {
            walk_expr(program, condition, refs)?;
            walk_stmt(program, body, refs)?;
        }
        StmtKind::DoWhile { body, condition } => {
            walk_stmt(program, body, refs)?;
            walk_expr(program, condition, refs)?;
        }
        StmtKind::If {
            condition,
            body,
            else_branch,
        } => {
            walk_expr(program, condition, refs)?;
            walk_stmt(program, body, refs)?;
            if let Some(else_branch) = else_branch {
                walk_stmt(program, else_branch, refs)?;
            }
        }
        StmtKind::Switch { selector, cases } => {
            walk_expr(program, selector, refs)?;
            for case in cases {
                if let Some(expr) = &case.expr {
                    walk_expr(program, expr, refs)?;
                }
                for stmt in &case.stmts {
                    walk_stmt(program, stmt, refs)?;
                }
            }
        }
        StmtKind::Expr(expr) => walk_expr(program, expr, refs)?,
        StmtKind::Return { expr } => {
            if let Some(expr) = expr {
                walk_expr(program, expr, refs)?;
            }
        }
    }
    Ok(())
}

fn walk_var_ident(program: &Program, ident: &VarIdent, refs: &mut Refs) -> Result<(), Error> {
    if let Some(symbol) = ident.symbol {
        refs.keys.push(match symbol {
            SymbolRef::Var(h) => DeclKey::Var(h),
            SymbolRef::Buffer(h) => DeclKey::Buffer(h),
            SymbolRef::Sampler(h) => DeclKey::Sampler(h),
            SymbolRef::Struct(h) => DeclKey::Struct(h),
            SymbolRef::Function(h) => DeclKey::Function(h),
        });
    }
    let mut link = Some(ident);
    while let Some(current) = link {
        for index in &current.array_indices {
            walk_expr(program, index, refs)?;
        }
        link = current.next.as_deref();
    }
    Ok(())
}

fn walk_expr(program: &Program, expr: &Expr, refs: &mut Refs) -> Result<(), Error> {
    match &expr.kind {
        ExprKind::Null | ExprKind::Literal { .. } => {}
        ExprKind::Ternary {
            cond,
            then_expr,
            else_expr,
        } => {
            walk_expr(program, cond, refs)?;
            walk_expr(program, then_expr, refs)?;
            walk_expr(program, else_expr, refs)?;
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            walk_expr(program, lhs, refs)?;
            walk_expr(program, rhs, refs)?;
        }
        ExprKind::Unary { expr, .. } | ExprKind::PostUnary { expr, .. } => {
            walk_expr(program, expr, refs)?;
        }
        ExprKind::Bracket(inner) => walk_expr(program, inner, refs)?,
        ExprKind::Suffix { expr, ident } => {
            walk_expr(program, expr, refs)?;
            walk_var_ident(program, ident, refs)?;
        }
        ExprKind::ArrayAccess { expr, indices } => {
            walk_expr(program, expr, refs)?;
            for index in indices {
                walk_expr(program, index, refs)?;
            }
        }
        ExprKind::Cast { to, expr } => {
            type_refs(to, refs);
            walk_expr(program, expr, refs)?;
        }
        ExprKind::InitializerList(exprs) => {
            for expr in exprs {
                walk_expr(program, expr, refs)?;
            }
        }
        ExprKind::Var(access) => {
            walk_var_ident(program, &access.ident, refs)?;
            if let Some(assign) = &access.assign_expr {
                walk_expr(program, assign, refs)?;
            }
        }
        ExprKind::Call(call) => {
            if let Some(name) = &call.name {
                walk_var_ident(program, name, refs)?;
            }
            if let Some(constructor) = &call.constructor {
                type_refs(constructor, refs);
            }
            if let Some(func) = call.func {
                refs.keys.push(DeclKey::Function(func));
            }
            for arg in &call.args {
                walk_expr(program, arg, refs)?;
            }
            if let Some(intrinsic) = call.intrinsic {
                refs.usages
                    .push((intrinsic, intrinsic_arg_types(program, call.args.iter())?));
            }
        }
    }
    Ok(())
}

/// The argument base types observed at one intrinsic call site; non-base
/// argument types (textures, structs) are skipped.
fn intrinsic_arg_types<'a>(
    program: &Program,
    args: impl Iterator<Item = &'a Expr>,
) -> Result<Vec<DataType>, Error> {
    let mut types = Vec::new();
    for arg in args {
        let ty = program.resolved_type(&program.expr_type(arg)?)?;
        if let Some(dt) = ty.as_base() {
            types.push(dt);
        }
    }
    Ok(types)
}
