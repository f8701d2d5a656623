//! GLSL code generator.
//!
//! A read-only visitor over the converted program that emits the translation
//! unit in a fixed order: banner, `#version`, `#extension` directives, stage
//! pre-header, intrinsic helpers, fragment output declarations, entry-point
//! input globals, then the global declarations with the entry point renamed
//! to `main`. The intrinsic rewrites (`mul`, `rcp`, atomics, texture
//! methods) and the system-value identifier substitution happen here, at
//! emission time.

use std::collections::BTreeSet;
use std::time::SystemTime;

use tracing::debug;

use shx_ast::ast::{
    BufferDeclStmt, CodeBlock, Expr, ExprKind, FunctionCall, FunctionDecl, NodeFlags,
    RegisterSlot, SamplerDeclStmt, ShaderTarget, Stmt, StmtKind, StructDecl, StructFlags,
    SwitchCase, SymbolRef, TypeSpecifier, VarAccess, VarDecl, VarDeclStmt, VarFlags, VarIdent,
};
use shx_ast::ty::{RegisterType, TypeDenoter};
use shx_ast::{
    Error, Handle, IndexedSemantic, Intrinsic, Program, Report, Semantic, SourceArea,
};

use crate::convert::must_resolve_struct;
use crate::extension::required_extensions;
use crate::keywords::{
    buffer_type_keyword, data_type_keyword, interp_modifier_keyword, intrinsic_keyword,
    primitive_type_keyword, semantic_keyword, storage_class_keyword, stream_primitive_keyword,
    tess_layout_keyword,
};
use crate::options::{OutputVersion, ShaderInput, ShaderOutput};
use crate::reflection::{BindingSlot, Reflection};
use crate::writer::{iso8601_utc, Writer};

const INTERFACE_BLOCK_PREFIX: &str = "_I";

pub(crate) struct Generated {
    pub glsl: String,
    pub reflection: Option<Reflection>,
    pub warnings: Vec<Report>,
}

pub(crate) fn generate(
    program: &Program,
    input: &ShaderInput,
    output: &ShaderOutput,
) -> Result<Generated, Error> {
    let mut generator = Generator::new(program, input, output);
    generator.write_program()?;
    debug!(stage = %input.target, version = %output.version, "generation finished");
    Ok(Generated {
        glsl: generator.writer.finish(),
        reflection: generator.reflection,
        warnings: generator.warnings,
    })
}

struct Generator<'a> {
    program: &'a Program,
    target: ShaderTarget,
    entry_name: &'a str,
    version: OutputVersion,
    prefix: &'a str,
    comments: bool,
    allow_extensions: bool,
    writer: Writer,
    single_output_variable: Option<String>,
    inside_entry_point: bool,
    reflection: Option<Reflection>,
    warnings: Vec<Report>,
}

impl<'a> Generator<'a> {
    fn new(program: &'a Program, input: &'a ShaderInput, output: &'a ShaderOutput) -> Self {
        Self {
            program,
            target: input.target,
            entry_name: &input.entry_point,
            version: output.version,
            prefix: &output.format.prefix,
            comments: output.format.comments,
            allow_extensions: output.extensions,
            writer: Writer::new(
                &output.format.indent,
                output.format.line_marks,
                output.format.blanks,
            ),
            single_output_variable: None,
            inside_entry_point: false,
            reflection: output.reflect.then(Reflection::default),
            warnings: Vec::new(),
        }
    }

    fn has_version(&self, version: u16) -> bool {
        self.version.feature_level() >= version
    }

    fn comment(&mut self, text: &str) {
        if self.comments {
            self.writer.write_ln(&format!("// {text}"));
        }
    }

    /* ----- Program ----- */

    fn write_program(&mut self) -> Result<(), Error> {
        if self.comments {
            self.comment(&format!("GLSL {} \"{}\"", self.target, self.entry_name));
            self.comment(&format!("Generated by shx {}", env!("CARGO_PKG_VERSION")));
            self.comment(&iso8601_utc(SystemTime::now()));
            self.writer.blank();
        }

        self.writer.write_ln(&self.version.version_line());
        self.writer.blank();

        let extensions = required_extensions(
            self.program,
            self.target,
            self.version,
            self.allow_extensions,
        )?;
        if !extensions.is_empty() {
            for extension in extensions {
                self.writer
                    .write_ln(&format!("#extension {extension} : enable"));
            }
            self.writer.blank();
        }

        self.write_stage_pre_header();
        self.write_clip_helpers();
        self.setup_output_semantics()?;
        self.write_entry_point_inputs()?;

        let stmts = &self.program.global_stmts;
        for stmt in stmts {
            self.write_stmt(stmt)?;
        }
        Ok(())
    }

    fn write_stage_pre_header(&mut self) {
        match self.target {
            ShaderTarget::Fragment => {
                let layout = &self.program.layout_fragment;
                if layout.screen_space_sm3 {
                    self.writer.begin_ln();
                    self.writer.write("layout(origin_upper_left");
                    if layout.pixel_center_integer {
                        self.writer.write(", pixel_center_integer");
                    }
                    self.writer.write(") in vec4 gl_FragCoord;");
                    self.writer.end_ln();
                    self.writer.blank();
                }
                if layout.early_depth_stencil {
                    self.writer.write_ln("layout(early_fragment_tests) in;");
                    self.writer.blank();
                }
            }
            ShaderTarget::Compute => {
                let [x, y, z] = self.program.layout_compute.num_threads;
                if [x, y, z] != [0, 0, 0] {
                    self.writer.write_ln(&format!(
                        "layout(local_size_x = {x}, local_size_y = {y}, local_size_z = {z}) in;"
                    ));
                    self.writer.blank();
                }
            }
            ShaderTarget::Geometry => {
                let layout = &self.program.layout_geometry;
                let input_primitive = layout.input_primitive;
                let output_primitive = layout.output_primitive.and_then(stream_primitive_keyword);
                let max_vertices = layout.max_vertices;

                let mut wrote = false;
                if let Some(primitive) = input_primitive {
                    self.writer.write_ln(&format!(
                        "layout({}) in;",
                        primitive_type_keyword(primitive)
                    ));
                    wrote = true;
                }
                if output_primitive.is_some() || max_vertices > 0 {
                    let mut qualifiers = Vec::new();
                    if let Some(keyword) = output_primitive {
                        qualifiers.push(keyword.to_string());
                    }
                    if max_vertices > 0 {
                        qualifiers.push(format!("max_vertices = {max_vertices}"));
                    }
                    self.writer
                        .write_ln(&format!("layout({}) out;", qualifiers.join(", ")));
                    wrote = true;
                }
                if wrote {
                    self.writer.blank();
                }
            }
            ShaderTarget::TessControl => {
                let points = self.program.layout_tess_control.output_control_points;
                if points > 0 {
                    self.writer
                        .write_ln(&format!("layout(vertices = {points}) out;"));
                    self.writer.blank();
                }
            }
            ShaderTarget::TessEvaluation => {
                let layout = &self.program.layout_tess_evaluation;
                let qualifiers: Vec<&str> =
                    [layout.domain, layout.partitioning, layout.output_topology]
                        .into_iter()
                        .flatten()
                        .filter_map(tess_layout_keyword)
                        .collect();
                if !qualifiers.is_empty() {
                    self.writer
                        .write_ln(&format!("layout({}) in;", qualifiers.join(", ")));
                    self.writer.blank();
                }
            }
            ShaderTarget::Vertex => {}
        }
    }

    /// Emits the `clip` helper once per observed argument type.
    fn write_clip_helpers(&mut self) {
        let Some(usage) = self.program.intrinsic_usage(Intrinsic::Clip) else {
            return;
        };
        let mut dims = BTreeSet::new();
        for args in &usage.arg_lists {
            if let Some(dt) = args.first() {
                dims.insert(dt.vector_dim().unwrap_or(1));
            }
        }
        for dim in dims {
            if dim == 1 {
                self.writer
                    .write_ln("void clip(float x) { if (x < 0.0) discard; }");
            } else {
                let ty = format!("vec{dim}");
                self.writer.write_ln(&format!(
                    "void clip({ty} x) {{ if (any(lessThan(x, {ty}(0.0)))) discard; }}"
                ));
            }
        }
        self.writer.blank();
    }

    /// Resolves where the entry point's return value goes and emits the
    /// output declarations this requires.
    fn setup_output_semantics(&mut self) -> Result<(), Error> {
        if self.target == ShaderTarget::Fragment {
            return self.write_fragment_shader_output();
        }
        let Some(semantic) = self.program.entry_io.return_semantic.clone() else {
            return Ok(());
        };
        match &semantic.semantic {
            Semantic::Target => Err(Error::mapping(
                "output semantic",
                format!("'{semantic}' outside a fragment shader"),
            )),
            Semantic::UserDefined(_) => {
                let name = output_var_name(&semantic);
                let return_type = self.entry_return_type();
                self.writer.begin_ln();
                self.writer.write("out ");
                self.write_type_denoter(&return_type, SourceArea::default())?;
                self.writer.write(&format!(" {name};"));
                self.writer.end_ln();
                self.writer.blank();
                self.single_output_variable = Some(name);
                Ok(())
            }
            sv => {
                let keyword = semantic_keyword(sv, self.target, false).ok_or_else(|| {
                    Error::mapping("output semantic", format!("'{semantic}'"))
                })?;
                self.single_output_variable = Some(keyword.to_string());
                Ok(())
            }
        }
    }

    fn entry_return_type(&self) -> TypeDenoter {
        self.program
            .entry_point
            .map(|entry| self.program.functions[entry].return_type.denoter.clone())
            .unwrap_or(TypeDenoter::Void)
    }

    /// Declares the fragment outputs and records the single output variable.
    fn write_fragment_shader_output(&mut self) -> Result<(), Error> {
        if let Some(output_struct) = self.program.entry_io.output_struct {
            // SV_Target members need explicit output declarations; user
            // members are flattened by the structure emission itself.
            let mut wrote = false;
            for member in self.program.struct_members_base_first(output_struct) {
                let var = &self.program.var_decls[member];
                let Some(semantic) = var.semantic.clone() else {
                    continue;
                };
                if semantic.semantic == Semantic::Target && self.has_version(130) {
                    self.writer.begin_ln();
                    self.writer
                        .write(&format!("layout(location = {}) out ", semantic.index));
                    let ty = var.type_spec.denoter.clone();
                    self.write_type_denoter(&ty, var.area)?;
                    self.writer
                        .write(&format!(" {};", output_var_name(&semantic)));
                    self.writer.end_ln();
                    wrote = true;
                }
            }
            if wrote {
                self.writer.blank();
            }
            return Ok(());
        }

        let Some(semantic) = self.program.entry_io.return_semantic.clone() else {
            return Ok(());
        };
        match &semantic.semantic {
            Semantic::Target => {
                if self.has_version(130) {
                    let name = output_var_name(&semantic);
                    let return_type = self.entry_return_type();
                    self.writer.begin_ln();
                    self.writer
                        .write(&format!("layout(location = {}) out ", semantic.index));
                    self.write_type_denoter(&return_type, SourceArea::default())?;
                    self.writer.write(&format!(" {name};"));
                    self.writer.end_ln();
                    self.writer.blank();
                    self.single_output_variable = Some(name);
                } else {
                    self.single_output_variable =
                        Some(format!("gl_FragData[{}]", semantic.index));
                }
                Ok(())
            }
            Semantic::Depth => {
                self.single_output_variable = Some("gl_FragDepth".into());
                Ok(())
            }
            other => Err(Error::mapping(
                "output semantic",
                format!("'{other}' for a fragment shader"),
            )),
        }
    }

    /// Emits `in` globals for user-defined entry-point input parameters.
    fn write_entry_point_inputs(&mut self) -> Result<(), Error> {
        let mut wrote = false;
        for &param in &self.program.entry_io.inputs {
            let var = &self.program.var_decls[param];
            if self
                .program
                .resolved_type(&var.type_spec.denoter)?
                .is_struct()
            {
                continue;
            }
            let Some(semantic) = &var.semantic else {
                continue;
            };
            if semantic.is_system_value() {
                continue;
            }
            let (denoter, ident, area) =
                (var.type_spec.denoter.clone(), var.ident.clone(), var.area);
            self.writer.begin_ln();
            self.write_interp_modifiers(&var.type_spec);
            self.writer.write("in ");
            self.write_type_denoter(&denoter, area)?;
            self.writer.write(&format!(" {ident};"));
            self.writer.end_ln();
            wrote = true;
        }
        if wrote {
            self.writer.blank();
        }
        Ok(())
    }

    fn write_interp_modifiers(&mut self, spec: &TypeSpecifier) {
        for modifier in &spec.interp_modifiers {
            self.writer.write(interp_modifier_keyword(*modifier));
            self.writer.write(" ");
        }
    }

    /* ----- Statements ----- */

    fn write_stmt(&mut self, stmt: &Stmt) -> Result<(), Error> {
        if stmt.flags.contains(NodeFlags::DISABLE_CODEGEN) {
            return Ok(());
        }
        if let Some(comment) = &stmt.comment {
            if self.comments {
                self.comment(comment);
            }
        }
        match &stmt.kind {
            StmtKind::Null => {
                self.writer.write_ln(";");
                Ok(())
            }
            StmtKind::Block(block) => self.write_code_block(block),
            StmtKind::VarDecl(decl_stmt) => self.write_var_decl_stmt(decl_stmt),
            StmtKind::BufferDecls(decl_stmt) => self.write_buffer_decl_stmt(stmt, decl_stmt),
            StmtKind::SamplerDecls(decl_stmt) => self.write_sampler_decl_stmt(decl_stmt),
            StmtKind::Struct(handle) => self.write_struct_decl_stmt(stmt, *handle),
            // GLSL has no type aliases; they are resolved at their use sites.
            StmtKind::Alias(_) => Ok(()),
            StmtKind::Function(handle) => self.write_function_decl(*handle),
            StmtKind::UniformBuffer(handle) => self.write_uniform_buffer_decl(stmt, *handle),
            StmtKind::For {
                init,
                condition,
                iteration,
                body,
            } => self.write_for_loop(init, condition.as_ref(), iteration.as_ref(), body),
            StmtKind::While { condition, body } => {
                self.writer.begin_ln();
                self.writer.write("while (");
                self.write_expr(condition)?;
                self.writer.write(")");
                self.writer.end_ln();
                self.write_scoped_stmt(body)
            }
            StmtKind::DoWhile { body, condition } => {
                self.writer.write_ln("do");
                self.write_scoped_stmt(body)?;
                self.writer.begin_ln();
                self.writer.write("while (");
                self.write_expr(condition)?;
                self.writer.write(");");
                self.writer.end_ln();
                Ok(())
            }
            StmtKind::If {
                condition,
                body,
                else_branch,
            } => self.write_if(condition, body, else_branch.as_deref(), false),
            StmtKind::Switch { selector, cases } => self.write_switch(selector, cases),
            StmtKind::Expr(expr) => {
                self.writer.begin_ln();
                self.write_expr(expr)?;
                self.writer.write(";");
                self.writer.end_ln();
                Ok(())
            }
            StmtKind::Return { expr } => self.write_return(expr.as_ref()),
            StmtKind::CtrlTransfer(transfer) => {
                self.writer.write_ln(&format!("{};", transfer.keyword()));
                Ok(())
            }
        }
    }

    fn write_code_block(&mut self, block: &CodeBlock) -> Result<(), Error> {
        self.writer.open_scope();
        for stmt in &block.stmts {
            self.write_stmt(stmt)?;
        }
        self.writer.close_scope(false);
        Ok(())
    }

    fn write_scoped_stmt(&mut self, stmt: &Stmt) -> Result<(), Error> {
        if matches!(stmt.kind, StmtKind::Block(_)) {
            self.write_stmt(stmt)
        } else {
            self.writer.inc_indent();
            self.write_stmt(stmt)?;
            self.writer.dec_indent();
            Ok(())
        }
    }

    fn write_for_loop(
        &mut self,
        init: &Stmt,
        condition: Option<&Expr>,
        iteration: Option<&Expr>,
        body: &Stmt,
    ) -> Result<(), Error> {
        self.writer.begin_ln();
        self.writer.write("for (");

        // The init statement writes its own ';'.
        self.writer.push_options(false, false);
        let init_result = self.write_stmt(init);
        self.writer.pop_options();
        init_result?;

        self.writer.write(" ");
        if let Some(condition) = condition {
            self.write_expr(condition)?;
        }
        self.writer.write("; ");
        if let Some(iteration) = iteration {
            self.write_expr(iteration)?;
        }
        self.writer.write(")");
        self.writer.end_ln();

        self.write_scoped_stmt(body)
    }

    fn write_if(
        &mut self,
        condition: &Expr,
        body: &Stmt,
        else_branch: Option<&Stmt>,
        has_else_parent: bool,
    ) -> Result<(), Error> {
        if !has_else_parent {
            self.writer.begin_ln();
        }
        self.writer.write("if (");
        self.write_expr(condition)?;
        self.writer.write(")");
        self.writer.end_ln();

        self.write_scoped_stmt(body)?;

        if let Some(else_stmt) = else_branch {
            if let StmtKind::If {
                condition,
                body,
                else_branch,
            } = &else_stmt.kind
            {
                self.writer.begin_ln();
                self.writer.write("else ");
                self.write_if(condition, body, else_branch.as_deref(), true)?;
            } else {
                self.writer.write_ln("else");
                self.write_scoped_stmt(else_stmt)?;
            }
        }
        Ok(())
    }

    fn write_switch(&mut self, selector: &Expr, cases: &[SwitchCase]) -> Result<(), Error> {
        self.writer.begin_ln();
        self.writer.write("switch (");
        self.write_expr(selector)?;
        self.writer.write(")");
        self.writer.end_ln();

        self.writer.open_scope();
        for case in cases {
            match &case.expr {
                Some(expr) => {
                    self.writer.begin_ln();
                    self.writer.write("case ");
                    self.write_expr(expr)?;
                    self.writer.write(":");
                    self.writer.end_ln();
                }
                None => self.writer.write_ln("default:"),
            }
            self.writer.inc_indent();
            for stmt in &case.stmts {
                self.write_stmt(stmt)?;
            }
            self.writer.dec_indent();
        }
        self.writer.close_scope(false);
        Ok(())
    }

    fn write_return(&mut self, expr: Option<&Expr>) -> Result<(), Error> {
        if self.inside_entry_point {
            match expr {
                Some(expr) => {
                    self.writer.open_scope();
                    self.write_output_semantics(expr)?;
                    self.writer.write_ln("return;");
                    self.writer.close_scope(false);
                }
                None => self.writer.write_ln("return;"),
            }
            return Ok(());
        }
        self.writer.begin_ln();
        self.writer.write("return");
        if let Some(expr) = expr {
            self.writer.write(" ");
            self.write_expr(expr)?;
        }
        self.writer.write(";");
        self.writer.end_ln();
        Ok(())
    }

    /// Rewrites an entry-point `return <expr>;` into output assignments.
    fn write_output_semantics(&mut self, expr: &Expr) -> Result<(), Error> {
        if let Some(single) = self.single_output_variable.clone() {
            self.writer.begin_ln();
            self.writer.write(&format!("{single} = "));
            self.write_expr(expr)?;
            self.writer.write(";");
            self.writer.end_ln();
            return Ok(());
        }

        let Some(output_struct) = self.program.entry_io.output_struct else {
            return Err(Error::mapping(
                "output semantic",
                "entry-point return value carries no semantic",
            )
            .with_area(expr.area));
        };

        // Copy into a local, then assign member-wise in base-then-derived
        // declaration order.
        let local = format!("{}output", self.prefix);
        let struct_ident = self.program.struct_decls[output_struct].ident.clone();
        self.writer.begin_ln();
        self.writer.write(&format!("{struct_ident} {local} = "));
        self.write_expr(expr)?;
        self.writer.write(";");
        self.writer.end_ln();

        let resolve = must_resolve_struct(self.target, &self.program.struct_decls[output_struct]);
        let alias = self.program.struct_decls[output_struct].alias_name.clone();
        for member in self.program.struct_members_base_first(output_struct) {
            let var = &self.program.var_decls[member];
            let member_ident = var.ident.clone();
            let dst = match var.semantic.clone() {
                Some(semantic) if semantic.is_system_value() => {
                    match self.system_value_name(&semantic, false) {
                        Some(name) => name,
                        None => {
                            return Err(Error::mapping(
                                "output semantic",
                                format!("'{semantic}'"),
                            )
                            .with_area(var.area));
                        }
                    }
                }
                _ if resolve => member_ident.clone(),
                _ => format!("{alias}.{member_ident}"),
            };
            self.writer
                .write_ln(&format!("{dst} = {local}.{member_ident};"));
        }
        Ok(())
    }

    /* ----- Declarations ----- */

    fn write_function_decl(&mut self, handle: Handle<FunctionDecl>) -> Result<(), Error> {
        let func = &self.program.functions[handle];
        if !func.flags.contains(NodeFlags::REACHABLE) {
            return Ok(());
        }
        self.writer.line(func.area);

        if func.is_entry_point() {
            self.writer.write_ln("void main()");
            self.writer.open_scope();
            self.write_input_semantics()?;
            self.inside_entry_point = true;
            let result = func
                .body
                .as_ref()
                .map(|body| {
                    body.stmts
                        .iter()
                        .try_for_each(|stmt| self.write_stmt(stmt))
                })
                .unwrap_or(Ok(()));
            self.inside_entry_point = false;
            result?;
            self.writer.close_scope(false);
            self.writer.blank();
            return Ok(());
        }

        self.writer.begin_ln();
        let return_type = func.return_type.denoter.clone();
        self.write_type_denoter(&return_type, func.area)?;
        self.writer.write(&format!(" {}(", func.ident));
        let params = func.parameters.clone();
        for (i, &param) in params.iter().enumerate() {
            self.write_parameter(param)?;
            if i + 1 < params.len() {
                self.writer.write(", ");
            }
        }
        self.writer.write(")");

        let func = &self.program.functions[handle];
        match &func.body {
            Some(body) => {
                self.writer.end_ln();
                let body = body.clone();
                self.write_code_block(&body)?;
            }
            None => {
                // Forward declaration.
                self.writer.write(";");
                self.writer.end_ln();
            }
        }
        self.writer.blank();
        Ok(())
    }

    fn write_parameter(&mut self, param: Handle<VarDecl>) -> Result<(), Error> {
        let var = &self.program.var_decls[param];
        let spec = var.type_spec.clone();
        let (ident, dims, area) = (var.ident.clone(), var.array_dims.clone(), var.area);

        match (spec.is_input, spec.is_output) {
            (true, true) => self.writer.write("inout "),
            (false, true) => self.writer.write("out "),
            _ => {}
        }
        if spec.is_const() {
            self.writer.write("const ");
        }
        self.write_type_denoter(&spec.denoter, area)?;
        self.writer.write(&format!(" {ident}"));
        self.write_array_dims(&dims);
        Ok(())
    }

    /// Synthesizes local copies of system-value entry-point parameters.
    fn write_input_semantics(&mut self) -> Result<(), Error> {
        let mut wrote = false;
        for &param in &self.program.entry_io.inputs {
            let var = &self.program.var_decls[param];
            let Some(semantic) = var.semantic.clone() else {
                continue;
            };
            if !semantic.is_system_value() {
                continue;
            }
            let Some(keyword) = semantic_keyword(&semantic.semantic, self.target, true) else {
                return Err(
                    Error::mapping("input semantic", format!("'{semantic}'")).with_area(var.area)
                );
            };
            let (denoter, ident, area) =
                (var.type_spec.denoter.clone(), var.ident.clone(), var.area);
            self.writer.begin_ln();
            self.write_type_denoter(&denoter, area)?;
            self.writer.write(&format!(" {ident} = {keyword};"));
            self.writer.end_ln();
            wrote = true;
        }
        if wrote {
            self.writer.blank();
        }
        Ok(())
    }

    fn write_uniform_buffer_decl(
        &mut self,
        stmt: &Stmt,
        handle: Handle<shx_ast::ast::UniformBufferDecl>,
    ) -> Result<(), Error> {
        let decl = &self.program.uniform_buffers[handle];
        if !decl.flags.contains(NodeFlags::REACHABLE) {
            return Ok(());
        }
        self.writer.line(stmt.area);

        let slot = RegisterSlot::for_target(&decl.slot_registers, self.target)
            .filter(|slot| slot.register_type == RegisterType::ConstantBuffer)
            .map(|slot| slot.slot);
        let ident = decl.ident.clone();
        let members = decl.members.clone();

        self.writer.begin_ln();
        self.writer.write("layout(std140");
        if let Some(slot) = slot {
            self.writer.write(&format!(", binding = {slot}"));
        }
        self.writer.write(&format!(") uniform {ident}"));
        self.writer.end_ln();

        self.writer.open_scope();
        for member in members {
            self.write_var_decl_line(member, None)?;
        }
        self.writer.close_scope(true);
        self.writer.blank();

        if let Some(reflection) = &mut self.reflection {
            reflection.uniform_buffers.push(BindingSlot::new(ident, slot));
        }
        Ok(())
    }

    fn write_buffer_decl_stmt(
        &mut self,
        stmt: &Stmt,
        decl_stmt: &BufferDeclStmt,
    ) -> Result<(), Error> {
        let reachable: Vec<_> = decl_stmt
            .decls
            .iter()
            .copied()
            .filter(|&d| self.program.buffer_decls[d].flags.contains(NodeFlags::REACHABLE))
            .collect();
        if reachable.is_empty() {
            return Ok(());
        }
        self.writer.line(stmt.area);

        for handle in reachable {
            let decl = &self.program.buffer_decls[handle];
            let keyword = buffer_type_keyword(decl.buffer_type).ok_or_else(|| {
                Error::mapping(
                    "texture type",
                    format!("'{:?}' has no GLSL sampler type", decl.buffer_type),
                )
                .with_area(decl.area)
            })?;
            let slot = RegisterSlot::for_target(&decl.slot_registers, self.target)
                .filter(|slot| slot.register_type == RegisterType::TextureBuffer)
                .map(|slot| slot.slot);
            let ident = decl.ident.clone();

            self.writer.begin_ln();
            if let Some(slot) = slot {
                self.writer.write(&format!("layout(binding = {slot}) "));
            }
            self.writer.write(&format!("uniform {keyword} {ident};"));
            self.writer.end_ln();

            if let Some(reflection) = &mut self.reflection {
                reflection.textures.push(BindingSlot::new(ident, slot));
            }
        }
        self.writer.blank();
        Ok(())
    }

    /// Sampler states fold into GLSL combined samplers; only the reflection
    /// record sees them.
    fn write_sampler_decl_stmt(&mut self, decl_stmt: &SamplerDeclStmt) -> Result<(), Error> {
        for &handle in &decl_stmt.decls {
            let decl = &self.program.sampler_decls[handle];
            if !decl.flags.contains(NodeFlags::REACHABLE) {
                continue;
            }
            let slot = RegisterSlot::for_target(&decl.slot_registers, self.target)
                .filter(|slot| slot.register_type == RegisterType::Sampler)
                .map(|slot| slot.slot);
            let ident = decl.ident.clone();
            if let Some(reflection) = &mut self.reflection {
                reflection.samplers.push(BindingSlot::new(ident, slot));
            }
        }
        Ok(())
    }

    fn write_struct_decl_stmt(
        &mut self,
        stmt: &Stmt,
        handle: Handle<StructDecl>,
    ) -> Result<(), Error> {
        if !self.program.struct_decls[handle]
            .flags
            .contains(NodeFlags::REACHABLE)
        {
            return Ok(());
        }
        self.writer.line(stmt.area);
        self.write_struct_decl(handle)?;
        self.writer.blank();
        Ok(())
    }

    fn write_struct_decl(&mut self, handle: Handle<StructDecl>) -> Result<(), Error> {
        let decl = &self.program.struct_decls[handle];
        let resolve = must_resolve_struct(self.target, decl);
        let is_io = decl.is_shader_io();
        let is_input = decl.struct_flags.contains(StructFlags::SHADER_INPUT);
        let ident = decl.ident.clone();
        let alias = decl.alias_name.clone();
        let members = self.program.struct_members_base_first(handle);

        // The plain declaration is always emitted so locals of this type
        // keep working; I/O structures additionally become a block or
        // flattened globals.
        self.writer.begin_ln();
        self.writer.write("struct");
        if !ident.is_empty() {
            self.writer.write(&format!(" {ident}"));
        }
        self.writer.end_ln();
        self.writer.open_scope();
        for &member in &members {
            self.write_var_decl_line(member, None)?;
        }
        self.writer.close_scope(true);

        if resolve {
            // Vertex shaders cannot take input interface blocks and fragment
            // shaders cannot produce output blocks, so the members become
            // plain in/out globals.
            for &member in &members {
                let var = &self.program.var_decls[member];
                if var.has_system_value_semantic() {
                    continue;
                }
                let io = if var.var_flags.contains(VarFlags::SHADER_INPUT) {
                    "in"
                } else {
                    "out"
                };
                self.write_var_decl_line(member, Some(io))?;
            }
        } else if is_io {
            self.writer.begin_ln();
            self.writer.write(if is_input { "in" } else { "out" });
            self.writer
                .write(&format!(" {INTERFACE_BLOCK_PREFIX}{ident}"));
            self.writer.end_ln();
            self.writer.open_scope();
            for &member in &members {
                // System values live in built-ins, never in the block.
                if self.program.var_decls[member].has_system_value_semantic() {
                    continue;
                }
                self.write_var_decl_line(member, None)?;
            }
            self.writer.close_scope(false);
            self.writer.write_ln(&format!("{alias};"));
        }
        Ok(())
    }

    /// One `T ident[dims];` line, optionally prefixed with `in`/`out`.
    fn write_var_decl_line(
        &mut self,
        member: Handle<VarDecl>,
        io_keyword: Option<&str>,
    ) -> Result<(), Error> {
        let var = &self.program.var_decls[member];
        if var.flags.contains(NodeFlags::DISABLE_CODEGEN) {
            return Ok(());
        }
        let spec = var.type_spec.clone();
        let (ident, dims, area) = (var.ident.clone(), var.array_dims.clone(), var.area);

        self.writer.begin_ln();
        if let Some(io) = io_keyword {
            self.write_interp_modifiers(&spec);
            self.writer.write(io);
            self.writer.write(" ");
        }
        self.write_type_denoter(&spec.denoter, area)?;
        self.writer.write(&format!(" {ident}"));
        self.write_array_dims(&dims);
        self.writer.write(";");
        self.writer.end_ln();
        Ok(())
    }

    fn write_var_decl_stmt(&mut self, decl_stmt: &VarDeclStmt) -> Result<(), Error> {
        let vars: Vec<_> = decl_stmt
            .vars
            .iter()
            .copied()
            .filter(|&v| {
                !self.program.var_decls[v]
                    .flags
                    .contains(NodeFlags::DISABLE_CODEGEN)
            })
            .collect();
        if vars.is_empty() {
            return Ok(());
        }

        let spec = self.program.var_decls[vars[0]].type_spec.clone();
        self.writer.begin_ln();
        for class in &spec.storage_classes {
            if let Some(keyword) = storage_class_keyword(*class) {
                self.writer.write(keyword);
                self.writer.write(" ");
            }
        }
        if spec.is_const_or_uniform() {
            self.writer.write("const ");
        }
        let area = self.program.var_decls[vars[0]].area;
        self.write_type_denoter(&spec.denoter, area)?;
        self.writer.write(" ");

        for (i, &var) in vars.iter().enumerate() {
            self.write_var_decl_ident(var)?;
            if i + 1 < vars.len() {
                self.writer.write(", ");
            }
        }
        self.writer.write(";");
        self.writer.end_ln();
        Ok(())
    }

    fn write_var_decl_ident(&mut self, handle: Handle<VarDecl>) -> Result<(), Error> {
        let var = &self.program.var_decls[handle];
        let (ident, dims) = (var.ident.clone(), var.array_dims.clone());
        let is_local = var.var_flags.contains(VarFlags::ENTRY_POINT_LOCAL);
        let initializer = var.initializer.clone();

        if is_local {
            self.writer.write(self.prefix);
        }
        self.writer.write(&ident);
        self.write_array_dims(&dims);
        if let Some(init) = initializer {
            self.writer.write(" = ");
            self.write_expr(&init)?;
        }
        Ok(())
    }

    fn write_array_dims(&mut self, dims: &[u32]) {
        for &dim in dims {
            if dim == 0 {
                self.writer.write("[]");
            } else {
                self.writer.write(&format!("[{dim}]"));
            }
        }
    }

    /* ----- Types ----- */

    fn write_type_denoter(&mut self, ty: &TypeDenoter, area: SourceArea) -> Result<(), Error> {
        match ty {
            TypeDenoter::Void => {
                self.writer.write("void");
                Ok(())
            }
            TypeDenoter::Base(dt) => {
                let keyword = data_type_keyword(*dt).ok_or_else(|| {
                    Error::mapping("data type", format!("'{dt}'")).with_area(area)
                })?;
                self.writer.write(keyword);
                Ok(())
            }
            TypeDenoter::Texture { buffer_type, .. } | TypeDenoter::Buffer { buffer_type, .. } => {
                let keyword = buffer_type_keyword(*buffer_type).ok_or_else(|| {
                    Error::mapping("texture type", format!("'{buffer_type:?}'")).with_area(area)
                })?;
                self.writer.write(keyword);
                Ok(())
            }
            TypeDenoter::Sampler(sampler_type) => Err(Error::mapping(
                "sampler type",
                format!("'{sampler_type:?}' (samplers are combined in GLSL)"),
            )
            .with_area(area)),
            TypeDenoter::Struct(handle) => {
                let ident = self.program.struct_decls[*handle].ident.clone();
                if ident.is_empty() {
                    return Err(Error::mapping(
                        "struct type",
                        "anonymous structure cannot be named",
                    )
                    .with_area(area));
                }
                self.writer.write(&ident);
                Ok(())
            }
            TypeDenoter::Alias(handle) => {
                let denoter = self.program.alias_decls[*handle].denoter.clone();
                self.write_type_denoter(&denoter, area)
            }
            TypeDenoter::Array { base, dims } => {
                self.write_type_denoter(base, area)?;
                self.write_array_dims(dims);
                Ok(())
            }
        }
    }

    /* ----- Expressions ----- */

    fn write_expr(&mut self, expr: &Expr) -> Result<(), Error> {
        match &expr.kind {
            ExprKind::Null => Ok(()),
            ExprKind::Literal { value, .. } => {
                self.writer.write(value);
                Ok(())
            }
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                self.write_expr(cond)?;
                self.writer.write(" ? ");
                self.write_expr(then_expr)?;
                self.writer.write(" : ");
                self.write_expr(else_expr)
            }
            ExprKind::Binary { lhs, op, rhs } => {
                self.write_expr(lhs)?;
                self.writer.write(&format!(" {} ", op.token()));
                self.write_expr(rhs)
            }
            ExprKind::Unary { op, expr } => {
                self.writer.write(op.token());
                self.write_expr(expr)
            }
            ExprKind::PostUnary { expr, op } => {
                self.write_expr(expr)?;
                self.writer.write(op.token());
                Ok(())
            }
            ExprKind::Call(call) => self.write_function_call(call, expr.area),
            ExprKind::Bracket(inner) => {
                self.writer.write("(");
                self.write_expr(inner)?;
                self.writer.write(")");
                Ok(())
            }
            ExprKind::Suffix { expr, ident } => {
                self.write_expr(expr)?;
                self.writer.write(".");
                self.write_var_ident(ident)
            }
            ExprKind::ArrayAccess { expr, indices } => {
                self.write_expr(expr)?;
                for index in indices {
                    self.writer.write("[");
                    self.write_expr(index)?;
                    self.writer.write("]");
                }
                Ok(())
            }
            ExprKind::Cast { to, expr } => {
                self.write_type_denoter(to, expr.area)?;
                self.writer.write("(");
                self.write_expr(expr)?;
                self.writer.write(")");
                Ok(())
            }
            ExprKind::Var(access) => self.write_var_access(access),
            ExprKind::InitializerList(exprs) => {
                self.writer.write("{ ");
                for (i, expr) in exprs.iter().enumerate() {
                    self.write_expr(expr)?;
                    if i + 1 < exprs.len() {
                        self.writer.write(", ");
                    }
                }
                self.writer.write(" }");
                Ok(())
            }
        }
    }

    fn write_var_access(&mut self, access: &VarAccess) -> Result<(), Error> {
        self.write_var_ident_or_system_value(&access.ident)?;
        if let (Some(op), Some(assign)) = (access.assign_op, &access.assign_expr) {
            self.writer.write(&format!(" {} ", op.token()));
            self.write_expr(assign)?;
        }
        Ok(())
    }

    fn write_var_ident(&mut self, ident: &VarIdent) -> Result<(), Error> {
        self.writer.write(&ident.ident);
        for index in &ident.array_indices {
            self.writer.write("[");
            self.write_expr(index)?;
            self.writer.write("]");
        }
        if let Some(next) = ident.next.as_deref() {
            self.writer.write(".");
            self.write_var_ident(next)?;
        }
        Ok(())
    }

    /// Writes the identifier as-is, or substitutes the GLSL built-in when a
    /// member of the chain carries a system-value semantic (propagating any
    /// trailing subscript, e.g. `output.position.xyz` → `gl_Position.xyz`).
    fn write_var_ident_or_system_value(&mut self, ident: &VarIdent) -> Result<(), Error> {
        if let Some((name, rest)) = self.find_system_value(ident)? {
            self.writer.write(&name);
            if let Some(rest) = rest {
                self.writer.write(".");
                return self.write_var_ident(rest);
            }
            return Ok(());
        }
        self.write_var_ident(ident)
    }

    /// Finds the first member link resolving to a system value; returns the
    /// GLSL spelling and the remaining chain.
    fn find_system_value<'e>(
        &self,
        ident: &'e VarIdent,
    ) -> Result<Option<(String, Option<&'e VarIdent>)>, Error> {
        let Some(SymbolRef::Var(root)) = ident.symbol else {
            return Ok(None);
        };
        let mut ty = self.program.var_decl_type(root);
        let mut link = ident.next.as_deref();
        while let Some(current) = link {
            ty = self.program.resolved_type(&ty)?;
            let TypeDenoter::Struct(s) = ty else {
                break;
            };
            let Some(member) = self.program.struct_member(s, &current.ident) else {
                break;
            };
            let var = &self.program.var_decls[member];
            if let Some(semantic) = &var.semantic {
                if semantic.is_system_value() {
                    let is_input = var.var_flags.contains(VarFlags::SHADER_INPUT);
                    if let Some(name) = self.system_value_name(semantic, is_input) {
                        return Ok(Some((name, current.next.as_deref())));
                    }
                }
            }
            ty = self.program.var_decl_type(member);
            link = current.next.as_deref();
        }
        Ok(None)
    }

    /// The GLSL spelling of a system value, version-dependent for
    /// `SV_Target`.
    fn system_value_name(&self, semantic: &IndexedSemantic, is_input: bool) -> Option<String> {
        match &semantic.semantic {
            Semantic::Target => {
                if self.has_version(130) {
                    Some(output_var_name(semantic))
                } else {
                    Some(format!("gl_FragData[{}]", semantic.index))
                }
            }
            other => {
                semantic_keyword(other, self.target, is_input).map(str::to_string)
            }
        }
    }

    /* ----- Function calls ----- */

    fn write_function_call(&mut self, call: &FunctionCall, area: SourceArea) -> Result<(), Error> {
        match call.intrinsic {
            Some(Intrinsic::Mul) => self.write_intrinsic_mul(call),
            Some(Intrinsic::Rcp) => self.write_intrinsic_rcp(call, area),
            Some(Intrinsic::Saturate) => self.write_intrinsic_saturate(call),
            Some(intrinsic) if intrinsic.is_texture_method() => {
                self.write_intrinsic_tex(call, intrinsic, area)
            }
            Some(intrinsic) if intrinsic.is_atomic() => {
                self.write_intrinsic_atomic(call, intrinsic, area)
            }
            _ => self.write_function_call_standard(call, area),
        }
    }

    fn write_function_call_standard(
        &mut self,
        call: &FunctionCall,
        area: SourceArea,
    ) -> Result<(), Error> {
        if let Some(intrinsic) = call.intrinsic {
            let keyword = intrinsic_keyword(intrinsic).ok_or_else(|| {
                Error::mapping("intrinsic", format!("'{}'", intrinsic.hlsl_name()))
                    .with_area(area)
            })?;
            self.writer.write(keyword);
        } else if let Some(name) = &call.name {
            self.write_var_ident(name)?;
        } else if let Some(constructor) = &call.constructor {
            self.write_type_denoter(constructor, area)?;
        } else {
            return Err(Error::missing_reference("function call without a name").with_area(area));
        }

        self.writer.write("(");
        for (i, arg) in call.args.iter().enumerate() {
            self.write_expr(arg)?;
            if i + 1 < call.args.len() {
                self.writer.write(", ");
            }
        }
        self.writer.write(")");
        Ok(())
    }

    /// `mul(A, B)` becomes `(A * B)`; composite operands get their own
    /// brackets so precedence survives the conversion.
    fn write_intrinsic_mul(&mut self, call: &FunctionCall) -> Result<(), Error> {
        self.writer.write("(");
        self.write_mul_operand(&call.args[0])?;
        self.writer.write(" * ");
        self.write_mul_operand(&call.args[1])?;
        self.writer.write(")");
        Ok(())
    }

    fn write_mul_operand(&mut self, expr: &Expr) -> Result<(), Error> {
        let needs_brackets = matches!(
            expr.kind,
            ExprKind::Ternary { .. }
                | ExprKind::Binary { .. }
                | ExprKind::Unary { .. }
                | ExprKind::PostUnary { .. }
        );
        if needs_brackets {
            self.writer.write("(");
            self.write_expr(expr)?;
            self.writer.write(")");
        } else {
            self.write_expr(expr)?;
        }
        Ok(())
    }

    /// `rcp(x)` becomes `(T(1) / (x))` for a base-typed argument.
    fn write_intrinsic_rcp(&mut self, call: &FunctionCall, area: SourceArea) -> Result<(), Error> {
        let arg = &call.args[0];
        let ty = self.program.resolved_type(&self.program.expr_type(arg)?)?;
        if !ty.is_base() {
            return Err(
                Error::invalid_argument("intrinsic 'rcp' requires a scalar, vector or matrix")
                    .with_area(area),
            );
        }
        self.writer.write("(");
        self.write_type_denoter(&ty, area)?;
        self.writer.write("(1) / (");
        self.write_expr(arg)?;
        self.writer.write("))");
        Ok(())
    }

    fn write_intrinsic_saturate(&mut self, call: &FunctionCall) -> Result<(), Error> {
        self.writer.write("clamp(");
        self.write_expr(&call.args[0])?;
        self.writer.write(", 0.0, 1.0)");
        Ok(())
    }

    /// `Interlocked*(dst, value[, original])` becomes
    /// `[original = ]atomic*(dst, value)`.
    fn write_intrinsic_atomic(
        &mut self,
        call: &FunctionCall,
        intrinsic: Intrinsic,
        area: SourceArea,
    ) -> Result<(), Error> {
        let keyword = intrinsic_keyword(intrinsic).ok_or_else(|| {
            Error::mapping("intrinsic", format!("'{}'", intrinsic.hlsl_name())).with_area(area)
        })?;
        let value_args = if intrinsic == Intrinsic::InterlockedCompareExchange {
            3
        } else {
            2
        };
        if call.args.len() > value_args {
            self.write_expr(&call.args[value_args])?;
            self.writer.write(" = ");
        }
        self.writer.write(&format!("{keyword}("));
        for (i, arg) in call.args[..value_args].iter().enumerate() {
            self.write_expr(arg)?;
            if i + 1 < value_args {
                self.writer.write(", ");
            }
        }
        self.writer.write(")");
        Ok(())
    }

    /// Texture methods become free functions with the receiver as the first
    /// argument; sampler-state arguments fold into the combined sampler.
    fn write_intrinsic_tex(
        &mut self,
        call: &FunctionCall,
        intrinsic: Intrinsic,
        area: SourceArea,
    ) -> Result<(), Error> {
        let keyword = intrinsic_keyword(intrinsic).ok_or_else(|| {
            Error::mapping(
                "texture method",
                format!("'{}' is not supported", intrinsic.hlsl_name()),
            )
            .with_area(area)
        })?;
        let receiver = call
            .name
            .as_ref()
            .ok_or_else(|| Error::missing_reference("texture call without a receiver").with_area(area))?;

        self.writer.write(&format!("{keyword}("));
        // The receiver object only; the method link is dropped.
        self.writer.write(&receiver.ident);
        for index in &receiver.array_indices {
            self.writer.write("[");
            self.write_expr(index)?;
            self.writer.write("]");
        }
        for arg in &call.args {
            let ty = self.program.resolved_type(&self.program.expr_type(arg)?)?;
            if let TypeDenoter::Sampler(sampler_type) = ty {
                if sampler_type.is_sampler_state() {
                    continue;
                }
            }
            self.writer.write(", ");
            self.write_expr(arg)?;
        }
        self.writer.write(")");
        Ok(())
    }
}

/// The generated output-variable name for a semantic (`SV_Target`,
/// `SV_Target3`, or the user-defined name).
fn output_var_name(semantic: &IndexedSemantic) -> String {
    let base = match &semantic.semantic {
        Semantic::UserDefined(name) => name.clone(),
        other => other.to_string(),
    };
    if semantic.index == 0 {
        base
    } else {
        format!("{base}{}", semantic.index)
    }
}
