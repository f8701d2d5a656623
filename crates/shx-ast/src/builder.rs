//! Construction API for type-resolved programs.
//!
//! The parser/semantic-analyzer front end is an external collaborator; this
//! builder is the contract it targets. It fills the cross-reference handles
//! the semantic analyzer would fill (symbol references, resolved call
//! targets, parent links), so a program built here is ready for the back-end
//! pipeline. Tests use it to assemble their inputs.

use crate::ast::*;
use crate::intrinsic::Intrinsic;
use crate::report::SourceArea;
use crate::semantic::IndexedSemantic;
use crate::ty::{BufferType, DataType, RegisterType, SamplerType, TypeDenoter, UniformBufferType};
use crate::Handle;

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> Program {
        self.program
    }

    /// Declares a bare variable (no statement); used for parameters and
    /// members.
    pub fn var(
        &mut self,
        ident: &str,
        denoter: TypeDenoter,
        semantic: Option<&str>,
    ) -> Handle<VarDecl> {
        let mut decl = VarDecl::new(ident, TypeSpecifier::new(denoter));
        decl.semantic = semantic.map(IndexedSemantic::parse);
        self.program.var_decls.push(decl)
    }

    /// Declares a global variable with an optional initializer.
    pub fn global_var(
        &mut self,
        ident: &str,
        type_spec: TypeSpecifier,
        initializer: Option<Expr>,
    ) -> Handle<VarDecl> {
        let mut decl = VarDecl::new(ident, type_spec);
        decl.initializer = initializer;
        let handle = self.program.var_decls.push(decl);
        self.program.global_stmts.push(Stmt::new(
            StmtKind::VarDecl(VarDeclStmt {
                vars: vec![handle],
            }),
            SourceArea::default(),
        ));
        handle
    }

    /// Declares a texture object (`Texture2D myTex : register(t0);`).
    pub fn texture(
        &mut self,
        ident: &str,
        buffer_type: BufferType,
        slot: Option<u32>,
    ) -> Handle<BufferDecl> {
        let handle = self.program.buffer_decls.push(BufferDecl {
            ident: ident.into(),
            buffer_type,
            elem: None,
            array_dims: Vec::new(),
            slot_registers: slot
                .map(|s| RegisterSlot::new(RegisterType::TextureBuffer, s))
                .into_iter()
                .collect(),
            flags: NodeFlags::default(),
            area: SourceArea::default(),
        });
        self.program.global_stmts.push(Stmt::new(
            StmtKind::BufferDecls(BufferDeclStmt {
                decls: vec![handle],
            }),
            SourceArea::default(),
        ));
        handle
    }

    /// Declares a sampler state object.
    pub fn sampler(
        &mut self,
        ident: &str,
        sampler_type: SamplerType,
        slot: Option<u32>,
    ) -> Handle<SamplerDecl> {
        let handle = self.program.sampler_decls.push(SamplerDecl {
            ident: ident.into(),
            sampler_type,
            slot_registers: slot
                .map(|s| RegisterSlot::new(RegisterType::Sampler, s))
                .into_iter()
                .collect(),
            sampler_values: Vec::new(),
            flags: NodeFlags::default(),
            area: SourceArea::default(),
        });
        self.program.global_stmts.push(Stmt::new(
            StmtKind::SamplerDecls(SamplerDeclStmt {
                decls: vec![handle],
            }),
            SourceArea::default(),
        ));
        handle
    }

    /// Declares a constant buffer; returns its handle and member handles.
    pub fn uniform_buffer(
        &mut self,
        ident: &str,
        slot: Option<u32>,
        members: &[(&str, TypeDenoter)],
    ) -> (Handle<UniformBufferDecl>, Vec<Handle<VarDecl>>) {
        let member_handles: Vec<_> = members
            .iter()
            .map(|(name, denoter)| self.var(name, denoter.clone(), None))
            .collect();
        let handle = self.program.uniform_buffers.push(UniformBufferDecl {
            ident: ident.into(),
            buffer_type: UniformBufferType::ConstantBuffer,
            slot_registers: slot
                .map(|s| RegisterSlot::new(RegisterType::ConstantBuffer, s))
                .into_iter()
                .collect(),
            members: member_handles.clone(),
            flags: NodeFlags::default(),
            area: SourceArea::default(),
        });
        for &member in &member_handles {
            self.program.var_decls[member].uniform_buffer = Some(handle);
        }
        self.program.global_stmts.push(Stmt::new(
            StmtKind::UniformBuffer(handle),
            SourceArea::default(),
        ));
        (handle, member_handles)
    }

    /// Declares a structure; returns its handle and member handles.
    pub fn struct_decl(
        &mut self,
        ident: &str,
        members: &[(&str, TypeDenoter, Option<&str>)],
    ) -> (Handle<StructDecl>, Vec<Handle<VarDecl>>) {
        self.struct_decl_with_base(ident, None, members)
    }

    pub fn struct_decl_with_base(
        &mut self,
        ident: &str,
        base_struct: Option<Handle<StructDecl>>,
        members: &[(&str, TypeDenoter, Option<&str>)],
    ) -> (Handle<StructDecl>, Vec<Handle<VarDecl>>) {
        let member_handles: Vec<_> = members
            .iter()
            .map(|(name, denoter, semantic)| self.var(name, denoter.clone(), *semantic))
            .collect();
        let handle = self.program.struct_decls.push(StructDecl {
            ident: ident.into(),
            base_struct,
            members: member_handles.clone(),
            methods: Vec::new(),
            alias_name: String::new(),
            flags: NodeFlags::default(),
            struct_flags: StructFlags::default(),
            area: SourceArea::default(),
        });
        for &member in &member_handles {
            self.program.var_decls[member].struct_decl = Some(handle);
        }
        self.program
            .global_stmts
            .push(Stmt::new(StmtKind::Struct(handle), SourceArea::default()));
        (handle, member_handles)
    }

    /// Declares a function with a body.
    pub fn function(
        &mut self,
        ident: &str,
        return_type: TypeDenoter,
        semantic: Option<&str>,
        parameters: Vec<Handle<VarDecl>>,
        body: CodeBlock,
    ) -> Handle<FunctionDecl> {
        self.push_function(ident, return_type, semantic, parameters, Some(body), false)
    }

    /// Declares the entry point; also records it on the program.
    pub fn entry_point(
        &mut self,
        ident: &str,
        return_type: TypeDenoter,
        semantic: Option<&str>,
        parameters: Vec<Handle<VarDecl>>,
        body: CodeBlock,
    ) -> Handle<FunctionDecl> {
        self.push_function(ident, return_type, semantic, parameters, Some(body), true)
    }

    /// Declares a forward declaration for an existing implementation and
    /// links the two.
    pub fn forward_decl(&mut self, implementation: Handle<FunctionDecl>) -> Handle<FunctionDecl> {
        let (ident, return_type, semantic, parameters) = {
            let decl = &self.program.functions[implementation];
            (
                decl.ident.clone(),
                decl.return_type.clone(),
                decl.semantic.clone(),
                decl.parameters.clone(),
            )
        };
        let forward = self.program.functions.push(FunctionDecl {
            ident,
            return_type,
            semantic,
            parameters,
            body: None,
            attribs: Vec::new(),
            flags: NodeFlags::default(),
            fn_flags: FunctionFlags::default(),
            area: SourceArea::default(),
            impl_decl: Some(implementation),
            forward_decls: Vec::new(),
            struct_decl: None,
        });
        self.program.functions[implementation]
            .forward_decls
            .push(forward);
        self.program
            .global_stmts
            .push(Stmt::new(StmtKind::Function(forward), SourceArea::default()));
        forward
    }

    /// Attaches attributes to a declared function (`[numthreads(...)]`).
    pub fn attribs(&mut self, function: Handle<FunctionDecl>, attribs: Vec<Attribute>) {
        self.program.functions[function].attribs = attribs;
    }

    fn push_function(
        &mut self,
        ident: &str,
        return_type: TypeDenoter,
        semantic: Option<&str>,
        parameters: Vec<Handle<VarDecl>>,
        body: Option<CodeBlock>,
        is_entry_point: bool,
    ) -> Handle<FunctionDecl> {
        let mut fn_flags = FunctionFlags::default();
        if is_entry_point {
            fn_flags |= FunctionFlags::ENTRY_POINT;
        }
        let handle = self.program.functions.push(FunctionDecl {
            ident: ident.into(),
            return_type: TypeSpecifier::new(return_type),
            semantic: semantic.map(IndexedSemantic::parse),
            parameters,
            body,
            attribs: Vec::new(),
            flags: NodeFlags::default(),
            fn_flags,
            area: SourceArea::default(),
            impl_decl: None,
            forward_decls: Vec::new(),
            struct_decl: None,
        });
        if is_entry_point {
            self.program.entry_point = Some(handle);
        }
        self.program
            .global_stmts
            .push(Stmt::new(StmtKind::Function(handle), SourceArea::default()));
        handle
    }

    /// Declares a local variable and returns its declaration statement.
    pub fn local_var(
        &mut self,
        ident: &str,
        denoter: TypeDenoter,
        initializer: Option<Expr>,
    ) -> (Stmt, Handle<VarDecl>) {
        let mut decl = VarDecl::new(ident, TypeSpecifier::new(denoter));
        decl.initializer = initializer;
        let handle = self.program.var_decls.push(decl);
        let stmt = Stmt::new(
            StmtKind::VarDecl(VarDeclStmt {
                vars: vec![handle],
            }),
            SourceArea::default(),
        );
        (stmt, handle)
    }
}

/* ----- Expression and statement helpers ----- */

pub fn lit_int(value: i64) -> Expr {
    Expr::new(
        ExprKind::Literal {
            data_type: DataType::Int,
            value: value.to_string(),
        },
        SourceArea::default(),
    )
}

pub fn lit_float(value: &str) -> Expr {
    Expr::new(
        ExprKind::Literal {
            data_type: DataType::Float,
            value: value.into(),
        },
        SourceArea::default(),
    )
}

/// A string literal; only valid inside attributes and annotations.
pub fn lit_str(value: &str) -> Expr {
    Expr::new(
        ExprKind::Literal {
            data_type: DataType::String,
            value: format!("\"{value}\""),
        },
        SourceArea::default(),
    )
}

/// A plain variable access.
pub fn var_expr(ident: &str, handle: Handle<VarDecl>) -> Expr {
    Expr::new(
        ExprKind::Var(VarAccess {
            ident: VarIdent::with_symbol(ident, SymbolRef::Var(handle)),
            assign_op: None,
            assign_expr: None,
        }),
        SourceArea::default(),
    )
}

/// A dot-separated access rooted at a resolved symbol (`root.a.b`).
pub fn chain_expr(root: &str, symbol: SymbolRef, links: &[&str]) -> Expr {
    let mut next = None;
    for link in links.iter().rev() {
        let mut chain_link = VarIdent::new(*link);
        chain_link.next = next;
        next = Some(Box::new(chain_link));
    }
    let mut ident = VarIdent::with_symbol(root, symbol);
    ident.next = next;
    Expr::new(
        ExprKind::Var(VarAccess {
            ident,
            assign_op: None,
            assign_expr: None,
        }),
        SourceArea::default(),
    )
}

/// An assignment through a plain variable access.
pub fn assign_expr(ident: &str, handle: Handle<VarDecl>, value: Expr) -> Expr {
    Expr::new(
        ExprKind::Var(VarAccess {
            ident: VarIdent::with_symbol(ident, SymbolRef::Var(handle)),
            assign_op: Some(AssignOp::Set),
            assign_expr: Some(Box::new(value)),
        }),
        SourceArea::default(),
    )
}

/// A type constructor call (`float4(...)`).
pub fn constructor(data_type: DataType, args: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::Call(FunctionCall {
            name: None,
            constructor: Some(TypeDenoter::Base(data_type)),
            func: None,
            intrinsic: None,
            args,
        }),
        SourceArea::default(),
    )
}

/// A global intrinsic call (`mul(...)`, `clip(...)`).
pub fn intrinsic_call(intrinsic: Intrinsic, args: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::Call(FunctionCall {
            name: Some(VarIdent::new(intrinsic.hlsl_name())),
            constructor: None,
            func: None,
            intrinsic: Some(intrinsic),
            args,
        }),
        SourceArea::default(),
    )
}

/// A texture method call (`tex.Sample(...)`); the receiver is the first
/// chain link.
pub fn texture_call(
    texture: (&str, Handle<BufferDecl>),
    method: Intrinsic,
    args: Vec<Expr>,
) -> Expr {
    let mut name = VarIdent::with_symbol(texture.0, SymbolRef::Buffer(texture.1));
    name.next = Some(Box::new(VarIdent::new(method.hlsl_name())));
    Expr::new(
        ExprKind::Call(FunctionCall {
            name: Some(name),
            constructor: None,
            func: None,
            intrinsic: Some(method),
            args,
        }),
        SourceArea::default(),
    )
}

/// A call to a user-defined function.
pub fn function_call(ident: &str, func: Handle<FunctionDecl>, args: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::Call(FunctionCall {
            name: Some(VarIdent::with_symbol(ident, SymbolRef::Function(func))),
            constructor: None,
            func: Some(func),
            intrinsic: None,
            args,
        }),
        SourceArea::default(),
    )
}

pub fn binary(lhs: Expr, op: BinaryOp, rhs: Expr) -> Expr {
    Expr::new(
        ExprKind::Binary {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        },
        SourceArea::default(),
    )
}

pub fn ret(expr: Option<Expr>) -> Stmt {
    Stmt::new(StmtKind::Return { expr }, SourceArea::default())
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::new(StmtKind::Expr(expr), SourceArea::default())
}

pub fn block(stmts: Vec<Stmt>) -> CodeBlock {
    CodeBlock { stmts }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_links_struct_members_to_their_struct() {
        let mut b = ProgramBuilder::new();
        let (s, members) = b.struct_decl(
            "VsOut",
            &[("position", TypeDenoter::Base(DataType::Float4), Some("SV_Position"))],
        );
        let program = b.finish();
        assert_eq!(program.var_decls[members[0]].struct_decl, Some(s));
        assert_eq!(program.struct_member(s, "position"), Some(members[0]));
    }

    #[test]
    fn forward_decl_links_both_ways() {
        let mut b = ProgramBuilder::new();
        let f = b.function(
            "helper",
            TypeDenoter::Base(DataType::Float),
            None,
            vec![],
            block(vec![ret(Some(lit_float("1.0")))]),
        );
        let fwd = b.forward_decl(f);
        let program = b.finish();
        assert_eq!(program.functions[fwd].impl_decl, Some(f));
        assert_eq!(program.functions[f].forward_decls, vec![fwd]);
        assert!(program.functions[fwd].is_forward_decl());
    }

    #[test]
    fn find_function_prefers_implementations() {
        let mut b = ProgramBuilder::new();
        let f = b.function(
            "helper",
            TypeDenoter::Void,
            None,
            vec![],
            block(vec![ret(None)]),
        );
        b.forward_decl(f);
        let program = b.finish();
        assert_eq!(program.find_function("helper"), Some(f));
    }
}
