//! Typed AST, type denoters and diagnostics for the shx shader
//! cross-compiler.
//!
//! This crate models a fully parsed and type-resolved HLSL translation unit:
//! the [`Program`] owns every declaration in typed arenas, statement and
//! expression trees own their children, and all cross-references are
//! non-owning [`Handle`]s filled by the front end (see [`builder`]). The
//! back-end pipeline that turns a program into GLSL lives in the `shx-glsl`
//! crate.

#![forbid(unsafe_code)]

pub mod arena;
pub mod ast;
pub mod builder;
pub mod intrinsic;
pub mod report;
pub mod semantic;
pub mod ty;

pub use arena::{Arena, Handle};
pub use ast::{Program, ShaderTarget};
pub use intrinsic::{Intrinsic, IntrinsicUsage};
pub use report::{Error, ErrorKind, Report, Severity, SourceArea};
pub use semantic::{IndexedSemantic, Semantic};
pub use ty::{BufferType, DataType, SamplerType, TypeDenoter, UniformBufferType};
