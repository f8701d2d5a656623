//! GLSL extension agent.
//!
//! Scans the converted program and the requested output version and computes
//! the `#extension` directives required to express it. Each rule names the
//! minimum core version that makes the extension unnecessary; when the
//! requested version is below every applicable gate and extensions are
//! disabled, the compilation fails with a version mismatch.

use std::collections::BTreeSet;

use tracing::debug;

use shx_ast::ast::{NodeFlags, ShaderTarget};
use shx_ast::ty::TypeDenoter;
use shx_ast::{Error, ErrorKind, Program};

use crate::options::OutputVersion;

pub const GL_EXT_TEXTURE_ARRAY: &str = "GL_EXT_texture_array";
pub const GL_ARB_SHADING_LANGUAGE_420PACK: &str = "GL_ARB_shading_language_420pack";
pub const GL_ARB_SHADER_ATOMIC_COUNTERS: &str = "GL_ARB_shader_atomic_counters";
pub const GL_ARB_FRAGMENT_COORD_CONVENTIONS: &str = "GL_ARB_fragment_coord_conventions";
pub const GL_ARB_GPU_SHADER_FP64: &str = "GL_ARB_gpu_shader_fp64";
pub const GL_ARB_SHADER_IMAGE_LOAD_STORE: &str = "GL_ARB_shader_image_load_store";

struct Rule {
    min_version: u16,
    extension: &'static str,
}

/// Determines the extension directives required for `program` at `version`.
///
/// Fails with [`ErrorKind::VersionMismatch`] when a gate is not met and
/// `allow_extensions` is false.
pub fn required_extensions(
    program: &Program,
    target: ShaderTarget,
    version: OutputVersion,
    allow_extensions: bool,
) -> Result<Vec<&'static str>, Error> {
    let mut rules = Vec::new();

    if uses_texture_arrays(program) {
        rules.push(Rule {
            min_version: 150,
            extension: GL_EXT_TEXTURE_ARRAY,
        });
    }
    if uses_explicit_bindings(program) {
        rules.push(Rule {
            min_version: 420,
            extension: GL_ARB_SHADING_LANGUAGE_420PACK,
        });
    }
    if program.used_intrinsics.keys().any(|i| i.is_atomic()) {
        rules.push(Rule {
            min_version: 430,
            extension: GL_ARB_SHADER_ATOMIC_COUNTERS,
        });
    }
    if target == ShaderTarget::Fragment && program.layout_fragment.screen_space_sm3 {
        rules.push(Rule {
            min_version: 150,
            extension: GL_ARB_FRAGMENT_COORD_CONVENTIONS,
        });
    }
    if target == ShaderTarget::Fragment && program.layout_fragment.early_depth_stencil {
        rules.push(Rule {
            min_version: 420,
            extension: GL_ARB_SHADER_IMAGE_LOAD_STORE,
        });
    }
    if uses_double_precision(program) {
        rules.push(Rule {
            min_version: 400,
            extension: GL_ARB_GPU_SHADER_FP64,
        });
    }

    let level = version.feature_level();
    let mut extensions = BTreeSet::new();
    for rule in rules {
        if level >= rule.min_version {
            continue;
        }
        if !allow_extensions {
            return Err(Error::new(ErrorKind::VersionMismatch {
                requested: version.number(),
                required: rule.min_version,
            }));
        }
        extensions.insert(rule.extension);
    }

    let extensions: Vec<_> = extensions.into_iter().collect();
    debug!(?extensions, level, "extension requirements resolved");
    Ok(extensions)
}

fn uses_texture_arrays(program: &Program) -> bool {
    program
        .buffer_decls
        .iter()
        .any(|(_, decl)| decl.flags.contains(NodeFlags::REACHABLE) && decl.buffer_type.is_array_texture())
}

fn uses_explicit_bindings(program: &Program) -> bool {
    let buffers = program
        .uniform_buffers
        .iter()
        .filter(|(_, decl)| decl.flags.contains(NodeFlags::REACHABLE))
        .any(|(_, decl)| !decl.slot_registers.is_empty());
    let textures = program
        .buffer_decls
        .iter()
        .filter(|(_, decl)| decl.flags.contains(NodeFlags::REACHABLE))
        .any(|(_, decl)| !decl.slot_registers.is_empty());
    buffers || textures
}

fn uses_double_precision(program: &Program) -> bool {
    let var_uses_double = |denoter: &TypeDenoter| -> bool {
        fn walk(denoter: &TypeDenoter) -> bool {
            match denoter {
                TypeDenoter::Base(dt) => dt.is_double(),
                TypeDenoter::Array { base, .. } => walk(base),
                TypeDenoter::Buffer {
                    elem: Some(elem), ..
                } => walk(elem),
                _ => false,
            }
        }
        walk(denoter)
    };

    let decls = program
        .var_decls
        .iter()
        .filter(|(_, var)| var.flags.contains(NodeFlags::REACHABLE))
        .any(|(_, var)| var_uses_double(&var.type_spec.denoter));
    let intrinsics = program
        .used_intrinsics
        .values()
        .flat_map(|usage| usage.arg_lists.iter())
        .flatten()
        .any(|dt| dt.is_double());
    decls || intrinsics
}
