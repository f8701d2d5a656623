//! HLSL → GLSL back end.
//!
//! Takes a fully parsed and type-resolved [`Program`] (built by the front
//! end through `shx_ast::builder`) plus a [`ShaderInput`]/[`ShaderOutput`]
//! descriptor pair, and produces the UTF-8 source text of one GLSL
//! translation unit. The pipeline is reference analysis → AST conversion →
//! extension resolution → code generation; see the module docs for the
//! individual stages.
//!
//! A compilation is single-threaded and owns no global mutable state;
//! multiple compilations may run in parallel on disjoint programs.

#![forbid(unsafe_code)]

pub mod convert;
pub mod extension;
pub mod generator;
pub mod keywords;
pub mod options;
pub mod reference;
pub mod reflection;
pub mod writer;

use tracing::debug_span;

use shx_ast::ast::{AttributeKind, FunctionFlags};
use shx_ast::{Error, Program, Report};

pub use crate::options::{
    expand_output_pattern, Formatting, InputVersion, OutputVersion, ShaderInput, ShaderOutput,
};
pub use crate::reflection::{BindingSlot, Reflection};
pub use shx_ast::ShaderTarget;

/// The result of a successful translation.
#[derive(Debug, Clone)]
pub struct Translation {
    /// Source text of the GLSL translation unit.
    pub glsl: String,
    /// Resource reflection, when requested via [`ShaderOutput::reflect`].
    pub reflection: Option<Reflection>,
    /// Non-fatal diagnostics; these never suppress output.
    pub warnings: Vec<Report>,
}

/// Translates `program` into GLSL for the given entry point and stage.
///
/// On error the output is discarded and a structured [`Report`] carrying the
/// offending node's source area is returned instead.
pub fn translate(
    program: &mut Program,
    input: &ShaderInput,
    output: &ShaderOutput,
) -> Result<Translation, Report> {
    let _span = debug_span!(
        "translate",
        entry = %input.entry_point,
        stage = %input.target,
        version = %output.version,
    )
    .entered();

    resolve_entry_points(program, input).map_err(Report::from)?;
    // Shader-model 3 fragment shaders keep their screen-space conventions.
    if input.target == ShaderTarget::Fragment && input.input_version == InputVersion::Hlsl3 {
        program.layout_fragment.screen_space_sm3 = true;
    }
    reference::analyze(program).map_err(Report::from)?;
    let mut warnings = convert::convert(program, input.target).map_err(Report::from)?;
    let generated = generator::generate(program, input, output).map_err(Report::from)?;
    warnings.extend(generated.warnings);

    Ok(Translation {
        glsl: generated.glsl,
        reflection: generated.reflection,
        warnings,
    })
}

/// Resolves the entry point (and the secondary entry point, if any) by name
/// and flags them on the program.
fn resolve_entry_points(program: &mut Program, input: &ShaderInput) -> Result<(), Error> {
    let entry = if input.entry_point.is_empty() {
        program.entry_point
    } else {
        program.find_function(&input.entry_point)
    };
    let entry = entry.ok_or_else(|| {
        Error::missing_reference(format!("entry point \"{}\" not found", input.entry_point))
    })?;
    program.entry_point = Some(entry);
    program.functions[entry].fn_flags |= FunctionFlags::ENTRY_POINT;

    if let Some(secondary) = &input.secondary_entry_point {
        let handle = program.find_function(secondary).ok_or_else(|| {
            Error::missing_reference(format!("secondary entry point \"{secondary}\" not found"))
        })?;
        program.functions[handle].fn_flags |= FunctionFlags::SECONDARY_ENTRY_POINT;
        if input.target == ShaderTarget::TessControl {
            program.layout_tess_control.patch_const_function = Some(handle);
        }
    }

    // `[patchconstantfunc("...")]` on the entry point names the secondary
    // entry point inline.
    let patch_fn_name = program.functions[entry]
        .attribs
        .iter()
        .find(|attrib| attrib.kind == AttributeKind::PatchConstantFunc)
        .and_then(|attrib| attrib.args.first())
        .and_then(convert::attribute_string)
        .map(str::to_string);
    if let Some(name) = patch_fn_name {
        let handle = program.find_function(&name).ok_or_else(|| {
            Error::missing_reference(format!("patch-constant function \"{name}\" not found"))
        })?;
        program.functions[handle].fn_flags |= FunctionFlags::SECONDARY_ENTRY_POINT;
        if input.target == ShaderTarget::TessControl {
            program.layout_tess_control.patch_const_function = Some(handle);
        }
    }
    Ok(())
}
