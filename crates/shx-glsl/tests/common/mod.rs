//! Shared helpers for the translation tests.

use shx_ast::ty::TypeDenoter;
use shx_ast::{DataType, Program, ShaderTarget};
use shx_glsl::{translate, OutputVersion, ShaderInput, ShaderOutput, Translation};

pub fn base(dt: DataType) -> TypeDenoter {
    TypeDenoter::Base(dt)
}

/// Translates with default formatting and panics on failure.
pub fn translate_ok(
    program: &mut Program,
    target: ShaderTarget,
    entry: &str,
    version: OutputVersion,
) -> Translation {
    translate(
        program,
        &ShaderInput::new(target, entry),
        &ShaderOutput::new(version),
    )
    .unwrap_or_else(|report| panic!("translation failed: {report}"))
}

/// Translates with extensions enabled.
#[allow(dead_code)]
pub fn translate_with_extensions(
    program: &mut Program,
    target: ShaderTarget,
    entry: &str,
    version: OutputVersion,
) -> Translation {
    let mut output = ShaderOutput::new(version);
    output.extensions = true;
    translate(program, &ShaderInput::new(target, entry), &output)
        .unwrap_or_else(|report| panic!("translation failed: {report}"))
}

/// Asserts that `haystack` contains `needle`, with a readable failure.
pub fn assert_contains(haystack: &str, needle: &str) {
    assert!(
        haystack.contains(needle),
        "expected output to contain {needle:?}, got:\n{haystack}"
    );
}

#[allow(dead_code)]
pub fn assert_not_contains(haystack: &str, needle: &str) {
    assert!(
        !haystack.contains(needle),
        "expected output to NOT contain {needle:?}, got:\n{haystack}"
    );
}
