//! Compilation descriptors: what to translate and how to format the output.

use std::fmt;
use std::str::FromStr;

use shx_ast::ShaderTarget;

/// Source language/version of the input, as selected by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputVersion {
    Hlsl3,
    Hlsl4,
    Hlsl5,
    Glsl,
    Essl,
    Vksl,
}

impl FromStr for InputVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HLSL3" => Ok(InputVersion::Hlsl3),
            "HLSL4" => Ok(InputVersion::Hlsl4),
            "HLSL5" => Ok(InputVersion::Hlsl5),
            "GLSL" => Ok(InputVersion::Glsl),
            "ESSL" => Ok(InputVersion::Essl),
            "VKSL" => Ok(InputVersion::Vksl),
            other => Err(format!("unknown input version '{other}'")),
        }
    }
}

/// Output shading-language dialect and version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutputVersion {
    Glsl110,
    Glsl120,
    Glsl130,
    Glsl140,
    Glsl150,
    Glsl330,
    Glsl400,
    Glsl410,
    Glsl420,
    Glsl430,
    Glsl440,
    Glsl450,
    Essl100,
    Essl300,
    Essl310,
    Essl320,
    Vksl450,
}

impl OutputVersion {
    /// The number written on the `#version` line.
    pub fn number(self) -> u16 {
        match self {
            OutputVersion::Glsl110 => 110,
            OutputVersion::Glsl120 => 120,
            OutputVersion::Glsl130 => 130,
            OutputVersion::Glsl140 => 140,
            OutputVersion::Glsl150 => 150,
            OutputVersion::Glsl330 => 330,
            OutputVersion::Glsl400 => 400,
            OutputVersion::Glsl410 => 410,
            OutputVersion::Glsl420 => 420,
            OutputVersion::Glsl430 => 430,
            OutputVersion::Glsl440 => 440,
            OutputVersion::Glsl450 => 450,
            OutputVersion::Essl100 => 100,
            OutputVersion::Essl300 => 300,
            OutputVersion::Essl310 => 310,
            OutputVersion::Essl320 => 320,
            OutputVersion::Vksl450 => 450,
        }
    }

    pub fn is_essl(self) -> bool {
        (OutputVersion::Essl100..=OutputVersion::Essl320).contains(&self)
    }

    pub fn is_vksl(self) -> bool {
        self == OutputVersion::Vksl450
    }

    pub fn is_glsl(self) -> bool {
        !self.is_essl() && !self.is_vksl()
    }

    /// The desktop-GLSL feature level used by the version gates of the
    /// extension agent. ESSL versions are mapped to the closest desktop
    /// level.
    pub fn feature_level(self) -> u16 {
        match self {
            OutputVersion::Essl100 => 120,
            OutputVersion::Essl300 => 330,
            OutputVersion::Essl310 => 430,
            OutputVersion::Essl320 => 450,
            other => other.number(),
        }
    }

    /// The complete `#version` directive line.
    pub fn version_line(self) -> String {
        if self.is_essl() {
            format!("#version {} es", self.number())
        } else {
            format!("#version {}", self.number())
        }
    }
}

impl fmt::Display for OutputVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let family = if self.is_essl() {
            "ESSL"
        } else if self.is_vksl() {
            "VKSL"
        } else {
            "GLSL"
        };
        write!(f, "{family}{}", self.number())
    }
}

impl FromStr for OutputVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let version = match s {
            "GLSL110" => OutputVersion::Glsl110,
            "GLSL120" => OutputVersion::Glsl120,
            "GLSL130" => OutputVersion::Glsl130,
            "GLSL140" => OutputVersion::Glsl140,
            "GLSL150" => OutputVersion::Glsl150,
            "GLSL330" => OutputVersion::Glsl330,
            "GLSL400" => OutputVersion::Glsl400,
            "GLSL410" => OutputVersion::Glsl410,
            "GLSL420" => OutputVersion::Glsl420,
            "GLSL430" => OutputVersion::Glsl430,
            "GLSL440" => OutputVersion::Glsl440,
            "GLSL450" => OutputVersion::Glsl450,
            "ESSL100" => OutputVersion::Essl100,
            "ESSL300" => OutputVersion::Essl300,
            "ESSL310" => OutputVersion::Essl310,
            "ESSL320" => OutputVersion::Essl320,
            "VKSL450" => OutputVersion::Vksl450,
            other => return Err(format!("unknown output version '{other}'")),
        };
        Ok(version)
    }
}

/// Output text formatting options.
#[derive(Debug, Clone)]
pub struct Formatting {
    /// Indentation unit; whitespace only.
    pub indent: String,
    /// Prefix prepended to every emitted local declaration identifier.
    pub prefix: String,
    /// Emit `#line` markers relating output to input rows.
    pub line_marks: bool,
    /// Emit blank lines between declarations.
    pub blanks: bool,
    /// Emit the banner comment and source commentaries.
    pub comments: bool,
}

impl Default for Formatting {
    fn default() -> Self {
        Self {
            indent: "    ".into(),
            prefix: "shx_".into(),
            line_marks: false,
            blanks: true,
            comments: true,
        }
    }
}

/// What to compile: source version, target stage and entry point(s).
#[derive(Debug, Clone)]
pub struct ShaderInput {
    pub target: ShaderTarget,
    pub entry_point: String,
    /// Secondary entry point (e.g. the patch-constant function of a
    /// tessellation-control shader).
    pub secondary_entry_point: Option<String>,
    /// Source language/version. Shader-model 3 inputs keep their
    /// screen-space conventions in the fragment stage.
    pub input_version: InputVersion,
}

impl ShaderInput {
    pub fn new(target: ShaderTarget, entry_point: impl Into<String>) -> Self {
        Self {
            target,
            entry_point: entry_point.into(),
            secondary_entry_point: None,
            input_version: InputVersion::Hlsl5,
        }
    }
}

/// How to emit: output version, formatting, extension policy, reflection.
#[derive(Debug, Clone)]
pub struct ShaderOutput {
    pub version: OutputVersion,
    pub format: Formatting,
    /// Permit `#extension` directives when the version alone is too low.
    pub extensions: bool,
    /// Populate the reflection record.
    pub reflect: bool,
}

impl ShaderOutput {
    pub fn new(version: OutputVersion) -> Self {
        Self {
            version,
            format: Formatting::default(),
            extensions: false,
            reflect: false,
        }
    }
}

/// Expands the driver's `-o` pattern: the literal `*` becomes
/// `<FILE>.<ENTRY>.<TARGET>`.
pub fn expand_output_pattern(
    pattern: &str,
    file: &str,
    entry: &str,
    target: ShaderTarget,
) -> String {
    pattern.replace('*', &format!("{file}.{entry}.{}", target.file_ext()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn version_lines_follow_the_dialect() {
        assert_eq!(OutputVersion::Glsl130.version_line(), "#version 130");
        assert_eq!(OutputVersion::Essl300.version_line(), "#version 300 es");
        assert_eq!(OutputVersion::Vksl450.version_line(), "#version 450");
    }

    #[test]
    fn output_versions_parse_from_driver_spelling() {
        assert_eq!("GLSL450".parse(), Ok(OutputVersion::Glsl450));
        assert_eq!("ESSL310".parse(), Ok(OutputVersion::Essl310));
        assert!("GLSL460".parse::<OutputVersion>().is_err());
    }

    #[test]
    fn output_pattern_expands_star() {
        let name = expand_output_pattern("out/*", "shader.hlsl", "VS", ShaderTarget::Vertex);
        assert_eq!(name, "out/shader.hlsl.VS.vert");
        assert_eq!(
            expand_output_pattern("fixed.frag", "f", "PS", ShaderTarget::Fragment),
            "fixed.frag"
        );
    }
}
