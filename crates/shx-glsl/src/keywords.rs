//! Keyword tables mapping HLSL names onto GLSL spellings.
//!
//! These are process-wide constant mappings exposed as pure lookup
//! functions; an unmappable input surfaces as a [`MappingError`] at the call
//! site that consulted the table.
//!
//! [`MappingError`]: shx_ast::ErrorKind::Mapping

use shx_ast::ast::{AttributeValue, InterpModifier, PrimitiveType, ShaderTarget, StorageClass};
use shx_ast::ty::{BufferType, DataType};
use shx_ast::{Intrinsic, Semantic};

/// GLSL type keyword for a data type.
///
/// Half-precision types map to the single-precision spellings; boolean and
/// integer matrices have no GLSL counterpart.
pub fn data_type_keyword(dt: DataType) -> Option<&'static str> {
    use DataType::*;
    let keyword = match dt {
        Bool => "bool",
        Int => "int",
        UInt => "uint",
        Half | Float => "float",
        Double => "double",

        Bool2 => "bvec2",
        Bool3 => "bvec3",
        Bool4 => "bvec4",
        Int2 => "ivec2",
        Int3 => "ivec3",
        Int4 => "ivec4",
        UInt2 => "uvec2",
        UInt3 => "uvec3",
        UInt4 => "uvec4",
        Half2 | Float2 => "vec2",
        Half3 | Float3 => "vec3",
        Half4 | Float4 => "vec4",
        Double2 => "dvec2",
        Double3 => "dvec3",
        Double4 => "dvec4",

        Half2x2 | Float2x2 => "mat2",
        Half2x3 | Float2x3 => "mat2x3",
        Half2x4 | Float2x4 => "mat2x4",
        Half3x2 | Float3x2 => "mat3x2",
        Half3x3 | Float3x3 => "mat3",
        Half3x4 | Float3x4 => "mat3x4",
        Half4x2 | Float4x2 => "mat4x2",
        Half4x3 | Float4x3 => "mat4x3",
        Half4x4 | Float4x4 => "mat4",

        Double2x2 => "dmat2",
        Double2x3 => "dmat2x3",
        Double2x4 => "dmat2x4",
        Double3x2 => "dmat3x2",
        Double3x3 => "dmat3",
        Double3x4 => "dmat3x4",
        Double4x2 => "dmat4x2",
        Double4x3 => "dmat4x3",
        Double4x4 => "dmat4",

        // bool/int/uint matrices and string literals do not exist in GLSL.
        _ => return None,
    };
    Some(keyword)
}

/// GLSL input-layout qualifier for a geometry-shader input primitive.
pub fn primitive_type_keyword(primitive: PrimitiveType) -> &'static str {
    match primitive {
        PrimitiveType::Point => "points",
        PrimitiveType::Line => "lines",
        PrimitiveType::LineAdj => "lines_adjacency",
        PrimitiveType::Triangle => "triangles",
        PrimitiveType::TriangleAdj => "triangles_adjacency",
    }
}

/// GLSL output-layout qualifier for a geometry-shader stream type.
pub fn stream_primitive_keyword(stream: BufferType) -> Option<&'static str> {
    match stream {
        BufferType::PointStream => Some("points"),
        BufferType::LineStream => Some("line_strip"),
        BufferType::TriangleStream => Some("triangle_strip"),
        _ => None,
    }
}

/// GLSL tessellation-evaluation layout qualifier for a captured attribute
/// value. `[outputtopology("line")]` has no qualifier of its own; an
/// isoline domain already implies it.
pub fn tess_layout_keyword(value: AttributeValue) -> Option<&'static str> {
    match value {
        AttributeValue::DomainTri => Some("triangles"),
        AttributeValue::DomainQuad => Some("quads"),
        AttributeValue::DomainIsoline => Some("isolines"),
        AttributeValue::PartitioningInteger | AttributeValue::PartitioningPow2 => {
            Some("equal_spacing")
        }
        AttributeValue::PartitioningFractionalEven => Some("fractional_even_spacing"),
        AttributeValue::PartitioningFractionalOdd => Some("fractional_odd_spacing"),
        AttributeValue::OutputTopologyTriangleCw => Some("cw"),
        AttributeValue::OutputTopologyTriangleCcw => Some("ccw"),
        AttributeValue::OutputTopologyPoint => Some("point_mode"),
        AttributeValue::OutputTopologyLine => None,
    }
}

/// GLSL sampler/image keyword for a texture or buffer object type.
pub fn buffer_type_keyword(bt: BufferType) -> Option<&'static str> {
    let keyword = match bt {
        BufferType::Buffer => "samplerBuffer",
        BufferType::RwBuffer => "imageBuffer",

        BufferType::RwTexture1D => "image1D",
        BufferType::RwTexture1DArray => "image1DArray",
        BufferType::RwTexture2D => "image2D",
        BufferType::RwTexture2DArray => "image2DArray",
        BufferType::RwTexture3D => "image3D",

        BufferType::Texture1D => "sampler1D",
        BufferType::Texture1DArray => "sampler1DArray",
        BufferType::Texture2D => "sampler2D",
        BufferType::Texture2DArray => "sampler2DArray",
        BufferType::Texture3D => "sampler3D",
        BufferType::TextureCube => "samplerCube",
        BufferType::TextureCubeArray => "samplerCubeArray",
        BufferType::Texture2DMs => "sampler2DMS",
        BufferType::Texture2DMsArray => "sampler2DMSArray",

        // Structured/byte-address buffers, patches, streams and the generic
        // `Texture` type have no direct keyword.
        _ => return None,
    };
    Some(keyword)
}

/// GLSL built-in variable for a system-value semantic.
///
/// `SV_Position` depends on stage and direction: it is `gl_FragCoord` as a
/// fragment input and `gl_Position` otherwise. `SV_Target` maps to a
/// generated output variable, not a built-in, so it resolves to `None` here.
pub fn semantic_keyword(
    semantic: &Semantic,
    target: ShaderTarget,
    is_input: bool,
) -> Option<&'static str> {
    let keyword = match semantic {
        Semantic::ClipDistance => "gl_ClipDistance",
        Semantic::CullDistance => "gl_CullDistance",
        Semantic::Depth | Semantic::DepthGreaterEqual | Semantic::DepthLessEqual => "gl_FragDepth",
        Semantic::DispatchThreadId => "gl_GlobalInvocationID",
        Semantic::DomainLocation => "gl_TessCoord",
        Semantic::GroupId => "gl_WorkGroupID",
        Semantic::GroupIndex => "gl_LocalInvocationIndex",
        Semantic::GroupThreadId => "gl_LocalInvocationID",
        Semantic::GsInstanceId => "gl_InvocationID",
        Semantic::InsideTessFactor => "gl_TessLevelInner",
        Semantic::InstanceId => "gl_InstanceID",
        Semantic::IsFrontFace => "gl_FrontFacing",
        Semantic::OutputControlPointId => "gl_InvocationID",
        Semantic::Position => {
            if target == ShaderTarget::Fragment && is_input {
                "gl_FragCoord"
            } else {
                "gl_Position"
            }
        }
        Semantic::PrimitiveId => "gl_PrimitiveID",
        Semantic::RenderTargetArrayIndex => "gl_Layer",
        Semantic::SampleIndex => "gl_SampleID",
        Semantic::TessFactor => "gl_TessLevelOuter",
        Semantic::VertexId => "gl_VertexID",
        Semantic::ViewportArrayIndex => "gl_ViewportIndex",
        Semantic::Coverage | Semantic::StencilRef | Semantic::Target | Semantic::UserDefined(_) => {
            return None;
        }
    };
    Some(keyword)
}

/// GLSL function name for an intrinsic.
///
/// `mul`, `rcp` and `saturate` are rewritten into expressions by the
/// generator and resolve to `None`; `clip` resolves to the emitted helper.
pub fn intrinsic_keyword(intrinsic: Intrinsic) -> Option<&'static str> {
    use Intrinsic::*;
    let keyword = match intrinsic {
        Abs => "abs",
        Acos => "acos",
        All => "all",
        Any => "any",
        Asin => "asin",
        Atan => "atan",
        Atan2 => "atan",
        Ceil => "ceil",
        Clamp => "clamp",
        Clip => "clip",
        Cos => "cos",
        Cosh => "cosh",
        Cross => "cross",
        Ddx => "dFdx",
        Ddy => "dFdy",
        Degrees => "degrees",
        Determinant => "determinant",
        Distance => "distance",
        Dot => "dot",
        Exp => "exp",
        Exp2 => "exp2",
        Floor => "floor",
        Fmod => "mod",
        Frac => "fract",
        IsInf => "isinf",
        IsNan => "isnan",
        Length => "length",
        Lerp => "mix",
        Log => "log",
        Log2 => "log2",
        Mad => "fma",
        Max => "max",
        Min => "min",
        Normalize => "normalize",
        Pow => "pow",
        Radians => "radians",
        Reflect => "reflect",
        Refract => "refract",
        Round => "round",
        Rsqrt => "inversesqrt",
        Sign => "sign",
        Sin => "sin",
        Sinh => "sinh",
        SmoothStep => "smoothstep",
        Sqrt => "sqrt",
        Step => "step",
        Tan => "tan",
        Tanh => "tanh",
        Transpose => "transpose",
        Trunc => "trunc",

        InterlockedAdd => "atomicAdd",
        InterlockedAnd => "atomicAnd",
        InterlockedCompareExchange => "atomicCompSwap",
        InterlockedExchange => "atomicExchange",
        InterlockedMax => "atomicMax",
        InterlockedMin => "atomicMin",
        InterlockedOr => "atomicOr",
        InterlockedXor => "atomicXor",

        TextureGetDimensions => "textureSize",
        TextureLoad => "texelFetch",
        TextureSample => "texture",
        TextureSampleBias => "textureOffset",
        TextureSampleGrad => "textureGrad",
        TextureSampleLevel => "textureLod",

        Mul | Rcp | Saturate | TextureSampleCmp | TextureSampleCmpLevelZero => return None,
    };
    Some(keyword)
}

/// Argument count bounds for intrinsics the converter validates.
pub fn intrinsic_arity(intrinsic: Intrinsic) -> Option<(usize, usize)> {
    use Intrinsic::*;
    let bounds = match intrinsic {
        Mul => (2, 2),
        Rcp => (1, 1),
        Clip => (1, 1),
        Dot | Cross | Step | Atan2 | Fmod | Distance | Reflect | Pow => (2, 2),
        Lerp | Clamp | SmoothStep | Mad | Refract => (3, 3),
        InterlockedCompareExchange => (3, 4),
        i if i.is_atomic() => (2, 3),
        _ => return None,
    };
    Some(bounds)
}

/// GLSL storage-class keyword; `None` for classes that are silently dropped
/// (`static`, `extern`).
pub fn storage_class_keyword(class: StorageClass) -> Option<&'static str> {
    match class {
        StorageClass::GroupShared | StorageClass::Shared => Some("shared"),
        StorageClass::Precise => Some("precise"),
        StorageClass::Volatile => Some("volatile"),
        StorageClass::Static | StorageClass::Extern => None,
    }
}

/// GLSL interpolation-modifier keyword.
pub fn interp_modifier_keyword(modifier: InterpModifier) -> &'static str {
    match modifier {
        InterpModifier::NoInterpolation => "flat",
        InterpModifier::Linear => "smooth",
        InterpModifier::Centroid => "centroid",
        InterpModifier::NoPerspective => "noperspective",
        InterpModifier::Sample => "sample",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_types_collapse_to_float_spellings() {
        assert_eq!(data_type_keyword(DataType::Half3), Some("vec3"));
        assert_eq!(data_type_keyword(DataType::Half4x4), Some("mat4"));
        assert_eq!(data_type_keyword(DataType::Double3), Some("dvec3"));
    }

    #[test]
    fn integer_matrices_have_no_keyword() {
        assert_eq!(data_type_keyword(DataType::Int3x3), None);
        assert_eq!(data_type_keyword(DataType::Bool2x2), None);
    }

    #[test]
    fn position_semantic_depends_on_stage_and_direction() {
        assert_eq!(
            semantic_keyword(&Semantic::Position, ShaderTarget::Vertex, false),
            Some("gl_Position")
        );
        assert_eq!(
            semantic_keyword(&Semantic::Position, ShaderTarget::Fragment, true),
            Some("gl_FragCoord")
        );
        assert_eq!(
            semantic_keyword(&Semantic::Target, ShaderTarget::Fragment, false),
            None
        );
    }

    #[test]
    fn tess_and_geometry_qualifiers_map_to_glsl() {
        assert_eq!(primitive_type_keyword(PrimitiveType::TriangleAdj), "triangles_adjacency");
        assert_eq!(
            stream_primitive_keyword(BufferType::TriangleStream),
            Some("triangle_strip")
        );
        assert_eq!(stream_primitive_keyword(BufferType::Texture2D), None);
        assert_eq!(
            tess_layout_keyword(AttributeValue::PartitioningFractionalOdd),
            Some("fractional_odd_spacing")
        );
        assert_eq!(tess_layout_keyword(AttributeValue::OutputTopologyLine), None);
    }

    #[test]
    fn texture_methods_map_to_free_functions() {
        assert_eq!(intrinsic_keyword(Intrinsic::TextureSample), Some("texture"));
        assert_eq!(intrinsic_keyword(Intrinsic::TextureLoad), Some("texelFetch"));
        assert_eq!(
            intrinsic_keyword(Intrinsic::TextureSampleLevel),
            Some("textureLod")
        );
        assert_eq!(intrinsic_keyword(Intrinsic::TextureSampleCmp), None);
    }
}
