//! Intrinsic function identifiers and their recorded usages.

use std::collections::BTreeSet;

use crate::ty::DataType;

/// HLSL intrinsic functions understood by the back end.
///
/// Ordering groups the atomic family and the texture-method family into
/// contiguous runs so the classification predicates are range checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Intrinsic {
    Abs,
    Acos,
    All,
    Any,
    Asin,
    Atan,
    Atan2,
    Ceil,
    Clamp,
    Clip,
    Cos,
    Cosh,
    Cross,
    Ddx,
    Ddy,
    Degrees,
    Determinant,
    Distance,
    Dot,
    Exp,
    Exp2,
    Floor,
    Fmod,
    Frac,
    IsInf,
    IsNan,
    Length,
    Lerp,
    Log,
    Log2,
    Mad,
    Max,
    Min,
    Mul,
    Normalize,
    Pow,
    Radians,
    Rcp,
    Reflect,
    Refract,
    Round,
    Rsqrt,
    Saturate,
    Sign,
    Sin,
    Sinh,
    SmoothStep,
    Sqrt,
    Step,
    Tan,
    Tanh,
    Transpose,
    Trunc,

    // Atomic family (`Interlocked*`); keep contiguous.
    InterlockedAdd,
    InterlockedAnd,
    InterlockedCompareExchange,
    InterlockedExchange,
    InterlockedMax,
    InterlockedMin,
    InterlockedOr,
    InterlockedXor,

    // Texture methods; keep contiguous. The receiver object becomes the
    // first argument of the GLSL free function.
    TextureGetDimensions,
    TextureLoad,
    TextureSample,
    TextureSampleBias,
    TextureSampleCmp,
    TextureSampleCmpLevelZero,
    TextureSampleGrad,
    TextureSampleLevel,
}

impl Intrinsic {
    pub fn is_atomic(self) -> bool {
        (Intrinsic::InterlockedAdd..=Intrinsic::InterlockedXor).contains(&self)
    }

    pub fn is_texture_method(self) -> bool {
        (Intrinsic::TextureGetDimensions..=Intrinsic::TextureSampleLevel).contains(&self)
    }

    /// Resolves an HLSL texture member-function name (`Sample`, `Load`, ...).
    pub fn texture_method(name: &str) -> Option<Intrinsic> {
        match name {
            "GetDimensions" => Some(Intrinsic::TextureGetDimensions),
            "Load" => Some(Intrinsic::TextureLoad),
            "Sample" => Some(Intrinsic::TextureSample),
            "SampleBias" => Some(Intrinsic::TextureSampleBias),
            "SampleCmp" => Some(Intrinsic::TextureSampleCmp),
            "SampleCmpLevelZero" => Some(Intrinsic::TextureSampleCmpLevelZero),
            "SampleGrad" => Some(Intrinsic::TextureSampleGrad),
            "SampleLevel" => Some(Intrinsic::TextureSampleLevel),
            _ => None,
        }
    }

    /// The HLSL spelling, used in diagnostics.
    pub fn hlsl_name(self) -> &'static str {
        match self {
            Intrinsic::Abs => "abs",
            Intrinsic::Acos => "acos",
            Intrinsic::All => "all",
            Intrinsic::Any => "any",
            Intrinsic::Asin => "asin",
            Intrinsic::Atan => "atan",
            Intrinsic::Atan2 => "atan2",
            Intrinsic::Ceil => "ceil",
            Intrinsic::Clamp => "clamp",
            Intrinsic::Clip => "clip",
            Intrinsic::Cos => "cos",
            Intrinsic::Cosh => "cosh",
            Intrinsic::Cross => "cross",
            Intrinsic::Ddx => "ddx",
            Intrinsic::Ddy => "ddy",
            Intrinsic::Degrees => "degrees",
            Intrinsic::Determinant => "determinant",
            Intrinsic::Distance => "distance",
            Intrinsic::Dot => "dot",
            Intrinsic::Exp => "exp",
            Intrinsic::Exp2 => "exp2",
            Intrinsic::Floor => "floor",
            Intrinsic::Fmod => "fmod",
            Intrinsic::Frac => "frac",
            Intrinsic::IsInf => "isinf",
            Intrinsic::IsNan => "isnan",
            Intrinsic::Length => "length",
            Intrinsic::Lerp => "lerp",
            Intrinsic::Log => "log",
            Intrinsic::Log2 => "log2",
            Intrinsic::Mad => "mad",
            Intrinsic::Max => "max",
            Intrinsic::Min => "min",
            Intrinsic::Mul => "mul",
            Intrinsic::Normalize => "normalize",
            Intrinsic::Pow => "pow",
            Intrinsic::Radians => "radians",
            Intrinsic::Rcp => "rcp",
            Intrinsic::Reflect => "reflect",
            Intrinsic::Refract => "refract",
            Intrinsic::Round => "round",
            Intrinsic::Rsqrt => "rsqrt",
            Intrinsic::Saturate => "saturate",
            Intrinsic::Sign => "sign",
            Intrinsic::Sin => "sin",
            Intrinsic::Sinh => "sinh",
            Intrinsic::SmoothStep => "smoothstep",
            Intrinsic::Sqrt => "sqrt",
            Intrinsic::Step => "step",
            Intrinsic::Tan => "tan",
            Intrinsic::Tanh => "tanh",
            Intrinsic::Transpose => "transpose",
            Intrinsic::Trunc => "trunc",
            Intrinsic::InterlockedAdd => "InterlockedAdd",
            Intrinsic::InterlockedAnd => "InterlockedAnd",
            Intrinsic::InterlockedCompareExchange => "InterlockedCompareExchange",
            Intrinsic::InterlockedExchange => "InterlockedExchange",
            Intrinsic::InterlockedMax => "InterlockedMax",
            Intrinsic::InterlockedMin => "InterlockedMin",
            Intrinsic::InterlockedOr => "InterlockedOr",
            Intrinsic::InterlockedXor => "InterlockedXor",
            Intrinsic::TextureGetDimensions => "GetDimensions",
            Intrinsic::TextureLoad => "Load",
            Intrinsic::TextureSample => "Sample",
            Intrinsic::TextureSampleBias => "SampleBias",
            Intrinsic::TextureSampleCmp => "SampleCmp",
            Intrinsic::TextureSampleCmpLevelZero => "SampleCmpLevelZero",
            Intrinsic::TextureSampleGrad => "SampleGrad",
            Intrinsic::TextureSampleLevel => "SampleLevel",
        }
    }

    /// Resolves a global (non-member) intrinsic name.
    pub fn global(name: &str) -> Option<Intrinsic> {
        let intrinsic = match name {
            "abs" => Intrinsic::Abs,
            "acos" => Intrinsic::Acos,
            "all" => Intrinsic::All,
            "any" => Intrinsic::Any,
            "asin" => Intrinsic::Asin,
            "atan" => Intrinsic::Atan,
            "atan2" => Intrinsic::Atan2,
            "ceil" => Intrinsic::Ceil,
            "clamp" => Intrinsic::Clamp,
            "clip" => Intrinsic::Clip,
            "cos" => Intrinsic::Cos,
            "cosh" => Intrinsic::Cosh,
            "cross" => Intrinsic::Cross,
            "ddx" => Intrinsic::Ddx,
            "ddy" => Intrinsic::Ddy,
            "degrees" => Intrinsic::Degrees,
            "determinant" => Intrinsic::Determinant,
            "distance" => Intrinsic::Distance,
            "dot" => Intrinsic::Dot,
            "exp" => Intrinsic::Exp,
            "exp2" => Intrinsic::Exp2,
            "floor" => Intrinsic::Floor,
            "fmod" => Intrinsic::Fmod,
            "frac" => Intrinsic::Frac,
            "isinf" => Intrinsic::IsInf,
            "isnan" => Intrinsic::IsNan,
            "length" => Intrinsic::Length,
            "lerp" => Intrinsic::Lerp,
            "log" => Intrinsic::Log,
            "log2" => Intrinsic::Log2,
            "mad" => Intrinsic::Mad,
            "max" => Intrinsic::Max,
            "min" => Intrinsic::Min,
            "mul" => Intrinsic::Mul,
            "normalize" => Intrinsic::Normalize,
            "pow" => Intrinsic::Pow,
            "radians" => Intrinsic::Radians,
            "rcp" => Intrinsic::Rcp,
            "reflect" => Intrinsic::Reflect,
            "refract" => Intrinsic::Refract,
            "round" => Intrinsic::Round,
            "rsqrt" => Intrinsic::Rsqrt,
            "saturate" => Intrinsic::Saturate,
            "sign" => Intrinsic::Sign,
            "sin" => Intrinsic::Sin,
            "sinh" => Intrinsic::Sinh,
            "smoothstep" => Intrinsic::SmoothStep,
            "sqrt" => Intrinsic::Sqrt,
            "step" => Intrinsic::Step,
            "tan" => Intrinsic::Tan,
            "tanh" => Intrinsic::Tanh,
            "transpose" => Intrinsic::Transpose,
            "trunc" => Intrinsic::Trunc,
            "InterlockedAdd" => Intrinsic::InterlockedAdd,
            "InterlockedAnd" => Intrinsic::InterlockedAnd,
            "InterlockedCompareExchange" => Intrinsic::InterlockedCompareExchange,
            "InterlockedExchange" => Intrinsic::InterlockedExchange,
            "InterlockedMax" => Intrinsic::InterlockedMax,
            "InterlockedMin" => Intrinsic::InterlockedMin,
            "InterlockedOr" => Intrinsic::InterlockedOr,
            "InterlockedXor" => Intrinsic::InterlockedXor,
            _ => return None,
        };
        Some(intrinsic)
    }
}

/// The argument base-type tuples observed at the call sites of one intrinsic.
///
/// Filled during reference analysis; the generator derives per-type helper
/// emission (`clip`) from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntrinsicUsage {
    pub arg_lists: BTreeSet<Vec<DataType>>,
}

impl IntrinsicUsage {
    pub fn record(&mut self, arg_types: Vec<DataType>) {
        self.arg_lists.insert(arg_types);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_predicates_use_contiguous_ranges() {
        assert!(Intrinsic::InterlockedAdd.is_atomic());
        assert!(Intrinsic::InterlockedXor.is_atomic());
        assert!(!Intrinsic::Mul.is_atomic());
        assert!(Intrinsic::TextureSample.is_texture_method());
        assert!(!Intrinsic::Clip.is_texture_method());
    }

    #[test]
    fn names_round_trip_for_global_intrinsics() {
        for &i in &[Intrinsic::Mul, Intrinsic::Clip, Intrinsic::InterlockedXor] {
            assert_eq!(Intrinsic::global(i.hlsl_name()), Some(i));
        }
        assert_eq!(Intrinsic::global("no_such_intrinsic"), None);
    }

    #[test]
    fn usage_deduplicates_signatures() {
        let mut usage = IntrinsicUsage::default();
        usage.record(vec![DataType::Float3]);
        usage.record(vec![DataType::Float3]);
        usage.record(vec![DataType::Float]);
        assert_eq!(usage.arg_lists.len(), 2);
    }
}
