//! Type denoters: the canonical, comparable representation of shader types.
//!
//! [`DataType`] is laid out contiguously ({Bool,Int,UInt,Half,Float,Double} ×
//! scalar, vec2..4, mat2x2..4x4) so that [`DataType::vector_of`],
//! [`DataType::matrix_of`] and [`DataType::base_type`] are O(1) index
//! arithmetic. Callers may rely on the ordering; it is part of the contract.

use std::fmt;

use crate::ast::{AliasDecl, BufferDecl, StructDecl};
use crate::report::Error;
use crate::Handle;

macro_rules! data_types {
    ($($name:ident),* $(,)?) => {
        /// Scalar, vector and matrix types of HLSL and GLSL.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u8)]
        pub enum DataType {
            $($name),*
        }

        impl DataType {
            /// All data types in enumeration order.
            pub const ALL: &'static [DataType] = &[$(DataType::$name),*];
        }
    };
}

data_types! {
    // Scalars.
    Bool, Int, UInt, Half, Float, Double,
    // Vectors, three per base type (dimensions 2..4).
    Bool2, Bool3, Bool4,
    Int2, Int3, Int4,
    UInt2, UInt3, UInt4,
    Half2, Half3, Half4,
    Float2, Float3, Float4,
    Double2, Double3, Double4,
    // Matrices, nine per base type (rows 2..4 × columns 2..4).
    Bool2x2, Bool2x3, Bool2x4, Bool3x2, Bool3x3, Bool3x4, Bool4x2, Bool4x3, Bool4x4,
    Int2x2, Int2x3, Int2x4, Int3x2, Int3x3, Int3x4, Int4x2, Int4x3, Int4x4,
    UInt2x2, UInt2x3, UInt2x4, UInt3x2, UInt3x3, UInt3x4, UInt4x2, UInt4x3, UInt4x4,
    Half2x2, Half2x3, Half2x4, Half3x2, Half3x3, Half3x4, Half4x2, Half4x3, Half4x4,
    Float2x2, Float2x3, Float2x4, Float3x2, Float3x3, Float3x4, Float4x2, Float4x3, Float4x4,
    Double2x2, Double2x3, Double2x4, Double3x2, Double3x3, Double3x4, Double4x2, Double4x3, Double4x4,
    // String literals; only valid in attributes and annotations.
    String,
}

const NUM_SCALARS: usize = 6;
const VECTOR_BASE: usize = NUM_SCALARS;
const VECTORS_PER_SCALAR: usize = 3;
const MATRIX_BASE: usize = VECTOR_BASE + NUM_SCALARS * VECTORS_PER_SCALAR;
const MATRICES_PER_SCALAR: usize = 9;
const MATRIX_END: usize = MATRIX_BASE + NUM_SCALARS * MATRICES_PER_SCALAR;

impl DataType {
    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Option<DataType> {
        Self::ALL.get(index).copied()
    }

    pub fn is_scalar(self) -> bool {
        self.index() < VECTOR_BASE
    }

    pub fn is_vector(self) -> bool {
        (VECTOR_BASE..MATRIX_BASE).contains(&self.index())
    }

    pub fn is_matrix(self) -> bool {
        (MATRIX_BASE..MATRIX_END).contains(&self.index())
    }

    pub fn is_boolean(self) -> bool {
        self.base_type() == DataType::Bool
    }

    pub fn is_integral(self) -> bool {
        matches!(self.base_type(), DataType::Int | DataType::UInt)
    }

    pub fn is_real(self) -> bool {
        matches!(
            self.base_type(),
            DataType::Half | DataType::Float | DataType::Double
        )
    }

    pub fn is_half(self) -> bool {
        self.base_type() == DataType::Half
    }

    pub fn is_double(self) -> bool {
        self.base_type() == DataType::Double
    }

    /// Returns the scalar base of this type (`Float` for `Float3x2`).
    pub fn base_type(self) -> DataType {
        let idx = self.index();
        let scalar = if idx < VECTOR_BASE {
            return self;
        } else if idx < MATRIX_BASE {
            (idx - VECTOR_BASE) / VECTORS_PER_SCALAR
        } else if idx < MATRIX_END {
            (idx - MATRIX_BASE) / MATRICES_PER_SCALAR
        } else {
            return self;
        };
        DataType::from_index(scalar).unwrap_or(self)
    }

    /// Vector dimension: 1 for scalars, 2..4 for vectors, `None` for
    /// matrices.
    pub fn vector_dim(self) -> Option<u32> {
        let idx = self.index();
        if idx < VECTOR_BASE {
            Some(1)
        } else if idx < MATRIX_BASE {
            Some(((idx - VECTOR_BASE) % VECTORS_PER_SCALAR) as u32 + 2)
        } else {
            None
        }
    }

    /// Matrix dimensions: `(1, 1)` for scalars, `(n, 1)` for vectors,
    /// `(rows, columns)` for matrices.
    pub fn matrix_dim(self) -> (u32, u32) {
        let idx = self.index();
        if idx < MATRIX_BASE || idx >= MATRIX_END {
            (self.vector_dim().unwrap_or(1), 1)
        } else {
            let off = (idx - MATRIX_BASE) % MATRICES_PER_SCALAR;
            ((off / 3) as u32 + 2, (off % 3) as u32 + 2)
        }
    }

    /// Returns the vector type with scalar base `base` and `dim` components.
    ///
    /// `dim == 1` returns the base itself. Fails for a non-scalar base or a
    /// dimension outside 1..4.
    pub fn vector_of(base: DataType, dim: u32) -> Option<DataType> {
        if !base.is_scalar() {
            return None;
        }
        match dim {
            1 => Some(base),
            2..=4 => DataType::from_index(
                VECTOR_BASE + base.index() * VECTORS_PER_SCALAR + (dim as usize - 2),
            ),
            _ => None,
        }
    }

    /// Returns the matrix type with scalar base `base`, degenerating to a
    /// vector when one dimension is 1 and to the scalar for 1×1.
    pub fn matrix_of(base: DataType, rows: u32, columns: u32) -> Option<DataType> {
        if !base.is_scalar() {
            return None;
        }
        match (rows, columns) {
            (1, 1) => Some(base),
            (1, n) => DataType::vector_of(base, n),
            (n, 1) => DataType::vector_of(base, n),
            (2..=4, 2..=4) => DataType::from_index(
                MATRIX_BASE
                    + base.index() * MATRICES_PER_SCALAR
                    + (rows as usize - 2) * 3
                    + (columns as usize - 2),
            ),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    /// Formats the HLSL spelling (`float`, `float3`, `float3x4`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == DataType::String {
            return write!(f, "string");
        }
        let base = match self.base_type() {
            DataType::Bool => "bool",
            DataType::Int => "int",
            DataType::UInt => "uint",
            DataType::Half => "half",
            DataType::Float => "float",
            DataType::Double => "double",
            _ => unreachable!("base_type returns a scalar"),
        };
        if self.is_scalar() {
            write!(f, "{base}")
        } else if self.is_vector() {
            write!(f, "{base}{}", self.vector_dim().unwrap_or(0))
        } else {
            let (rows, cols) = self.matrix_dim();
            write!(f, "{base}{rows}x{cols}")
        }
    }
}

/// Resolves a vector swizzle or matrix accessor applied to `ty`.
///
/// Swizzles draw from either the `xyzw` or the `rgba` domain; the domains
/// must not mix and each component must be within the vector's dimension.
/// Matrix accessors are runs of zero-based `_mRC` or one-based `_RC` tokens;
/// the two forms must not mix. The result dimension is the component/token
/// count.
pub fn subscript_data_type(ty: DataType, subscript: &str) -> Result<DataType, Error> {
    let (rows, cols) = ty.matrix_dim();
    if cols == 1 {
        subscript_vector(ty, subscript, rows)
    } else {
        subscript_matrix(ty, subscript)
    }
}

fn subscript_vector(ty: DataType, subscript: &str, dim: u32) -> Result<DataType, Error> {
    let len = subscript.chars().count();
    if !(1..=4).contains(&len) {
        return Err(Error::invalid_argument(format!(
            "vector subscript cannot have {len} component(s): '{subscript}'"
        )));
    }

    let in_domain = |domain: &str| {
        subscript
            .chars()
            .all(|c| domain[..dim as usize].contains(c))
    };
    if !in_domain("xyzw") && !in_domain("rgba") {
        return Err(Error::invalid_argument(format!(
            "invalid subscript '{subscript}' for type '{ty}'"
        )));
    }

    DataType::vector_of(ty.base_type(), len as u32).ok_or_else(|| {
        Error::invalid_argument(format!("invalid subscript '{subscript}' for type '{ty}'"))
    })
}

fn subscript_matrix(ty: DataType, subscript: &str) -> Result<DataType, Error> {
    let bytes = subscript.as_bytes();
    let mut i = 0;
    let mut count = 0u32;
    // Some(true) once the first token fixed the zero-based `_mRC` form.
    let mut zero_based: Option<bool> = None;

    while i < bytes.len() {
        if bytes[i] != b'_' {
            return Err(Error::invalid_argument(format!(
                "invalid character '{}' in matrix subscript '{subscript}'",
                bytes[i] as char
            )));
        }
        i += 1;

        let is_zero_based = bytes.get(i) == Some(&b'm');
        if is_zero_based {
            i += 1;
        }
        match zero_based {
            None => zero_based = Some(is_zero_based),
            Some(prev) if prev != is_zero_based => {
                return Err(Error::invalid_argument(format!(
                    "zero-based and one-based forms mixed in matrix subscript '{subscript}'"
                )));
            }
            Some(_) => {}
        }

        if i + 2 > bytes.len() {
            return Err(Error::invalid_argument(format!(
                "incomplete matrix subscript '{subscript}'"
            )));
        }
        let (lo, hi) = if is_zero_based {
            (b'0', b'3')
        } else {
            (b'1', b'4')
        };
        for _ in 0..2 {
            if bytes[i] < lo || bytes[i] > hi {
                return Err(Error::invalid_argument(format!(
                    "invalid character '{}' in matrix subscript '{subscript}'",
                    bytes[i] as char
                )));
            }
            i += 1;
        }
        count += 1;
    }

    if count == 0 {
        return Err(Error::invalid_argument(format!(
            "incomplete matrix subscript '{subscript}'"
        )));
    }
    DataType::vector_of(ty.base_type(), count).ok_or_else(|| {
        Error::invalid_argument(format!(
            "matrix subscript '{subscript}' yields more than 4 components"
        ))
    })
}

/// HLSL buffer, texture, patch and stream object types.
///
/// The enumeration order backs the range predicates below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BufferType {
    Buffer,
    StructuredBuffer,
    ByteAddressBuffer,

    RwBuffer,
    RwStructuredBuffer,
    RwByteAddressBuffer,
    AppendStructuredBuffer,
    ConsumeStructuredBuffer,

    RwTexture1D,
    RwTexture1DArray,
    RwTexture2D,
    RwTexture2DArray,
    RwTexture3D,

    Texture1D,
    Texture1DArray,
    Texture2D,
    Texture2DArray,
    Texture3D,
    TextureCube,
    TextureCubeArray,
    Texture2DMs,
    Texture2DMsArray,

    GenericTexture,

    InputPatch,
    OutputPatch,

    PointStream,
    LineStream,
    TriangleStream,
}

impl BufferType {
    pub fn is_storage_buffer(self) -> bool {
        (BufferType::Buffer..=BufferType::ConsumeStructuredBuffer).contains(&self)
    }

    pub fn is_rw(self) -> bool {
        (BufferType::RwBuffer..=BufferType::RwTexture3D).contains(&self)
    }

    pub fn is_texture(self) -> bool {
        (BufferType::RwTexture1D..=BufferType::GenericTexture).contains(&self)
    }

    pub fn is_multisample_texture(self) -> bool {
        (BufferType::Texture2DMs..=BufferType::Texture2DMsArray).contains(&self)
    }

    pub fn is_array_texture(self) -> bool {
        matches!(
            self,
            BufferType::Texture1DArray
                | BufferType::Texture2DArray
                | BufferType::TextureCubeArray
                | BufferType::Texture2DMsArray
                | BufferType::RwTexture1DArray
                | BufferType::RwTexture2DArray
        )
    }

    pub fn is_patch(self) -> bool {
        (BufferType::InputPatch..=BufferType::OutputPatch).contains(&self)
    }

    pub fn is_stream(self) -> bool {
        (BufferType::PointStream..=BufferType::TriangleStream).contains(&self)
    }
}

/// HLSL sampler object types, including the DX9-era texture samplers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SamplerType {
    Sampler,
    Sampler1D,
    Sampler2D,
    Sampler3D,
    SamplerCube,
    SamplerState,
    SamplerComparisonState,
}

impl SamplerType {
    /// Shader-model 4+ sampler state objects (as opposed to the DX9 combined
    /// texture samplers).
    pub fn is_sampler_state(self) -> bool {
        (SamplerType::SamplerState..=SamplerType::SamplerComparisonState).contains(&self)
    }
}

/// `cbuffer` / `tbuffer` flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformBufferType {
    ConstantBuffer,
    TextureBuffer,
}

/// HLSL `register(...)` slot classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterType {
    ConstantBuffer,
    TextureBuffer,
    BufferOffset,
    Sampler,
    UnorderedAccessView,
}

impl RegisterType {
    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            'b' => Some(RegisterType::ConstantBuffer),
            't' => Some(RegisterType::TextureBuffer),
            'c' => Some(RegisterType::BufferOffset),
            's' => Some(RegisterType::Sampler),
            'u' => Some(RegisterType::UnorderedAccessView),
            _ => None,
        }
    }

    pub fn prefix(self) -> char {
        match self {
            RegisterType::ConstantBuffer => 'b',
            RegisterType::TextureBuffer => 't',
            RegisterType::BufferOffset => 'c',
            RegisterType::Sampler => 's',
            RegisterType::UnorderedAccessView => 'u',
        }
    }
}

/// The canonical representation of a resolved type.
///
/// `Struct`, `Alias` and `Texture` hold non-owning arena handles into the
/// owning [`Program`](crate::Program); a denoter is never self-cyclic through
/// its owned fields.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDenoter {
    Void,
    Base(DataType),
    Buffer {
        buffer_type: BufferType,
        /// Element type for structured/typed buffers; `None` for raw buffers.
        elem: Option<Box<TypeDenoter>>,
    },
    Sampler(SamplerType),
    Texture {
        buffer_type: BufferType,
        /// Declaration backing this texture type; filled by the analyzer.
        decl: Option<Handle<BufferDecl>>,
    },
    Struct(Handle<StructDecl>),
    Alias(Handle<AliasDecl>),
    Array {
        base: Box<TypeDenoter>,
        /// Dimension sizes; zero means a dynamic dimension.
        dims: Vec<u32>,
    },
}

impl TypeDenoter {
    pub fn is_void(&self) -> bool {
        matches!(self, TypeDenoter::Void)
    }

    pub fn is_base(&self) -> bool {
        matches!(self, TypeDenoter::Base(_))
    }

    pub fn is_buffer(&self) -> bool {
        matches!(self, TypeDenoter::Buffer { .. })
    }

    pub fn is_sampler(&self) -> bool {
        matches!(self, TypeDenoter::Sampler(_))
    }

    pub fn is_texture(&self) -> bool {
        matches!(self, TypeDenoter::Texture { .. })
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, TypeDenoter::Struct(_))
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, TypeDenoter::Alias(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeDenoter::Array { .. })
    }

    /// The base data type if this is a scalar/vector/matrix denoter.
    pub fn as_base(&self) -> Option<DataType> {
        match self {
            TypeDenoter::Base(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn array_of(self, dims: Vec<u32>) -> TypeDenoter {
        TypeDenoter::Array {
            base: Box::new(self),
            dims,
        }
    }
}

impl From<DataType> for TypeDenoter {
    fn from(dt: DataType) -> Self {
        TypeDenoter::Base(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn data_type_layout_is_contiguous() {
        assert_eq!(DataType::ALL.len(), 79);
        assert_eq!(DataType::vector_of(DataType::Float, 3), Some(DataType::Float3));
        assert_eq!(DataType::vector_of(DataType::Float, 1), Some(DataType::Float));
        assert_eq!(DataType::vector_of(DataType::Float3, 2), None);
        assert_eq!(DataType::vector_of(DataType::Bool, 5), None);
        assert_eq!(
            DataType::matrix_of(DataType::Double, 4, 3),
            Some(DataType::Double4x3)
        );
        assert_eq!(DataType::matrix_of(DataType::Int, 1, 1), Some(DataType::Int));
        assert_eq!(DataType::matrix_of(DataType::Int, 1, 4), Some(DataType::Int4));
        assert_eq!(DataType::matrix_of(DataType::Int, 3, 1), Some(DataType::Int3));
        assert_eq!(DataType::matrix_of(DataType::Int, 5, 2), None);
    }

    #[test]
    fn round_trips_between_dims_and_constructors() {
        for &ty in DataType::ALL {
            if ty == DataType::String {
                continue;
            }
            let base = ty.base_type();
            assert!(base.is_scalar());
            let (rows, cols) = ty.matrix_dim();
            assert_eq!(DataType::matrix_of(base, rows, cols), Some(ty));
            if let Some(dim) = ty.vector_dim() {
                assert_eq!(DataType::vector_of(base, dim), Some(ty));
            }
        }
    }

    #[test]
    fn display_uses_hlsl_spelling() {
        assert_eq!(DataType::Float.to_string(), "float");
        assert_eq!(DataType::UInt3.to_string(), "uint3");
        assert_eq!(DataType::Half4x2.to_string(), "half4x2");
        assert_eq!(DataType::String.to_string(), "string");
    }

    #[test]
    fn string_stays_outside_the_numeric_families() {
        assert!(!DataType::String.is_scalar());
        assert!(!DataType::String.is_vector());
        assert!(!DataType::String.is_matrix());
        assert_eq!(DataType::String.base_type(), DataType::String);
        assert_eq!(DataType::String.matrix_dim(), (1, 1));
    }

    #[test]
    fn vector_swizzles_resolve() {
        assert_eq!(
            subscript_data_type(DataType::Float4, "xyz").unwrap(),
            DataType::Float3
        );
        assert_eq!(
            subscript_data_type(DataType::Float2, "xx").unwrap(),
            DataType::Float2
        );
        assert_eq!(
            subscript_data_type(DataType::Int3, "rgb").unwrap(),
            DataType::Int3
        );
        assert_eq!(
            subscript_data_type(DataType::Float, "x").unwrap(),
            DataType::Float
        );
    }

    #[test]
    fn mixed_swizzle_domains_are_rejected() {
        assert!(subscript_data_type(DataType::Float4, "xg").is_err());
        assert!(subscript_data_type(DataType::Float4, "rz").is_err());
    }

    #[test]
    fn out_of_range_swizzle_components_are_rejected() {
        // 'z' is out of range for a two-component vector.
        assert!(subscript_data_type(DataType::Float2, "xz").is_err());
        assert!(subscript_data_type(DataType::Float4, "xyzwx").is_err());
        assert!(subscript_data_type(DataType::Float4, "q").is_err());
    }

    #[test]
    fn matrix_subscripts_resolve() {
        assert_eq!(
            subscript_data_type(DataType::Float4x4, "_m00").unwrap(),
            DataType::Float
        );
        assert_eq!(
            subscript_data_type(DataType::Float4x4, "_m00_m11_m22").unwrap(),
            DataType::Float3
        );
        assert_eq!(
            subscript_data_type(DataType::Float3x3, "_11_22").unwrap(),
            DataType::Float2
        );
    }

    #[test]
    fn malformed_matrix_subscripts_are_rejected() {
        // Incomplete token.
        assert!(subscript_data_type(DataType::Float4x4, "_m0").is_err());
        // Mixed zero-based and one-based forms.
        assert!(subscript_data_type(DataType::Float4x4, "_m00_11").is_err());
        // Out-of-range digit for the one-based form.
        assert!(subscript_data_type(DataType::Float4x4, "_05").is_err());
        // Missing leading underscore.
        assert!(subscript_data_type(DataType::Float4x4, "m00").is_err());
        // Five tokens yield more than four components.
        assert!(subscript_data_type(DataType::Float4x4, "_11_12_13_14_21").is_err());
    }

    #[test]
    fn buffer_type_predicates_follow_enum_ranges() {
        assert!(BufferType::StructuredBuffer.is_storage_buffer());
        assert!(BufferType::RwTexture2D.is_rw());
        assert!(BufferType::RwTexture2D.is_texture());
        assert!(BufferType::Texture2DArray.is_array_texture());
        assert!(!BufferType::Texture2D.is_array_texture());
        assert!(BufferType::TriangleStream.is_stream());
        assert!(!BufferType::Texture2D.is_stream());
    }
}
