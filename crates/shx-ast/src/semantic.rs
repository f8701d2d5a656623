//! HLSL semantics: system values (`SV_*`) and user-defined bindings.

use std::fmt;

/// A parameter/return binding that determines its pipeline role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Semantic {
    /// System-value semantics (`SV_*`), mapped to GLSL built-ins.
    ClipDistance,
    CullDistance,
    Coverage,
    Depth,
    DepthGreaterEqual,
    DepthLessEqual,
    DispatchThreadId,
    DomainLocation,
    GroupId,
    GroupIndex,
    GroupThreadId,
    GsInstanceId,
    InsideTessFactor,
    InstanceId,
    IsFrontFace,
    OutputControlPointId,
    Position,
    PrimitiveId,
    RenderTargetArrayIndex,
    SampleIndex,
    StencilRef,
    Target,
    TessFactor,
    VertexId,
    ViewportArrayIndex,
    /// Anything that is not a system value.
    UserDefined(String),
}

impl Semantic {
    pub fn is_system_value(&self) -> bool {
        !matches!(self, Semantic::UserDefined(_))
    }

    /// Parses a semantic name without its trailing index digits.
    ///
    /// System-value names compare case-insensitively, as HLSL does.
    pub fn parse(name: &str) -> Semantic {
        let upper = name.to_ascii_uppercase();
        match upper.as_str() {
            "SV_CLIPDISTANCE" => Semantic::ClipDistance,
            "SV_CULLDISTANCE" => Semantic::CullDistance,
            "SV_COVERAGE" => Semantic::Coverage,
            "SV_DEPTH" => Semantic::Depth,
            "SV_DEPTHGREATEREQUAL" => Semantic::DepthGreaterEqual,
            "SV_DEPTHLESSEQUAL" => Semantic::DepthLessEqual,
            "SV_DISPATCHTHREADID" => Semantic::DispatchThreadId,
            "SV_DOMAINLOCATION" => Semantic::DomainLocation,
            "SV_GROUPID" => Semantic::GroupId,
            "SV_GROUPINDEX" => Semantic::GroupIndex,
            "SV_GROUPTHREADID" => Semantic::GroupThreadId,
            "SV_GSINSTANCEID" => Semantic::GsInstanceId,
            "SV_INSIDETESSFACTOR" => Semantic::InsideTessFactor,
            "SV_INSTANCEID" => Semantic::InstanceId,
            "SV_ISFRONTFACE" => Semantic::IsFrontFace,
            "SV_OUTPUTCONTROLPOINTID" => Semantic::OutputControlPointId,
            "SV_POSITION" => Semantic::Position,
            "SV_PRIMITIVEID" => Semantic::PrimitiveId,
            "SV_RENDERTARGETARRAYINDEX" => Semantic::RenderTargetArrayIndex,
            "SV_SAMPLEINDEX" => Semantic::SampleIndex,
            "SV_STENCILREF" => Semantic::StencilRef,
            "SV_TARGET" => Semantic::Target,
            "SV_TESSFACTOR" => Semantic::TessFactor,
            "SV_VERTEXID" => Semantic::VertexId,
            "SV_VIEWPORTARRAYINDEX" => Semantic::ViewportArrayIndex,
            _ => Semantic::UserDefined(upper),
        }
    }
}

impl fmt::Display for Semantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Semantic::ClipDistance => "SV_ClipDistance",
            Semantic::CullDistance => "SV_CullDistance",
            Semantic::Coverage => "SV_Coverage",
            Semantic::Depth => "SV_Depth",
            Semantic::DepthGreaterEqual => "SV_DepthGreaterEqual",
            Semantic::DepthLessEqual => "SV_DepthLessEqual",
            Semantic::DispatchThreadId => "SV_DispatchThreadID",
            Semantic::DomainLocation => "SV_DomainLocation",
            Semantic::GroupId => "SV_GroupID",
            Semantic::GroupIndex => "SV_GroupIndex",
            Semantic::GroupThreadId => "SV_GroupThreadID",
            Semantic::GsInstanceId => "SV_GSInstanceID",
            Semantic::InsideTessFactor => "SV_InsideTessFactor",
            Semantic::InstanceId => "SV_InstanceID",
            Semantic::IsFrontFace => "SV_IsFrontFace",
            Semantic::OutputControlPointId => "SV_OutputControlPointID",
            Semantic::Position => "SV_Position",
            Semantic::PrimitiveId => "SV_PrimitiveID",
            Semantic::RenderTargetArrayIndex => "SV_RenderTargetArrayIndex",
            Semantic::SampleIndex => "SV_SampleIndex",
            Semantic::StencilRef => "SV_StencilRef",
            Semantic::Target => "SV_Target",
            Semantic::TessFactor => "SV_TessFactor",
            Semantic::VertexId => "SV_VertexID",
            Semantic::ViewportArrayIndex => "SV_ViewportArrayIndex",
            Semantic::UserDefined(name) => name,
        };
        write!(f, "{name}")
    }
}

/// A semantic together with its index (`SV_Target3` → `(Target, 3)`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexedSemantic {
    pub semantic: Semantic,
    pub index: u32,
}

impl IndexedSemantic {
    pub fn new(semantic: Semantic) -> Self {
        Self { semantic, index: 0 }
    }

    pub fn with_index(semantic: Semantic, index: u32) -> Self {
        Self { semantic, index }
    }

    /// Parses a full semantic name; all right-most decimal digits form the
    /// index (`TEXCOORD2` → user-defined `TEXCOORD`, index 2).
    pub fn parse(name: &str) -> Self {
        let split = name
            .rfind(|c: char| !c.is_ascii_digit())
            .map(|pos| pos + 1)
            .unwrap_or(0);
        let (base, digits) = name.split_at(split);
        let index = digits.parse().unwrap_or(0);
        if base.is_empty() {
            return Self {
                semantic: Semantic::UserDefined(name.to_ascii_uppercase()),
                index: 0,
            };
        }
        Self {
            semantic: Semantic::parse(base),
            index,
        }
    }

    pub fn is_system_value(&self) -> bool {
        self.semantic.is_system_value()
    }
}

impl fmt::Display for IndexedSemantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.semantic, self.index)
    }
}
