//! Reflection record populated during code generation.

/// A named resource with its binding slot, if one was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSlot {
    pub ident: String,
    pub slot: Option<u32>,
}

impl BindingSlot {
    pub fn new(ident: impl Into<String>, slot: Option<u32>) -> Self {
        Self {
            ident: ident.into(),
            slot,
        }
    }
}

/// Names and bindings of the resources the generated shader uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reflection {
    pub textures: Vec<BindingSlot>,
    pub samplers: Vec<BindingSlot>,
    pub uniform_buffers: Vec<BindingSlot>,
}
