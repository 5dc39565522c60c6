use serde::Serialize;

use crate::diagnostics::Position;
use crate::parser::ast::TypeSlot;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Identifier {
    pub name: String,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

impl Identifier {
    pub fn new(name: impl ToString, position: Position) -> Self {
        Identifier {
            name: name.to_string(),
            position,
            ty: TypeSlot::default(),
        }
    }
}

/// `ipse`, the receiver inside genus methods.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SelfRef {
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}
