use serde::Serialize;

use crate::diagnostics::Position;
use crate::parser::ast::{Expression, FunctionDeclaration, LiteralValue, Parameter, TypeAnnotation};

/// `ordo Color { Ruber, Viridis = 3 }`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrdoDeclaration {
    pub name: String,
    pub members: Vec<OrdoMember>,
    pub position: Position,
    pub leading_comments: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrdoMember {
    pub name: String,
    pub value: Option<LiteralValue>,
    pub position: Position,
}

/// Struct-like type: fields, methods and `communis` statics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenusDeclaration {
    pub name: String,
    /// pacta this genus declares to fulfil (`genus G implet P { .. }`)
    pub implements: Vec<String>,
    pub fields: Vec<GenusField>,
    pub methods: Vec<GenusMethod>,
    pub position: Position,
    pub leading_comments: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenusField {
    pub name: String,
    pub annotation: TypeAnnotation,
    pub is_static: bool,
    pub default: Option<Expression>,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenusMethod {
    pub function: FunctionDeclaration,
    pub is_static: bool,
}

/// Interface-like contract: method signatures only.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PactumDeclaration {
    pub name: String,
    pub methods: Vec<PactumMethod>,
    pub position: Position,
    pub leading_comments: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PactumMethod {
    pub name: String,
    pub params: Vec<Parameter>,
    pub return_annotation: Option<TypeAnnotation>,
    pub position: Position,
}

/// Tagged union: `discretio Event { Click { numerus x, numerus y } Quit }`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiscretioDeclaration {
    pub name: String,
    pub variants: Vec<DiscretioVariant>,
    pub position: Position,
    pub leading_comments: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiscretioVariant {
    pub name: String,
    /// named fields in declaration order; positional `discerne` bindings
    /// follow this order
    pub fields: Vec<(String, TypeAnnotation)>,
    pub position: Position,
}
