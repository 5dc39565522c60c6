use serde::Serialize;

use crate::diagnostics::Position;
use crate::parser::ast::{Block, Expression, TypeAnnotation};

/// A function or lambda parameter. Ownership lives on the annotation;
/// `vel` defaults make the parameter optional, `ceteri` marks a rest
/// parameter collecting trailing arguments.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub annotation: Option<TypeAnnotation>,
    pub default: Option<Expression>,
    pub rest: bool,
    pub position: Position,
}

/// `functio nomen(params) -> T { ... }`; `functio fiet nomen(...)` is async.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub params: Vec<Parameter>,
    pub return_annotation: Option<TypeAnnotation>,
    pub body: Block,
    pub is_async: bool,
    pub position: Position,
    pub leading_comments: Vec<String>,
}
