use serde::Serialize;

use crate::diagnostics::Position;
use crate::parser::ast::{Block, Expression, Parameter, TypeSlot};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum LambdaBody {
    Expression(Box<Expression>),
    Block(Block),
}

/// `(x, y) => x + y`, `(x) => { ... }` or `fiet (x) => ...` for async.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LambdaExpression {
    pub params: Vec<Parameter>,
    pub body: LambdaBody,
    pub is_async: bool,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}
