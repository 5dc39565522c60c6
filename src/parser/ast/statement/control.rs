use serde::Serialize;

use crate::diagnostics::Position;
use crate::parser::ast::{Block, Expression};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatchClause {
    pub binding: String,
    pub block: Block,
    pub position: Position,
}

/// `si cond { } sin cond { } secus { } cape err { }`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_block: Block,
    pub else_ifs: Vec<(Expression, Block)>,
    pub else_block: Option<Block>,
    /// optional catch clause recovering from throws inside the branches
    pub catch: Option<CatchClause>,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Block,
    pub position: Position,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum IterationKind {
    /// `pro x ex seq`: iterate by value
    Ex,
    /// `pro x in seq`: iterate in place
    In,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IterationStatement {
    pub binding: String,
    pub kind: IterationKind,
    pub is_async: bool,
    pub iterable: Expression,
    pub body: Block,
    pub position: Position,
}

/// `custodi cond secus { ... }`: the fallback runs when the condition fails.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GuardStatement {
    pub condition: Expression,
    pub fallback: Block,
    pub position: Position,
}

/// `elige x { casu 1, 2 { } ceterum { } }`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValueSwitch {
    pub discriminant: Expression,
    pub arms: Vec<ValueArm>,
    pub default: Option<Block>,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValueArm {
    pub values: Vec<Expression>,
    pub body: Block,
    pub position: Position,
}

/// Field bindings of a `casu` arm: positional (`pro x, y`), alias
/// (`ut whole`) or none.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum VariantBindings {
    None,
    Positional(Vec<String>),
    Alias(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariantArm {
    /// matched variant names, one per discriminant; `_` is the wildcard
    pub variants: Vec<String>,
    pub bindings: VariantBindings,
    pub body: Block,
    pub position: Position,
}

/// `discerne e { casu Click pro x, y { } casu Quit { } }`; supports
/// multiple discriminants and wildcard arms.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariantSwitch {
    pub discriminants: Vec<Expression>,
    pub arms: Vec<VariantArm>,
    pub default: Option<Block>,
    pub position: Position,
    /// structural type of the first discriminant's discretio, filled by
    /// analysis for the emitters
    #[serde(skip)]
    pub shape: crate::parser::ast::TypeSlot,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReturnStatement {
    pub value: Option<Expression>,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BreakStatement {
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContinueStatement {
    pub position: Position,
}

/// `iace e` throws recoverably; `mori e` is fatal.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThrowStatement {
    pub value: Expression,
    pub fatal: bool,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TryStatement {
    pub body: Block,
    pub catch: Option<CatchClause>,
    pub finally: Option<Block>,
    pub position: Position,
}

/// `fac { ... }`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DoBlock {
    pub body: Block,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssertStatement {
    pub condition: Expression,
    pub position: Position,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PrintKind {
    /// `scribe`: standard output
    Scribe,
    /// `vide`: debug output
    Vide,
    /// `mone`: warning output
    Mone,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PrintStatement {
    pub kind: PrintKind,
    pub value: Expression,
    pub position: Position,
}
