use serde::Serialize;

use crate::diagnostics::Position;
use crate::parser::ast::{Expression, TypeSlot};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArrayLiteral {
    pub elements: Vec<Expression>,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObjectEntry {
    pub key: String,
    pub value: Expression,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObjectLiteral {
    pub entries: Vec<ObjectEntry>,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PipelineOp {
    /// `prima n ex seq`: first n elements
    Prima,
    /// `ultima n ex seq`: last n elements
    Ultima,
    /// `summa ex seq`: sum of elements
    Summa,
}

/// Collection pipeline DSL: `prima 3 ex seq`, `ultima 3 ex seq`,
/// `summa ex seq`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PipelineExpression {
    pub op: PipelineOp,
    pub count: Option<Expression>,
    pub source: Expression,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

/// Filtering DSL: `ab seq pro x ubi x > 3`. The binding is scoped to the
/// predicate only.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterExpression {
    pub source: Expression,
    pub binding: String,
    pub predicate: Expression,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

/// `x intra lo..hi` / `x intra lo..=hi`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RangeTestExpression {
    pub value: Expression,
    pub low: Expression,
    pub high: Expression,
    pub inclusive: bool,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

/// `x inter seq`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MembershipExpression {
    pub value: Expression,
    pub collection: Expression,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}
