use serde::Serialize;

use crate::diagnostics::Position;
use crate::parser::ast::{Expression, TypeSlot};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equals,
    NotEquals,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    And,
    Or,
    NullCoalesce,
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::LessThan
                | BinaryOperator::LessOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterOrEqual
        )
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOperator::Equals | BinaryOperator::NotEquals)
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
                | BinaryOperator::Modulo
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub lhs: Expression,
    pub rhs: Expression,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum UnaryOperator {
    Negate,
    Not,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub operand: Expression,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ShiftDirection {
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShiftExpression {
    pub direction: ShiftDirection,
    pub value: Expression,
    pub amount: Expression,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TernaryExpression {
    pub condition: Expression,
    pub consequent: Expression,
    pub alternative: Expression,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RangeExpression {
    pub start: Expression,
    pub end: Expression,
    pub inclusive: bool,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

/// Assignment is an expression; statement position wraps it in
/// an expression statement.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssignmentExpression {
    pub target: Expression,
    pub value: Expression,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}
