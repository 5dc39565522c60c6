use serde::Serialize;

use crate::diagnostics::Position;
use crate::parser::ast::{Expression, TypeSlot};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum LiteralValue {
    String(String),
    Integer(i64),
    Float(f64),
    /// arbitrary precision integers keep their digits as written
    BigInt(String),
    Boolean(bool),
    Null,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Literal {
    pub value: LiteralValue,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

impl Literal {
    pub fn new(value: LiteralValue, position: Position) -> Self {
        Literal {
            value,
            position,
            ty: TypeSlot::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TemplatePart {
    Text(String),
    Interpolation(Expression),
}

/// Backtick string with `${...}` interpolations.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TemplateString {
    pub parts: Vec<TemplatePart>,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

/// `forma(fmt, args...)`: positional `{}` placeholders in `fmt`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormatString {
    pub format: Box<Expression>,
    pub args: Vec<Expression>,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

/// `regula "pattern"`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegexLiteral {
    pub pattern: String,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

/// `lege()` / `lege(prompt)`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReadInput {
    pub prompt: Option<Box<Expression>>,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}
