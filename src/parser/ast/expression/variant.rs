use serde::Serialize;

use crate::diagnostics::Position;
use crate::parser::ast::{Expression, TypeAnnotation, TypeSlot};

/// `finge Event.Click(1, 2)`: constructs a tagged-union variant, arguments
/// bound to the variant's fields positionally in declaration order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariantConstruction {
    /// the discretio name when spelled `finge Event.Click(..)`; omitted when
    /// the variant name alone is unambiguous
    pub discretio: Option<String>,
    pub variant: String,
    pub args: Vec<Expression>,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
    /// structural discretio type, filled by analysis so emitters can map
    /// positional arguments onto variant field names
    #[serde(skip)]
    pub shape: TypeSlot,
}

/// `value est T`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TypeCheckExpression {
    pub value: Expression,
    pub annotation: TypeAnnotation,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

/// `value qua T`; binds tighter than additive operators, so
/// `a + b qua T` reads `a + (b qua T)`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CastExpression {
    pub value: Expression,
    pub annotation: TypeAnnotation,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ConversionKind {
    /// `numeratum(x)` to integer
    Numeratum,
    /// `textatum(x)` to string
    Textatum,
    /// `fractatum(x)` to float
    Fractatum,
    /// `bivalentum(x)` to boolean
    Bivalentum,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConversionExpression {
    pub kind: ConversionKind,
    pub value: Expression,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

/// `expecta promise`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AwaitExpression {
    pub value: Expression,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

/// `praefixum expr`: evaluated at compile time where the target supports it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComptimeExpression {
    pub value: Expression,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}
