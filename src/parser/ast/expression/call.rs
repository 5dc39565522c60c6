use std::cell::Cell;

use serde::Serialize;

use crate::diagnostics::Position;
use crate::parser::ast::{Expression, TypeAnnotation, TypeSlot};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CallExpression {
    pub callee: Expression,
    pub args: Vec<Expression>,
    /// `callee?.(...)`: evaluates to null when the callee is null
    pub optional_chain: bool,
    /// `callee!.(...)`: asserts the callee is non-null
    pub non_null: bool,
    /// set by the analyzer when the callee's type carries the curator flag;
    /// code generation then threads an allocator argument through the call
    #[serde(skip)]
    pub injects_curator: Cell<bool>,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MemberExpression {
    pub object: Expression,
    pub property: String,
    pub optional_chain: bool,
    pub non_null: bool,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndexExpression {
    pub object: Expression,
    pub index: Expression,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

/// `novum Genus(args)`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewExpression {
    pub type_name: String,
    pub args: Vec<Expression>,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}

/// `innatum T(args)`: constructs a value of the target language's native
/// representation of `T`, bypassing Faber-level checking of the arguments.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NativeConstruction {
    pub target_type: TypeAnnotation,
    pub args: Vec<Expression>,
    pub position: Position,
    #[serde(skip)]
    pub ty: TypeSlot,
}
