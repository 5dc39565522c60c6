//! The abstract syntax tree.
//!
//! Nodes are created by the parser and never mutated afterwards, with one
//! exception: every expression carries a shared [`TypeSlot`] that semantic
//! analysis fills with the node's resolved type. Declarations additionally
//! carry leading comment lists the parser attaches by line adjacency.

mod expression;
mod statement;
mod type_name;

pub use self::expression::*;
pub use self::statement::*;
pub use self::type_name::*;

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::semantic::Type;

/// Shared mutable slot for an expression's resolved type. Cloning the slot
/// aliases it, so refinements made through one handle are visible through
/// all of them.
pub type TypeSlot = Rc<RefCell<Option<Type>>>;

/// AST root for one translation unit.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Program {
    pub statements: Vec<Statement>,
}
