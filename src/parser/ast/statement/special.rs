use serde::Serialize;

use crate::diagnostics::Position;
use crate::parser::ast::{Block, CatchClause, Expression};

/// Program entry block: `fit { ... }` sync, `fiet { ... }` async.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntryStatement {
    pub body: Block,
    pub is_async: bool,
    pub position: Position,
}

/// `in target { ... }`: bare-identifier assignments inside the block are
/// rewritten to member stores on the target.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MutationContext {
    pub target: Expression,
    pub body: Block,
    pub position: Position,
    /// structural genus type of the target, filled by analysis so emitters
    /// know which bare names are field stores
    #[serde(skip)]
    pub shape: crate::parser::ast::TypeSlot,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum CuratorKind {
    /// `cura arena a { }`: arena allocator
    Arena,
    /// `cura pagina p { }`: page allocator
    Pagina,
    /// `cura de resource pro r { }`: generic resource with a release hook
    Generic(Expression),
}

/// Scoped acquisition: the curator is released on every exit path from the
/// block, including thrown errors caught by the optional catch clause.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CuraStatement {
    pub curator: CuratorKind,
    pub binding: String,
    pub is_async: bool,
    pub body: Block,
    pub catch: Option<CatchClause>,
    pub position: Position,
}

/// Dispatch verb: sync/async crossed with single/plural result binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DispatchVerb {
    /// `fit`: sync, single
    Fit,
    /// `fiet`: async, single
    Fiet,
    /// `fiunt`: sync, plural
    Fiunt,
    /// `fient`: async, plural
    Fient,
}

impl DispatchVerb {
    pub fn is_async(&self) -> bool {
        matches!(self, DispatchVerb::Fiet | DispatchVerb::Fient)
    }

    pub fn is_plural(&self) -> bool {
        matches!(self, DispatchVerb::Fiunt | DispatchVerb::Fient)
    }
}

/// `ad "target" (args) fit x { body } cape e { }`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DispatchStatement {
    pub target: String,
    pub args: Vec<Expression>,
    pub verb: Option<DispatchVerb>,
    pub binding: Option<String>,
    pub body: Option<Block>,
    pub catch: Option<CatchClause>,
    pub position: Position,
}

/// `probatio "suite" { ... }`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SuiteStatement {
    pub name: String,
    pub body: Block,
    pub position: Position,
}

/// `exemplum "case" intra 500 { ... }`; the optional `intra` gives a
/// timeout in milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CaseStatement {
    pub name: String,
    pub timeout_ms: Option<u64>,
    pub body: Block,
    pub position: Position,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FixtureKind {
    /// `ante`: setup
    Ante,
    /// `post`: teardown
    Post,
}

/// `ante { }` runs per case, `ante omnia { }` once per suite.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FixtureStatement {
    pub kind: FixtureKind,
    pub all: bool,
    pub body: Block,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExpressionStatement {
    pub expression: Expression,
    pub position: Position,
}
