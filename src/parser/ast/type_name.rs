use serde::Serialize;

use crate::diagnostics::Position;

/// Ownership preposition on a parameter type: `de` borrows immutably,
/// `in` borrows mutably, no preposition passes ownership.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Ownership {
    #[default]
    Owned,
    Borrowed,
    MutableBorrow,
}

/// A type parameter is either a nested type or a numeric literal denoting a
/// bit width, as in `numerus<32>`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TypeParam {
    Type(TypeAnnotation),
    Width(u32),
}

/// Parameter and return types of a function-type annotation
/// like `(numerus, textus) -> bivalens`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FunctionAnnotation {
    pub params: Vec<TypeAnnotation>,
    pub returns: Box<TypeAnnotation>,
}

/// A syntactic type annotation as written in the source. Resolution to a
/// semantic type happens in the analyzer; the annotation itself stays an
/// uninterpreted name plus shape flags.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TypeAnnotation {
    pub name: String,
    pub params: Vec<TypeParam>,
    pub nullable: bool,
    /// union alternatives beyond the head type (`A | B | C` stores B, C here)
    pub alternatives: Vec<TypeAnnotation>,
    /// `T[]` shorthand for `lista<T>`
    pub array: bool,
    pub ownership: Ownership,
    pub function: Option<FunctionAnnotation>,
    pub position: Position,
}

impl TypeAnnotation {
    pub fn named(name: impl ToString, position: Position) -> Self {
        TypeAnnotation {
            name: name.to_string(),
            params: Vec::new(),
            nullable: false,
            alternatives: Vec::new(),
            array: false,
            ownership: Ownership::Owned,
            function: None,
            position,
        }
    }
}

impl std::fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(function) = &self.function {
            let params = function
                .params
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return write!(f, "({params}) -> {}", function.returns);
        }

        match self.ownership {
            Ownership::Borrowed => write!(f, "de ")?,
            Ownership::MutableBorrow => write!(f, "in ")?,
            Ownership::Owned => {}
        }

        write!(f, "{}", self.name)?;

        if !self.params.is_empty() {
            let params = self
                .params
                .iter()
                .map(|p| match p {
                    TypeParam::Type(t) => t.to_string(),
                    TypeParam::Width(w) => w.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "<{params}>")?;
        }

        if self.array {
            write!(f, "[]")?;
        }
        if self.nullable {
            write!(f, "?")?;
        }
        for alternative in &self.alternatives {
            write!(f, " | {alternative}")?;
        }

        Ok(())
    }
}
