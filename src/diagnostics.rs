//! Shared diagnostic machinery.
//!
//! Every stage of the pipeline reports problems as [`Diagnostic`] values
//! carrying a stable [`ErrorCode`], a rendered message, a [`Position`] and a
//! [`Severity`]. Diagnostics accumulate in lists; no stage ever throws past
//! its caller. Rendering follows the `code: text` + help convention, with an
//! optional colored source snippet when the source text is at hand.

use colored::Colorize;
use serde::Serialize;

/// A location in the source text: 0-based line and column plus byte offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Position {
            line,
            column,
            offset,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// Stable error codes. The numbering is part of the public surface and must
/// not be reshuffled between releases; new conditions get new codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    /// S001: reference to a name with no in-scope symbol
    UndefinedVariable,
    /// S002: redefinition of a name in the same scope
    DuplicateDefinition,
    /// S003: assignment to an immutable binding
    ImmutableAssignment,
    /// S004: type mismatch in assignment, initializer or return
    TypeMismatch,
    /// S005: comparison between incompatible primitive types
    IncompatibleComparison,
    /// S006: `redde` outside of a function body
    ReturnOutsideFunction,
    /// S007: `expecta` or async binding outside an async context
    AwaitOutsideAsync,
    /// S008: type alias cycle
    CircularTypeAlias,
    /// S009: import cycle between modules
    CircularImport,
    /// S010: module not found or not parseable
    ModuleError,
    /// S011: invalid parameter declaration
    InvalidParameter,
    /// P001: lexical or syntactic error
    Syntax,
    /// G001: construct unsupported by the selected target
    UnsupportedConstruct,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::UndefinedVariable => "S001",
            ErrorCode::DuplicateDefinition => "S002",
            ErrorCode::ImmutableAssignment => "S003",
            ErrorCode::TypeMismatch => "S004",
            ErrorCode::IncompatibleComparison => "S005",
            ErrorCode::ReturnOutsideFunction => "S006",
            ErrorCode::AwaitOutsideAsync => "S007",
            ErrorCode::CircularTypeAlias => "S008",
            ErrorCode::CircularImport => "S009",
            ErrorCode::ModuleError => "S010",
            ErrorCode::InvalidParameter => "S011",
            ErrorCode::Syntax => "P001",
            ErrorCode::UnsupportedConstruct => "G001",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            ErrorCode::UndefinedVariable => "declare the name before use or check its spelling",
            ErrorCode::DuplicateDefinition => {
                "a name can only be introduced once per scope; shadowing requires a nested scope"
            }
            ErrorCode::ImmutableAssignment => {
                "bindings declared with 'fixum' or 'figendum' cannot be reassigned; use 'varia'"
            }
            ErrorCode::TypeMismatch => "the value's type must be assignable to the expected type",
            ErrorCode::IncompatibleComparison => {
                "both operands of a comparison must share a primitive type"
            }
            ErrorCode::ReturnOutsideFunction => "'redde' is only valid inside a function body",
            ErrorCode::AwaitOutsideAsync => {
                "'expecta', 'figendum' and 'variandum' require an async enclosing function"
            }
            ErrorCode::CircularTypeAlias => "break the cycle by referencing a concrete type",
            ErrorCode::CircularImport => "restructure the modules so imports form a tree",
            ErrorCode::ModuleError => "check the import path relative to the importing file",
            ErrorCode::InvalidParameter => {
                "borrowed ('de'/'in') parameters cannot take defaults and required \
                 parameters cannot follow optional ones"
            }
            ErrorCode::Syntax => "the source text does not follow the Faber grammar",
            ErrorCode::UnsupportedConstruct => {
                "this construct has no translation for the selected target"
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
    pub position: Position,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn error(code: ErrorCode, message: impl ToString, position: Position) -> Self {
        Diagnostic {
            code,
            message: message.to_string(),
            position,
            severity: Severity::Error,
        }
    }

    pub fn warning(code: ErrorCode, message: impl ToString, position: Position) -> Self {
        Diagnostic {
            code,
            message: message.to_string(),
            position,
            severity: Severity::Warning,
        }
    }

    /// Plain rendering without source context: `code: text` plus help.
    pub fn render(&self) -> String {
        format!(
            "{}: {}\n  --> {}\n  help: {}",
            self.code.code(),
            self.message,
            self.position,
            self.code.help()
        )
    }

    /// Rendering with a source snippet and a caret under the offending
    /// column, colored for terminals.
    pub fn render_with_source(&self, source: &str) -> String {
        let lines = source.lines().collect::<Vec<_>>();
        let Some(line_str) = lines.get(self.line()) else {
            return self.render();
        };

        let header = match self.severity {
            Severity::Error => format!("{}: {}", self.code.code().red().bold(), self.message),
            Severity::Warning => {
                format!("{}: {}", self.code.code().yellow().bold(), self.message)
            }
        };

        let margin = format!("{}", self.line() + 1).len();
        let margin_fill = " ".repeat(margin);
        let caret_fill = " ".repeat(self.position.column);

        format!(
            "{header}\n{margin_fill} |\n{line} |{line_str}\n{margin_fill} |{caret_fill}^--- {help}",
            line = self.line() + 1,
            help = self.code.help()
        )
    }

    fn line(&self) -> usize {
        self.position.line
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorCode::UndefinedVariable.code(), "S001");
        assert_eq!(ErrorCode::InvalidParameter.code(), "S011");
        assert_eq!(ErrorCode::CircularTypeAlias.code(), "S008");
    }

    #[test]
    fn test_render_contains_code_and_position() {
        let diagnostic = Diagnostic::error(
            ErrorCode::UndefinedVariable,
            "undefined variable 'salve'",
            Position::new(2, 4, 20),
        );

        let rendered = diagnostic.render();
        assert!(rendered.starts_with("S001: undefined variable 'salve'"));
        assert!(rendered.contains("3:5"));
    }
}
