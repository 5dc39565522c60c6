//! # Code generation
//!
//! Walks the annotated AST and emits target source text. Each target owns a
//! generator object carrying an indentation counter, an accumulating set of
//! required headers/imports, a side buffer for forward output the target
//! needs hoisted (C++ forward declarations, Python prologue imports) and an
//! exhaustive dispatch over node tags: statement emitters write into the
//! output, expression emitters return strings.
//!
//! Constructs with no translation on a target produce a `G001` diagnostic
//! and a commented placeholder instead of silently dropping code, so the
//! emitted module is always complete and inspectable.

mod cpp;
mod python;
mod rust;
mod typescript;
mod zig;

pub use self::cpp::CppGenerator;
pub use self::python::PythonGenerator;
pub use self::rust::RustGenerator;
pub use self::typescript::TypeScriptGenerator;
pub use self::zig::ZigGenerator;

use std::collections::BTreeSet;

use crate::diagnostics::Diagnostic;
use crate::parser::ast::{Expression, Program, Statement, TypeSlot};
use crate::semantic::Type;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    Cpp,
    Rust,
    TypeScript,
    Python,
    Zig,
}

impl Target {
    pub fn all() -> &'static [Target] {
        &[
            Target::Cpp,
            Target::Rust,
            Target::TypeScript,
            Target::Python,
            Target::Zig,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Target::Cpp => "cpp",
            Target::Rust => "rust",
            Target::TypeScript => "typescript",
            Target::Python => "python",
            Target::Zig => "zig",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            Target::Cpp => "cpp",
            Target::Rust => "rs",
            Target::TypeScript => "ts",
            Target::Python => "py",
            Target::Zig => "zig",
        }
    }
}

impl std::str::FromStr for Target {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "cpp" | "c++" | "cxx" => Ok(Target::Cpp),
            "rust" | "rs" => Ok(Target::Rust),
            "typescript" | "ts" => Ok(Target::TypeScript),
            "python" | "py" => Ok(Target::Python),
            "zig" => Ok(Target::Zig),
            other => Err(format!("unknown target '{other}'")),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Emitted source plus the deduplicated header/import manifest and any
/// generation diagnostics.
#[derive(Clone, Debug, Default)]
pub struct GeneratedModule {
    pub source: String,
    pub headers: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Generate target source for an analyzed program.
pub fn generate(program: &Program, target: Target) -> GeneratedModule {
    match target {
        Target::Cpp => CppGenerator::new().generate(program),
        Target::Rust => RustGenerator::new().generate(program),
        Target::TypeScript => TypeScriptGenerator::new().generate(program),
        Target::Python => PythonGenerator::new().generate(program),
        Target::Zig => ZigGenerator::new().generate(program),
    }
}

/// Shared emission state: output buffer, indentation counter, required
/// header set and side buffer for hoisted declarations.
#[derive(Clone, Debug, Default)]
pub(crate) struct Emitter {
    pub out: String,
    pub indent: usize,
    pub headers: BTreeSet<String>,
    pub side: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Emitter {
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.out.push('\n');
            return;
        }
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Emit a line and indent the following ones (block opener).
    pub fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.indent += 1;
    }

    /// Dedent and emit a closing line.
    pub fn close(&mut self, text: impl AsRef<str>) {
        self.indent = self.indent.saturating_sub(1);
        self.line(text);
    }

    /// Dedent without emitting (indentation-based targets).
    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn require(&mut self, header: impl ToString) {
        self.headers.insert(header.to_string());
    }
}

/// Millisecond values of the duration intrinsics; identical across targets.
pub(crate) fn duration_constant(name: &str) -> Option<i64> {
    match name {
        "MILLISECUNDUM" => Some(1),
        "SECUNDUM" => Some(1_000),
        "MINUTUM" => Some(60_000),
        "HORA" => Some(3_600_000),
        "DIES" => Some(86_400_000),
        _ => None,
    }
}

/// Escape a string for inclusion in a double-quoted literal; shared by all
/// brace-family targets.
pub(crate) fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Keep float literals round-trippable: a fractional part is always spelled.
pub(crate) fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Generic head of an expression's resolved receiver type, if any.
pub(crate) fn receiver_generic(expression: &Expression) -> Option<String> {
    expression
        .resolved_type()
        .and_then(|ty| ty.generic_name().map(|n| n.to_string()))
}

/// Field names of a variant inside an analyzer-filled discretio shape slot.
pub(crate) fn variant_field_names(shape: &TypeSlot, variant: &str) -> Vec<String> {
    match shape.borrow().as_ref() {
        Some(Type::Discretio { variants, .. }) => variants
            .iter()
            .find(|(name, _)| name == variant)
            .map(|(_, fields)| fields.iter().map(|(field, _)| field.clone()).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Field names of an analyzer-filled genus shape slot.
pub(crate) fn genus_field_names(shape: &TypeSlot) -> Vec<String> {
    match shape.borrow().as_ref() {
        Some(Type::Genus { fields, .. }) => {
            fields.iter().map(|(field, _)| field.clone()).collect()
        }
        _ => Vec::new(),
    }
}

/// A statement of the form `name = value` inside a mutation-context block.
pub(crate) fn bare_assignment(statement: &Statement) -> Option<(String, &Expression)> {
    let Statement::Expression(expression_statement) = statement else {
        return None;
    };
    let Expression::Assignment(assignment) = &expression_statement.expression else {
        return None;
    };
    let Expression::Identifier(id) = &assignment.target else {
        return None;
    };
    Some((id.name.clone(), &assignment.value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parsing() {
        assert_eq!("ts".parse::<Target>(), Ok(Target::TypeScript));
        assert_eq!("c++".parse::<Target>(), Ok(Target::Cpp));
        assert!("cobol".parse::<Target>().is_err());
    }

    #[test]
    fn test_emitter_indentation() {
        let mut emitter = Emitter::default();
        emitter.open("fn main() {");
        emitter.line("let x = 1;");
        emitter.close("}");
        assert_eq!(emitter.out, "fn main() {\n    let x = 1;\n}\n");
    }

    #[test]
    fn test_duration_constants() {
        assert_eq!(duration_constant("SECUNDUM"), Some(1_000));
        assert_eq!(duration_constant("DIES"), Some(86_400_000));
        assert_eq!(duration_constant("PI"), None);
    }
}
