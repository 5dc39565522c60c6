//! Faber: a source-to-source compiler for a Latin-keyword language.
//!
//! The pipeline is a strict sequence over one translation unit:
//! tokenize -> parse -> analyze -> generate. Every stage accumulates
//! diagnostics instead of failing, so a compilation always yields a full
//! batch of findings.

pub mod codegen;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod semantic;

use std::path::Path;

use codegen::{GeneratedModule, Target};
use diagnostics::{Diagnostic, Severity};
use parser::parse_source;
use semantic::SharedModuleContext;

/// Outcome of compiling one source text. `output` is `None` only when the
/// parser could not produce a program at all.
#[derive(Clone, Debug)]
pub struct CompileResult {
    pub output: Option<GeneratedModule>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// Compile a standalone source text (no local imports).
pub fn compile(source: &str, target: Target) -> CompileResult {
    let parsed = parse_source(source);
    let mut diagnostics = parsed.diagnostics;

    let Some(program) = parsed.program else {
        return CompileResult {
            output: None,
            diagnostics,
        };
    };

    let analysis = semantic::analyze(&program);
    diagnostics.extend(analysis.diagnostics);

    let module = codegen::generate(&program, target);
    diagnostics.extend(module.diagnostics.clone());

    CompileResult {
        output: Some(module),
        diagnostics,
    }
}

/// Compile a source text that belongs to a file on disk; `./` and `../`
/// imports resolve relative to it through the shared module context.
pub fn compile_file(
    source: &str,
    path: &Path,
    target: Target,
    context: SharedModuleContext,
) -> CompileResult {
    let parsed = parse_source(source);
    let mut diagnostics = parsed.diagnostics;

    let Some(program) = parsed.program else {
        return CompileResult {
            output: None,
            diagnostics,
        };
    };

    let analysis = semantic::analyze_with_modules(&program, path, context);
    diagnostics.extend(analysis.diagnostics);

    let module = codegen::generate(&program, target);
    diagnostics.extend(module.diagnostics.clone());

    CompileResult {
        output: Some(module),
        diagnostics,
    }
}
