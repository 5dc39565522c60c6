//! # Semantic analysis
//!
//! Annotates the AST with resolved types, builds symbol tables and collects
//! diagnostics. The analyzer never fails hard: every problem becomes a
//! [`Diagnostic`] and the offending expression is typed [`Type::Unknown`] so
//! downstream analysis keeps producing useful results.
//!
//! Analysis runs in five sub-phases over the top-level statement list:
//!
//! 1. **Predeclaration** registers every top-level declaration under a
//!    placeholder shell type, so later phases see all names regardless of
//!    declaration order (mutual recursion needs no forward declarations).
//! 2. **Signature resolution** re-walks the declarations, resolves their
//!    annotations against the now-visible names and refines the placeholder
//!    in place through the symbol's shared type slot.
//! 3. **Alias fixed point** iteratively re-resolves type aliases that are
//!    still unknown until a pass makes no progress, which settles alias
//!    chains written in any order.
//! 4. **Cycle scan** reports any alias that survived the fixed point as
//!    circular.
//! 5. **Body analysis** walks every statement, types each expression
//!    bottom-up and writes the result into the expression's type slot.

mod expression;
mod module;
mod scope;
mod statement;
pub mod stdlib;
mod types;

pub use self::module::{ExportedSymbol, ModuleContext, ModuleError, SharedModuleContext};
pub use self::scope::{Scope, ScopeKind, Symbol, SymbolKind};
pub use self::types::{is_assignable, Type, GENERIC_NAMES, PRIMITIVES};

use std::collections::HashSet;
use std::path::PathBuf;

use log::debug;

use crate::diagnostics::{Diagnostic, ErrorCode, Position};
use crate::parser::ast::{
    FunctionAnnotation, Program, Statement, TypeAnnotation, TypeParam,
};

/// Result of analyzing one program. The program itself is annotated in
/// place through the expression type slots.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub diagnostics: Vec<Diagnostic>,
}

impl Analysis {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == crate::diagnostics::Severity::Error)
    }
}

#[derive(Clone, Debug)]
struct AliasRecord {
    name: String,
    annotation: TypeAnnotation,
    position: Position,
}

pub struct Analyzer {
    pub(crate) scope: Scope,
    pub(crate) diagnostics: Vec<Diagnostic>,
    /// return-type context stack; a `redde` checks against the top
    pub(crate) return_stack: Vec<Type>,
    /// async context stack parallel to the function nesting
    pub(crate) async_stack: Vec<bool>,
    /// `ipse` type stack for genus method bodies
    pub(crate) self_stack: Vec<Type>,
    aliases: Vec<AliasRecord>,
    /// aliases currently being resolved, for self-reference detection
    resolving: HashSet<String>,
    /// aliases already reported circular, to avoid double reports
    reported_aliases: HashSet<String>,
    /// names of nominal types (genus/pactum/ordo/discretio) that resolve to
    /// `Type::User` references instead of structural clones
    pub(crate) nominal: HashSet<String>,
    pub(crate) module: Option<(SharedModuleContext, PathBuf)>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Analyzer {
            scope: Scope::new(),
            diagnostics: Vec::new(),
            return_stack: Vec::new(),
            async_stack: Vec::new(),
            self_stack: Vec::new(),
            aliases: Vec::new(),
            resolving: HashSet::new(),
            reported_aliases: HashSet::new(),
            nominal: HashSet::new(),
            module: None,
        }
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyzer with a module context, enabling `./` and `../` imports
    /// resolved relative to `base_dir`.
    pub fn with_module(context: SharedModuleContext, base_dir: PathBuf) -> Self {
        Analyzer {
            module: Some((context, base_dir)),
            ..Default::default()
        }
    }

    /// Run all phases. Returns the accumulated diagnostics; the program's
    /// expression nodes now carry resolved types.
    pub fn run(&mut self, program: &Program) -> Vec<Diagnostic> {
        debug!("phase 1a: predeclaration");
        for statement in &program.statements {
            self.predeclare(statement);
        }

        debug!("phase 1b: signature resolution");
        for statement in &program.statements {
            self.resolve_signature(statement);
        }

        debug!("phase 1c: alias fixed point");
        self.alias_fixed_point();

        debug!("phase 1d: alias cycle scan");
        self.report_circular_aliases();

        debug!("phase 2: body analysis");
        for statement in &program.statements {
            self.analyze_statement(statement);
        }

        self.diagnostics.clone()
    }

    /// Exports table for the module context: one entry per top-level
    /// declaration, with the post-analysis symbol type.
    pub fn exports(&self, program: &Program) -> Vec<ExportedSymbol> {
        let mut exports = Vec::new();

        for statement in &program.statements {
            let name = match statement {
                Statement::Variable(decl) => &decl.name,
                Statement::Function(decl) => &decl.name,
                Statement::TypeAlias(decl) => &decl.name,
                Statement::Ordo(decl) => &decl.name,
                Statement::Genus(decl) => &decl.name,
                Statement::Pactum(decl) => &decl.name,
                Statement::Discretio(decl) => &decl.name,
                _ => continue,
            };

            if let Some(symbol) = self.scope.lookup(name) {
                exports.push(ExportedSymbol {
                    name: symbol.name.clone(),
                    ty: symbol.current_type(),
                    kind: symbol.kind,
                    mutable: symbol.mutable,
                });
            }
        }

        exports
    }

    // --- alias machinery ----------------------------------------------

    pub(crate) fn record_alias(
        &mut self,
        name: impl ToString,
        annotation: TypeAnnotation,
        position: Position,
    ) {
        self.aliases.push(AliasRecord {
            name: name.to_string(),
            annotation,
            position,
        });
    }

    pub(crate) fn resolve_alias(&mut self, name: &str) -> Type {
        let Some(record) = self.aliases.iter().find(|a| a.name == name).cloned() else {
            return Type::Unknown;
        };

        self.resolving.insert(record.name.clone());
        let ty = self.resolve_annotation(&record.annotation);
        self.resolving.remove(&record.name);
        ty
    }

    fn alias_unresolved(&self, name: &str) -> bool {
        self.scope
            .lookup(name)
            .map(|symbol| symbol.current_type().is_unknown())
            .unwrap_or(false)
    }

    fn alias_fixed_point(&mut self) {
        loop {
            let mut progress = false;
            let names = self
                .aliases
                .iter()
                .map(|a| a.name.clone())
                .collect::<Vec<_>>();

            for name in names {
                if !self.alias_unresolved(&name) {
                    continue;
                }
                let ty = self.resolve_alias(&name);
                if !ty.is_unknown() {
                    self.scope.update_symbol_type(&name, ty);
                    progress = true;
                }
            }

            if !progress {
                break;
            }
        }
    }

    fn report_circular_aliases(&mut self) {
        let records = self.aliases.clone();
        for record in &records {
            if self.alias_unresolved(&record.name)
                && !self.reported_aliases.contains(&record.name)
            {
                self.error(
                    ErrorCode::CircularTypeAlias,
                    format!("type alias '{}' is circular", record.name),
                    record.position,
                );
            }
        }
    }

    // --- annotation resolution ----------------------------------------

    pub(crate) fn resolve_annotation(&mut self, annotation: &TypeAnnotation) -> Type {
        if let Some(function) = &annotation.function {
            return self.resolve_function_annotation(function);
        }

        let mut ty = self.resolve_named_annotation(annotation);
        if annotation.array {
            ty = Type::lista(ty);
        }
        if annotation.nullable {
            ty = ty.with_nullable(true);
        }
        if !annotation.alternatives.is_empty() {
            let mut alternatives = vec![ty];
            for alternative in &annotation.alternatives {
                alternatives.push(self.resolve_annotation(alternative));
            }
            ty = Type::Union(alternatives);
        }
        ty
    }

    fn resolve_function_annotation(&mut self, function: &FunctionAnnotation) -> Type {
        let params = function
            .params
            .iter()
            .map(|p| self.resolve_annotation(p))
            .collect();
        let returns = self.resolve_annotation(&function.returns);
        Type::Function {
            params,
            returns: Box::new(returns),
            is_async: false,
            has_curator: false,
        }
    }

    fn resolve_named_annotation(&mut self, annotation: &TypeAnnotation) -> Type {
        let name = annotation.name.as_str();

        if PRIMITIVES.contains(&name) {
            let size = annotation.params.iter().find_map(|p| match p {
                TypeParam::Width(width) => Some(*width),
                TypeParam::Type(_) => None,
            });
            return Type::Primitive {
                name: name.to_string(),
                size,
                nullable: false,
            };
        }

        if GENERIC_NAMES.contains(&name) {
            let params = annotation
                .params
                .iter()
                .map(|p| match p {
                    TypeParam::Type(inner) => self.resolve_annotation(inner),
                    TypeParam::Width(width) => Type::Primitive {
                        name: "numerus".to_string(),
                        size: Some(*width),
                        nullable: false,
                    },
                })
                .collect();
            return Type::Generic {
                name: name.to_string(),
                params,
                nullable: false,
            };
        }

        if self.nominal.contains(name) {
            return Type::User(name.to_string());
        }

        if let Some(symbol) = self.scope.lookup(name) {
            if symbol.kind == SymbolKind::TypeDef {
                if self.resolving.contains(name) {
                    self.error(
                        ErrorCode::CircularTypeAlias,
                        format!("type alias '{name}' refers to itself"),
                        annotation.position,
                    );
                    self.reported_aliases.insert(name.to_string());
                    return Type::Unknown;
                }
                return symbol.current_type();
            }
        }

        // unknown names stay opaque to permit host-ecosystem interop
        Type::User(name.to_string())
    }

    // --- context helpers ----------------------------------------------

    pub(crate) fn enter_function(&mut self, returns: Type, is_async: bool) {
        self.scope.enter(ScopeKind::Function);
        self.return_stack.push(returns);
        self.async_stack.push(is_async);
    }

    pub(crate) fn exit_function(&mut self) {
        self.scope.exit();
        self.return_stack.pop();
        self.async_stack.pop();
    }

    pub(crate) fn in_async(&self) -> bool {
        self.async_stack.last().copied().unwrap_or(false)
    }

    /// Resolve a nominal `Type::User` reference to the declaring symbol's
    /// structural type; other types pass through.
    pub(crate) fn dereference(&self, ty: &Type) -> Type {
        if let Type::User(name) = ty {
            if let Some(symbol) = self.scope.lookup(name) {
                return symbol.current_type();
            }
        }
        ty.clone()
    }

    pub(crate) fn error(
        &mut self,
        code: ErrorCode,
        message: impl ToString,
        position: Position,
    ) {
        self.diagnostics
            .push(Diagnostic::error(code, message, position));
    }

    pub(crate) fn warning(
        &mut self,
        code: ErrorCode,
        message: impl ToString,
        position: Position,
    ) {
        self.diagnostics
            .push(Diagnostic::warning(code, message, position));
    }

    pub(crate) fn define_or_report(
        &mut self,
        name: &str,
        ty: Type,
        kind: SymbolKind,
        mutable: bool,
        position: Position,
    ) {
        if let Err(existing) = self.scope.define(name, ty, kind, mutable, position) {
            self.error(
                ErrorCode::DuplicateDefinition,
                format!(
                    "'{name}' is already defined at line {}",
                    existing.position.line + 1
                ),
                position,
            );
        }
    }
}

/// Analyze a standalone program (no local imports).
pub fn analyze(program: &Program) -> Analysis {
    let mut analyzer = Analyzer::new();
    Analysis {
        diagnostics: analyzer.run(program),
    }
}

/// Analyze a program belonging to a file on disk; local imports resolve
/// relative to that file through the shared module context.
pub fn analyze_with_modules(
    program: &Program,
    file_path: &std::path::Path,
    context: SharedModuleContext,
) -> Analysis {
    let base_dir = file_path
        .parent()
        .unwrap_or(std::path::Path::new("."))
        .to_path_buf();
    let mut analyzer = Analyzer::with_module(context, base_dir);
    Analysis {
        diagnostics: analyzer.run(program),
    }
}
