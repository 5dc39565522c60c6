//! Module context for local (`./`, `../`) imports.
//!
//! The context caches parsed-and-analyzed exports by normalized path and
//! tracks an in-progress stack for cycle detection. The cache may be shared
//! across translation units compiled in sequence; sharing across threads
//! requires external locking.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use log::debug;

use crate::diagnostics::Diagnostic;
use crate::parser::parse_source;

use super::scope::SymbolKind;
use super::types::Type;
use super::Analyzer;

#[derive(Clone, Debug)]
pub struct ExportedSymbol {
    pub name: String,
    pub ty: Type,
    pub kind: SymbolKind,
    pub mutable: bool,
}

#[derive(Clone, Debug)]
pub enum ModuleError {
    NotFound(PathBuf),
    /// the full chain from the first occurrence of the re-entered module
    Circular(Vec<PathBuf>),
    Unparseable(PathBuf),
}

impl std::fmt::Display for ModuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleError::NotFound(path) => {
                write!(f, "module not found: {}", path.display())
            }
            ModuleError::Circular(chain) => {
                let rendered = chain
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                write!(f, "circular import: {rendered}")
            }
            ModuleError::Unparseable(path) => {
                write!(f, "imported module failed to parse: {}", path.display())
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ModuleContext {
    cache: HashMap<PathBuf, Vec<ExportedSymbol>>,
    in_progress: Vec<PathBuf>,
}

pub type SharedModuleContext = Rc<RefCell<ModuleContext>>;

impl ModuleContext {
    pub fn new() -> SharedModuleContext {
        Rc::new(RefCell::new(ModuleContext::default()))
    }

    pub fn cached_modules(&self) -> usize {
        self.cache.len()
    }

    /// Resolve a local import relative to the importing file's directory.
    /// Re-entering a module whose analysis has started but not finished is
    /// a cycle and reported with the full chain. The returned diagnostics
    /// are the imported module's own findings; they surface once, on the
    /// first resolution, and cache hits return none.
    pub fn resolve(
        context: &SharedModuleContext,
        base_dir: &Path,
        spec: &str,
    ) -> Result<(Vec<ExportedSymbol>, Vec<Diagnostic>), ModuleError> {
        let path = normalize(&base_dir.join(with_extension(spec)));

        if let Some(exports) = context.borrow().cache.get(&path) {
            debug!("module cache hit: {}", path.display());
            return Ok((exports.clone(), Vec::new()));
        }

        {
            let borrowed = context.borrow();
            if let Some(start) = borrowed.in_progress.iter().position(|p| p == &path) {
                let mut chain = borrowed.in_progress[start..].to_vec();
                chain.push(path.clone());
                return Err(ModuleError::Circular(chain));
            }
        }

        let source = std::fs::read_to_string(&path)
            .map_err(|_| ModuleError::NotFound(path.clone()))?;

        context.borrow_mut().in_progress.push(path.clone());
        let result = Self::analyze_module(context, &path, &source);
        context.borrow_mut().in_progress.pop();

        let (exports, diagnostics) = result?;
        context
            .borrow_mut()
            .cache
            .insert(path.clone(), exports.clone());
        debug!("module analyzed and cached: {}", path.display());

        Ok((exports, diagnostics))
    }

    fn analyze_module(
        context: &SharedModuleContext,
        path: &Path,
        source: &str,
    ) -> Result<(Vec<ExportedSymbol>, Vec<Diagnostic>), ModuleError> {
        let parsed = parse_source(source);
        let Some(program) = parsed.program else {
            return Err(ModuleError::Unparseable(path.to_path_buf()));
        };

        let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let mut analyzer = Analyzer::with_module(context.clone(), base_dir);
        let mut diagnostics = parsed.diagnostics;
        diagnostics.extend(analyzer.run(&program));

        Ok((analyzer.exports(&program), diagnostics))
    }
}

fn with_extension(spec: &str) -> String {
    if Path::new(spec).extension().is_some() {
        spec.to_string()
    } else {
        format!("{spec}.fab")
    }
}

/// Lexical normalization: resolves `.` and `..` without touching the
/// filesystem, so cache keys are stable regardless of the importer's cwd.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_resolves_dots() {
        assert_eq!(
            normalize(Path::new("a/b/../c/./d.fab")),
            PathBuf::from("a/c/d.fab")
        );
    }

    #[test]
    fn test_extension_appended_once() {
        assert_eq!(with_extension("./util"), "./util.fab");
        assert_eq!(with_extension("./util.fab"), "./util.fab");
    }
}
