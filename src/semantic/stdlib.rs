//! Precomputed export tables for the `norma` standard library.
//!
//! Imports from `norma` or its submodules bind specifiers against these
//! tables; unknown modules that are neither stdlib nor local paths pass
//! through untyped for host-ecosystem interop.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::scope::SymbolKind;
use super::types::Type;

#[derive(Clone, Debug)]
pub struct StdlibExport {
    pub name: &'static str,
    pub ty: Type,
    pub kind: SymbolKind,
}

fn constant(name: &'static str, ty: Type) -> StdlibExport {
    StdlibExport {
        name,
        ty,
        kind: SymbolKind::Variable,
    }
}

fn function(name: &'static str, params: Vec<Type>, returns: Type) -> StdlibExport {
    StdlibExport {
        name,
        ty: Type::function(params, returns),
        kind: SymbolKind::Function,
    }
}

fn async_function(name: &'static str, params: Vec<Type>, returns: Type) -> StdlibExport {
    StdlibExport {
        name,
        ty: Type::Function {
            params,
            returns: Box::new(Type::promissum(returns)),
            is_async: true,
            has_curator: false,
        },
        kind: SymbolKind::Function,
    }
}

static MODULES: Lazy<HashMap<&'static str, Vec<StdlibExport>>> = Lazy::new(|| {
    HashMap::from([
        (
            "norma",
            vec![
                constant("PI", Type::fractus()),
                constant("TAU", Type::fractus()),
                constant("EULERUS", Type::fractus()),
                constant("MILLISECUNDUM", Type::numerus()),
                constant("SECUNDUM", Type::numerus()),
                constant("MINUTUM", Type::numerus()),
                constant("HORA", Type::numerus()),
                constant("DIES", Type::numerus()),
                async_function("dormi", vec![Type::numerus()], Type::vacuum()),
            ],
        ),
        (
            "norma/math",
            vec![
                function("sin", vec![Type::fractus()], Type::fractus()),
                function("cos", vec![Type::fractus()], Type::fractus()),
                function("tan", vec![Type::fractus()], Type::fractus()),
                function("radix", vec![Type::fractus()], Type::fractus()),
                function(
                    "potentia",
                    vec![Type::fractus(), Type::fractus()],
                    Type::fractus(),
                ),
                function("absolutus", vec![Type::fractus()], Type::fractus()),
                function("tectum", vec![Type::fractus()], Type::numerus()),
                function("solum", vec![Type::fractus()], Type::numerus()),
            ],
        ),
        (
            "norma/tempus",
            vec![
                function("nunc", vec![], Type::numerus()),
                function("dies_hodiernus", vec![], Type::textus()),
            ],
        ),
        (
            "norma/textus",
            vec![
                function("maiuscula", vec![Type::textus()], Type::textus()),
                function("minuscula", vec![Type::textus()], Type::textus()),
                function("recide", vec![Type::textus()], Type::textus()),
                function(
                    "scinde",
                    vec![Type::textus(), Type::textus()],
                    Type::lista(Type::textus()),
                ),
            ],
        ),
        (
            "norma/fortuna",
            vec![
                function("alea", vec![], Type::fractus()),
                function(
                    "aleatorius",
                    vec![Type::numerus(), Type::numerus()],
                    Type::numerus(),
                ),
            ],
        ),
    ])
});

pub fn is_stdlib(path: &str) -> bool {
    path == "norma" || path.starts_with("norma/")
}

pub fn module_exports(path: &str) -> Option<&'static [StdlibExport]> {
    MODULES.get(path).map(|exports| exports.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_and_submodules_present() {
        assert!(module_exports("norma").is_some());
        assert!(module_exports("norma/math").is_some());
        assert!(module_exports("norma/ignotum").is_none());
    }

    #[test]
    fn test_stdlib_detection() {
        assert!(is_stdlib("norma"));
        assert!(is_stdlib("norma/math"));
        assert!(!is_stdlib("./localis"));
        assert!(!is_stdlib("npm-aliquid"));
    }
}
