use serde::Serialize;

/// Canonical semantic type representation used by analysis and code
/// generation. Nominal types (genus, pactum, discretio, ordo) are referenced
/// through [`Type::User`] at use sites; the structural definition lives on
/// the declaring symbol, so refinements made during signature resolution are
/// visible everywhere without re-cloning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Type {
    /// named primitive with optional bit width (`numerus<32>`)
    Primitive {
        name: String,
        size: Option<u32>,
        nullable: bool,
    },
    /// known generic head with its parameters (`lista<numerus>`)
    Generic {
        name: String,
        params: Vec<Type>,
        nullable: bool,
    },
    Function {
        params: Vec<Type>,
        returns: Box<Type>,
        is_async: bool,
        /// the function allocates through a scoped curator and needs one
        /// threaded in by the caller
        has_curator: bool,
    },
    Union(Vec<Type>),
    /// opaque or nominal reference by name
    User(String),
    Enum {
        name: String,
        /// member name to value type, declaration order
        members: Vec<(String, Type)>,
    },
    Genus {
        name: String,
        fields: Vec<(String, Type)>,
        methods: Vec<(String, Type)>,
        statics: Vec<(String, Type)>,
        static_methods: Vec<(String, Type)>,
    },
    Pactum {
        name: String,
        methods: Vec<(String, Type)>,
    },
    Discretio {
        name: String,
        /// variant name to ordered field list
        variants: Vec<(String, Vec<(String, Type)>)>,
    },
    Unknown,
}

/// Primitive type names of the surface language.
pub const PRIMITIVES: &[&str] = &[
    "numerus", "fractus", "magnus", "textus", "bivalens", "vacuum", "nihil",
];

/// Known generic heads.
pub const GENERIC_NAMES: &[&str] = &["lista", "tabula", "copia", "promissum", "cursor", "fluxus"];

impl Type {
    pub fn primitive(name: impl ToString) -> Type {
        Type::Primitive {
            name: name.to_string(),
            size: None,
            nullable: false,
        }
    }

    pub fn numerus() -> Type {
        Type::primitive("numerus")
    }

    pub fn fractus() -> Type {
        Type::primitive("fractus")
    }

    pub fn magnus() -> Type {
        Type::primitive("magnus")
    }

    pub fn textus() -> Type {
        Type::primitive("textus")
    }

    pub fn bivalens() -> Type {
        Type::primitive("bivalens")
    }

    pub fn vacuum() -> Type {
        Type::primitive("vacuum")
    }

    pub fn nihil() -> Type {
        Type::primitive("nihil")
    }

    pub fn lista(element: Type) -> Type {
        Type::Generic {
            name: "lista".to_string(),
            params: vec![element],
            nullable: false,
        }
    }

    pub fn promissum(value: Type) -> Type {
        Type::Generic {
            name: "promissum".to_string(),
            params: vec![value],
            nullable: false,
        }
    }

    pub fn function(params: Vec<Type>, returns: Type) -> Type {
        Type::Function {
            params,
            returns: Box::new(returns),
            is_async: false,
            has_curator: false,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Type::Primitive { name, .. } if name == "numerus" || name == "fractus" || name == "magnus"
        )
    }

    pub fn is_primitive_named(&self, expected: &str) -> bool {
        matches!(self, Type::Primitive { name, .. } if name == expected)
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            Type::Primitive { nullable, .. } | Type::Generic { nullable, .. } => *nullable,
            Type::Union(alternatives) => alternatives
                .iter()
                .any(|t| t.is_primitive_named("nihil") || t.is_nullable()),
            _ => false,
        }
    }

    pub fn with_nullable(&self, nullable: bool) -> Type {
        match self.clone() {
            Type::Primitive { name, size, .. } => Type::Primitive {
                name,
                size,
                nullable,
            },
            Type::Generic { name, params, .. } => Type::Generic {
                name,
                params,
                nullable,
            },
            other if nullable => Type::Union(vec![other, Type::nihil()]),
            other => other,
        }
    }

    /// Generic head name, when this is a known generic.
    pub fn generic_name(&self) -> Option<&str> {
        match self {
            Type::Generic { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn generic_param(&self, index: usize) -> Option<&Type> {
        match self {
            Type::Generic { params, .. } => params.get(index),
            _ => None,
        }
    }
}

/// Width of a numeric primitive in the widening lattice; the suffix-free
/// spelling is the widest.
fn numeric_width(size: &Option<u32>) -> u32 {
    size.unwrap_or(64)
}

/// Widening order between numeric primitive families:
/// `numerus` widens into `fractus` and `magnus`.
fn numeric_family_widens(source: &str, target: &str) -> bool {
    source == target || (source == "numerus" && (target == "fractus" || target == "magnus"))
}

/// Assignability: structural equality, unknown as wildcard, `nihil` into
/// nullable targets, union targets by alternative, numeric widening, and
/// componentwise generics.
pub fn is_assignable(source: &Type, target: &Type) -> bool {
    if source == target {
        return true;
    }
    if source.is_unknown() || target.is_unknown() {
        return true;
    }

    if source.is_primitive_named("nihil") && target.is_nullable() {
        return true;
    }

    if let Type::Union(alternatives) = target {
        return alternatives.iter().any(|t| is_assignable(source, t));
    }

    match (source, target) {
        (
            Type::Primitive {
                name: source_name,
                size: source_size,
                nullable: source_nullable,
            },
            Type::Primitive {
                name: target_name,
                size: target_size,
                nullable: target_nullable,
            },
        ) => {
            if *source_nullable && !target_nullable {
                return false;
            }
            if source_name == target_name {
                return numeric_width(source_size) <= numeric_width(target_size)
                    || !source.is_numeric();
            }
            numeric_family_widens(source_name, target_name)
        }
        (
            Type::Generic {
                name: source_name,
                params: source_params,
                nullable: source_nullable,
            },
            Type::Generic {
                name: target_name,
                params: target_params,
                nullable: target_nullable,
            },
        ) => {
            source_name == target_name
                && source_params.len() == target_params.len()
                && (!source_nullable || *target_nullable)
                && source_params
                    .iter()
                    .zip(target_params.iter())
                    .all(|(s, t)| is_assignable(s, t))
        }
        (
            Type::Function {
                params: source_params,
                returns: source_returns,
                ..
            },
            Type::Function {
                params: target_params,
                returns: target_returns,
                ..
            },
        ) => {
            source_params.len() == target_params.len()
                && source_params
                    .iter()
                    .zip(target_params.iter())
                    .all(|(s, t)| is_assignable(t, s))
                && is_assignable(source_returns, target_returns)
        }
        _ => false,
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Primitive { name, size, nullable } => {
                write!(f, "{name}")?;
                if let Some(size) = size {
                    write!(f, "<{size}>")?;
                }
                if *nullable {
                    write!(f, "?")?;
                }
                Ok(())
            }
            Type::Generic {
                name,
                params,
                nullable,
            } => {
                let params = params
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{name}<{params}>")?;
                if *nullable {
                    write!(f, "?")?;
                }
                Ok(())
            }
            Type::Function {
                params,
                returns,
                is_async,
                ..
            } => {
                let params = params
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                if *is_async {
                    write!(f, "fiet ({params}) -> {returns}")
                } else {
                    write!(f, "({params}) -> {returns}")
                }
            }
            Type::Union(alternatives) => {
                let rendered = alternatives
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(" | ");
                write!(f, "{rendered}")
            }
            Type::User(name) => write!(f, "{name}"),
            Type::Enum { name, .. } => write!(f, "ordo {name}"),
            Type::Genus { name, .. } => write!(f, "genus {name}"),
            Type::Pactum { name, .. } => write!(f, "pactum {name}"),
            Type::Discretio { name, .. } => write!(f, "discretio {name}"),
            Type::Unknown => write!(f, "ignotum"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality_is_assignable() {
        assert!(is_assignable(&Type::numerus(), &Type::numerus()));
        assert!(is_assignable(
            &Type::lista(Type::textus()),
            &Type::lista(Type::textus())
        ));
    }

    #[test]
    fn test_unknown_is_wildcard() {
        assert!(is_assignable(&Type::Unknown, &Type::textus()));
        assert!(is_assignable(&Type::textus(), &Type::Unknown));
    }

    #[test]
    fn test_nihil_into_nullable() {
        let nullable = Type::textus().with_nullable(true);
        assert!(is_assignable(&Type::nihil(), &nullable));
        assert!(!is_assignable(&Type::nihil(), &Type::textus()));
    }

    #[test]
    fn test_union_target() {
        let target = Type::Union(vec![Type::numerus(), Type::textus()]);
        assert!(is_assignable(&Type::textus(), &target));
        assert!(!is_assignable(&Type::bivalens(), &target));
    }

    #[test]
    fn test_numeric_widening() {
        let narrow = Type::Primitive {
            name: "numerus".into(),
            size: Some(32),
            nullable: false,
        };
        assert!(is_assignable(&narrow, &Type::numerus()));
        assert!(!is_assignable(&Type::numerus(), &narrow));
        assert!(is_assignable(&Type::numerus(), &Type::fractus()));
        assert!(!is_assignable(&Type::fractus(), &Type::numerus()));
    }

    #[test]
    fn test_generic_componentwise() {
        let narrow = Type::lista(Type::Primitive {
            name: "numerus".into(),
            size: Some(16),
            nullable: false,
        });
        assert!(is_assignable(&narrow, &Type::lista(Type::numerus())));
        assert!(!is_assignable(
            &Type::lista(Type::textus()),
            &Type::lista(Type::numerus())
        ));
    }
}
