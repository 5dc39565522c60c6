//! Lexical scopes and symbols.
//!
//! Scopes form a stack of frames with the innermost frame last; lookup walks
//! outward, definition touches only the innermost frame, so shadowing across
//! frames is allowed while same-frame redefinition is an error. Symbol types
//! live behind shared `Rc<RefCell<..>>` slots so the signature-resolution
//! phase can refine predeclared placeholders in place and every holder of
//! the symbol observes the refinement.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::diagnostics::Position;

use super::types::Type;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
    TypeDef,
    EnumDef,
    GenusDef,
    PactumDef,
}

#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub ty: Rc<RefCell<Type>>,
    pub kind: SymbolKind,
    pub mutable: bool,
    pub position: Position,
}

impl Symbol {
    pub fn current_type(&self) -> Type {
        self.ty.borrow().clone()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScopeKind {
    #[default]
    Global,
    Function,
    Block,
}

#[derive(Clone, Debug, Default)]
struct Frame {
    kind: ScopeKind,
    symbols: HashMap<String, Symbol>,
}

type StackFrame = Rc<RefCell<Frame>>;

#[derive(Clone, Debug)]
pub struct Scope {
    frames: Vec<StackFrame>,
}

impl Default for Scope {
    fn default() -> Self {
        Scope {
            frames: vec![StackFrame::default()],
        }
    }
}

impl Scope {
    pub fn new() -> Scope {
        Self::default()
    }

    pub fn enter(&mut self, kind: ScopeKind) {
        self.frames.push(Rc::new(RefCell::new(Frame {
            kind,
            symbols: HashMap::new(),
        })));
    }

    pub fn exit(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Insert into the innermost frame. Returns the already-present symbol
    /// on a same-frame duplicate; outer shadowing is allowed.
    pub fn define(
        &mut self,
        name: impl ToString,
        ty: Type,
        kind: SymbolKind,
        mutable: bool,
        position: Position,
    ) -> Result<(), Symbol> {
        let name = name.to_string();
        let Some(frame) = self.frames.last() else {
            unreachable!("scope always retains the global frame");
        };

        if let Some(existing) = frame.borrow().symbols.get(&name) {
            return Err(existing.clone());
        }

        frame.borrow_mut().symbols.insert(
            name.clone(),
            Symbol {
                name,
                ty: Rc::new(RefCell::new(ty)),
                kind,
                mutable,
                position,
            },
        );

        Ok(())
    }

    /// Search the frame stack from innermost outward.
    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.borrow().symbols.get(name).cloned())
    }

    /// Check only the innermost frame.
    pub fn lookup_local(&self, name: &str) -> Option<Symbol> {
        self.frames
            .last()
            .and_then(|frame| frame.borrow().symbols.get(name).cloned())
    }

    /// Replace a symbol's type in place through its shared slot; used by
    /// signature resolution to refine predeclared placeholders.
    pub fn update_symbol_type(&mut self, name: &str, ty: Type) -> bool {
        match self.lookup(name) {
            Some(symbol) => {
                *symbol.ty.borrow_mut() = ty;
                true
            }
            None => false,
        }
    }

    /// Whether any enclosing frame belongs to a function body.
    pub fn in_function(&self) -> bool {
        self.frames
            .iter()
            .any(|frame| frame.borrow().kind == ScopeKind::Function)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Find the discretio that declares `variant`, for `finge` expressions
    /// written without an explicit discretio name.
    pub fn find_variant_owner(&self, variant: &str) -> Option<(String, Type)> {
        for frame in self.frames.iter().rev() {
            for symbol in frame.borrow().symbols.values() {
                let ty = symbol.current_type();
                if let Type::Discretio { name, variants } = &ty {
                    if variants.iter().any(|(v, _)| v == variant) {
                        return Some((name.clone(), ty.clone()));
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position() -> Position {
        Position::default()
    }

    #[test]
    fn test_define_and_lookup() {
        let mut scope = Scope::new();
        scope
            .define("x", Type::numerus(), SymbolKind::Variable, true, position())
            .expect("fresh name");

        let symbol = scope.lookup("x").unwrap();
        assert_eq!(symbol.current_type(), Type::numerus());
        assert!(symbol.mutable);
    }

    #[test]
    fn test_same_frame_duplicate_rejected() {
        let mut scope = Scope::new();
        scope
            .define("x", Type::numerus(), SymbolKind::Variable, true, position())
            .expect("fresh name");
        assert!(scope
            .define("x", Type::textus(), SymbolKind::Variable, true, position())
            .is_err());
    }

    #[test]
    fn test_shadowing_across_frames_allowed() {
        let mut scope = Scope::new();
        scope
            .define("x", Type::numerus(), SymbolKind::Variable, false, position())
            .expect("fresh name");

        scope.enter(ScopeKind::Block);
        scope
            .define("x", Type::textus(), SymbolKind::Variable, false, position())
            .expect("shadowing is allowed");
        assert_eq!(scope.lookup("x").unwrap().current_type(), Type::textus());

        scope.exit();
        assert_eq!(scope.lookup("x").unwrap().current_type(), Type::numerus());
    }

    #[test]
    fn test_lookup_local_ignores_outer_frames() {
        let mut scope = Scope::new();
        scope
            .define("x", Type::numerus(), SymbolKind::Variable, false, position())
            .expect("fresh name");

        scope.enter(ScopeKind::Block);
        assert!(scope.lookup_local("x").is_none());
        assert!(scope.lookup("x").is_some());
    }

    #[test]
    fn test_update_symbol_type_refines_in_place() {
        let mut scope = Scope::new();
        scope
            .define("f", Type::Unknown, SymbolKind::Function, false, position())
            .expect("fresh name");

        let held = scope.lookup("f").unwrap();
        assert!(scope.update_symbol_type("f", Type::function(vec![], Type::numerus())));

        // the previously held handle observes the refinement
        assert_eq!(
            held.current_type(),
            Type::function(vec![], Type::numerus())
        );
    }
}
