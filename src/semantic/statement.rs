//! Phase walkers over statements: predeclaration (1a), signature
//! resolution (1b) and body analysis (2).

use crate::diagnostics::ErrorCode;
use crate::parser::ast::*;

use super::scope::{ScopeKind, SymbolKind};
use super::stdlib;
use super::types::{is_assignable, Type};
use super::{Analyzer, ModuleContext, ModuleError};

impl Analyzer {
    // --- phase 1a: predeclaration -------------------------------------

    pub(crate) fn predeclare(&mut self, statement: &Statement) {
        match statement {
            Statement::Function(decl) => {
                let placeholder = Type::Function {
                    params: vec![Type::Unknown; decl.params.len()],
                    returns: Box::new(Type::Unknown),
                    is_async: decl.is_async,
                    has_curator: false,
                };
                self.define_or_report(
                    &decl.name,
                    placeholder,
                    SymbolKind::Function,
                    false,
                    decl.position,
                );
            }
            Statement::TypeAlias(decl) => {
                self.define_or_report(
                    &decl.name,
                    Type::Unknown,
                    SymbolKind::TypeDef,
                    false,
                    decl.position,
                );
                self.record_alias(&decl.name, decl.target.clone(), decl.position);
            }
            Statement::Ordo(decl) => {
                // ordo members are self-contained, so the full type is
                // available from the start
                let members = decl
                    .members
                    .iter()
                    .map(|member| {
                        let value_type = match &member.value {
                            Some(LiteralValue::String(_)) => Type::textus(),
                            _ => Type::numerus(),
                        };
                        (member.name.clone(), value_type)
                    })
                    .collect();
                self.nominal.insert(decl.name.clone());
                self.define_or_report(
                    &decl.name,
                    Type::Enum {
                        name: decl.name.clone(),
                        members,
                    },
                    SymbolKind::EnumDef,
                    false,
                    decl.position,
                );
            }
            Statement::Genus(decl) => {
                self.nominal.insert(decl.name.clone());
                self.define_or_report(
                    &decl.name,
                    Type::Genus {
                        name: decl.name.clone(),
                        fields: Vec::new(),
                        methods: Vec::new(),
                        statics: Vec::new(),
                        static_methods: Vec::new(),
                    },
                    SymbolKind::GenusDef,
                    false,
                    decl.position,
                );
            }
            Statement::Pactum(decl) => {
                self.nominal.insert(decl.name.clone());
                self.define_or_report(
                    &decl.name,
                    Type::Pactum {
                        name: decl.name.clone(),
                        methods: Vec::new(),
                    },
                    SymbolKind::PactumDef,
                    false,
                    decl.position,
                );
            }
            Statement::Discretio(decl) => {
                // tags are registered up front; field types follow in 1b
                let variants = decl
                    .variants
                    .iter()
                    .map(|variant| {
                        let fields = variant
                            .fields
                            .iter()
                            .map(|(field, _)| (field.clone(), Type::Unknown))
                            .collect();
                        (variant.name.clone(), fields)
                    })
                    .collect();
                self.nominal.insert(decl.name.clone());
                self.define_or_report(
                    &decl.name,
                    Type::Discretio {
                        name: decl.name.clone(),
                        variants,
                    },
                    SymbolKind::TypeDef,
                    false,
                    decl.position,
                );
            }
            _ => {}
        }
    }

    // --- phase 1b: signature resolution -------------------------------

    pub(crate) fn resolve_signature(&mut self, statement: &Statement) {
        match statement {
            Statement::Function(decl) => {
                let signature = self.resolve_function_signature(decl);
                self.scope.update_symbol_type(&decl.name, signature);
            }
            Statement::TypeAlias(decl) => {
                let ty = self.resolve_alias(&decl.name);
                if !ty.is_unknown() {
                    self.scope.update_symbol_type(&decl.name, ty);
                }
            }
            Statement::Genus(decl) => {
                let ty = self.resolve_genus_type(decl);
                self.scope.update_symbol_type(&decl.name, ty);
            }
            Statement::Pactum(decl) => {
                let methods = decl
                    .methods
                    .iter()
                    .map(|method| {
                        let params = method
                            .params
                            .iter()
                            .map(|p| self.resolve_parameter_type(p))
                            .collect();
                        let returns = self.resolve_return_type(&method.return_annotation);
                        (method.name.clone(), Type::function(params, returns))
                    })
                    .collect();
                self.scope.update_symbol_type(
                    &decl.name,
                    Type::Pactum {
                        name: decl.name.clone(),
                        methods,
                    },
                );
            }
            Statement::Discretio(decl) => {
                let variants = decl
                    .variants
                    .iter()
                    .map(|variant| {
                        let fields = variant
                            .fields
                            .iter()
                            .map(|(field, annotation)| {
                                (field.clone(), self.resolve_annotation(annotation))
                            })
                            .collect();
                        (variant.name.clone(), fields)
                    })
                    .collect();
                self.scope.update_symbol_type(
                    &decl.name,
                    Type::Discretio {
                        name: decl.name.clone(),
                        variants,
                    },
                );
            }
            _ => {}
        }
    }

    pub(crate) fn resolve_parameter_type(&mut self, parameter: &Parameter) -> Type {
        match &parameter.annotation {
            Some(annotation) => self.resolve_annotation(annotation),
            None => Type::Unknown,
        }
    }

    fn resolve_return_type(&mut self, annotation: &Option<TypeAnnotation>) -> Type {
        match annotation {
            Some(annotation) => self.resolve_annotation(annotation),
            None => Type::vacuum(),
        }
    }

    /// The body of an async function checks its `redde` statements against
    /// the promise's value type, not the promise itself.
    fn return_context(&self, returns: &Type, is_async: bool) -> Type {
        if is_async && returns.generic_name() == Some("promissum") {
            return returns.generic_param(0).cloned().unwrap_or(Type::Unknown);
        }
        returns.clone()
    }

    pub(crate) fn resolve_function_signature(&mut self, decl: &FunctionDeclaration) -> Type {
        let params = decl
            .params
            .iter()
            .map(|p| self.resolve_parameter_type(p))
            .collect();
        let returns = self.resolve_return_type(&decl.return_annotation);
        Type::Function {
            params,
            returns: Box::new(returns),
            is_async: decl.is_async,
            has_curator: body_uses_curator(&decl.body),
        }
    }

    fn resolve_genus_type(&mut self, decl: &GenusDeclaration) -> Type {
        let mut fields = Vec::new();
        let mut statics = Vec::new();
        for field in &decl.fields {
            let ty = self.resolve_annotation(&field.annotation);
            if field.is_static {
                statics.push((field.name.clone(), ty));
            } else {
                fields.push((field.name.clone(), ty));
            }
        }

        let mut methods = Vec::new();
        let mut static_methods = Vec::new();
        for method in &decl.methods {
            let signature = self.resolve_function_signature(&method.function);
            if method.is_static {
                static_methods.push((method.function.name.clone(), signature));
            } else {
                methods.push((method.function.name.clone(), signature));
            }
        }

        Type::Genus {
            name: decl.name.clone(),
            fields,
            methods,
            statics,
            static_methods,
        }
    }

    // --- phase 2: body analysis ---------------------------------------

    pub(crate) fn analyze_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Import(decl) => self.analyze_import(decl),
            Statement::DestructureImport(decl) => self.analyze_destructure_import(decl),
            Statement::Variable(decl) => self.analyze_variable(decl),
            Statement::Function(decl) => self.analyze_function(decl),
            Statement::TypeAlias(_) | Statement::Ordo(_) | Statement::Pactum(_) => {}
            Statement::Genus(decl) => self.analyze_genus(decl),
            Statement::Discretio(decl) => {
                if decl.variants.is_empty() {
                    self.warning(
                        ErrorCode::TypeMismatch,
                        format!("discretio '{}' has no variants", decl.name),
                        decl.position,
                    );
                }
            }
            Statement::If(decl) => self.analyze_if(decl),
            Statement::While(decl) => {
                self.check_condition(&decl.condition);
                self.analyze_block(&decl.body);
            }
            Statement::Iteration(decl) => self.analyze_iteration(decl),
            Statement::MutationContext(decl) => self.analyze_mutation_context(decl),
            Statement::ValueSwitch(decl) => self.analyze_value_switch(decl),
            Statement::VariantSwitch(decl) => self.analyze_variant_switch(decl),
            Statement::Guard(decl) => {
                self.check_condition(&decl.condition);
                self.analyze_block(&decl.fallback);
            }
            Statement::Assert(decl) => {
                self.check_condition(&decl.condition);
            }
            Statement::Return(decl) => self.analyze_return(decl),
            Statement::Break(_) | Statement::Continue(_) => {}
            Statement::Block(block) => self.analyze_block(block),
            Statement::Throw(decl) => {
                self.analyze_expression(&decl.value);
            }
            Statement::Try(decl) => {
                self.analyze_block(&decl.body);
                if let Some(catch) = &decl.catch {
                    self.analyze_catch(catch);
                }
                if let Some(finally) = &decl.finally {
                    self.analyze_block(finally);
                }
            }
            Statement::DoBlock(decl) => self.analyze_block(&decl.body),
            Statement::Entry(decl) => {
                self.enter_function(Type::vacuum(), decl.is_async);
                for inner in &decl.body.statements {
                    self.analyze_statement(inner);
                }
                self.exit_function();
            }
            Statement::Print(decl) => {
                self.analyze_expression(&decl.value);
            }
            Statement::Suite(decl) => self.analyze_block(&decl.body),
            Statement::Case(decl) => self.analyze_block(&decl.body),
            Statement::Fixture(decl) => self.analyze_block(&decl.body),
            Statement::Cura(decl) => self.analyze_cura(decl),
            Statement::Dispatch(decl) => self.analyze_dispatch(decl),
            Statement::Expression(decl) => {
                self.analyze_expression(&decl.expression);
            }
        }
    }

    pub(crate) fn analyze_block(&mut self, block: &Block) {
        self.scope.enter(ScopeKind::Block);
        for statement in &block.statements {
            self.analyze_statement(statement);
        }
        self.scope.exit();
    }

    fn analyze_catch(&mut self, catch: &CatchClause) {
        self.scope.enter(ScopeKind::Block);
        self.define_or_report(
            &catch.binding,
            Type::Unknown,
            SymbolKind::Variable,
            false,
            catch.position,
        );
        for statement in &catch.block.statements {
            self.analyze_statement(statement);
        }
        self.scope.exit();
    }

    fn check_condition(&mut self, condition: &Expression) {
        let ty = self.analyze_expression(condition);
        if !ty.is_unknown() && !ty.is_primitive_named("bivalens") {
            self.error(
                ErrorCode::TypeMismatch,
                format!("condition must be bivalens, found {ty}"),
                condition.position(),
            );
        }
    }

    // --- imports ------------------------------------------------------

    fn analyze_import(&mut self, decl: &ImportStatement) {
        if stdlib::is_stdlib(&decl.module) {
            match stdlib::module_exports(&decl.module) {
                Some(exports) => {
                    for export in exports {
                        let _ = self.scope.define(
                            export.name,
                            export.ty.clone(),
                            export.kind,
                            false,
                            decl.position,
                        );
                    }
                }
                None => self.error(
                    ErrorCode::ModuleError,
                    format!("unknown standard library module '{}'", decl.module),
                    decl.position,
                ),
            }
            return;
        }

        if is_local(&decl.module) {
            if let Some(exports) = self.resolve_local_module(&decl.module, decl.position) {
                for export in exports {
                    let _ = self.scope.define(
                        &export.name,
                        export.ty.clone(),
                        export.kind,
                        export.mutable,
                        decl.position,
                    );
                }
            }
        }
        // unknown bare modules pass through untyped for interop
    }

    fn analyze_destructure_import(&mut self, decl: &DestructureImport) {
        if stdlib::is_stdlib(&decl.module) {
            let Some(exports) = stdlib::module_exports(&decl.module) else {
                self.error(
                    ErrorCode::ModuleError,
                    format!("unknown standard library module '{}'", decl.module),
                    decl.position,
                );
                return;
            };

            if decl.wildcard {
                for export in exports {
                    let _ = self.scope.define(
                        export.name,
                        export.ty.clone(),
                        export.kind,
                        false,
                        decl.position,
                    );
                }
                return;
            }

            for specifier in &decl.specifiers {
                match exports.iter().find(|e| e.name == specifier.as_str()) {
                    Some(export) => {
                        let _ = self.scope.define(
                            export.name,
                            export.ty.clone(),
                            export.kind,
                            false,
                            decl.position,
                        );
                    }
                    None => self.error(
                        ErrorCode::ModuleError,
                        format!("module '{}' does not export '{specifier}'", decl.module),
                        decl.position,
                    ),
                }
            }
            return;
        }

        if is_local(&decl.module) {
            let Some(exports) = self.resolve_local_module(&decl.module, decl.position) else {
                return;
            };

            if decl.wildcard {
                for export in &exports {
                    let _ = self.scope.define(
                        &export.name,
                        export.ty.clone(),
                        export.kind,
                        export.mutable,
                        decl.position,
                    );
                }
                return;
            }

            for specifier in &decl.specifiers {
                match exports.iter().find(|e| &e.name == specifier) {
                    Some(export) => {
                        let _ = self.scope.define(
                            &export.name,
                            export.ty.clone(),
                            export.kind,
                            export.mutable,
                            decl.position,
                        );
                    }
                    None => self.error(
                        ErrorCode::ModuleError,
                        format!("module '{}' does not export '{specifier}'", decl.module),
                        decl.position,
                    ),
                }
            }
            return;
        }

        // unknown bare modules: bind the specifiers untyped
        for specifier in &decl.specifiers {
            let _ = self.scope.define(
                specifier,
                Type::Unknown,
                SymbolKind::Variable,
                false,
                decl.position,
            );
        }
    }

    fn resolve_local_module(
        &mut self,
        spec: &str,
        position: crate::diagnostics::Position,
    ) -> Option<Vec<super::ExportedSymbol>> {
        let Some((context, base_dir)) = self.module.clone() else {
            self.error(
                ErrorCode::ModuleError,
                "local imports require a file path for the translation unit",
                position,
            );
            return None;
        };

        match ModuleContext::resolve(&context, &base_dir, spec) {
            Ok((exports, diagnostics)) => {
                self.diagnostics.extend(diagnostics);
                Some(exports)
            }
            Err(error @ ModuleError::Circular(_)) => {
                self.error(ErrorCode::CircularImport, error.to_string(), position);
                None
            }
            Err(error) => {
                self.error(ErrorCode::ModuleError, error.to_string(), position);
                None
            }
        }
    }

    // --- declarations -------------------------------------------------

    fn analyze_variable(&mut self, decl: &VariableDeclaration) {
        let mut initializer_type = self.analyze_expression(&decl.initializer);

        if decl.kind.is_async() {
            if !self.in_async() {
                self.error(
                    ErrorCode::AwaitOutsideAsync,
                    format!(
                        "'{}' binding requires an async enclosing function",
                        if decl.kind == BindingKind::Figendum {
                            "figendum"
                        } else {
                            "variandum"
                        }
                    ),
                    decl.position,
                );
            }
            // the async binding awaits its initializer
            if initializer_type.generic_name() == Some("promissum") {
                initializer_type = initializer_type
                    .generic_param(0)
                    .cloned()
                    .unwrap_or(Type::Unknown);
            }
        }

        let declared = match &decl.annotation {
            Some(annotation) => {
                let declared = self.resolve_annotation(annotation);
                if !is_assignable(&initializer_type, &declared) {
                    self.error(
                        ErrorCode::TypeMismatch,
                        format!(
                            "cannot initialize '{}' of type {declared} with {initializer_type}",
                            decl.name
                        ),
                        decl.initializer.position(),
                    );
                }
                declared
            }
            None => initializer_type,
        };

        self.define_or_report(
            &decl.name,
            declared,
            SymbolKind::Variable,
            decl.kind.is_mutable(),
            decl.position,
        );
    }

    pub(crate) fn check_parameters(&mut self, params: &[Parameter]) {
        let mut seen_optional = false;

        for (index, parameter) in params.iter().enumerate() {
            let borrowed = parameter
                .annotation
                .as_ref()
                .map(|a| a.ownership != Ownership::Owned)
                .unwrap_or(false);

            if borrowed && parameter.default.is_some() {
                self.error(
                    ErrorCode::InvalidParameter,
                    format!(
                        "borrowed parameter '{}' cannot have a default value",
                        parameter.name
                    ),
                    parameter.position,
                );
            }

            if parameter.rest && index + 1 != params.len() {
                self.error(
                    ErrorCode::InvalidParameter,
                    format!("rest parameter '{}' must come last", parameter.name),
                    parameter.position,
                );
            }

            if parameter.default.is_none() && !parameter.rest && seen_optional {
                self.error(
                    ErrorCode::InvalidParameter,
                    format!(
                        "required parameter '{}' cannot follow an optional one",
                        parameter.name
                    ),
                    parameter.position,
                );
            }

            if parameter.default.is_some() {
                seen_optional = true;
            }
        }
    }

    pub(crate) fn bind_parameters(&mut self, params: &[Parameter]) {
        for parameter in params {
            let ty = self.resolve_parameter_type(parameter);
            let mutable = parameter
                .annotation
                .as_ref()
                .map(|a| a.ownership == Ownership::MutableBorrow)
                .unwrap_or(false);
            self.define_or_report(
                &parameter.name,
                ty,
                SymbolKind::Parameter,
                mutable,
                parameter.position,
            );
        }
    }

    fn analyze_function(&mut self, decl: &FunctionDeclaration) {
        // nested functions are not predeclared; define them here
        if self.scope.depth() > 1 {
            let signature = self.resolve_function_signature(decl);
            self.define_or_report(
                &decl.name,
                signature,
                SymbolKind::Function,
                false,
                decl.position,
            );
        }

        self.check_parameters(&decl.params);
        for parameter in &decl.params {
            if let Some(default) = &parameter.default {
                self.analyze_expression(default);
            }
        }

        let returns = self.resolve_return_type(&decl.return_annotation);
        let context = self.return_context(&returns, decl.is_async);
        self.enter_function(context, decl.is_async);
        self.bind_parameters(&decl.params);
        for statement in &decl.body.statements {
            self.analyze_statement(statement);
        }
        self.exit_function();
    }

    fn analyze_genus(&mut self, decl: &GenusDeclaration) {
        for field in &decl.fields {
            if let Some(default) = &field.default {
                self.analyze_expression(default);
            }
        }

        for method in &decl.methods {
            if !method.is_static {
                self.self_stack.push(Type::User(decl.name.clone()));
            }

            let function = &method.function;
            self.check_parameters(&function.params);
            let returns = self.resolve_return_type(&function.return_annotation);
            let context = self.return_context(&returns, function.is_async);
            self.enter_function(context, function.is_async);
            self.bind_parameters(&function.params);
            for statement in &function.body.statements {
                self.analyze_statement(statement);
            }
            self.exit_function();

            if !method.is_static {
                self.self_stack.pop();
            }
        }
    }

    // --- control flow -------------------------------------------------

    fn analyze_if(&mut self, decl: &IfStatement) {
        self.check_condition(&decl.condition);
        self.analyze_block(&decl.then_block);
        for (condition, block) in &decl.else_ifs {
            self.check_condition(condition);
            self.analyze_block(block);
        }
        if let Some(block) = &decl.else_block {
            self.analyze_block(block);
        }
        if let Some(catch) = &decl.catch {
            self.analyze_catch(catch);
        }
    }

    fn analyze_iteration(&mut self, decl: &IterationStatement) {
        if decl.is_async && !self.in_async() {
            self.error(
                ErrorCode::AwaitOutsideAsync,
                "async iteration requires an async enclosing function",
                decl.position,
            );
        }

        let iterable = self.analyze_expression(&decl.iterable);
        let element = self.element_type(&iterable);

        self.scope.enter(ScopeKind::Block);
        self.define_or_report(
            &decl.binding,
            element,
            SymbolKind::Variable,
            decl.kind == IterationKind::In,
            decl.position,
        );
        for statement in &decl.body.statements {
            self.analyze_statement(statement);
        }
        self.scope.exit();
    }

    pub(crate) fn element_type(&self, iterable: &Type) -> Type {
        match iterable {
            Type::Generic { name, params, .. } => match name.as_str() {
                "lista" | "copia" | "cursor" | "fluxus" => {
                    params.first().cloned().unwrap_or(Type::Unknown)
                }
                "tabula" => params.first().cloned().unwrap_or(Type::Unknown),
                _ => Type::Unknown,
            },
            Type::Primitive { name, .. } if name == "textus" => Type::textus(),
            _ => Type::Unknown,
        }
    }

    /// The mutation-context block pre-binds the target's fields as mutable
    /// names; bare assignments inside become member stores at codegen.
    fn analyze_mutation_context(&mut self, decl: &MutationContext) {
        let target = self.analyze_expression(&decl.target);
        let target = self.dereference(&target);
        if matches!(target, Type::Genus { .. }) {
            *decl.shape.borrow_mut() = Some(target.clone());
        }

        self.scope.enter(ScopeKind::Block);
        if let Type::Genus { fields, .. } = &target {
            for (name, ty) in fields {
                let _ = self.scope.define(
                    name,
                    ty.clone(),
                    SymbolKind::Variable,
                    true,
                    decl.position,
                );
            }
        }
        for statement in &decl.body.statements {
            self.analyze_statement(statement);
        }
        self.scope.exit();
    }

    fn analyze_value_switch(&mut self, decl: &ValueSwitch) {
        let discriminant = self.analyze_expression(&decl.discriminant);

        for arm in &decl.arms {
            for value in &arm.values {
                let value_type = self.analyze_expression(value);
                if let (
                    Type::Primitive { name: left, .. },
                    Type::Primitive { name: right, .. },
                ) = (&discriminant, &value_type)
                {
                    if left != right {
                        self.error(
                            ErrorCode::IncompatibleComparison,
                            format!("cannot match {discriminant} against {value_type}"),
                            value.position(),
                        );
                    }
                }
            }
            self.analyze_block(&arm.body);
        }

        if let Some(default) = &decl.default {
            self.analyze_block(default);
        }
    }

    fn analyze_variant_switch(&mut self, decl: &VariantSwitch) {
        let discriminant_types = decl
            .discriminants
            .iter()
            .map(|d| self.analyze_expression(d))
            .collect::<Vec<_>>();
        let first_discretio = discriminant_types
            .first()
            .map(|t| self.dereference(t))
            .filter(|t| matches!(t, Type::Discretio { .. }));
        if let Some(shape) = &first_discretio {
            *decl.shape.borrow_mut() = Some(shape.clone());
        }

        for arm in &decl.arms {
            if let Some(Type::Discretio { variants, name }) = &first_discretio {
                for variant in &arm.variants {
                    if variant != "_" && !variants.iter().any(|(v, _)| v == variant) {
                        self.error(
                            ErrorCode::UndefinedVariable,
                            format!("discretio '{name}' has no variant '{variant}'"),
                            arm.position,
                        );
                    }
                }
            }

            self.scope.enter(ScopeKind::Block);
            match &arm.bindings {
                VariantBindings::Positional(names) => {
                    // positional bindings take the matched variant's fields
                    // in declaration order
                    let fields = first_discretio
                        .as_ref()
                        .and_then(|t| match t {
                            Type::Discretio { variants, .. } => arm
                                .variants
                                .first()
                                .and_then(|v| variants.iter().find(|(name, _)| name == v))
                                .map(|(_, fields)| fields.clone()),
                            _ => None,
                        })
                        .unwrap_or_default();

                    for (index, binding) in names.iter().enumerate() {
                        let ty = fields
                            .get(index)
                            .map(|(_, ty)| ty.clone())
                            .unwrap_or(Type::Unknown);
                        self.define_or_report(
                            binding,
                            ty,
                            SymbolKind::Variable,
                            false,
                            arm.position,
                        );
                    }
                }
                VariantBindings::Alias(name) => {
                    let ty = discriminant_types.first().cloned().unwrap_or(Type::Unknown);
                    self.define_or_report(name, ty, SymbolKind::Variable, false, arm.position);
                }
                VariantBindings::None => {}
            }

            for statement in &arm.body.statements {
                self.analyze_statement(statement);
            }
            self.scope.exit();
        }

        if let Some(default) = &decl.default {
            self.analyze_block(default);
        }
    }

    fn analyze_return(&mut self, decl: &ReturnStatement) {
        let value_type = match &decl.value {
            Some(value) => self.analyze_expression(value),
            None => Type::vacuum(),
        };

        let Some(expected) = self.return_stack.last().cloned() else {
            self.error(
                ErrorCode::ReturnOutsideFunction,
                "'redde' outside of a function body",
                decl.position,
            );
            return;
        };

        if !is_assignable(&value_type, &expected) {
            self.error(
                ErrorCode::TypeMismatch,
                format!("cannot return {value_type} from a function returning {expected}"),
                decl.position,
            );
        }
    }

    fn analyze_cura(&mut self, decl: &CuraStatement) {
        if decl.is_async && !self.in_async() {
            self.error(
                ErrorCode::AwaitOutsideAsync,
                "'cura fiet' requires an async enclosing function",
                decl.position,
            );
        }

        let binding_type = match &decl.curator {
            CuratorKind::Arena => Type::User("Arena".to_string()),
            CuratorKind::Pagina => Type::User("Pagina".to_string()),
            CuratorKind::Generic(resource) => self.analyze_expression(resource),
        };

        self.scope.enter(ScopeKind::Block);
        self.define_or_report(
            &decl.binding,
            binding_type,
            SymbolKind::Variable,
            false,
            decl.position,
        );
        for statement in &decl.body.statements {
            self.analyze_statement(statement);
        }
        self.scope.exit();

        if let Some(catch) = &decl.catch {
            self.analyze_catch(catch);
        }
    }

    fn analyze_dispatch(&mut self, decl: &DispatchStatement) {
        for arg in &decl.args {
            self.analyze_expression(arg);
        }

        if decl.verb.map(|v| v.is_async()).unwrap_or(false) && !self.in_async() {
            self.error(
                ErrorCode::AwaitOutsideAsync,
                "async dispatch requires an async enclosing function",
                decl.position,
            );
        }

        if let Some(body) = &decl.body {
            self.scope.enter(ScopeKind::Block);
            if let Some(binding) = &decl.binding {
                let ty = if decl.verb.map(|v| v.is_plural()).unwrap_or(false) {
                    Type::lista(Type::Unknown)
                } else {
                    Type::Unknown
                };
                self.define_or_report(binding, ty, SymbolKind::Variable, false, decl.position);
            }
            for statement in &body.statements {
                self.analyze_statement(statement);
            }
            self.scope.exit();
        }

        if let Some(catch) = &decl.catch {
            self.analyze_catch(catch);
        }
    }
}

fn is_local(spec: &str) -> bool {
    spec.starts_with("./") || spec.starts_with("../")
}

/// Whether a function body acquires an arena or page curator anywhere;
/// such functions need an allocator threaded in by their callers on
/// allocator-passing targets.
pub(crate) fn body_uses_curator(block: &Block) -> bool {
    block.statements.iter().any(statement_uses_curator)
}

fn statement_uses_curator(statement: &Statement) -> bool {
    match statement {
        Statement::Cura(cura) => {
            matches!(cura.curator, CuratorKind::Arena | CuratorKind::Pagina)
                || body_uses_curator(&cura.body)
        }
        Statement::If(s) => {
            body_uses_curator(&s.then_block)
                || s.else_ifs.iter().any(|(_, b)| body_uses_curator(b))
                || s.else_block.as_ref().map(body_uses_curator).unwrap_or(false)
        }
        Statement::While(s) => body_uses_curator(&s.body),
        Statement::Iteration(s) => body_uses_curator(&s.body),
        Statement::Block(b) => body_uses_curator(b),
        Statement::DoBlock(s) => body_uses_curator(&s.body),
        Statement::Try(s) => {
            body_uses_curator(&s.body)
                || s.finally.as_ref().map(body_uses_curator).unwrap_or(false)
        }
        _ => false,
    }
}
