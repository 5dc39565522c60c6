//! Phase 2 expression typing. Every expression is typed bottom-up and the
//! result is written into the node's shared type slot; failed analysis
//! yields [`Type::Unknown`] so surrounding expressions keep being checked.

use regex::Regex;

use crate::diagnostics::ErrorCode;
use crate::parser::ast::*;

use super::scope::{ScopeKind, SymbolKind};
use super::types::{is_assignable, Type};
use super::Analyzer;

impl Analyzer {
    pub(crate) fn analyze_expression(&mut self, expression: &Expression) -> Type {
        let ty = self.type_of_expression(expression);
        *expression.type_slot().borrow_mut() = Some(ty.clone());
        ty
    }

    fn type_of_expression(&mut self, expression: &Expression) -> Type {
        match expression {
            Expression::Identifier(id) => match self.scope.lookup(&id.name) {
                Some(symbol) => symbol.current_type(),
                None => {
                    self.error(
                        ErrorCode::UndefinedVariable,
                        format!("undefined variable '{}'", id.name),
                        id.position,
                    );
                    Type::Unknown
                }
            },
            Expression::SelfRef(self_ref) => match self.self_stack.last() {
                Some(ty) => ty.clone(),
                None => {
                    self.error(
                        ErrorCode::UndefinedVariable,
                        "'ipse' is only available inside genus methods",
                        self_ref.position,
                    );
                    Type::Unknown
                }
            },
            Expression::Literal(literal) => match &literal.value {
                LiteralValue::String(_) => Type::textus(),
                LiteralValue::Integer(_) => Type::numerus(),
                LiteralValue::Float(_) => Type::fractus(),
                LiteralValue::BigInt(_) => Type::magnus(),
                LiteralValue::Boolean(_) => Type::bivalens(),
                LiteralValue::Null => Type::nihil(),
            },
            Expression::TemplateString(template) => {
                for part in &template.parts {
                    if let TemplatePart::Interpolation(inner) = part {
                        self.analyze_expression(inner);
                    }
                }
                Type::textus()
            }
            Expression::FormatString(format) => {
                self.analyze_expression(&format.format);
                for arg in &format.args {
                    self.analyze_expression(arg);
                }
                Type::textus()
            }
            Expression::Regex(regex) => {
                if let Err(error) = Regex::new(&regex.pattern) {
                    self.warning(
                        ErrorCode::Syntax,
                        format!("invalid regular expression: {error}"),
                        regex.position,
                    );
                }
                Type::User("Regula".to_string())
            }
            Expression::ReadInput(read) => {
                if let Some(prompt) = &read.prompt {
                    self.analyze_expression(prompt);
                }
                Type::textus()
            }
            Expression::Array(array) => {
                let mut element = Type::Unknown;
                for item in &array.elements {
                    let item_type = self.analyze_expression(item);
                    if element.is_unknown() {
                        element = item_type;
                    }
                }
                Type::lista(element)
            }
            Expression::Object(object) => {
                let mut value = Type::Unknown;
                for entry in &object.entries {
                    let entry_type = self.analyze_expression(&entry.value);
                    if value.is_unknown() {
                        value = entry_type;
                    }
                }
                Type::Generic {
                    name: "tabula".to_string(),
                    params: vec![Type::textus(), value],
                    nullable: false,
                }
            }
            Expression::Range(range) => {
                let start = self.analyze_expression(&range.start);
                self.analyze_expression(&range.end);
                let element = if start.is_numeric() {
                    start
                } else {
                    Type::numerus()
                };
                Type::Generic {
                    name: "cursor".to_string(),
                    params: vec![element],
                    nullable: false,
                }
            }
            Expression::Binary(binary) => self.analyze_binary(binary),
            Expression::Unary(unary) => {
                let operand = self.analyze_expression(&unary.operand);
                match unary.operator {
                    UnaryOperator::Not => Type::bivalens(),
                    UnaryOperator::Negate if operand.is_numeric() => operand,
                    UnaryOperator::Negate => Type::Unknown,
                }
            }
            Expression::Shift(shift) => {
                let value = self.analyze_expression(&shift.value);
                self.analyze_expression(&shift.amount);
                if value.is_numeric() {
                    value
                } else {
                    Type::numerus()
                }
            }
            Expression::Ternary(ternary) => {
                self.analyze_expression(&ternary.condition);
                let consequent = self.analyze_expression(&ternary.consequent);
                let alternative = self.analyze_expression(&ternary.alternative);
                if consequent == alternative || alternative.is_unknown() {
                    consequent
                } else if consequent.is_unknown() {
                    alternative
                } else {
                    Type::Union(vec![consequent, alternative])
                }
            }
            Expression::Assignment(assignment) => self.analyze_assignment(assignment),
            Expression::TypeCheck(check) => {
                self.analyze_expression(&check.value);
                self.resolve_annotation(&check.annotation);
                Type::bivalens()
            }
            Expression::Cast(cast) => {
                self.analyze_expression(&cast.value);
                self.resolve_annotation(&cast.annotation)
            }
            Expression::Conversion(conversion) => {
                self.analyze_expression(&conversion.value);
                match conversion.kind {
                    ConversionKind::Numeratum => Type::numerus(),
                    ConversionKind::Textatum => Type::textus(),
                    ConversionKind::Fractatum => Type::fractus(),
                    ConversionKind::Bivalentum => Type::bivalens(),
                }
            }
            Expression::Native(native) => {
                for arg in &native.args {
                    self.analyze_expression(arg);
                }
                self.resolve_annotation(&native.target_type)
            }
            Expression::Call(call) => self.analyze_call(call),
            Expression::Member(member) => self.analyze_member(member),
            Expression::Index(index) => {
                let object = self.analyze_expression(&index.object);
                self.analyze_expression(&index.index);
                match &object {
                    Type::Generic { name, params, .. } if name == "lista" => {
                        params.first().cloned().unwrap_or(Type::Unknown)
                    }
                    Type::Generic { name, params, .. } if name == "tabula" => {
                        params.get(1).cloned().unwrap_or(Type::Unknown)
                    }
                    Type::Primitive { name, .. } if name == "textus" => Type::textus(),
                    _ => Type::Unknown,
                }
            }
            Expression::New(new) => self.analyze_new(new),
            Expression::Variant(variant) => self.analyze_variant_construction(variant),
            Expression::Lambda(lambda) => self.analyze_lambda(lambda),
            Expression::Await(await_expr) => {
                let value = self.analyze_expression(&await_expr.value);
                if !self.in_async() {
                    self.error(
                        ErrorCode::AwaitOutsideAsync,
                        "'expecta' requires an async enclosing function",
                        await_expr.position,
                    );
                }
                if value.generic_name() == Some("promissum") {
                    value.generic_param(0).cloned().unwrap_or(Type::Unknown)
                } else {
                    value
                }
            }
            Expression::Comptime(comptime) => self.analyze_expression(&comptime.value),
            Expression::Pipeline(pipeline) => {
                if let Some(count) = &pipeline.count {
                    self.analyze_expression(count);
                }
                let source = self.analyze_expression(&pipeline.source);
                match pipeline.op {
                    PipelineOp::Summa => {
                        let element = self.element_type(&source);
                        if element.is_numeric() {
                            element
                        } else {
                            Type::Unknown
                        }
                    }
                    PipelineOp::Prima | PipelineOp::Ultima => source,
                }
            }
            Expression::Filter(filter) => {
                let source = self.analyze_expression(&filter.source);
                let element = self.element_type(&source);

                self.scope.enter(ScopeKind::Block);
                let _ = self.scope.define(
                    &filter.binding,
                    element,
                    SymbolKind::Variable,
                    false,
                    filter.position,
                );
                self.analyze_expression(&filter.predicate);
                self.scope.exit();

                source
            }
            Expression::RangeTest(test) => {
                self.analyze_expression(&test.value);
                self.analyze_expression(&test.low);
                self.analyze_expression(&test.high);
                Type::bivalens()
            }
            Expression::Membership(membership) => {
                self.analyze_expression(&membership.value);
                self.analyze_expression(&membership.collection);
                Type::bivalens()
            }
        }
    }

    fn analyze_binary(&mut self, binary: &BinaryExpression) -> Type {
        let left = self.analyze_expression(&binary.lhs);
        let right = self.analyze_expression(&binary.rhs);
        let operator = binary.operator;

        if operator.is_arithmetic() {
            if operator == BinaryOperator::Add
                && (left.is_primitive_named("textus") || right.is_primitive_named("textus"))
            {
                return Type::textus();
            }
            if left.is_numeric() && right.is_numeric() {
                // same-named operands keep their type, mixed numerics take
                // the left type
                return left;
            }
            if left.is_numeric() && right.is_unknown() {
                return left;
            }
            if left.is_unknown() && right.is_numeric() {
                return right;
            }
            return Type::Unknown;
        }

        if operator.is_comparison() {
            if let (Type::Primitive { name: left_name, .. }, Type::Primitive { name: right_name, .. }) =
                (&left, &right)
            {
                if left_name != right_name {
                    self.error(
                        ErrorCode::IncompatibleComparison,
                        format!("cannot compare {left} with {right}"),
                        binary.position,
                    );
                }
            }
            return Type::bivalens();
        }

        if operator.is_equality() {
            return Type::bivalens();
        }

        match operator {
            BinaryOperator::And | BinaryOperator::Or => Type::bivalens(),
            BinaryOperator::NullCoalesce => {
                if left.is_unknown() {
                    right
                } else {
                    left.with_nullable(false)
                }
            }
            _ => Type::Unknown,
        }
    }

    fn analyze_assignment(&mut self, assignment: &AssignmentExpression) -> Type {
        let value = self.analyze_expression(&assignment.value);

        match &assignment.target {
            Expression::Identifier(id) => {
                let Some(symbol) = self.scope.lookup(&id.name) else {
                    self.error(
                        ErrorCode::UndefinedVariable,
                        format!("undefined variable '{}'", id.name),
                        id.position,
                    );
                    *assignment.target.type_slot().borrow_mut() = Some(Type::Unknown);
                    return value;
                };

                let target_type = symbol.current_type();
                *assignment.target.type_slot().borrow_mut() = Some(target_type.clone());

                if !symbol.mutable {
                    self.error(
                        ErrorCode::ImmutableAssignment,
                        format!("cannot reassign immutable binding '{}'", id.name),
                        assignment.position,
                    );
                }
                if !is_assignable(&value, &target_type) {
                    self.error(
                        ErrorCode::TypeMismatch,
                        format!("cannot assign {value} to '{}' of type {target_type}", id.name),
                        assignment.position,
                    );
                }
            }
            Expression::Member(_) | Expression::Index(_) => {
                let target_type = self.analyze_expression(&assignment.target);
                if !is_assignable(&value, &target_type) {
                    self.error(
                        ErrorCode::TypeMismatch,
                        format!("cannot assign {value} to a target of type {target_type}"),
                        assignment.position,
                    );
                }
            }
            other => {
                self.analyze_expression(other);
                self.error(
                    ErrorCode::TypeMismatch,
                    "invalid assignment target",
                    assignment.position,
                );
            }
        }

        value
    }

    fn analyze_call(&mut self, call: &CallExpression) -> Type {
        let callee = self.analyze_expression(&call.callee);
        let args = call
            .args
            .iter()
            .map(|arg| self.analyze_expression(arg))
            .collect::<Vec<_>>();

        match callee {
            Type::Function {
                params,
                returns,
                has_curator,
                ..
            } => {
                if has_curator {
                    // the callee allocates through a curator; code
                    // generation threads one through this call site
                    call.injects_curator.set(true);
                }
                for (index, (arg, param)) in args.iter().zip(params.iter()).enumerate() {
                    if !is_assignable(arg, param) {
                        self.error(
                            ErrorCode::TypeMismatch,
                            format!("argument {} has type {arg}, expected {param}", index + 1),
                            call.args[index].position(),
                        );
                    }
                }
                *returns
            }
            Type::Unknown => Type::Unknown,
            other => {
                self.error(
                    ErrorCode::TypeMismatch,
                    format!("cannot call a value of type {other}"),
                    call.position,
                );
                Type::Unknown
            }
        }
    }

    fn analyze_member(&mut self, member: &MemberExpression) -> Type {
        // a bare type name on the left selects enum members or genus statics
        if let Expression::Identifier(id) = &member.object {
            if let Some(symbol) = self.scope.lookup(&id.name) {
                match symbol.kind {
                    SymbolKind::EnumDef => {
                        *member.object.type_slot().borrow_mut() = Some(symbol.current_type());
                        if let Type::Enum { name, members } = symbol.current_type() {
                            if members.iter().any(|(m, _)| m == &member.property) {
                                return Type::User(name);
                            }
                            self.error(
                                ErrorCode::UndefinedVariable,
                                format!("ordo '{name}' has no member '{}'", member.property),
                                member.position,
                            );
                            return Type::Unknown;
                        }
                    }
                    SymbolKind::GenusDef => {
                        *member.object.type_slot().borrow_mut() = Some(symbol.current_type());
                        if let Type::Genus {
                            name,
                            statics,
                            static_methods,
                            ..
                        } = symbol.current_type()
                        {
                            if let Some((_, ty)) =
                                statics.iter().find(|(n, _)| n == &member.property)
                            {
                                return ty.clone();
                            }
                            if let Some((_, ty)) =
                                static_methods.iter().find(|(n, _)| n == &member.property)
                            {
                                return ty.clone();
                            }
                            self.error(
                                ErrorCode::UndefinedVariable,
                                format!(
                                    "genus '{name}' has no static member '{}'",
                                    member.property
                                ),
                                member.position,
                            );
                            return Type::Unknown;
                        }
                    }
                    _ => {}
                }
            }
        }

        let object = self.analyze_expression(&member.object);
        let object = self.dereference(&object);

        match &object {
            Type::Genus {
                name,
                fields,
                methods,
                ..
            } => {
                if let Some((_, ty)) = fields.iter().find(|(n, _)| n == &member.property) {
                    return ty.clone();
                }
                if let Some((_, ty)) = methods.iter().find(|(n, _)| n == &member.property) {
                    return ty.clone();
                }
                self.error(
                    ErrorCode::UndefinedVariable,
                    format!("genus '{name}' has no member '{}'", member.property),
                    member.position,
                );
                Type::Unknown
            }
            Type::Pactum { methods, .. } => methods
                .iter()
                .find(|(n, _)| n == &member.property)
                .map(|(_, ty)| ty.clone())
                .unwrap_or(Type::Unknown),
            other => builtin_member(other, &member.property).unwrap_or(Type::Unknown),
        }
    }

    fn analyze_new(&mut self, new: &NewExpression) -> Type {
        let args = new
            .args
            .iter()
            .map(|arg| self.analyze_expression(arg))
            .collect::<Vec<_>>();

        let Some(symbol) = self.scope.lookup(&new.type_name) else {
            self.error(
                ErrorCode::UndefinedVariable,
                format!("unknown genus '{}'", new.type_name),
                new.position,
            );
            return Type::Unknown;
        };

        if let Type::Genus { name, fields, .. } = symbol.current_type() {
            for (index, (arg, (field, field_type))) in
                args.iter().zip(fields.iter()).enumerate()
            {
                if !is_assignable(arg, field_type) {
                    self.error(
                        ErrorCode::TypeMismatch,
                        format!(
                            "argument {} for field '{field}' has type {arg}, expected {field_type}",
                            index + 1
                        ),
                        new.args[index].position(),
                    );
                }
            }
            return Type::User(name);
        }

        Type::User(new.type_name.clone())
    }

    fn analyze_variant_construction(&mut self, variant: &VariantConstruction) -> Type {
        let args = variant
            .args
            .iter()
            .map(|arg| self.analyze_expression(arg))
            .collect::<Vec<_>>();

        let discretio_type = match &variant.discretio {
            Some(name) => self.scope.lookup(name).map(|s| s.current_type()),
            None => self
                .scope
                .find_variant_owner(&variant.variant)
                .map(|(_, ty)| ty),
        };

        let Some(Type::Discretio { name, variants }) = discretio_type else {
            self.error(
                ErrorCode::UndefinedVariable,
                format!("no discretio declares a variant '{}'", variant.variant),
                variant.position,
            );
            return Type::Unknown;
        };
        *variant.shape.borrow_mut() = Some(Type::Discretio {
            name: name.clone(),
            variants: variants.clone(),
        });

        let Some((_, fields)) = variants.iter().find(|(v, _)| v == &variant.variant) else {
            self.error(
                ErrorCode::UndefinedVariable,
                format!("discretio '{name}' has no variant '{}'", variant.variant),
                variant.position,
            );
            return Type::Unknown;
        };

        for (index, (arg, (field, field_type))) in args.iter().zip(fields.iter()).enumerate() {
            if !is_assignable(arg, field_type) {
                self.error(
                    ErrorCode::TypeMismatch,
                    format!(
                        "argument {} for field '{field}' has type {arg}, expected {field_type}",
                        index + 1
                    ),
                    variant.args[index].position(),
                );
            }
        }

        Type::User(name)
    }

    fn analyze_lambda(&mut self, lambda: &LambdaExpression) -> Type {
        self.check_parameters(&lambda.params);
        let params = lambda
            .params
            .iter()
            .map(|p| self.resolve_parameter_type(p))
            .collect::<Vec<_>>();

        self.enter_function(Type::Unknown, lambda.is_async);
        self.bind_parameters(&lambda.params);
        let returns = match &lambda.body {
            LambdaBody::Expression(body) => self.analyze_expression(body),
            LambdaBody::Block(block) => {
                for statement in &block.statements {
                    self.analyze_statement(statement);
                }
                Type::Unknown
            }
        };
        self.exit_function();

        Type::Function {
            params,
            returns: Box::new(returns),
            is_async: lambda.is_async,
            has_curator: false,
        }
    }
}

/// Built-in member table for collection generics and `textus`, keyed by the
/// receiver's resolved generic head. Unknown receivers resolve nothing; the
/// code generator falls back to list semantics there.
pub(crate) fn builtin_member(object: &Type, property: &str) -> Option<Type> {
    match object {
        Type::Generic { name, params, .. } => {
            let first = params.first().cloned().unwrap_or(Type::Unknown);
            let second = params.get(1).cloned().unwrap_or(Type::Unknown);

            match (name.as_str(), property) {
                ("lista", "adde") => Some(Type::function(vec![first], Type::vacuum())),
                ("lista", "demite") => Some(Type::function(vec![], first.with_nullable(true))),
                ("lista", "longitudo") => Some(Type::numerus()),
                ("lista", "continet") => Some(Type::function(vec![first], Type::bivalens())),
                ("lista", "caput") | ("lista", "cauda") => Some(first.with_nullable(true)),
                ("lista", "inverte") | ("lista", "ordina") => {
                    Some(Type::function(vec![], Type::lista(first)))
                }
                ("lista", "iunge") => {
                    Some(Type::function(vec![Type::textus()], Type::textus()))
                }
                ("tabula", "pone") => {
                    Some(Type::function(vec![first, second], Type::vacuum()))
                }
                ("tabula", "accipe") => {
                    Some(Type::function(vec![first], second.with_nullable(true)))
                }
                ("tabula", "dele") | ("tabula", "habet") => {
                    Some(Type::function(vec![first], Type::bivalens()))
                }
                ("tabula", "claves") => Some(Type::function(vec![], Type::lista(first))),
                ("tabula", "valores") => Some(Type::function(vec![], Type::lista(second))),
                ("tabula", "longitudo") => Some(Type::numerus()),
                ("copia", "adde") => Some(Type::function(vec![first], Type::vacuum())),
                ("copia", "habet") | ("copia", "dele") => {
                    Some(Type::function(vec![first], Type::bivalens()))
                }
                ("copia", "longitudo") => Some(Type::numerus()),
                _ => None,
            }
        }
        Type::Primitive { name, .. } if name == "textus" => match property {
            "longitudo" => Some(Type::numerus()),
            "maiuscula" | "minuscula" | "recide" => {
                Some(Type::function(vec![], Type::textus()))
            }
            "scinde" => Some(Type::function(
                vec![Type::textus()],
                Type::lista(Type::textus()),
            )),
            "continet" => Some(Type::function(vec![Type::textus()], Type::bivalens())),
            _ => None,
        },
        _ => None,
    }
}
