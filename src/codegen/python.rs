//! Python emitter.
//!
//! Indentation-based: the shared indentation counter is the block structure.
//! Tagged unions lower to one dataclass per variant (`Event_Click`) plus a
//! union alias, matched with `isinstance` chains. Imports collect in the
//! header set and are hoisted in sorted order.

use crate::codegen::{
    bare_assignment, duration_constant, escape_string, format_float, genus_field_names,
    receiver_generic, variant_field_names, Emitter, GeneratedModule,
};
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::parser::ast::*;
use crate::semantic::Type;

pub struct PythonGenerator {
    e: Emitter,
    curators: Vec<String>,
    /// inside a `probatio` class body: cases become methods taking `self`
    in_suite: bool,
}

impl Default for PythonGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PythonGenerator {
    pub fn new() -> Self {
        PythonGenerator {
            e: Emitter::default(),
            curators: Vec::new(),
            in_suite: false,
        }
    }

    pub fn generate(mut self, program: &Program) -> GeneratedModule {
        for statement in &program.statements {
            self.stmt(statement);
        }

        let headers: Vec<String> = self.e.headers.iter().cloned().collect();
        let mut source = String::new();
        for header in &headers {
            source.push_str(header);
            source.push('\n');
        }
        if !headers.is_empty() {
            source.push('\n');
        }
        source.push_str(&self.e.out);

        GeneratedModule {
            source,
            headers,
            diagnostics: self.e.diagnostics,
        }
    }

    fn runtime(&mut self, name: &str) {
        self.e
            .require(format!("from faber_runtime import {name}"));
    }

    // --- types --------------------------------------------------------

    fn ann(&mut self, annotation: &TypeAnnotation) -> String {
        if let Some(function) = &annotation.function {
            self.e.require("from typing import Callable".to_string());
            let params = function
                .params
                .iter()
                .map(|p| self.ann(p))
                .collect::<Vec<_>>()
                .join(", ");
            return format!("Callable[[{params}], {}]", self.ann(&function.returns));
        }

        let mut base = match annotation.name.as_str() {
            "numerus" | "magnus" => "int".to_string(),
            "fractus" => "float".to_string(),
            "textus" => "str".to_string(),
            "bivalens" => "bool".to_string(),
            "vacuum" => "None".to_string(),
            "nihil" => "None".to_string(),
            "lista" => format!("list[{}]", self.type_param(annotation, 0)),
            "tabula" => format!(
                "dict[{}, {}]",
                self.type_param(annotation, 0),
                self.type_param(annotation, 1)
            ),
            "copia" => format!("set[{}]", self.type_param(annotation, 0)),
            "promissum" => {
                self.e.require("from typing import Awaitable".to_string());
                format!("Awaitable[{}]", self.type_param(annotation, 0))
            }
            "cursor" => {
                self.e.require("from typing import Iterable".to_string());
                format!("Iterable[{}]", self.type_param(annotation, 0))
            }
            "fluxus" => {
                self.e
                    .require("from typing import AsyncIterable".to_string());
                format!("AsyncIterable[{}]", self.type_param(annotation, 0))
            }
            other => other.to_string(),
        };

        if annotation.array {
            base = format!("list[{base}]");
        }
        if annotation.nullable {
            base = format!("{base} | None");
        }
        for alternative in &annotation.alternatives {
            base = format!("{base} | {}", self.ann(alternative));
        }
        base
    }

    fn type_param(&mut self, annotation: &TypeAnnotation, index: usize) -> String {
        match annotation.params.get(index) {
            Some(TypeParam::Type(inner)) => self.ann(inner),
            Some(TypeParam::Width(_)) => "int".to_string(),
            None => "object".to_string(),
        }
    }

    // --- statements ---------------------------------------------------

    fn block(&mut self, block: &Block) {
        if block.statements.is_empty() {
            self.e.line("pass");
            return;
        }
        for statement in &block.statements {
            self.stmt(statement);
        }
    }

    fn stmt(&mut self, statement: &Statement) {
        match statement {
            Statement::Import(decl) => {
                if !crate::semantic::stdlib::is_stdlib(&decl.module) {
                    let module = decl.module.trim_start_matches("./").replace('/', ".");
                    self.e.require(format!("import {module}"));
                }
            }
            Statement::DestructureImport(decl) => {
                if !crate::semantic::stdlib::is_stdlib(&decl.module) {
                    let module = decl.module.trim_start_matches("./").replace('/', ".");
                    if decl.wildcard {
                        self.e.require(format!("from {module} import *"));
                    } else {
                        self.e.require(format!(
                            "from {module} import {}",
                            decl.specifiers.join(", ")
                        ));
                    }
                }
            }
            Statement::Variable(decl) => {
                for comment in &decl.leading_comments {
                    self.e.line(format!("# {comment}"));
                }
                let mut value = self.expr(&decl.initializer);
                if decl.kind.is_async() {
                    value = format!("await {value}");
                }
                match &decl.annotation {
                    Some(annotation) => {
                        let ty = self.ann(annotation);
                        self.e.line(format!("{}: {ty} = {value}", decl.name));
                    }
                    None => self.e.line(format!("{} = {value}", decl.name)),
                }
            }
            Statement::Function(decl) => self.function(decl, MethodKind::Free),
            Statement::TypeAlias(decl) => {
                let target = self.ann(&decl.target);
                self.e.line(format!("{} = {target}", decl.name));
            }
            Statement::Ordo(decl) => self.ordo(decl),
            Statement::Genus(decl) => self.genus(decl),
            Statement::Pactum(decl) => self.pactum(decl),
            Statement::Discretio(decl) => self.discretio(decl),
            Statement::If(decl) => self.if_stmt(decl),
            Statement::While(decl) => {
                let condition = self.expr(&decl.condition);
                self.e.open(format!("while {condition}:"));
                self.block(&decl.body);
                self.e.dedent();
            }
            Statement::Iteration(decl) => {
                let iterable = self.expr(&decl.iterable);
                let keyword = if decl.is_async { "async for" } else { "for" };
                self.e
                    .open(format!("{keyword} {} in {iterable}:", decl.binding));
                self.block(&decl.body);
                self.e.dedent();
            }
            Statement::MutationContext(decl) => self.mutation_context(decl),
            Statement::ValueSwitch(decl) => self.value_switch(decl),
            Statement::VariantSwitch(decl) => self.variant_switch(decl),
            Statement::Guard(decl) => {
                let condition = self.expr(&decl.condition);
                self.e.open(format!("if not ({condition}):"));
                self.block(&decl.fallback);
                self.e.dedent();
            }
            Statement::Assert(decl) => {
                let condition = self.expr(&decl.condition);
                self.e.line(format!("assert {condition}"));
            }
            Statement::Return(decl) => match &decl.value {
                Some(value) => {
                    let value = self.expr(value);
                    self.e.line(format!("return {value}"));
                }
                None => self.e.line("return"),
            },
            Statement::Break(_) => self.e.line("break"),
            Statement::Continue(_) => self.e.line("continue"),
            Statement::Block(block) => {
                // Python has no bare blocks; emit inline
                self.block(block);
            }
            Statement::Throw(decl) => {
                let value = self.expr(&decl.value);
                if decl.fatal {
                    self.e.line(format!("raise SystemExit({value})"));
                } else {
                    self.runtime("FaberError");
                    self.e.line(format!("raise FaberError({value})"));
                }
            }
            Statement::Try(decl) => {
                self.e.open("try:");
                self.block(&decl.body);
                self.e.dedent();
                if let Some(catch) = &decl.catch {
                    self.e
                        .open(format!("except Exception as {}:", catch.binding));
                    self.block(&catch.block);
                    self.e.dedent();
                }
                if let Some(finally) = &decl.finally {
                    self.e.open("finally:");
                    self.block(finally);
                    self.e.dedent();
                }
            }
            Statement::DoBlock(decl) => self.block(&decl.body),
            Statement::Entry(decl) => self.entry(decl),
            Statement::Print(decl) => {
                let value = self.expr(&decl.value);
                match decl.kind {
                    PrintKind::Scribe => self.e.line(format!("print({value})")),
                    PrintKind::Vide => {
                        self.e.require("import sys".to_string());
                        self.e.line(format!("print({value}, file=sys.stderr)"));
                    }
                    PrintKind::Mone => {
                        self.e.require("import sys".to_string());
                        self.e
                            .line(format!("print(\"monitum:\", {value}, file=sys.stderr)"));
                    }
                }
            }
            Statement::Suite(decl) => {
                self.e.require("import unittest".to_string());
                let name = class_name(&decl.name);
                self.e.open(format!("class Test{name}(unittest.TestCase):"));
                let was_in_suite = self.in_suite;
                self.in_suite = true;
                self.block(&decl.body);
                self.in_suite = was_in_suite;
                self.e.dedent();
            }
            Statement::Case(decl) => {
                let name = method_name(&decl.name);
                if decl.timeout_ms.is_some() {
                    self.e.line("# intra: no native per-case timeout");
                }
                if self.in_suite {
                    self.e.open(format!("def test_{name}(self):"));
                } else {
                    self.e.open(format!("def test_{name}():"));
                }
                self.block(&decl.body);
                self.e.dedent();
            }
            Statement::Fixture(decl) => {
                match (decl.kind, decl.all) {
                    (FixtureKind::Ante, false) => self.e.open("def setUp(self):"),
                    (FixtureKind::Post, false) => self.e.open("def tearDown(self):"),
                    (FixtureKind::Ante, true) => {
                        self.e.line("@classmethod");
                        self.e.open("def setUpClass(cls):");
                    }
                    (FixtureKind::Post, true) => {
                        self.e.line("@classmethod");
                        self.e.open("def tearDownClass(cls):");
                    }
                }
                self.block(&decl.body);
                self.e.dedent();
            }
            Statement::Cura(decl) => self.cura(decl),
            Statement::Dispatch(decl) => self.dispatch(decl),
            Statement::Expression(decl) => {
                // statement-level assignments are plain, not walrus
                if let Expression::Assignment(assignment) = &decl.expression {
                    let rendered = self.plain_assignment(assignment);
                    self.e.line(rendered);
                    return;
                }
                let rendered = self.expr(&decl.expression);
                self.e.line(rendered);
            }
        }
    }

    fn function(&mut self, decl: &FunctionDeclaration, kind: MethodKind) {
        for comment in &decl.leading_comments {
            self.e.line(format!("# {comment}"));
        }
        let mut params: Vec<String> = Vec::new();
        match kind {
            MethodKind::Instance => params.push("self".to_string()),
            MethodKind::Static => self.e.line("@staticmethod"),
            MethodKind::Free => {}
        }
        for parameter in &decl.params {
            let mut rendered = if parameter.rest {
                format!("*{}", parameter.name)
            } else {
                match &parameter.annotation {
                    Some(annotation) => {
                        let ty = self.ann(annotation);
                        format!("{}: {ty}", parameter.name)
                    }
                    None => parameter.name.clone(),
                }
            };
            if let Some(default) = &parameter.default {
                let default = self.expr(default);
                rendered = format!("{rendered} = {default}");
            }
            params.push(rendered);
        }

        let returns = match &decl.return_annotation {
            Some(annotation) => self.ann(annotation),
            None => "None".to_string(),
        };
        let keyword = if decl.is_async { "async def" } else { "def" };
        self.e.open(format!(
            "{keyword} {}({}) -> {returns}:",
            decl.name,
            params.join(", ")
        ));
        self.block(&decl.body);
        self.e.dedent();
    }

    fn ordo(&mut self, decl: &OrdoDeclaration) {
        self.e.require("from enum import Enum".to_string());
        self.e.open(format!("class {}(Enum):", decl.name));
        let mut next_value = 0i64;
        for member in &decl.members {
            match &member.value {
                Some(LiteralValue::Integer(value)) => {
                    self.e.line(format!("{} = {value}", member.name));
                    next_value = value + 1;
                }
                Some(LiteralValue::String(value)) => self
                    .e
                    .line(format!("{} = \"{}\"", member.name, escape_string(value))),
                _ => {
                    self.e.line(format!("{} = {next_value}", member.name));
                    next_value += 1;
                }
            }
        }
        if decl.members.is_empty() {
            self.e.line("pass");
        }
        self.e.dedent();
    }

    fn genus(&mut self, decl: &GenusDeclaration) {
        for comment in &decl.leading_comments {
            self.e.line(format!("# {comment}"));
        }
        self.e.open(format!("class {}:", decl.name));

        for field in decl.fields.iter().filter(|f| f.is_static) {
            let value = match &field.default {
                Some(default) => self.expr(default),
                None => "None".to_string(),
            };
            self.e.line(format!("{} = {value}", field.name));
        }

        let instance_fields: Vec<&GenusField> =
            decl.fields.iter().filter(|f| !f.is_static).collect();
        if !instance_fields.is_empty() {
            let params = instance_fields
                .iter()
                .map(|f| {
                    let ty = self.ann(&f.annotation);
                    format!("{}: {ty}", f.name)
                })
                .collect::<Vec<_>>()
                .join(", ");
            self.e.open(format!("def __init__(self, {params}):"));
            for field in &instance_fields {
                self.e.line(format!("self.{} = {}", field.name, field.name));
            }
            self.e.dedent();
        }

        for method in &decl.methods {
            let kind = if method.is_static {
                MethodKind::Static
            } else {
                MethodKind::Instance
            };
            self.function(&method.function, kind);
        }

        if decl.fields.is_empty() && decl.methods.is_empty() {
            self.e.line("pass");
        }
        self.e.dedent();
    }

    fn pactum(&mut self, decl: &PactumDeclaration) {
        self.e.require("from typing import Protocol".to_string());
        self.e.open(format!("class {}(Protocol):", decl.name));
        for method in &decl.methods {
            let params = std::iter::once("self".to_string())
                .chain(method.params.iter().map(|p| p.name.clone()))
                .collect::<Vec<_>>()
                .join(", ");
            let returns = match &method.return_annotation {
                Some(annotation) => self.ann(annotation),
                None => "None".to_string(),
            };
            self.e
                .open(format!("def {}({params}) -> {returns}:", method.name));
            self.e.line("...");
            self.e.dedent();
        }
        if decl.methods.is_empty() {
            self.e.line("pass");
        }
        self.e.dedent();
    }

    fn discretio(&mut self, decl: &DiscretioDeclaration) {
        self.e
            .require("from dataclasses import dataclass".to_string());

        for variant in &decl.variants {
            self.e.line("@dataclass");
            self.e
                .open(format!("class {}_{}:", decl.name, variant.name));
            if variant.fields.is_empty() {
                self.e.line("pass");
            }
            for (field, annotation) in &variant.fields {
                let ty = self.ann(annotation);
                self.e.line(format!("{field}: {ty}"));
            }
            self.e.dedent();
            self.e.blank();
        }

        if !decl.variants.is_empty() {
            let union = decl
                .variants
                .iter()
                .map(|v| format!("{}_{}", decl.name, v.name))
                .collect::<Vec<_>>()
                .join(" | ");
            self.e.line(format!("{} = {union}", decl.name));
        }
    }

    fn if_stmt(&mut self, decl: &IfStatement) {
        if decl.catch.is_some() {
            self.e.open("try:");
        }

        let condition = self.expr(&decl.condition);
        self.e.open(format!("if {condition}:"));
        self.block(&decl.then_block);
        self.e.dedent();
        for (condition, block) in &decl.else_ifs {
            let condition = self.expr(condition);
            self.e.open(format!("elif {condition}:"));
            self.block(block);
            self.e.dedent();
        }
        if let Some(block) = &decl.else_block {
            self.e.open("else:");
            self.block(block);
            self.e.dedent();
        }

        if let Some(catch) = &decl.catch {
            self.e.dedent();
            self.e
                .open(format!("except Exception as {}:", catch.binding));
            self.block(&catch.block);
            self.e.dedent();
        }
    }

    fn mutation_context(&mut self, decl: &MutationContext) {
        let target = self.expr(&decl.target);
        let fields = genus_field_names(&decl.shape);

        self.e.line(format!("__subiectum = {target}"));
        for statement in &decl.body.statements {
            if let Some((name, value)) = bare_assignment(statement) {
                if fields.contains(&name) {
                    let value = self.expr(value);
                    self.e.line(format!("__subiectum.{name} = {value}"));
                    continue;
                }
            }
            self.stmt(statement);
        }
    }

    fn value_switch(&mut self, decl: &ValueSwitch) {
        let discriminant = self.expr(&decl.discriminant);
        self.e.line(format!("__discrimen = {discriminant}"));

        let mut first = true;
        for arm in &decl.arms {
            let condition = arm
                .values
                .iter()
                .map(|value| {
                    let value = self.expr(value);
                    format!("__discrimen == {value}")
                })
                .collect::<Vec<_>>()
                .join(" or ");
            let keyword = if first { "if" } else { "elif" };
            self.e.open(format!("{keyword} {condition}:"));
            self.block(&arm.body);
            self.e.dedent();
            first = false;
        }

        if let Some(default) = &decl.default {
            if first {
                self.block(default);
            } else {
                self.e.open("else:");
                self.block(default);
                self.e.dedent();
            }
        }
    }

    fn variant_condition(&self, discriminant: &str, variant: &str, shape: &TypeSlot) -> String {
        match shape.borrow().as_ref() {
            Some(Type::Discretio { name, .. }) => {
                format!("isinstance({discriminant}, {name}_{variant})")
            }
            _ => format!("type({discriminant}).__name__.endswith(\"_{variant}\")"),
        }
    }

    fn variant_switch(&mut self, decl: &VariantSwitch) {
        let discriminants: Vec<String> =
            decl.discriminants.iter().map(|d| self.expr(d)).collect();

        let mut first = true;
        let mut saw_wildcard_arm = false;
        for arm in &decl.arms {
            let condition = discriminants
                .iter()
                .zip(arm.variants.iter())
                .filter(|(_, variant)| variant.as_str() != "_")
                .map(|(d, variant)| self.variant_condition(d, variant, &decl.shape))
                .collect::<Vec<_>>()
                .join(" and ");

            if condition.is_empty() {
                // wildcard-only arm acts as the default
                saw_wildcard_arm = true;
                if first {
                    self.block(&arm.body);
                } else {
                    self.e.open("else:");
                    self.bindings(arm, &discriminants, &decl.shape);
                    self.block(&arm.body);
                    self.e.dedent();
                }
                continue;
            }

            let keyword = if first { "if" } else { "elif" };
            self.e.open(format!("{keyword} {condition}:"));
            self.bindings(arm, &discriminants, &decl.shape);
            self.block(&arm.body);
            self.e.dedent();
            first = false;
        }

        if let Some(default) = &decl.default {
            if saw_wildcard_arm || first {
                self.block(default);
            } else {
                self.e.open("else:");
                self.block(default);
                self.e.dedent();
            }
        }
    }

    fn bindings(&mut self, arm: &VariantArm, discriminants: &[String], shape: &TypeSlot) {
        let discriminant = discriminants.first().cloned().unwrap_or_default();
        match &arm.bindings {
            VariantBindings::None => {}
            VariantBindings::Alias(name) => {
                self.e.line(format!("{name} = {discriminant}"));
            }
            VariantBindings::Positional(names) => {
                let fields = arm
                    .variants
                    .first()
                    .map(|v| variant_field_names(shape, v))
                    .unwrap_or_default();
                for (index, name) in names.iter().enumerate() {
                    match fields.get(index) {
                        Some(field) => {
                            self.e.line(format!("{name} = {discriminant}.{field}"))
                        }
                        None => self.e.line(format!("{name} = {discriminant}")),
                    }
                }
            }
        }
    }

    fn entry(&mut self, decl: &EntryStatement) {
        if decl.is_async {
            self.e.require("import asyncio".to_string());
            self.e.open("async def __main():");
            self.block(&decl.body);
            self.e.dedent();
            self.e.open("if __name__ == \"__main__\":");
            self.e.line("asyncio.run(__main())");
            self.e.dedent();
        } else {
            self.e.open("def __main():");
            self.block(&decl.body);
            self.e.dedent();
            self.e.open("if __name__ == \"__main__\":");
            self.e.line("__main()");
            self.e.dedent();
        }
    }

    fn cura(&mut self, decl: &CuraStatement) {
        let acquisition = match &decl.curator {
            CuratorKind::Arena => {
                self.runtime("Arena");
                "Arena()".to_string()
            }
            CuratorKind::Pagina => {
                self.runtime("Pagina");
                "Pagina()".to_string()
            }
            CuratorKind::Generic(resource) => self.expr(resource),
        };

        if decl.catch.is_some() {
            self.e.open("try:");
        }
        self.e
            .open(format!("with {acquisition} as {}:", decl.binding));
        self.curators.push(decl.binding.clone());
        self.block(&decl.body);
        self.curators.pop();
        self.e.dedent();
        if let Some(catch) = &decl.catch {
            self.e.dedent();
            self.e
                .open(format!("except Exception as {}:", catch.binding));
            self.block(&catch.block);
            self.e.dedent();
        }
    }

    fn dispatch(&mut self, decl: &DispatchStatement) {
        let is_async = decl.verb.map(|v| v.is_async()).unwrap_or(false);
        let helper = if is_async {
            self.runtime("faber_dispatch");
            "faber_dispatch"
        } else {
            self.runtime("faber_dispatch_sync");
            "faber_dispatch_sync"
        };
        let args = decl
            .args
            .iter()
            .map(|a| self.expr(a))
            .collect::<Vec<_>>()
            .join(", ");
        let mut call = format!("{helper}(\"{}\", [{args}])", escape_string(&decl.target));
        if is_async {
            call = format!("await {call}");
        }

        if decl.catch.is_some() {
            self.e.open("try:");
        }
        match &decl.binding {
            Some(binding) => self.e.line(format!("{binding} = {call}")),
            None => self.e.line(call),
        }
        if let Some(body) = &decl.body {
            self.block(body);
        }
        if let Some(catch) = &decl.catch {
            self.e.dedent();
            self.e
                .open(format!("except Exception as {}:", catch.binding));
            self.block(&catch.block);
            self.e.dedent();
        }
    }

    // --- expressions --------------------------------------------------

    fn exprs(&mut self, expressions: &[Expression]) -> Vec<String> {
        expressions.iter().map(|e| self.expr(e)).collect()
    }

    fn expr(&mut self, expression: &Expression) -> String {
        match expression {
            Expression::Identifier(id) => self.identifier(&id.name),
            Expression::SelfRef(_) => "self".to_string(),
            Expression::Literal(literal) => match &literal.value {
                LiteralValue::String(value) => format!("\"{}\"", escape_string(value)),
                LiteralValue::Integer(value) => value.to_string(),
                LiteralValue::Float(value) => format_float(*value),
                LiteralValue::BigInt(digits) => digits.clone(),
                LiteralValue::Boolean(true) => "True".to_string(),
                LiteralValue::Boolean(false) => "False".to_string(),
                LiteralValue::Null => "None".to_string(),
            },
            Expression::TemplateString(template) => {
                let mut rendered = String::from("f\"");
                for part in &template.parts {
                    match part {
                        TemplatePart::Text(text) => {
                            rendered.push_str(
                                &escape_string(text).replace('{', "{{").replace('}', "}}"),
                            );
                        }
                        TemplatePart::Interpolation(inner) => {
                            let inner = self.expr(inner);
                            rendered.push_str(&format!("{{{inner}}}"));
                        }
                    }
                }
                rendered.push('"');
                rendered
            }
            Expression::FormatString(format) => {
                let fmt = self.expr(&format.format);
                let args = self.exprs(&format.args).join(", ");
                format!("({fmt}).format({args})")
            }
            Expression::Regex(regex) => {
                self.e.require("import re".to_string());
                format!("re.compile(r\"{}\")", regex.pattern)
            }
            Expression::ReadInput(read) => match &read.prompt {
                Some(prompt) => {
                    let prompt = self.expr(prompt);
                    format!("input({prompt})")
                }
                None => "input()".to_string(),
            },
            Expression::Array(array) => {
                let elements = self.exprs(&array.elements).join(", ");
                format!("[{elements}]")
            }
            Expression::Object(object) => {
                let entries = object
                    .entries
                    .iter()
                    .map(|entry| {
                        let value = self.expr(&entry.value);
                        format!("\"{}\": {value}", escape_string(&entry.key))
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{entries}}}")
            }
            Expression::Range(range) => {
                let start = self.expr(&range.start);
                let end = self.expr(&range.end);
                if range.inclusive {
                    format!("range({start}, {end} + 1)")
                } else {
                    format!("range({start}, {end})")
                }
            }
            Expression::Binary(binary) => {
                let lhs = self.expr(&binary.lhs);
                let rhs = self.expr(&binary.rhs);
                if binary.operator == BinaryOperator::NullCoalesce {
                    return format!("({lhs} if {lhs} is not None else {rhs})");
                }
                format!("({lhs} {} {rhs})", py_operator(binary.operator))
            }
            Expression::Unary(unary) => {
                let operand = self.expr(&unary.operand);
                match unary.operator {
                    UnaryOperator::Negate => format!("(-{operand})"),
                    UnaryOperator::Not => format!("(not {operand})"),
                }
            }
            Expression::Shift(shift) => {
                let value = self.expr(&shift.value);
                let amount = self.expr(&shift.amount);
                let operator = match shift.direction {
                    ShiftDirection::Left => "<<",
                    ShiftDirection::Right => ">>",
                };
                format!("({value} {operator} {amount})")
            }
            Expression::Ternary(ternary) => {
                let condition = self.expr(&ternary.condition);
                let consequent = self.expr(&ternary.consequent);
                let alternative = self.expr(&ternary.alternative);
                format!("({consequent} if {condition} else {alternative})")
            }
            Expression::Assignment(assignment) => match &assignment.target {
                Expression::Identifier(id) => {
                    let value = self.expr(&assignment.value);
                    format!("({} := {value})", id.name)
                }
                _ => self.plain_assignment(assignment),
            },
            Expression::TypeCheck(check) => {
                let value = self.expr(&check.value);
                match check.annotation.name.as_str() {
                    "numerus" | "magnus" => format!("isinstance({value}, int)"),
                    "fractus" => format!("isinstance({value}, float)"),
                    "textus" => format!("isinstance({value}, str)"),
                    "bivalens" => format!("isinstance({value}, bool)"),
                    "nihil" => format!("({value} is None)"),
                    name => format!("isinstance({value}, {name})"),
                }
            }
            Expression::Cast(cast) => {
                let value = self.expr(&cast.value);
                match cast.annotation.name.as_str() {
                    "numerus" | "magnus" => format!("int({value})"),
                    "fractus" => format!("float({value})"),
                    "textus" => format!("str({value})"),
                    "bivalens" => format!("bool({value})"),
                    name => {
                        self.e.require("from typing import cast".to_string());
                        format!("cast({name}, {value})")
                    }
                }
            }
            Expression::Conversion(conversion) => {
                let value = self.expr(&conversion.value);
                match conversion.kind {
                    ConversionKind::Numeratum => format!("int({value})"),
                    ConversionKind::Textatum => format!("str({value})"),
                    ConversionKind::Fractatum => format!("float({value})"),
                    ConversionKind::Bivalentum => format!("bool({value})"),
                }
            }
            Expression::Native(native) => {
                let args = self.exprs(&native.args).join(", ");
                match native.target_type.name.as_str() {
                    "lista" => format!("[{args}]"),
                    "tabula" => format!("dict([{args}])"),
                    "copia" => format!("set([{args}])"),
                    name => format!("{name}({args})"),
                }
            }
            Expression::Call(call) => self.call(call),
            Expression::Member(member) => self.member(member),
            Expression::Index(index) => {
                let object = self.expr(&index.object);
                let key = self.expr(&index.index);
                format!("{object}[{key}]")
            }
            Expression::New(new) => {
                let args = self.exprs(&new.args).join(", ");
                format!("{}({args})", new.type_name)
            }
            Expression::Variant(variant) => {
                let class = match variant.shape.borrow().as_ref() {
                    Some(Type::Discretio { name, .. }) => {
                        format!("{name}_{}", variant.variant)
                    }
                    _ => variant.variant.clone(),
                };
                let fields = variant_field_names(&variant.shape, &variant.variant);
                let args = variant
                    .args
                    .iter()
                    .enumerate()
                    .map(|(index, arg)| {
                        let value = self.expr(arg);
                        match fields.get(index) {
                            Some(field) => format!("{field}={value}"),
                            None => value,
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{class}({args})")
            }
            Expression::Lambda(lambda) => {
                let params = lambda
                    .params
                    .iter()
                    .map(|p| p.name.clone())
                    .collect::<Vec<_>>()
                    .join(", ");
                match &lambda.body {
                    LambdaBody::Expression(body) => {
                        let body = self.expr(body);
                        format!("lambda {params}: {body}")
                    }
                    LambdaBody::Block(_) => {
                        self.e.diagnostics.push(Diagnostic::warning(
                            ErrorCode::UnsupportedConstruct,
                            "block-bodied lambdas have no Python expression form",
                            lambda.position,
                        ));
                        format!("lambda {params}: None  # block lambda")
                    }
                }
            }
            Expression::Await(await_expr) => {
                let value = self.expr(&await_expr.value);
                format!("await {value}")
            }
            Expression::Comptime(comptime) => {
                self.e.diagnostics.push(Diagnostic::warning(
                    ErrorCode::UnsupportedConstruct,
                    "praefixum has no compile-time evaluation on Python",
                    comptime.position,
                ));
                self.e.line("# praefixum: evaluated at runtime on this target");
                self.expr(&comptime.value)
            }
            Expression::Pipeline(pipeline) => {
                let source = self.expr(&pipeline.source);
                match pipeline.op {
                    PipelineOp::Prima => {
                        let count = pipeline
                            .count
                            .as_ref()
                            .map(|c| self.expr(c))
                            .unwrap_or_else(|| "1".to_string());
                        format!("{source}[:{count}]")
                    }
                    PipelineOp::Ultima => {
                        let count = pipeline
                            .count
                            .as_ref()
                            .map(|c| self.expr(c))
                            .unwrap_or_else(|| "1".to_string());
                        format!("{source}[-{count}:]")
                    }
                    PipelineOp::Summa => format!("sum({source})"),
                }
            }
            Expression::Filter(filter) => {
                let source = self.expr(&filter.source);
                let predicate = self.expr(&filter.predicate);
                format!(
                    "[{binding} for {binding} in {source} if {predicate}]",
                    binding = filter.binding
                )
            }
            Expression::RangeTest(test) => {
                let value = self.expr(&test.value);
                let low = self.expr(&test.low);
                let high = self.expr(&test.high);
                let comparison = if test.inclusive { "<=" } else { "<" };
                format!("({low} <= {value} {comparison} {high})")
            }
            Expression::Membership(membership) => {
                let value = self.expr(&membership.value);
                let collection = self.expr(&membership.collection);
                format!("({value} in {collection})")
            }
        }
    }

    fn identifier(&mut self, name: &str) -> String {
        if let Some(value) = duration_constant(name) {
            return value.to_string();
        }
        let math = |e: &mut Emitter, text: &str| {
            e.require("import math".to_string());
            text.to_string()
        };
        match name {
            "PI" => math(&mut self.e, "math.pi"),
            "TAU" => math(&mut self.e, "math.tau"),
            "EULERUS" => math(&mut self.e, "math.e"),
            "sin" => math(&mut self.e, "math.sin"),
            "cos" => math(&mut self.e, "math.cos"),
            "tan" => math(&mut self.e, "math.tan"),
            "radix" => math(&mut self.e, "math.sqrt"),
            "potentia" => math(&mut self.e, "math.pow"),
            "absolutus" => "abs".to_string(),
            "tectum" => math(&mut self.e, "math.ceil"),
            "solum" => math(&mut self.e, "math.floor"),
            "alea" => {
                self.e.require("import random".to_string());
                "random.random".to_string()
            }
            "aleatorius" => {
                self.e.require("import random".to_string());
                "random.randint".to_string()
            }
            "nunc" => {
                self.e.require("import time".to_string());
                "time.time_ns".to_string()
            }
            other => other.to_string(),
        }
    }

    fn plain_assignment(&mut self, assignment: &AssignmentExpression) -> String {
        let target = self.expr(&assignment.target);
        let value = self.expr(&assignment.value);
        format!("{target} = {value}")
    }

    fn call(&mut self, call: &CallExpression) -> String {
        let args = self.exprs(&call.args);

        if let Expression::Member(member) = &call.callee {
            let head = receiver_generic(&member.object)
                .unwrap_or_else(|| "lista".to_string());
            if let Some(rendered) = self.collection_method(member, &head, &args) {
                return rendered;
            }
        }

        let callee = self.expr(&call.callee);
        let mut args = args;
        if call.injects_curator.get() {
            let curator = self
                .curators
                .last()
                .cloned()
                .unwrap_or_else(|| "None".to_string());
            args.push(curator);
        }
        format!("{callee}({})", args.join(", "))
    }

    fn collection_method(
        &mut self,
        member: &MemberExpression,
        head: &str,
        args: &[String],
    ) -> Option<String> {
        let recv = self.expr(&member.object);
        let joined = args.join(", ");
        let first = args.first().cloned().unwrap_or_default();
        let rendered = match (head, member.property.as_str()) {
            ("lista", "adde") => format!("{recv}.append({joined})"),
            ("lista", "demite") => format!("{recv}.pop()"),
            ("lista", "continet") => format!("({first} in {recv})"),
            ("lista", "inverte") => format!("list(reversed({recv}))"),
            ("lista", "ordina") => format!("sorted({recv})"),
            ("lista", "iunge") => format!("{first}.join({recv})"),
            ("tabula", "pone") => {
                let key = args.first().cloned().unwrap_or_default();
                let value = args.get(1).cloned().unwrap_or_default();
                format!("{recv}.__setitem__({key}, {value})")
            }
            ("tabula", "accipe") => format!("{recv}.get({joined})"),
            ("tabula", "dele") => format!("{recv}.pop({first}, None)"),
            ("tabula", "habet") => format!("({first} in {recv})"),
            ("tabula", "claves") => format!("list({recv}.keys())"),
            ("tabula", "valores") => format!("list({recv}.values())"),
            ("copia", "adde") => format!("{recv}.add({joined})"),
            ("copia", "habet") => format!("({first} in {recv})"),
            ("copia", "dele") => format!("{recv}.discard({joined})"),
            (_, "maiuscula") => format!("{recv}.upper()"),
            (_, "minuscula") => format!("{recv}.lower()"),
            (_, "recide") => format!("{recv}.strip()"),
            (_, "scinde") => format!("{recv}.split({joined})"),
            (_, "continet") => format!("({first} in {recv})"),
            _ => return None,
        };
        Some(rendered)
    }

    fn member(&mut self, member: &MemberExpression) -> String {
        let object = self.expr(&member.object);

        if member.property == "longitudo" {
            return format!("len({object})");
        }
        if member.property == "caput" {
            return format!("{object}[0]");
        }
        if member.property == "cauda" {
            return format!("{object}[1:]");
        }

        format!("{object}.{}", member.property)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum MethodKind {
    Free,
    Instance,
    Static,
}

fn py_operator(operator: BinaryOperator) -> &'static str {
    match operator {
        BinaryOperator::Add => "+",
        BinaryOperator::Subtract => "-",
        BinaryOperator::Multiply => "*",
        BinaryOperator::Divide => "/",
        BinaryOperator::Modulo => "%",
        BinaryOperator::Equals => "==",
        BinaryOperator::NotEquals => "!=",
        BinaryOperator::LessThan => "<",
        BinaryOperator::LessOrEqual => "<=",
        BinaryOperator::GreaterThan => ">",
        BinaryOperator::GreaterOrEqual => ">=",
        BinaryOperator::And => "and",
        BinaryOperator::Or => "or",
        BinaryOperator::NullCoalesce => "??",
    }
}

/// `"calculi arithmeticæ"` -> `CalculiArithmetic`-style class fragment.
fn class_name(raw: &str) -> String {
    let mut name = String::new();
    let mut capitalize = true;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            if capitalize {
                name.extend(c.to_uppercase());
                capitalize = false;
            } else {
                name.push(c);
            }
        } else {
            capitalize = true;
        }
    }
    if name.is_empty() {
        "Probatio".to_string()
    } else {
        name
    }
}

fn method_name(raw: &str) -> String {
    let mut name = String::new();
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c.to_ascii_lowercase());
        } else if !name.ends_with('_') {
            name.push('_');
        }
    }
    let trimmed = name.trim_matches('_').to_string();
    if trimmed.is_empty() {
        "exemplum".to_string()
    } else {
        trimmed
    }
}
