//! Rust emitter.
//!
//! Discretio types become field-carrying enums matched with `match`;
//! recoverable throws become `Err` returns and fatal throws `panic!`;
//! arenas are owned allocator values released by `Drop`. The header set
//! collects `use` lines, alphabetized at finalization.

use crate::codegen::{
    bare_assignment, duration_constant, escape_string, format_float, genus_field_names,
    receiver_generic, variant_field_names, Emitter, GeneratedModule,
};
use crate::parser::ast::*;
use crate::semantic::Type;

pub struct RustGenerator {
    e: Emitter,
    curators: Vec<String>,
}

impl Default for RustGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RustGenerator {
    pub fn new() -> Self {
        RustGenerator {
            e: Emitter::default(),
            curators: Vec::new(),
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

    // --- types --------------------------------------------------------

    fn ann(&mut self, annotation: &TypeAnnotation) -> String {
        if let Some(function) = &annotation.function {
            let params = function
                .params
                .iter()
                .map(|p| self.ann(p))
                .collect::<Vec<_>>()
                .join(", ");
            return format!("Box<dyn Fn({params}) -> {}>", self.ann(&function.returns));
        }

        let width = annotation.params.iter().find_map(|p| match p {
            TypeParam::Width(w) => Some(*w),
            TypeParam::Type(_) => None,
        });

        let mut base = match annotation.name.as_str() {
            "numerus" => match width {
                Some(8) => "i8".to_string(),
                Some(16) => "i16".to_string(),
                Some(32) => "i32".to_string(),
                _ => "i64".to_string(),
            },
            "fractus" => match width {
                Some(32) => "f32".to_string(),
                _ => "f64".to_string(),
            },
            "magnus" => "i128".to_string(),
            "textus" => "String".to_string(),
            "bivalens" => "bool".to_string(),
            "vacuum" | "nihil" => "()".to_string(),
            "lista" => format!("Vec<{}>", self.type_param(annotation, 0)),
            "tabula" => {
                self.e.require("use std::collections::HashMap;");
                format!(
                    "HashMap<{}, {}>",
                    self.type_param(annotation, 0),
                    self.type_param(annotation, 1)
                )
            }
            "copia" => {
                self.e.require("use std::collections::HashSet;");
                format!("HashSet<{}>", self.type_param(annotation, 0))
            }
            // async functions unwrap their promise in the signature
            "promissum" => self.type_param(annotation, 0),
            "cursor" | "fluxus" => format!("Vec<{}>", self.type_param(annotation, 0)),
            other => other.to_string(),
        };

        if annotation.array {
            base = format!("Vec<{base}>");
        }
        if annotation.nullable {
            base = format!("Option<{base}>");
        }
        if !annotation.alternatives.is_empty() {
            // Rust has no anonymous unions; the head alternative carries
            let alternatives = annotation
                .alternatives
                .iter()
                .map(|a| a.name.clone())
                .collect::<Vec<_>>()
                .join(" | ");
            base = format!("{base} /* | {alternatives} */");
        }
        base
    }

    fn type_param(&mut self, annotation: &TypeAnnotation, index: usize) -> String {
        match annotation.params.get(index) {
            Some(TypeParam::Type(inner)) => self.ann(inner),
            Some(TypeParam::Width(_)) => "i64".to_string(),
            None => "i64".to_string(),
        }
    }

    fn ty(&mut self, ty: &Type) -> String {
        match ty {
            Type::Primitive { name, size, nullable } => {
                let base = match (name.as_str(), size) {
                    ("numerus", Some(8)) => "i8".to_string(),
                    ("numerus", Some(16)) => "i16".to_string(),
                    ("numerus", Some(32)) => "i32".to_string(),
                    ("numerus", _) => "i64".to_string(),
                    ("fractus", Some(32)) => "f32".to_string(),
                    ("fractus", _) => "f64".to_string(),
                    ("magnus", _) => "i128".to_string(),
                    ("textus", _) => "String".to_string(),
                    ("bivalens", _) => "bool".to_string(),
                    _ => "()".to_string(),
                };
                if *nullable {
                    format!("Option<{base}>")
                } else {
                    base
                }
            }
            Type::Generic {
                name,
                params,
                nullable,
            } => {
                let rendered: Vec<String> = params.iter().map(|p| self.ty(p)).collect();
                let first = rendered.first().cloned().unwrap_or_else(|| "i64".into());
                let base = match name.as_str() {
                    "tabula" => {
                        self.e.require("use std::collections::HashMap;");
                        format!(
                            "HashMap<{first}, {}>",
                            rendered.get(1).cloned().unwrap_or_else(|| "i64".into())
                        )
                    }
                    "copia" => {
                        self.e.require("use std::collections::HashSet;");
                        format!("HashSet<{first}>")
                    }
                    "promissum" => first,
                    _ => format!("Vec<{first}>"),
                };
                if *nullable {
                    format!("Option<{base}>")
                } else {
                    base
                }
            }
            Type::Function {
                params, returns, ..
            } => {
                let params = params
                    .iter()
                    .map(|p| self.ty(p))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Box<dyn Fn({params}) -> {}>", self.ty(returns))
            }
            Type::Union(alternatives) => match alternatives.first() {
                Some(first) => self.ty(first),
                None => "()".to_string(),
            },
            Type::User(name) => name.clone(),
            Type::Enum { name, .. }
            | Type::Genus { name, .. }
            | Type::Pactum { name, .. }
            | Type::Discretio { name, .. } => name.clone(),
            Type::Unknown => "()".to_string(),
        }
    }

    // --- statements ---------------------------------------------------

    fn block(&mut self, block: &Block) {
        for statement in &block.statements {
            self.stmt(statement);
        }
    }

    fn stmt(&mut self, statement: &Statement) {
        match statement {
            Statement::Import(_) | Statement::DestructureImport(_) => {
                // stdlib names lower to intrinsics; local modules compile
                // to their own crates
            }
            Statement::Variable(decl) => self.variable(decl),
            Statement::Function(decl) => self.function(decl, false),
            Statement::TypeAlias(decl) => {
                for comment in &decl.leading_comments {
                    self.e.line(format!("// {comment}"));
                }
                let target = self.ann(&decl.target);
                self.e.line(format!("type {} = {target};", decl.name));
            }
            Statement::Ordo(decl) => self.ordo(decl),
            Statement::Genus(decl) => self.genus(decl),
            Statement::Pactum(decl) => self.pactum(decl),
            Statement::Discretio(decl) => self.discretio(decl),
            Statement::If(decl) => self.if_stmt(decl),
            Statement::While(decl) => {
                let condition = self.expr(&decl.condition);
                self.e.open(format!("while {condition} {{"));
                self.block(&decl.body);
                self.e.close("}");
            }
            Statement::Iteration(decl) => {
                let iterable = self.expr(&decl.iterable);
                if decl.is_async {
                    self.e.line("// fiet: iteration awaits each element");
                }
                let binding = if decl.kind == IterationKind::In {
                    format!("mut {}", decl.binding)
                } else {
                    decl.binding.clone()
                };
                self.e.open(format!("for {binding} in {iterable} {{"));
                self.block(&decl.body);
                self.e.close("}");
            }
            Statement::MutationContext(decl) => self.mutation_context(decl),
            Statement::ValueSwitch(decl) => self.value_switch(decl),
            Statement::VariantSwitch(decl) => self.variant_switch(decl),
            Statement::Guard(decl) => {
                let condition = self.expr(&decl.condition);
                self.e.open(format!("if !({condition}) {{"));
                self.block(&decl.fallback);
                self.e.close("}");
            }
            Statement::Assert(decl) => {
                let condition = self.expr(&decl.condition);
                self.e.line(format!("assert!({condition});"));
            }
            Statement::Return(decl) => match &decl.value {
                Some(value) => {
                    let value = self.expr(value);
                    self.e.line(format!("return {value};"));
                }
                None => self.e.line("return;"),
            },
            Statement::Break(_) => self.e.line("break;"),
            Statement::Continue(_) => self.e.line("continue;"),
            Statement::Block(block) => {
                self.e.open("{");
                self.block(block);
                self.e.close("}");
            }
            Statement::Throw(decl) => {
                let value = self.expr(&decl.value);
                if decl.fatal {
                    self.e.line(format!("panic!(\"{{}}\", {value});"));
                } else {
                    self.e.line(format!("return Err(({value}).into());"));
                }
            }
            Statement::Try(decl) => self.try_stmt(decl),
            Statement::DoBlock(decl) => {
                self.e.open("{");
                self.block(&decl.body);
                self.e.close("}");
            }
            Statement::Entry(decl) => self.entry(decl),
            Statement::Print(decl) => {
                let value = self.expr(&decl.value);
                match decl.kind {
                    PrintKind::Scribe => self.e.line(format!("println!(\"{{}}\", {value});")),
                    PrintKind::Vide => self.e.line(format!("eprintln!(\"{{:?}}\", {value});")),
                    PrintKind::Mone => self
                        .e
                        .line(format!("eprintln!(\"monitum: {{}}\", {value});")),
                }
            }
            Statement::Suite(decl) => {
                self.e.line("#[cfg(test)]");
                self.e
                    .open(format!("mod {} {{", snake_case(&decl.name)));
                self.e.line("use super::*;");
                self.e.blank();
                self.block(&decl.body);
                self.e.close("}");
            }
            Statement::Case(decl) => {
                if let Some(timeout) = decl.timeout_ms {
                    self.e.line(format!("// intra {timeout}ms"));
                }
                self.e.line("#[test]");
                self.e
                    .open(format!("fn {}() {{", snake_case(&decl.name)));
                self.block(&decl.body);
                self.e.close("}");
            }
            Statement::Fixture(decl) => {
                let name = match (decl.kind, decl.all) {
                    (FixtureKind::Ante, false) => "ante",
                    (FixtureKind::Ante, true) => "ante_omnia",
                    (FixtureKind::Post, false) => "post",
                    (FixtureKind::Post, true) => "post_omnia",
                };
                self.e.open(format!("fn {name}() {{"));
                self.block(&decl.body);
                self.e.close("}");
            }
            Statement::Cura(decl) => self.cura(decl),
            Statement::Dispatch(decl) => self.dispatch(decl),
            Statement::Expression(decl) => {
                let rendered = self.expr(&decl.expression);
                self.e.line(format!("{rendered};"));
            }
        }
    }

    fn variable(&mut self, decl: &VariableDeclaration) {
        for comment in &decl.leading_comments {
            self.e.line(format!("// {comment}"));
        }
        let keyword = if decl.kind.is_mutable() {
            "let mut"
        } else {
            "let"
        };
        let mut value = self.expr(&decl.initializer);

        // string literals promote to owned values in binding position
        if matches!(
            &decl.initializer,
            Expression::Literal(Literal {
                value: LiteralValue::String(_),
                ..
            })
        ) {
            value = format!("{value}.to_string()");
        }
        if decl.kind.is_async() {
            value = format!("{value}.await");
        }

        match &decl.annotation {
            Some(annotation) => {
                let ty = self.ann(annotation);
                self.e
                    .line(format!("{keyword} {}: {ty} = {value};", decl.name));
            }
            None => self.e.line(format!("{keyword} {} = {value};", decl.name)),
        }
    }

    fn parameters(&mut self, params: &[Parameter]) -> String {
        params
            .iter()
            .map(|p| {
                let ty = match &p.annotation {
                    Some(annotation) => {
                        let base = self.ann(annotation);
                        match annotation.ownership {
                            Ownership::Borrowed => format!("&{base}"),
                            Ownership::MutableBorrow => format!("&mut {base}"),
                            Ownership::Owned => base,
                        }
                    }
                    None => "i64".to_string(),
                };
                if p.rest {
                    format!("{}: Vec<{ty}>", p.name)
                } else if p.default.is_some() {
                    // defaults resolve at call sites
                    format!("{}: {ty} /* vel */", p.name)
                } else {
                    format!("{}: {ty}", p.name)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn function(&mut self, decl: &FunctionDeclaration, in_impl: bool) {
        for comment in &decl.leading_comments {
            self.e.line(format!("// {comment}"));
        }
        let params = self.parameters(&decl.params);
        let params = if in_impl && !params.is_empty() {
            format!("&self, {params}")
        } else if in_impl {
            "&self".to_string()
        } else {
            params
        };

        let returns = match &decl.return_annotation {
            Some(annotation) => {
                let ty = self.ann(annotation);
                format!(" -> {ty}")
            }
            None => String::new(),
        };
        let keyword = if decl.is_async { "async fn" } else { "fn" };
        let visibility = if in_impl { "pub " } else { "" };
        self.e.open(format!(
            "{visibility}{keyword} {}({params}){returns} {{",
            decl.name
        ));
        self.block(&decl.body);
        self.e.close("}");
    }

    fn ordo(&mut self, decl: &OrdoDeclaration) {
        for comment in &decl.leading_comments {
            self.e.line(format!("// {comment}"));
        }
        self.e
            .line("#[derive(Clone, Copy, Debug, PartialEq, Eq)]");
        self.e.open(format!("pub enum {} {{", decl.name));
        let mut string_values = Vec::new();
        for member in &decl.members {
            match &member.value {
                Some(LiteralValue::Integer(value)) => {
                    self.e.line(format!("{} = {value},", member.name))
                }
                Some(LiteralValue::String(value)) => {
                    string_values.push((member.name.clone(), value.clone()));
                    self.e.line(format!("{},", member.name));
                }
                _ => self.e.line(format!("{},", member.name)),
            }
        }
        self.e.close("}");

        if !string_values.is_empty() {
            self.e.blank();
            self.e.open(format!("impl {} {{", decl.name));
            self.e.open("pub fn valor(&self) -> &'static str {");
            self.e.open("match self {");
            for (member, value) in &string_values {
                self.e.line(format!(
                    "{}::{member} => \"{}\",",
                    decl.name,
                    escape_string(value)
                ));
            }
            self.e.line("_ => \"\",");
            self.e.close("}");
            self.e.close("}");
            self.e.close("}");
        }
    }

    fn genus(&mut self, decl: &GenusDeclaration) {
        for comment in &decl.leading_comments {
            self.e.line(format!("// {comment}"));
        }
        let instance_fields: Vec<&GenusField> =
            decl.fields.iter().filter(|f| !f.is_static).collect();

        self.e.line("#[derive(Clone, Debug, PartialEq)]");
        self.e.open(format!("pub struct {} {{", decl.name));
        for field in &instance_fields {
            let ty = self.ann(&field.annotation);
            self.e.line(format!("pub {}: {ty},", field.name));
        }
        self.e.close("}");
        self.e.blank();

        self.e.open(format!("impl {} {{", decl.name));

        for field in decl.fields.iter().filter(|f| f.is_static) {
            if let Some(default) = &field.default {
                let ty = self.ann(&field.annotation);
                let value = self.expr(default);
                self.e.line(format!(
                    "pub const {}: {ty} = {value};",
                    field.name.to_uppercase()
                ));
            }
        }

        if !instance_fields.is_empty() {
            let params = instance_fields
                .iter()
                .map(|f| {
                    let ty = self.ann(&f.annotation);
                    format!("{}: {ty}", f.name)
                })
                .collect::<Vec<_>>()
                .join(", ");
            let names = instance_fields
                .iter()
                .map(|f| f.name.clone())
                .collect::<Vec<_>>()
                .join(", ");
            self.e.open(format!("pub fn new({params}) -> Self {{"));
            self.e.line(format!("Self {{ {names} }}"));
            self.e.close("}");
        }

        for method in &decl.methods {
            self.function(&method.function, !method.is_static);
        }

        self.e.close("}");
    }

    fn pactum(&mut self, decl: &PactumDeclaration) {
        for comment in &decl.leading_comments {
            self.e.line(format!("// {comment}"));
        }
        self.e.open(format!("pub trait {} {{", decl.name));
        for method in &decl.methods {
            let params = self.parameters(&method.params);
            let params = if params.is_empty() {
                "&self".to_string()
            } else {
                format!("&self, {params}")
            };
            let returns = match &method.return_annotation {
                Some(annotation) => format!(" -> {}", self.ann(annotation)),
                None => String::new(),
            };
            self.e
                .line(format!("fn {}({params}){returns};", method.name));
        }
        self.e.close("}");
    }

    fn discretio(&mut self, decl: &DiscretioDeclaration) {
        for comment in &decl.leading_comments {
            self.e.line(format!("// {comment}"));
        }
        self.e.line("#[derive(Clone, Debug, PartialEq)]");
        self.e.open(format!("pub enum {} {{", decl.name));
        for variant in &decl.variants {
            if variant.fields.is_empty() {
                self.e.line(format!("{},", variant.name));
            } else {
                let fields = variant
                    .fields
                    .iter()
                    .map(|(name, annotation)| format!("{name}: {}", self.ann(annotation)))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.e
                    .line(format!("{} {{ {fields} }},", variant.name));
            }
        }
        self.e.close("}");
    }

    fn if_stmt(&mut self, decl: &IfStatement) {
        if decl.catch.is_some() {
            self.e
                .line("// cape: recoverable failures surface as Results");
        }
        let condition = self.expr(&decl.condition);
        self.e.open(format!("if {condition} {{"));
        self.block(&decl.then_block);
        for (condition, block) in &decl.else_ifs {
            let condition = self.expr(condition);
            self.e.close(format!("}} else if {condition} {{"));
            self.e.indent += 1;
            self.block(block);
        }
        if let Some(block) = &decl.else_block {
            self.e.close("} else {");
            self.e.indent += 1;
            self.block(block);
        }
        self.e.close("}");
    }

    fn mutation_context(&mut self, decl: &MutationContext) {
        let target = self.expr(&decl.target);
        let fields = genus_field_names(&decl.shape);

        self.e.open("{");
        self.e.line(format!("let subiectum = &mut {target};"));
        for statement in &decl.body.statements {
            if let Some((name, value)) = bare_assignment(statement) {
                if fields.contains(&name) {
                    let value = self.expr(value);
                    self.e.line(format!("subiectum.{name} = {value};"));
                    continue;
                }
            }
            self.stmt(statement);
        }
        self.e.close("}");
    }

    fn value_switch(&mut self, decl: &ValueSwitch) {
        let mut discriminant = self.expr(&decl.discriminant);
        let is_string = decl
            .discriminant
            .resolved_type()
            .map(|t| t.is_primitive_named("textus"))
            .unwrap_or(false);
        if is_string {
            discriminant = format!("({discriminant}).as_str()");
        }

        self.e.open(format!("match {discriminant} {{"));
        for arm in &decl.arms {
            let patterns = arm
                .values
                .iter()
                .map(|value| self.expr(value))
                .collect::<Vec<_>>()
                .join(" | ");
            self.e.open(format!("{patterns} => {{"));
            self.block(&arm.body);
            self.e.close("}");
        }
        match &decl.default {
            Some(default) => {
                self.e.open("_ => {");
                self.block(default);
                self.e.close("}");
            }
            None => self.e.line("_ => {}"),
        }
        self.e.close("}");
    }

    fn variant_switch(&mut self, decl: &VariantSwitch) {
        if decl.discriminants.len() > 1 {
            self.variant_switch_multi(decl);
            return;
        }

        let discriminant = self.expr(&decl.discriminants[0]);
        let enum_name = match decl.shape.borrow().as_ref() {
            Some(Type::Discretio { name, .. }) => name.clone(),
            _ => String::new(),
        };

        self.e.open(format!("match {discriminant} {{"));
        for arm in &decl.arms {
            let pattern = arm
                .variants
                .iter()
                .map(|variant| {
                    self.variant_pattern(&enum_name, variant, &arm.bindings, &decl.shape)
                })
                .collect::<Vec<_>>()
                .join(" | ");
            self.e.open(format!("{pattern} => {{"));
            self.block(&arm.body);
            self.e.close("}");
        }
        match &decl.default {
            Some(default) => {
                self.e.open("_ => {");
                self.block(default);
                self.e.close("}");
            }
            None => self.e.line("_ => {}"),
        }
        self.e.close("}");
    }

    fn variant_pattern(
        &self,
        enum_name: &str,
        variant: &str,
        bindings: &VariantBindings,
        shape: &TypeSlot,
    ) -> String {
        if variant == "_" {
            return "_".to_string();
        }

        let path = if enum_name.is_empty() {
            variant.to_string()
        } else {
            format!("{enum_name}::{variant}")
        };
        let fields = variant_field_names(shape, variant);

        match bindings {
            VariantBindings::None => {
                if fields.is_empty() {
                    path
                } else {
                    format!("{path} {{ .. }}")
                }
            }
            VariantBindings::Alias(name) => {
                if fields.is_empty() {
                    format!("{name} @ {path}")
                } else {
                    format!("{name} @ {path} {{ .. }}")
                }
            }
            VariantBindings::Positional(names) => {
                let bound = fields
                    .iter()
                    .enumerate()
                    .map(|(index, field)| match names.get(index) {
                        Some(binding) if binding == field => field.clone(),
                        Some(binding) => format!("{field}: {binding}"),
                        None => format!("{field}: _"),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{path} {{ {bound} }}")
            }
        }
    }

    fn variant_switch_multi(&mut self, decl: &VariantSwitch) {
        let discriminants: Vec<String> =
            decl.discriminants.iter().map(|d| self.expr(d)).collect();
        let enum_name = match decl.shape.borrow().as_ref() {
            Some(Type::Discretio { name, .. }) => name.clone(),
            _ => String::new(),
        };

        let mut first = true;
        for arm in &decl.arms {
            let condition = discriminants
                .iter()
                .zip(arm.variants.iter())
                .filter(|(_, variant)| variant.as_str() != "_")
                .map(|(d, variant)| {
                    let path = if enum_name.is_empty() {
                        variant.clone()
                    } else {
                        format!("{enum_name}::{variant}")
                    };
                    format!("matches!(&{d}, {path} {{ .. }})")
                })
                .collect::<Vec<_>>()
                .join(" && ");
            let condition = if condition.is_empty() {
                "true".to_string()
            } else {
                condition
            };

            if first {
                self.e.open(format!("if {condition} {{"));
            } else {
                self.e.close(format!("}} else if {condition} {{"));
                self.e.indent += 1;
            }
            first = false;
            self.block(&arm.body);
        }

        if let Some(default) = &decl.default {
            if first {
                self.block(default);
                return;
            }
            self.e.close("} else {");
            self.e.indent += 1;
            self.block(default);
        }
        if !first {
            self.e.close("}");
        }
    }

    fn try_stmt(&mut self, decl: &TryStatement) {
        self.e.open(
            "let temptatum: Result<(), Box<dyn std::error::Error>> = (|| {",
        );
        self.block(&decl.body);
        self.e.line("Ok(())");
        self.e.close("})();");

        if let Some(catch) = &decl.catch {
            self.e
                .open(format!("if let Err({}) = temptatum {{", catch.binding));
            self.block(&catch.block);
            self.e.close("}");
        } else {
            self.e.line("let _ = temptatum;");
        }

        if let Some(finally) = &decl.finally {
            self.block(finally);
        }
    }

    fn entry(&mut self, decl: &EntryStatement) {
        if decl.is_async {
            self.e.open("async fn principale() {");
            self.block(&decl.body);
            self.e.close("}");
            self.e.blank();
            self.e.open("fn main() {");
            self.e
                .line("futures::executor::block_on(principale());");
            self.e.close("}");
        } else {
            self.e.open("fn main() {");
            self.block(&decl.body);
            self.e.close("}");
        }
    }

    fn cura(&mut self, decl: &CuraStatement) {
        self.e.open("{");
        let acquisition = match &decl.curator {
            CuratorKind::Arena => {
                self.e.require("use faber_runtime::Arena;");
                "Arena::new()".to_string()
            }
            CuratorKind::Pagina => {
                self.e.require("use faber_runtime::Pagina;");
                "Pagina::new()".to_string()
            }
            CuratorKind::Generic(resource) => self.expr(resource),
        };
        // released by Drop on every exit path
        self.e
            .line(format!("let mut {} = {acquisition};", decl.binding));
        self.curators.push(decl.binding.clone());
        self.block(&decl.body);
        self.curators.pop();
        if let Some(catch) = &decl.catch {
            self.e
                .line(format!("// cape {}: errors propagate as Results", catch.binding));
        }
        self.e.close("}");
    }

    fn dispatch(&mut self, decl: &DispatchStatement) {
        self.e.require("use faber_runtime::dispatch;");
        let args = decl
            .args
            .iter()
            .map(|a| self.expr(a))
            .collect::<Vec<_>>()
            .join(", ");
        let mut call = format!("dispatch(\"{}\", vec![{args}])", escape_string(&decl.target));
        if decl.verb.map(|v| v.is_async()).unwrap_or(false) {
            call = format!("{call}.await");
        }

        match (&decl.binding, &decl.body) {
            (Some(binding), Some(body)) => {
                self.e.open("{");
                self.e.line(format!("let {binding} = {call};"));
                self.block(body);
                self.e.close("}");
            }
            (Some(binding), None) => self.e.line(format!("let {binding} = {call};")),
            (None, Some(body)) => {
                self.e.line(format!("{call};"));
                self.e.open("{");
                self.block(body);
                self.e.close("}");
            }
            (None, None) => self.e.line(format!("{call};")),
        }

        if let Some(catch) = &decl.catch {
            self.e
                .line(format!("// cape {}: dispatch errors surface as Results", catch.binding));
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
                LiteralValue::BigInt(digits) => format!("{digits}i128"),
                LiteralValue::Boolean(value) => value.to_string(),
                LiteralValue::Null => "None".to_string(),
            },
            Expression::TemplateString(template) => {
                let mut fmt = String::new();
                let mut args = Vec::new();
                for part in &template.parts {
                    match part {
                        TemplatePart::Text(text) => fmt.push_str(&escape_string(text)),
                        TemplatePart::Interpolation(inner) => {
                            fmt.push_str("{}");
                            args.push(self.expr(inner));
                        }
                    }
                }
                if args.is_empty() {
                    format!("format!(\"{fmt}\")")
                } else {
                    format!("format!(\"{fmt}\", {})", args.join(", "))
                }
            }
            Expression::FormatString(format) => {
                if let Expression::Literal(Literal {
                    value: LiteralValue::String(fmt),
                    ..
                }) = format.format.as_ref()
                {
                    let args = self.exprs(&format.args).join(", ");
                    return format!("format!(\"{}\", {args})", escape_string(fmt));
                }
                let fmt = self.expr(&format.format);
                let args = self.exprs(&format.args).join(", ");
                self.e.require("use faber_runtime::faber_format;");
                format!("faber_format(&{fmt}, &[{args}])")
            }
            Expression::Regex(regex) => {
                self.e.require("use regex::Regex;");
                format!(
                    "Regex::new(\"{}\").unwrap()",
                    escape_string(&regex.pattern)
                )
            }
            Expression::ReadInput(read) => {
                if let Some(prompt) = &read.prompt {
                    let prompt = self.expr(prompt);
                    self.e.require("use faber_runtime::read_line;");
                    format!("read_line(Some({prompt}))")
                } else {
                    self.e.require("use faber_runtime::read_line;");
                    "read_line(None)".to_string()
                }
            }
            Expression::Array(array) => {
                let elements = self.exprs(&array.elements).join(", ");
                format!("vec![{elements}]")
            }
            Expression::Object(object) => {
                self.e.require("use std::collections::HashMap;");
                let entries = object
                    .entries
                    .iter()
                    .map(|entry| {
                        let value = self.expr(&entry.value);
                        format!("(\"{}\".to_string(), {value})", escape_string(&entry.key))
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("HashMap::from([{entries}])")
            }
            Expression::Range(range) => {
                let start = self.expr(&range.start);
                let end = self.expr(&range.end);
                if range.inclusive {
                    format!("({start}..={end})")
                } else {
                    format!("({start}..{end})")
                }
            }
            Expression::Binary(binary) => {
                let lhs = self.expr(&binary.lhs);
                let rhs = self.expr(&binary.rhs);
                if binary.operator == BinaryOperator::NullCoalesce {
                    return format!("{lhs}.unwrap_or({rhs})");
                }
                format!("({lhs} {} {rhs})", rust_operator(binary.operator))
            }
            Expression::Unary(unary) => {
                let operand = self.expr(&unary.operand);
                match unary.operator {
                    UnaryOperator::Negate => format!("(-{operand})"),
                    UnaryOperator::Not => format!("(!{operand})"),
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
                format!("if {condition} {{ {consequent} }} else {{ {alternative} }}")
            }
            Expression::Assignment(assignment) => {
                // map stores go through insert
                if let Expression::Index(index) = &assignment.target {
                    if receiver_generic(&index.object) == Some("tabula".to_string()) {
                        let object = self.expr(&index.object);
                        let key = self.expr(&index.index);
                        let value = self.expr(&assignment.value);
                        return format!("{object}.insert({key}, {value})");
                    }
                }
                let target = self.expr(&assignment.target);
                let value = self.expr(&assignment.value);
                format!("{target} = {value}")
            }
            Expression::TypeCheck(check) => {
                // statically decided: the analyzer already knows both sides
                let known = check
                    .value
                    .resolved_type()
                    .map(|ty| static_type_matches(&ty, &check.annotation))
                    .unwrap_or(true);
                let value = self.expr(&check.value);
                format!("{{ let _ = &{value}; {known} }}")
            }
            Expression::Cast(cast) => {
                let value = self.expr(&cast.value);
                match cast.annotation.name.as_str() {
                    "numerus" => format!("({value} as i64)"),
                    "fractus" => format!("({value} as f64)"),
                    "magnus" => format!("({value} as i128)"),
                    "textus" => format!("{value}.to_string()"),
                    _ => value,
                }
            }
            Expression::Conversion(conversion) => {
                let value = self.expr(&conversion.value);
                let is_string = conversion
                    .value
                    .resolved_type()
                    .map(|t| t.is_primitive_named("textus"))
                    .unwrap_or(false);
                match conversion.kind {
                    ConversionKind::Numeratum if is_string => {
                        format!("{value}.parse::<i64>().unwrap_or(0)")
                    }
                    ConversionKind::Numeratum => format!("({value} as i64)"),
                    ConversionKind::Textatum => format!("{value}.to_string()"),
                    ConversionKind::Fractatum if is_string => {
                        format!("{value}.parse::<f64>().unwrap_or(0.0)")
                    }
                    ConversionKind::Fractatum => format!("({value} as f64)"),
                    ConversionKind::Bivalentum if is_string => {
                        format!("!{value}.is_empty()")
                    }
                    ConversionKind::Bivalentum => format!("({value} != 0)"),
                }
            }
            Expression::Native(native) => {
                let args = self.exprs(&native.args).join(", ");
                match native.target_type.name.as_str() {
                    "lista" => format!("vec![{args}]"),
                    "tabula" => {
                        self.e.require("use std::collections::HashMap;");
                        format!("HashMap::from([{args}])")
                    }
                    "copia" => {
                        self.e.require("use std::collections::HashSet;");
                        format!("HashSet::from([{args}])")
                    }
                    name => format!("{name}::new({args})"),
                }
            }
            Expression::Call(call) => self.call(call),
            Expression::Member(member) => self.member(member),
            Expression::Index(index) => {
                let object = self.expr(&index.object);
                let key = self.expr(&index.index);
                match receiver_generic(&index.object).as_deref() {
                    Some("tabula") => format!("{object}[&{key}]"),
                    _ => format!("{object}[({key}) as usize]"),
                }
            }
            Expression::New(new) => {
                let args = self.exprs(&new.args).join(", ");
                format!("{}::new({args})", new.type_name)
            }
            Expression::Variant(variant) => {
                let enum_name = match variant.shape.borrow().as_ref() {
                    Some(Type::Discretio { name, .. }) => name.clone(),
                    _ => String::new(),
                };
                let path = if enum_name.is_empty() {
                    variant.variant.clone()
                } else {
                    format!("{enum_name}::{}", variant.variant)
                };
                if variant.args.is_empty() {
                    return path;
                }
                let fields = variant_field_names(&variant.shape, &variant.variant);
                let entries = variant
                    .args
                    .iter()
                    .enumerate()
                    .map(|(index, arg)| {
                        let value = self.expr(arg);
                        match fields.get(index) {
                            Some(field) => format!("{field}: {value}"),
                            None => value,
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{path} {{ {entries} }}")
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
                        if lambda.is_async {
                            format!("move |{params}| async move {{ {body} }}")
                        } else {
                            format!("move |{params}| {body}")
                        }
                    }
                    LambdaBody::Block(block) => {
                        let mut nested = RustGenerator::new();
                        nested.e.indent = self.e.indent + 1;
                        nested.block(block);
                        let body = nested.e.out;
                        for header in nested.e.headers {
                            self.e.require(header);
                        }
                        self.e.diagnostics.append(&mut nested.e.diagnostics);
                        let indent = "    ".repeat(self.e.indent);
                        format!("move |{params}| {{\n{body}{indent}}}")
                    }
                }
            }
            Expression::Await(await_expr) => {
                let value = self.expr(&await_expr.value);
                format!("{value}.await")
            }
            Expression::Comptime(comptime) => {
                let value = self.expr(&comptime.value);
                format!("/* praefixum */ {value}")
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
                        format!(
                            "{source}.iter().take(({count}) as usize).cloned().collect::<Vec<_>>()"
                        )
                    }
                    PipelineOp::Ultima => {
                        let count = pipeline
                            .count
                            .as_ref()
                            .map(|c| self.expr(c))
                            .unwrap_or_else(|| "1".to_string());
                        format!(
                            "{source}.iter().skip({source}.len().saturating_sub(({count}) as usize)).cloned().collect::<Vec<_>>()"
                        )
                    }
                    PipelineOp::Summa => {
                        let element = pipeline
                            .source
                            .resolved_type()
                            .and_then(|t| t.generic_param(0).cloned())
                            .map(|t| self.ty(&t))
                            .unwrap_or_else(|| "i64".to_string());
                        format!("{source}.iter().cloned().sum::<{element}>()")
                    }
                }
            }
            Expression::Filter(filter) => {
                let source = self.expr(&filter.source);
                let predicate = self.expr(&filter.predicate);
                let binding = &filter.binding;
                format!(
                    "{source}.iter().cloned().filter(|{binding}| {{ let {binding} = {binding}.clone(); {predicate} }}).collect::<Vec<_>>()"
                )
            }
            Expression::RangeTest(test) => {
                let value = self.expr(&test.value);
                let low = self.expr(&test.low);
                let high = self.expr(&test.high);
                let comparison = if test.inclusive { "<=" } else { "<" };
                format!("({value} >= {low} && {value} {comparison} {high})")
            }
            Expression::Membership(membership) => {
                let value = self.expr(&membership.value);
                let collection = self.expr(&membership.collection);
                format!("{collection}.contains(&{value})")
            }
        }
    }

    fn identifier(&mut self, name: &str) -> String {
        if let Some(value) = duration_constant(name) {
            return value.to_string();
        }
        match name {
            "PI" => "std::f64::consts::PI".to_string(),
            "TAU" => "std::f64::consts::TAU".to_string(),
            "EULERUS" => "std::f64::consts::E".to_string(),
            "alea" => {
                self.e.require("use faber_runtime::alea;");
                "alea".to_string()
            }
            "nunc" => {
                self.e.require("use faber_runtime::nunc;");
                "nunc".to_string()
            }
            other => other.to_string(),
        }
    }

    fn call(&mut self, call: &CallExpression) -> String {
        let args = self.exprs(&call.args);

        // math intrinsics are methods on the receiver in Rust
        if let Expression::Identifier(id) = &call.callee {
            let first = args.first().cloned().unwrap_or_default();
            match id.name.as_str() {
                "sin" => return format!("({first}).sin()"),
                "cos" => return format!("({first}).cos()"),
                "tan" => return format!("({first}).tan()"),
                "radix" => return format!("({first}).sqrt()"),
                "absolutus" => return format!("({first}).abs()"),
                "tectum" => return format!("({first}).ceil() as i64"),
                "solum" => return format!("({first}).floor() as i64"),
                "potentia" => {
                    let second = args.get(1).cloned().unwrap_or_default();
                    return format!("({first}).powf({second})");
                }
                _ => {}
            }
        }

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
                .map(|c| format!("&mut {c}"))
                .unwrap_or_else(|| "&mut Arena::default()".to_string());
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
            ("lista", "adde") => format!("{recv}.push({joined})"),
            ("lista", "demite") => format!("{recv}.pop()"),
            ("lista", "continet") => format!("{recv}.contains(&{first})"),
            ("lista", "inverte") => {
                format!("{recv}.iter().rev().cloned().collect::<Vec<_>>()")
            }
            ("lista", "ordina") => format!(
                "{{ let mut ordinata = {recv}.clone(); ordinata.sort(); ordinata }}"
            ),
            ("lista", "iunge") => format!("{recv}.join(&{first})"),
            ("tabula", "pone") => format!("{recv}.insert({joined})"),
            ("tabula", "accipe") => format!("{recv}.get(&{first}).cloned()"),
            ("tabula", "dele") => format!("{recv}.remove(&{first}).is_some()"),
            ("tabula", "habet") => format!("{recv}.contains_key(&{first})"),
            ("tabula", "claves") => {
                format!("{recv}.keys().cloned().collect::<Vec<_>>()")
            }
            ("tabula", "valores") => {
                format!("{recv}.values().cloned().collect::<Vec<_>>()")
            }
            ("copia", "adde") => format!("{recv}.insert({joined})"),
            ("copia", "habet") => format!("{recv}.contains(&{first})"),
            ("copia", "dele") => format!("{recv}.remove(&{first})"),
            (_, "maiuscula") => format!("{recv}.to_uppercase()"),
            (_, "minuscula") => format!("{recv}.to_lowercase()"),
            (_, "recide") => format!("{recv}.trim().to_string()"),
            (_, "scinde") => format!(
                "{recv}.split(&{first}).map(|p| p.to_string()).collect::<Vec<_>>()"
            ),
            _ => return None,
        };
        Some(rendered)
    }

    fn member(&mut self, member: &MemberExpression) -> String {
        // enum members and genus statics use path syntax
        if let Expression::Identifier(id) = &member.object {
            if matches!(
                member.object.resolved_type(),
                Some(Type::Enum { .. }) | Some(Type::Genus { .. })
            ) {
                return format!("{}::{}", id.name, member.property);
            }
        }

        let object = self.expr(&member.object);
        if member.property == "longitudo" {
            return format!("{object}.len() as i64");
        }
        if member.property == "caput" {
            return format!("{object}.first().cloned()");
        }
        if member.property == "cauda" {
            return format!("{object}[1..].to_vec()");
        }

        format!("{object}.{}", member.property)
    }
}

fn rust_operator(operator: BinaryOperator) -> &'static str {
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
        BinaryOperator::And => "&&",
        BinaryOperator::Or => "||",
        BinaryOperator::NullCoalesce => "??",
    }
}

/// Static `est` decision from the analyzer's resolved type.
fn static_type_matches(ty: &Type, annotation: &TypeAnnotation) -> bool {
    match ty {
        Type::Primitive { name, .. } => name == &annotation.name,
        Type::Generic { name, .. } => name == &annotation.name,
        Type::User(name) => name == &annotation.name,
        Type::Unknown => true,
        _ => false,
    }
}

fn snake_case(raw: &str) -> String {
    let mut name = String::new();
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c.to_ascii_lowercase());
        } else if !name.ends_with('_') && !name.is_empty() {
            name.push('_');
        }
    }
    let trimmed = name.trim_matches('_').to_string();
    if trimmed.is_empty() {
        "probatio".to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::semantic::analyze;

    fn emit(source: &str) -> String {
        let parsed = parse_source(source);
        let program = parsed.program.expect("parse");
        analyze(&program);
        RustGenerator::new().generate(&program).source
    }

    #[test]
    fn test_null_coalesce_uses_unwrap_or() {
        let out = emit("varia a = nihil\nvaria b = 2\nvaria c = a ?? b");
        assert!(out.contains("a.unwrap_or(b)"), "{out}");
    }

    #[test]
    fn test_variant_construction_uses_struct_syntax() {
        let out = emit(
            "discretio Event { Click { numerus x, numerus y } Quit }\n\
             varia e = finge Event.Click(1, 2)",
        );
        assert!(out.contains("Event::Click { x: 1, y: 2 }"), "{out}");
    }

    #[test]
    fn test_discerne_becomes_match() {
        let out = emit(
            "discretio Event { Click { numerus x, numerus y } Quit }\n\
             functio handle(Event e) {\n\
               discerne e {\n\
                 casu Click pro x, y { redde }\n\
                 casu Quit { redde }\n\
               }\n\
             }",
        );
        assert!(out.contains("match e {"), "{out}");
        assert!(out.contains("Event::Click { x, y } => {"), "{out}");
        assert!(out.contains("Event::Quit => {"), "{out}");
    }

    #[test]
    fn test_fatal_throw_panics_and_recoverable_errs() {
        let out = emit("functio f() { iace \"malum\" }\nfunctio g() { mori \"peius\" }");
        assert!(out.contains("return Err((\"malum\").into());"), "{out}");
        assert!(out.contains("panic!(\"{}\", \"peius\");"), "{out}");
    }

    #[test]
    fn test_headers_are_alphabetized_uses() {
        let out = emit("varia t = innatum tabula(1)\nvaria s = innatum copia(2)");
        let map = out.find("use std::collections::HashMap;").unwrap();
        let set = out.find("use std::collections::HashSet;").unwrap();
        assert!(map < set);
    }
}
