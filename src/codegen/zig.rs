//! Zig emitter.
//!
//! Discretio types become `union(enum)` declarations switched over with
//! payload captures; `cura arena` maps directly onto
//! `std.heap.ArenaAllocator` with a `defer deinit`. Constructs Zig has no
//! expression form for (closures, runtime regex) produce a diagnostic and a
//! placeholder. `test "name"` blocks carry the test constructs natively.

use crate::codegen::{
    bare_assignment, duration_constant, escape_string, format_float, genus_field_names,
    receiver_generic, variant_field_names, Emitter, GeneratedModule,
};
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::parser::ast::*;
use crate::semantic::Type;

const STD_IMPORT: &str = "const std = @import(\"std\");";
const RUNTIME_IMPORT: &str = "const faber = @import(\"faber_runtime.zig\");";

pub struct ZigGenerator {
    e: Emitter,
    curators: Vec<String>,
}

impl Default for ZigGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ZigGenerator {
    pub fn new() -> Self {
        ZigGenerator {
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

    fn std(&mut self) {
        self.e.require(STD_IMPORT);
    }

    fn runtime(&mut self) {
        self.e.require(RUNTIME_IMPORT);
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
            return format!(
                "*const fn ({params}) {}",
                self.ann(&function.returns)
            );
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
            "textus" => "[]const u8".to_string(),
            "bivalens" => "bool".to_string(),
            "vacuum" | "nihil" => "void".to_string(),
            "lista" => {
                self.std();
                format!("std.ArrayList({})", self.type_param(annotation, 0))
            }
            "tabula" => {
                self.std();
                format!(
                    "std.AutoHashMap({}, {})",
                    self.type_param(annotation, 0),
                    self.type_param(annotation, 1)
                )
            }
            "copia" => {
                self.std();
                format!("std.AutoHashMap({}, void)", self.type_param(annotation, 0))
            }
            "promissum" => self.type_param(annotation, 0),
            "cursor" | "fluxus" => {
                format!("[]const {}", self.type_param(annotation, 0))
            }
            other => other.to_string(),
        };

        if annotation.array {
            base = format!("[]const {base}");
        }
        if annotation.nullable {
            base = format!("?{base}");
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

    // --- statements ---------------------------------------------------

    fn block(&mut self, block: &Block) {
        for statement in &block.statements {
            self.stmt(statement);
        }
    }

    fn stmt(&mut self, statement: &Statement) {
        match statement {
            Statement::Import(_) | Statement::DestructureImport(_) => {}
            Statement::Variable(decl) => {
                for comment in &decl.leading_comments {
                    self.e.line(format!("// {comment}"));
                }
                let keyword = if decl.kind.is_mutable() { "var" } else { "const" };
                let value = self.expr(&decl.initializer);
                match &decl.annotation {
                    Some(annotation) => {
                        let ty = self.ann(annotation);
                        self.e
                            .line(format!("{keyword} {}: {ty} = {value};", decl.name));
                    }
                    None => self.e.line(format!("{keyword} {} = {value};", decl.name)),
                }
            }
            Statement::Function(decl) => self.function(decl),
            Statement::TypeAlias(decl) => {
                let target = self.ann(&decl.target);
                self.e.line(format!("const {} = {target};", decl.name));
            }
            Statement::Ordo(decl) => {
                self.e.open(format!("const {} = enum(i64) {{", decl.name));
                for member in &decl.members {
                    match &member.value {
                        Some(LiteralValue::Integer(value)) => {
                            self.e.line(format!("{} = {value},", member.name))
                        }
                        Some(LiteralValue::String(value)) => self.e.line(format!(
                            "{}, // \"{}\"",
                            member.name,
                            escape_string(value)
                        )),
                        _ => self.e.line(format!("{},", member.name)),
                    }
                }
                self.e.close("};");
            }
            Statement::Genus(decl) => self.genus(decl),
            Statement::Pactum(decl) => {
                // no interfaces; a vtable of function pointers stands in
                self.e.open(format!("const {} = struct {{", decl.name));
                for method in &decl.methods {
                    let params = method
                        .params
                        .iter()
                        .map(|p| match &p.annotation {
                            Some(annotation) => self.ann(annotation),
                            None => "i64".to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    let returns = match &method.return_annotation {
                        Some(annotation) => self.ann(annotation),
                        None => "void".to_string(),
                    };
                    self.e.line(format!(
                        "{}Fn: *const fn (*anyopaque{}{params}) {returns},",
                        method.name,
                        if params.is_empty() { "" } else { ", " }
                    ));
                }
                self.e.close("};");
            }
            Statement::Discretio(decl) => {
                self.e
                    .open(format!("const {} = union(enum) {{", decl.name));
                for variant in &decl.variants {
                    if variant.fields.is_empty() {
                        self.e.line(format!("{}: void,", variant.name));
                    } else {
                        let fields = variant
                            .fields
                            .iter()
                            .map(|(name, annotation)| {
                                format!("{name}: {}", self.ann(annotation))
                            })
                            .collect::<Vec<_>>()
                            .join(", ");
                        self.e.line(format!(
                            "{}: struct {{ {fields} }},",
                            variant.name
                        ));
                    }
                }
                self.e.close("};");
            }
            Statement::If(decl) => self.if_stmt(decl),
            Statement::While(decl) => {
                let condition = self.expr(&decl.condition);
                self.e.open(format!("while ({condition}) {{"));
                self.block(&decl.body);
                self.e.close("}");
            }
            Statement::Iteration(decl) => {
                let iterable = self.expr(&decl.iterable);
                let iterable = match receiver_generic(&decl.iterable).as_deref() {
                    Some("lista") => format!("{iterable}.items"),
                    _ => iterable,
                };
                let capture = if decl.kind == IterationKind::In {
                    format!("|*{}|", decl.binding)
                } else {
                    format!("|{}|", decl.binding)
                };
                self.e.open(format!("for ({iterable}) {capture} {{"));
                self.block(&decl.body);
                self.e.close("}");
            }
            Statement::MutationContext(decl) => {
                let target = self.expr(&decl.target);
                let fields = genus_field_names(&decl.shape);
                self.e.open("{");
                self.e.line(format!("var subiectum = &{target};"));
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
            Statement::ValueSwitch(decl) => {
                let discriminant = self.expr(&decl.discriminant);
                self.e.open(format!("switch ({discriminant}) {{"));
                for arm in &decl.arms {
                    let patterns = arm
                        .values
                        .iter()
                        .map(|v| self.expr(v))
                        .collect::<Vec<_>>()
                        .join(", ");
                    self.e.open(format!("{patterns} => {{"));
                    self.block(&arm.body);
                    self.e.close("},");
                }
                match &decl.default {
                    Some(default) => {
                        self.e.open("else => {");
                        self.block(default);
                        self.e.close("},");
                    }
                    None => self.e.line("else => {},"),
                }
                self.e.close("}");
            }
            Statement::VariantSwitch(decl) => self.variant_switch(decl),
            Statement::Guard(decl) => {
                let condition = self.expr(&decl.condition);
                self.e.open(format!("if (!({condition})) {{"));
                self.block(&decl.fallback);
                self.e.close("}");
            }
            Statement::Assert(decl) => {
                self.std();
                let condition = self.expr(&decl.condition);
                self.e.line(format!("std.debug.assert({condition});"));
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
                    self.std();
                    self.e
                        .line(format!("std.debug.panic(\"{{any}}\", .{{{value}}});"));
                } else {
                    self.e.line(format!("// iace {value}"));
                    self.e.line("return error.Iactum;");
                }
            }
            Statement::Try(decl) => {
                self.e.open("{");
                self.block(&decl.body);
                self.e.close("}");
                if let Some(catch) = &decl.catch {
                    self.e.diagnostics.push(Diagnostic::warning(
                        ErrorCode::UnsupportedConstruct,
                        "cape blocks lower to error unions on Zig; the catch body is kept as a comment scope",
                        catch.position,
                    ));
                    self.e
                        .line(format!("// cape {}: errors propagate as error unions", catch.binding));
                }
                if let Some(finally) = &decl.finally {
                    self.block(finally);
                }
            }
            Statement::DoBlock(decl) => {
                self.e.open("{");
                self.block(&decl.body);
                self.e.close("}");
            }
            Statement::Entry(decl) => {
                if decl.is_async {
                    self.e.line("// fiet: entry runs synchronously");
                }
                self.e.open("pub fn main() !void {");
                self.block(&decl.body);
                self.e.close("}");
            }
            Statement::Print(decl) => {
                self.std();
                let value = self.expr(&decl.value);
                match decl.kind {
                    PrintKind::Scribe => self
                        .e
                        .line(format!("std.debug.print(\"{{any}}\\n\", .{{{value}}});")),
                    PrintKind::Vide => self
                        .e
                        .line(format!("std.debug.print(\"vide: {{any}}\\n\", .{{{value}}});")),
                    PrintKind::Mone => self.e.line(format!(
                        "std.debug.print(\"monitum: {{any}}\\n\", .{{{value}}});"
                    )),
                }
            }
            Statement::Suite(decl) => {
                self.e.line(format!("// probatio: {}", decl.name));
                self.block(&decl.body);
            }
            Statement::Case(decl) => {
                if let Some(timeout) = decl.timeout_ms {
                    self.e.line(format!("// intra {timeout}ms"));
                }
                self.e
                    .open(format!("test \"{}\" {{", escape_string(&decl.name)));
                self.block(&decl.body);
                self.e.close("}");
            }
            Statement::Fixture(decl) => {
                let name = match (decl.kind, decl.all) {
                    (FixtureKind::Ante, false) => "ante",
                    (FixtureKind::Ante, true) => "anteOmnia",
                    (FixtureKind::Post, false) => "post",
                    (FixtureKind::Post, true) => "postOmnia",
                };
                self.e.open(format!("fn {name}() void {{"));
                self.block(&decl.body);
                self.e.close("}");
            }
            Statement::Cura(decl) => self.cura(decl),
            Statement::Dispatch(decl) => {
                self.runtime();
                let args = decl
                    .args
                    .iter()
                    .map(|a| self.expr(a))
                    .collect::<Vec<_>>()
                    .join(", ");
                let call = format!(
                    "faber.dispatch(\"{}\", .{{{args}}})",
                    escape_string(&decl.target)
                );
                match (&decl.binding, &decl.body) {
                    (Some(binding), Some(body)) => {
                        self.e.open("{");
                        self.e.line(format!("const {binding} = {call};"));
                        self.block(body);
                        self.e.close("}");
                    }
                    (Some(binding), None) => {
                        self.e.line(format!("const {binding} = {call};"))
                    }
                    (None, Some(body)) => {
                        self.e.line(format!("_ = {call};"));
                        self.e.open("{");
                        self.block(body);
                        self.e.close("}");
                    }
                    (None, None) => self.e.line(format!("_ = {call};")),
                }
                if let Some(catch) = &decl.catch {
                    self.e.line(format!(
                        "// cape {}: dispatch errors propagate as error unions",
                        catch.binding
                    ));
                }
            }
            Statement::Expression(decl) => {
                let rendered = self.expr(&decl.expression);
                if matches!(&decl.expression, Expression::Assignment(_)) {
                    self.e.line(format!("{rendered};"));
                } else {
                    self.e.line(format!("_ = {rendered};"));
                }
            }
        }
    }

    fn function(&mut self, decl: &FunctionDeclaration) {
        for comment in &decl.leading_comments {
            self.e.line(format!("// {comment}"));
        }
        if decl.is_async {
            self.e.line("// fiet");
        }
        let params = decl
            .params
            .iter()
            .map(|p| {
                let ty = match &p.annotation {
                    Some(annotation) => {
                        let base = self.ann(annotation);
                        match annotation.ownership {
                            Ownership::MutableBorrow => format!("*{base}"),
                            _ => base,
                        }
                    }
                    None => "i64".to_string(),
                };
                format!("{}: {ty}", p.name)
            })
            .collect::<Vec<_>>()
            .join(", ");
        let returns = match &decl.return_annotation {
            Some(annotation) => self.ann(annotation),
            None => "void".to_string(),
        };
        self.e
            .open(format!("pub fn {}({params}) {returns} {{", decl.name));
        self.block(&decl.body);
        self.e.close("}");
    }

    fn genus(&mut self, decl: &GenusDeclaration) {
        for comment in &decl.leading_comments {
            self.e.line(format!("// {comment}"));
        }
        self.e.open(format!("const {} = struct {{", decl.name));

        for field in &decl.fields {
            let ty = self.ann(&field.annotation);
            if field.is_static {
                let value = match &field.default {
                    Some(default) => self.expr(default),
                    None => "undefined".to_string(),
                };
                self.e
                    .line(format!("pub const {}: {ty} = {value};", field.name));
            } else {
                match &field.default {
                    Some(default) => {
                        let default = self.expr(default);
                        self.e
                            .line(format!("{}: {ty} = {default},", field.name));
                    }
                    None => self.e.line(format!("{}: {ty},", field.name)),
                }
            }
        }

        for method in &decl.methods {
            let function = &method.function;
            let mut params = Vec::new();
            if !method.is_static {
                params.push(format!("self: *const {}", decl.name));
            }
            for p in &function.params {
                let ty = match &p.annotation {
                    Some(annotation) => self.ann(annotation),
                    None => "i64".to_string(),
                };
                params.push(format!("{}: {ty}", p.name));
            }
            let returns = match &function.return_annotation {
                Some(annotation) => self.ann(annotation),
                None => "void".to_string(),
            };
            self.e.open(format!(
                "pub fn {}({}) {returns} {{",
                function.name,
                params.join(", ")
            ));
            self.block(&function.body);
            self.e.close("}");
        }

        self.e.close("};");
    }

    fn if_stmt(&mut self, decl: &IfStatement) {
        let condition = self.expr(&decl.condition);
        self.e.open(format!("if ({condition}) {{"));
        self.block(&decl.then_block);
        for (condition, block) in &decl.else_ifs {
            let condition = self.expr(condition);
            self.e.close(format!("}} else if ({condition}) {{"));
            self.e.indent += 1;
            self.block(block);
        }
        if let Some(block) = &decl.else_block {
            self.e.close("} else {");
            self.e.indent += 1;
            self.block(block);
        }
        self.e.close("}");
        if let Some(catch) = &decl.catch {
            self.e.line(format!(
                "// cape {}: errors propagate as error unions",
                catch.binding
            ));
        }
    }

    fn variant_switch(&mut self, decl: &VariantSwitch) {
        if decl.discriminants.len() > 1 {
            // multiple discriminants fall back to chained tag tests
            let discriminants: Vec<String> =
                decl.discriminants.iter().map(|d| self.expr(d)).collect();
            let mut first = true;
            for arm in &decl.arms {
                let condition = discriminants
                    .iter()
                    .zip(arm.variants.iter())
                    .filter(|(_, v)| v.as_str() != "_")
                    .map(|(d, v)| format!("{d} == .{v}"))
                    .collect::<Vec<_>>()
                    .join(" and ");
                let condition = if condition.is_empty() {
                    "true".to_string()
                } else {
                    condition
                };
                if first {
                    self.e.open(format!("if ({condition}) {{"));
                } else {
                    self.e.close(format!("}} else if ({condition}) {{"));
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
            return;
        }

        let discriminant = self.expr(&decl.discriminants[0]);
        self.e.open(format!("switch ({discriminant}) {{"));
        for arm in &decl.arms {
            if arm.variants.iter().any(|v| v == "_") {
                self.e.open("else => {");
                self.block(&arm.body);
                self.e.close("},");
                continue;
            }

            let tags = arm
                .variants
                .iter()
                .map(|v| format!(".{v}"))
                .collect::<Vec<_>>()
                .join(", ");

            match &arm.bindings {
                VariantBindings::None => {
                    self.e.open(format!("{tags} => {{"));
                    self.block(&arm.body);
                    self.e.close("},");
                }
                VariantBindings::Alias(name) => {
                    self.e.open(format!("{tags} => |{name}| {{"));
                    self.block(&arm.body);
                    self.e.close("},");
                }
                VariantBindings::Positional(names) => {
                    self.e.open(format!("{tags} => |electum| {{"));
                    let fields = arm
                        .variants
                        .first()
                        .map(|v| variant_field_names(&decl.shape, v))
                        .unwrap_or_default();
                    for (index, name) in names.iter().enumerate() {
                        match fields.get(index) {
                            Some(field) => self
                                .e
                                .line(format!("const {name} = electum.{field};")),
                            None => self.e.line(format!("const {name} = electum;")),
                        }
                    }
                    self.block(&arm.body);
                    self.e.close("},");
                }
            }
        }
        match &decl.default {
            Some(default) => {
                self.e.open("else => {");
                self.block(default);
                self.e.close("},");
            }
            None => self.e.line("else => {},"),
        }
        self.e.close("}");
    }

    fn cura(&mut self, decl: &CuraStatement) {
        self.e.open("{");
        match &decl.curator {
            CuratorKind::Arena => {
                self.std();
                self.e.line(format!(
                    "var {} = std.heap.ArenaAllocator.init(std.heap.page_allocator);",
                    decl.binding
                ));
                self.e.line(format!("defer {}.deinit();", decl.binding));
            }
            CuratorKind::Pagina => {
                self.std();
                self.e
                    .line(format!("const {} = std.heap.page_allocator;", decl.binding));
            }
            CuratorKind::Generic(resource) => {
                let resource = self.expr(resource);
                self.e
                    .line(format!("var {} = {resource};", decl.binding));
                self.e.line(format!("defer {}.release();", decl.binding));
            }
        }
        self.curators.push(decl.binding.clone());
        self.block(&decl.body);
        self.curators.pop();
        if let Some(catch) = &decl.catch {
            self.e.line(format!(
                "// cape {}: errors propagate as error unions",
                catch.binding
            ));
        }
        self.e.close("}");
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
                LiteralValue::Boolean(value) => value.to_string(),
                LiteralValue::Null => "null".to_string(),
            },
            Expression::TemplateString(template) => {
                self.std();
                let mut fmt = String::new();
                let mut args = Vec::new();
                for part in &template.parts {
                    match part {
                        TemplatePart::Text(text) => fmt.push_str(&escape_string(text)),
                        TemplatePart::Interpolation(inner) => {
                            fmt.push_str("{any}");
                            args.push(self.expr(inner));
                        }
                    }
                }
                format!(
                    "std.fmt.allocPrint(std.heap.page_allocator, \"{fmt}\", .{{{}}}) catch unreachable",
                    args.join(", ")
                )
            }
            Expression::FormatString(format) => {
                self.std();
                let fmt = match format.format.as_ref() {
                    Expression::Literal(Literal {
                        value: LiteralValue::String(fmt),
                        ..
                    }) => escape_string(&fmt.replace("{}", "{any}")),
                    _ => "{any}".to_string(),
                };
                let args = self.exprs(&format.args).join(", ");
                format!(
                    "std.fmt.allocPrint(std.heap.page_allocator, \"{fmt}\", .{{{args}}}) catch unreachable"
                )
            }
            Expression::Regex(regex) => {
                self.e.diagnostics.push(Diagnostic::warning(
                    ErrorCode::UnsupportedConstruct,
                    "regula literals have no Zig standard library form",
                    regex.position,
                ));
                format!("null /* regula \"{}\" */", escape_string(&regex.pattern))
            }
            Expression::ReadInput(read) => {
                self.runtime();
                match &read.prompt {
                    Some(prompt) => {
                        let prompt = self.expr(prompt);
                        format!("faber.readLine({prompt})")
                    }
                    None => "faber.readLine(null)".to_string(),
                }
            }
            Expression::Array(array) => {
                let elements = self.exprs(&array.elements).join(", ");
                format!(".{{{elements}}}")
            }
            Expression::Object(object) => {
                let entries = object
                    .entries
                    .iter()
                    .map(|entry| {
                        let value = self.expr(&entry.value);
                        format!(".{} = {value}", entry.key)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(".{{{entries}}}")
            }
            Expression::Range(range) => {
                let start = self.expr(&range.start);
                let end = self.expr(&range.end);
                if range.inclusive {
                    format!("{start}..{end} + 1")
                } else {
                    format!("{start}..{end}")
                }
            }
            Expression::Binary(binary) => {
                let lhs = self.expr(&binary.lhs);
                let rhs = self.expr(&binary.rhs);
                if binary.operator == BinaryOperator::NullCoalesce {
                    return format!("({lhs} orelse {rhs})");
                }
                format!("({lhs} {} {rhs})", zig_operator(binary.operator))
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
                format!("({value} {operator} @intCast({amount}))")
            }
            Expression::Ternary(ternary) => {
                let condition = self.expr(&ternary.condition);
                let consequent = self.expr(&ternary.consequent);
                let alternative = self.expr(&ternary.alternative);
                format!("(if ({condition}) {consequent} else {alternative})")
            }
            Expression::Assignment(assignment) => {
                let target = self.expr(&assignment.target);
                let value = self.expr(&assignment.value);
                format!("{target} = {value}")
            }
            Expression::TypeCheck(check) => {
                let known = check
                    .value
                    .resolved_type()
                    .map(|ty| static_type_matches(&ty, &check.annotation))
                    .unwrap_or(true);
                known.to_string()
            }
            Expression::Cast(cast) => {
                let value = self.expr(&cast.value);
                match cast.annotation.name.as_str() {
                    "numerus" => format!("@as(i64, @intCast({value}))"),
                    "fractus" => format!("@as(f64, @floatCast({value}))"),
                    _ => value,
                }
            }
            Expression::Conversion(conversion) => {
                self.runtime();
                let value = self.expr(&conversion.value);
                match conversion.kind {
                    ConversionKind::Numeratum => format!("faber.toInt({value})"),
                    ConversionKind::Textatum => format!("faber.toText({value})"),
                    ConversionKind::Fractatum => format!("faber.toFloat({value})"),
                    ConversionKind::Bivalentum => format!("faber.toBool({value})"),
                }
            }
            Expression::Native(native) => {
                let ty = self.ann(&native.target_type);
                let args = self.exprs(&native.args).join(", ");
                match native.target_type.name.as_str() {
                    "lista" | "tabula" | "copia" => {
                        self.std();
                        format!("{ty}.init(std.heap.page_allocator)")
                    }
                    _ => format!("{ty}{{{args}}}"),
                }
            }
            Expression::Call(call) => self.call(call),
            Expression::Member(member) => self.member(member),
            Expression::Index(index) => {
                let object = self.expr(&index.object);
                let key = self.expr(&index.index);
                match receiver_generic(&index.object).as_deref() {
                    Some("tabula") => format!("{object}.get({key}).?"),
                    Some("lista") => format!("{object}.items[@intCast({key})]"),
                    _ => format!("{object}[@intCast({key})]"),
                }
            }
            Expression::New(new) => {
                let entries = self.exprs(&new.args).join(", ");
                format!("{}{{{entries}}}", new.type_name)
            }
            Expression::Variant(variant) => {
                let enum_name = match variant.shape.borrow().as_ref() {
                    Some(Type::Discretio { name, .. }) => name.clone(),
                    _ => String::new(),
                };
                let fields = variant_field_names(&variant.shape, &variant.variant);
                let payload = if variant.args.is_empty() {
                    "{}".to_string()
                } else {
                    let entries = variant
                        .args
                        .iter()
                        .enumerate()
                        .map(|(index, arg)| {
                            let value = self.expr(arg);
                            match fields.get(index) {
                                Some(field) => format!(".{field} = {value}"),
                                None => value,
                            }
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!(".{{{entries}}}")
                };
                if enum_name.is_empty() {
                    format!(".{{ .{} = {payload} }}", variant.variant)
                } else {
                    format!("{enum_name}{{ .{} = {payload} }}", variant.variant)
                }
            }
            Expression::Lambda(lambda) => {
                self.e.diagnostics.push(Diagnostic::warning(
                    ErrorCode::UnsupportedConstruct,
                    "closures have no Zig expression form",
                    lambda.position,
                ));
                "undefined /* lambda */".to_string()
            }
            Expression::Await(await_expr) => {
                // async lowers to synchronous evaluation
                self.expr(&await_expr.value)
            }
            Expression::Comptime(comptime) => {
                let value = self.expr(&comptime.value);
                format!("comptime ({value})")
            }
            Expression::Pipeline(pipeline) => {
                self.runtime();
                let source = self.expr(&pipeline.source);
                match pipeline.op {
                    PipelineOp::Prima => {
                        let count = pipeline
                            .count
                            .as_ref()
                            .map(|c| self.expr(c))
                            .unwrap_or_else(|| "1".to_string());
                        format!("faber.take({source}, {count})")
                    }
                    PipelineOp::Ultima => {
                        let count = pipeline
                            .count
                            .as_ref()
                            .map(|c| self.expr(c))
                            .unwrap_or_else(|| "1".to_string());
                        format!("faber.takeLast({source}, {count})")
                    }
                    PipelineOp::Summa => format!("faber.sum({source})"),
                }
            }
            Expression::Filter(filter) => {
                self.e.diagnostics.push(Diagnostic::warning(
                    ErrorCode::UnsupportedConstruct,
                    "ab/ubi filtering needs a closure; lowered to a runtime helper without one",
                    filter.position,
                ));
                self.runtime();
                let source = self.expr(&filter.source);
                format!("faber.filterAll({source}) /* ubi */")
            }
            Expression::RangeTest(test) => {
                let value = self.expr(&test.value);
                let low = self.expr(&test.low);
                let high = self.expr(&test.high);
                let comparison = if test.inclusive { "<=" } else { "<" };
                format!("({value} >= {low} and {value} {comparison} {high})")
            }
            Expression::Membership(membership) => {
                self.runtime();
                let value = self.expr(&membership.value);
                let collection = self.expr(&membership.collection);
                format!("faber.contains({collection}, {value})")
            }
        }
    }

    fn identifier(&mut self, name: &str) -> String {
        if let Some(value) = duration_constant(name) {
            return value.to_string();
        }
        match name {
            "PI" => {
                self.std();
                "std.math.pi".to_string()
            }
            "TAU" => {
                self.std();
                "std.math.tau".to_string()
            }
            "EULERUS" => {
                self.std();
                "std.math.e".to_string()
            }
            "radix" => {
                self.std();
                "std.math.sqrt".to_string()
            }
            "potentia" => {
                self.std();
                "std.math.pow".to_string()
            }
            other => other.to_string(),
        }
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
            self.std();
            let curator = self
                .curators
                .last()
                .map(|c| format!("{c}.allocator()"))
                .unwrap_or_else(|| "std.heap.page_allocator".to_string());
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
        let first = args.first().cloned().unwrap_or_default();
        let rendered = match (head, member.property.as_str()) {
            ("lista", "adde") => format!("{recv}.append({first}) catch unreachable"),
            ("lista", "demite") => format!("{recv}.pop()"),
            ("lista", "continet") => {
                self.runtime();
                format!("faber.contains({recv}.items, {first})")
            }
            ("tabula", "pone") => {
                let value = args.get(1).cloned().unwrap_or_default();
                format!("{recv}.put({first}, {value}) catch unreachable")
            }
            ("tabula", "accipe") => format!("{recv}.get({first})"),
            ("tabula", "dele") => format!("{recv}.remove({first})"),
            ("tabula", "habet") => format!("{recv}.contains({first})"),
            ("copia", "adde") => format!("{recv}.put({first}, {{}}) catch unreachable"),
            ("copia", "habet") => format!("{recv}.contains({first})"),
            ("copia", "dele") => format!("{recv}.remove({first})"),
            (_, "maiuscula") => {
                self.runtime();
                format!("faber.upper({recv})")
            }
            (_, "minuscula") => {
                self.runtime();
                format!("faber.lower({recv})")
            }
            (_, "recide") => {
                self.std();
                format!("std.mem.trim(u8, {recv}, \" \\t\\n\")")
            }
            (_, "scinde") => {
                self.runtime();
                format!("faber.split({recv}, {first})")
            }
            _ => return None,
        };
        Some(rendered)
    }

    fn member(&mut self, member: &MemberExpression) -> String {
        let object = self.expr(&member.object);
        let head = receiver_generic(&member.object);

        if member.property == "longitudo" {
            return match head.as_deref() {
                Some("lista") => format!("@as(i64, @intCast({object}.items.len))"),
                Some("tabula") | Some("copia") => {
                    format!("@as(i64, @intCast({object}.count()))")
                }
                _ => format!("@as(i64, @intCast({object}.len))"),
            };
        }
        if member.property == "caput" {
            return format!("{object}[0]");
        }
        if member.property == "cauda" {
            return format!("{object}[1..]");
        }

        format!("{object}.{}", member.property)
    }
}

fn zig_operator(operator: BinaryOperator) -> &'static str {
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
        BinaryOperator::NullCoalesce => "orelse",
    }
}

fn static_type_matches(ty: &Type, annotation: &TypeAnnotation) -> bool {
    match ty {
        Type::Primitive { name, .. } => name == &annotation.name,
        Type::Generic { name, .. } => name == &annotation.name,
        Type::User(name) => name == &annotation.name,
        Type::Unknown => true,
        _ => false,
    }
}
