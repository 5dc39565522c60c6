//! TypeScript emitter.
//!
//! The closest target to the source semantics: tagged unions become
//! discriminated object unions, template strings pass through, and the
//! null-coalescing and optional-chaining operators map one to one. Runtime
//! support (arenas, dispatch, ranges) is imported from `./faber_runtime`.

use crate::codegen::{
    bare_assignment, duration_constant, escape_string, format_float, genus_field_names,
    receiver_generic, variant_field_names, Emitter, GeneratedModule,
};
use crate::parser::ast::*;
use crate::semantic::Type;

pub struct TypeScriptGenerator {
    e: Emitter,
    /// innermost `cura` binding, threaded into curator-flagged calls
    curators: Vec<String>,
}

impl Default for TypeScriptGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeScriptGenerator {
    pub fn new() -> Self {
        TypeScriptGenerator {
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

    fn runtime(&mut self, name: &str) {
        self.e
            .require(format!("import {{ {name} }} from \"./faber_runtime\";"));
    }

    // --- types --------------------------------------------------------

    fn ann(&mut self, annotation: &TypeAnnotation) -> String {
        if let Some(function) = &annotation.function {
            let params = function
                .params
                .iter()
                .enumerate()
                .map(|(i, p)| format!("arg{i}: {}", self.ann(p)))
                .collect::<Vec<_>>()
                .join(", ");
            return format!("({params}) => {}", self.ann(&function.returns));
        }

        let mut base = match annotation.name.as_str() {
            "numerus" | "fractus" => "number".to_string(),
            "magnus" => "bigint".to_string(),
            "textus" => "string".to_string(),
            "bivalens" => "boolean".to_string(),
            "vacuum" => "void".to_string(),
            "nihil" => "null".to_string(),
            "lista" => format!("{}[]", self.type_param(annotation, 0)),
            "tabula" => format!(
                "Map<{}, {}>",
                self.type_param(annotation, 0),
                self.type_param(annotation, 1)
            ),
            "copia" => format!("Set<{}>", self.type_param(annotation, 0)),
            "promissum" => format!("Promise<{}>", self.type_param(annotation, 0)),
            "cursor" => format!("Iterable<{}>", self.type_param(annotation, 0)),
            "fluxus" => format!("AsyncIterable<{}>", self.type_param(annotation, 0)),
            other => other.to_string(),
        };

        if annotation.array {
            base = format!("{base}[]");
        }
        if annotation.nullable {
            base = format!("{base} | null");
        }
        for alternative in &annotation.alternatives {
            base = format!("{base} | {}", self.ann(alternative));
        }
        base
    }

    fn type_param(&mut self, annotation: &TypeAnnotation, index: usize) -> String {
        match annotation.params.get(index) {
            Some(TypeParam::Type(inner)) => self.ann(inner),
            Some(TypeParam::Width(_)) => "number".to_string(),
            None => "any".to_string(),
        }
    }

    fn ty(&mut self, ty: &Type) -> String {
        match ty {
            Type::Primitive { name, nullable, .. } => {
                let base = match name.as_str() {
                    "numerus" | "fractus" => "number",
                    "magnus" => "bigint",
                    "textus" => "string",
                    "bivalens" => "boolean",
                    "vacuum" => "void",
                    "nihil" => "null",
                    other => other,
                };
                if *nullable {
                    format!("{base} | null")
                } else {
                    base.to_string()
                }
            }
            Type::Generic {
                name,
                params,
                nullable,
            } => {
                let rendered: Vec<String> = params.iter().map(|p| self.ty(p)).collect();
                let base = match name.as_str() {
                    "lista" => format!("{}[]", rendered.first().cloned().unwrap_or_default()),
                    "tabula" => format!(
                        "Map<{}, {}>",
                        rendered.first().cloned().unwrap_or_default(),
                        rendered.get(1).cloned().unwrap_or_default()
                    ),
                    "copia" => format!("Set<{}>", rendered.first().cloned().unwrap_or_default()),
                    "promissum" => {
                        format!("Promise<{}>", rendered.first().cloned().unwrap_or_default())
                    }
                    "cursor" => {
                        format!("Iterable<{}>", rendered.first().cloned().unwrap_or_default())
                    }
                    "fluxus" => format!(
                        "AsyncIterable<{}>",
                        rendered.first().cloned().unwrap_or_default()
                    ),
                    other => format!("{other}<{}>", rendered.join(", ")),
                };
                if *nullable {
                    format!("{base} | null")
                } else {
                    base
                }
            }
            Type::Function {
                params, returns, ..
            } => {
                let params = params
                    .iter()
                    .enumerate()
                    .map(|(i, p)| format!("arg{i}: {}", self.ty(p)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({params}) => {}", self.ty(returns))
            }
            Type::Union(alternatives) => alternatives
                .iter()
                .map(|t| self.ty(t))
                .collect::<Vec<_>>()
                .join(" | "),
            Type::User(name) => name.clone(),
            Type::Enum { name, .. }
            | Type::Genus { name, .. }
            | Type::Pactum { name, .. }
            | Type::Discretio { name, .. } => name.clone(),
            Type::Unknown => "any".to_string(),
        }
    }

    fn declared_type(&mut self, annotation: &Option<TypeAnnotation>, value: &Expression) -> String {
        match annotation {
            Some(annotation) => self.ann(annotation),
            None => match value.resolved_type() {
                Some(ty) => self.ty(&ty),
                None => "any".to_string(),
            },
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
            Statement::Import(decl) => self.import_stmt(decl),
            Statement::DestructureImport(decl) => self.destructure_import(decl),
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
                self.e.open(format!("while ({condition}) {{"));
                self.block(&decl.body);
                self.e.close("}");
            }
            Statement::Iteration(decl) => self.iteration(decl),
            Statement::MutationContext(decl) => self.mutation_context(decl),
            Statement::ValueSwitch(decl) => self.value_switch(decl),
            Statement::VariantSwitch(decl) => self.variant_switch(decl),
            Statement::Guard(decl) => {
                let condition = self.expr(&decl.condition);
                self.e.open(format!("if (!({condition})) {{"));
                self.block(&decl.fallback);
                self.e.close("}");
            }
            Statement::Assert(decl) => {
                let condition = self.expr(&decl.condition);
                self.e.line(format!("console.assert({condition});"));
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
                self.e.line(format!("throw {value};"));
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
                let call = match decl.kind {
                    PrintKind::Scribe => "console.log",
                    PrintKind::Vide => "console.debug",
                    PrintKind::Mone => "console.warn",
                };
                self.e.line(format!("{call}({value});"));
            }
            Statement::Suite(decl) => {
                self.e
                    .open(format!("describe(\"{}\", () => {{", escape_string(&decl.name)));
                self.block(&decl.body);
                self.e.close("});");
            }
            Statement::Case(decl) => {
                self.e
                    .open(format!("it(\"{}\", () => {{", escape_string(&decl.name)));
                self.block(&decl.body);
                match decl.timeout_ms {
                    Some(timeout) => self.e.close(format!("}}, {timeout});")),
                    None => self.e.close("});"),
                }
            }
            Statement::Fixture(decl) => {
                let hook = match (decl.kind, decl.all) {
                    (FixtureKind::Ante, false) => "beforeEach",
                    (FixtureKind::Ante, true) => "beforeAll",
                    (FixtureKind::Post, false) => "afterEach",
                    (FixtureKind::Post, true) => "afterAll",
                };
                self.e.open(format!("{hook}(() => {{"));
                self.block(&decl.body);
                self.e.close("});");
            }
            Statement::Cura(decl) => self.cura(decl),
            Statement::Dispatch(decl) => self.dispatch(decl),
            Statement::Expression(decl) => {
                let rendered = self.expr(&decl.expression);
                self.e.line(format!("{rendered};"));
            }
        }
    }

    fn import_stmt(&mut self, decl: &ImportStatement) {
        if crate::semantic::stdlib::is_stdlib(&decl.module) {
            // stdlib bindings become intrinsics at their use sites
            return;
        }
        self.e
            .require(format!("import \"{}\";", escape_string(&decl.module)));
    }

    fn destructure_import(&mut self, decl: &DestructureImport) {
        if crate::semantic::stdlib::is_stdlib(&decl.module) {
            return;
        }
        let module = escape_string(&decl.module);
        if decl.wildcard {
            self.e
                .require(format!("import * as __modulus from \"{module}\";"));
        } else {
            self.e.require(format!(
                "import {{ {} }} from \"{module}\";",
                decl.specifiers.join(", ")
            ));
        }
    }

    fn variable(&mut self, decl: &VariableDeclaration) {
        for comment in &decl.leading_comments {
            self.e.line(format!("// {comment}"));
        }
        let keyword = if decl.kind.is_mutable() { "let" } else { "const" };
        let ty = self.declared_type(&decl.annotation, &decl.initializer);
        let mut value = self.expr(&decl.initializer);
        if decl.kind.is_async() {
            value = format!("await {value}");
        }
        self.e
            .line(format!("{keyword} {}: {ty} = {value};", decl.name));
    }

    fn parameters(&mut self, params: &[Parameter]) -> String {
        params
            .iter()
            .map(|p| {
                let ty = match &p.annotation {
                    Some(annotation) => self.ann(annotation),
                    None => "any".to_string(),
                };
                let mut rendered = if p.rest {
                    format!("...{}: {ty}[]", p.name)
                } else {
                    format!("{}: {ty}", p.name)
                };
                if let Some(default) = &p.default {
                    let default = self.expr(default);
                    rendered = format!("{rendered} = {default}");
                }
                rendered
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn function(&mut self, decl: &FunctionDeclaration, method: bool) {
        for comment in &decl.leading_comments {
            self.e.line(format!("// {comment}"));
        }
        let params = self.parameters(&decl.params);
        let returns = match &decl.return_annotation {
            Some(annotation) => self.ann(annotation),
            None => "void".to_string(),
        };
        let returns = if decl.is_async {
            format!("Promise<{returns}>")
        } else {
            returns
        };

        let keyword = match (method, decl.is_async) {
            (true, true) => "async ".to_string(),
            (true, false) => String::new(),
            (false, true) => "async function ".to_string(),
            (false, false) => "function ".to_string(),
        };
        self.e
            .open(format!("{keyword}{}({params}): {returns} {{", decl.name));
        self.block(&decl.body);
        self.e.close("}");
    }

    fn ordo(&mut self, decl: &OrdoDeclaration) {
        for comment in &decl.leading_comments {
            self.e.line(format!("// {comment}"));
        }
        self.e.open(format!("enum {} {{", decl.name));
        for member in &decl.members {
            match &member.value {
                Some(LiteralValue::Integer(value)) => {
                    self.e.line(format!("{} = {value},", member.name))
                }
                Some(LiteralValue::String(value)) => self
                    .e
                    .line(format!("{} = \"{}\",", member.name, escape_string(value))),
                _ => self.e.line(format!("{},", member.name)),
            }
        }
        self.e.close("}");
    }

    fn genus(&mut self, decl: &GenusDeclaration) {
        for comment in &decl.leading_comments {
            self.e.line(format!("// {comment}"));
        }
        let implements = if decl.implements.is_empty() {
            String::new()
        } else {
            format!(" implements {}", decl.implements.join(", "))
        };
        self.e.open(format!("class {}{implements} {{", decl.name));

        for field in &decl.fields {
            let ty = self.ann(&field.annotation);
            let prefix = if field.is_static { "static " } else { "" };
            match &field.default {
                Some(default) => {
                    let default = self.expr(default);
                    self.e
                        .line(format!("{prefix}{}: {ty} = {default};", field.name));
                }
                None => self.e.line(format!("{prefix}{}: {ty};", field.name)),
            }
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
            self.e.open(format!("constructor({params}) {{"));
            for field in &instance_fields {
                self.e
                    .line(format!("this.{} = {};", field.name, field.name));
            }
            self.e.close("}");
        }

        for method in &decl.methods {
            if method.is_static {
                // emitted as a static method with the same body
                let params = self.parameters(&method.function.params);
                let returns = match &method.function.return_annotation {
                    Some(annotation) => self.ann(annotation),
                    None => "void".to_string(),
                };
                self.e.open(format!(
                    "static {}({params}): {returns} {{",
                    method.function.name
                ));
                self.block(&method.function.body);
                self.e.close("}");
            } else {
                self.function(&method.function, true);
            }
        }

        self.e.close("}");
    }

    fn pactum(&mut self, decl: &PactumDeclaration) {
        for comment in &decl.leading_comments {
            self.e.line(format!("// {comment}"));
        }
        self.e.open(format!("interface {} {{", decl.name));
        for method in &decl.methods {
            let params = self.parameters(&method.params);
            let returns = match &method.return_annotation {
                Some(annotation) => self.ann(annotation),
                None => "void".to_string(),
            };
            self.e.line(format!("{}({params}): {returns};", method.name));
        }
        self.e.close("}");
    }

    fn discretio(&mut self, decl: &DiscretioDeclaration) {
        for comment in &decl.leading_comments {
            self.e.line(format!("// {comment}"));
        }
        let variants = decl
            .variants
            .iter()
            .map(|variant| {
                let mut fields = vec![format!("tag: \"{}\"", variant.name)];
                for (name, annotation) in &variant.fields {
                    fields.push(format!("{name}: {}", self.ann(annotation)));
                }
                format!("{{ {} }}", fields.join(", "))
            })
            .collect::<Vec<_>>();

        if variants.is_empty() {
            self.e.line(format!("type {} = never;", decl.name));
        } else {
            self.e
                .line(format!("type {} = {};", decl.name, variants.join(" | ")));
        }
    }

    fn if_stmt(&mut self, decl: &IfStatement) {
        if decl.catch.is_some() {
            self.e.open("try {");
        }

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
            self.e.close(format!("}} catch ({}) {{", catch.binding));
            self.e.indent += 1;
            self.block(&catch.block);
            self.e.close("}");
        }
    }

    fn iteration(&mut self, decl: &IterationStatement) {
        let iterable = self.expr(&decl.iterable);
        let keyword = if decl.kind == IterationKind::In {
            "let"
        } else {
            "const"
        };
        let header = if decl.is_async {
            format!("for await ({keyword} {} of {iterable}) {{", decl.binding)
        } else {
            format!("for ({keyword} {} of {iterable}) {{", decl.binding)
        };
        self.e.open(header);
        self.block(&decl.body);
        self.e.close("}");
    }

    fn mutation_context(&mut self, decl: &MutationContext) {
        let target = self.expr(&decl.target);
        let fields = genus_field_names(&decl.shape);

        self.e.open("{");
        self.e.line(format!("const __subiectum = {target};"));
        for statement in &decl.body.statements {
            if let Some((name, value)) = bare_assignment(statement) {
                if fields.contains(&name) {
                    let value = self.expr(value);
                    self.e.line(format!("__subiectum.{name} = {value};"));
                    continue;
                }
            }
            self.stmt(statement);
        }
        self.e.close("}");
    }

    fn value_switch(&mut self, decl: &ValueSwitch) {
        let discriminant = self.expr(&decl.discriminant);
        self.e.open(format!("switch ({discriminant}) {{"));
        for arm in &decl.arms {
            for value in &arm.values {
                let value = self.expr(value);
                self.e.line(format!("case {value}:"));
            }
            self.e.open("{");
            self.block(&arm.body);
            self.e.line("break;");
            self.e.close("}");
        }
        if let Some(default) = &decl.default {
            self.e.open("default: {");
            self.block(default);
            self.e.close("}");
        }
        self.e.close("}");
    }

    fn variant_switch(&mut self, decl: &VariantSwitch) {
        if decl.discriminants.len() > 1 {
            self.variant_switch_multi(decl);
            return;
        }

        let discriminant = self.expr(&decl.discriminants[0]);
        self.e.open(format!("switch (({discriminant}).tag) {{"));

        for arm in &decl.arms {
            if arm.variants.iter().any(|v| v == "_") {
                self.e.open("default: {");
                self.variant_bindings(&arm.bindings, &discriminant, None, &decl.shape);
                self.block(&arm.body);
                self.e.close("}");
                continue;
            }

            for variant in &arm.variants {
                self.e.line(format!("case \"{variant}\":"));
            }
            self.e.open("{");
            self.variant_bindings(
                &arm.bindings,
                &discriminant,
                arm.variants.first().map(|s| s.as_str()),
                &decl.shape,
            );
            self.block(&arm.body);
            self.e.line("break;");
            self.e.close("}");
        }

        if let Some(default) = &decl.default {
            self.e.open("default: {");
            self.block(default);
            self.e.close("}");
        }
        self.e.close("}");
    }

    fn variant_switch_multi(&mut self, decl: &VariantSwitch) {
        let discriminants: Vec<String> =
            decl.discriminants.iter().map(|d| self.expr(d)).collect();

        let mut first = true;
        for arm in &decl.arms {
            let condition = discriminants
                .iter()
                .zip(arm.variants.iter())
                .filter(|(_, variant)| variant.as_str() != "_")
                .map(|(d, variant)| format!("({d}).tag === \"{variant}\""))
                .collect::<Vec<_>>()
                .join(" && ");
            let condition = if condition.is_empty() {
                "true".to_string()
            } else {
                condition
            };

            let keyword = if first { "if" } else { "} else if" };
            if first {
                self.e.open(format!("{keyword} ({condition}) {{"));
            } else {
                self.e.close(format!("{keyword} ({condition}) {{"));
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

    fn variant_bindings(
        &mut self,
        bindings: &VariantBindings,
        discriminant: &str,
        variant: Option<&str>,
        shape: &TypeSlot,
    ) {
        match bindings {
            VariantBindings::None => {}
            VariantBindings::Alias(name) => {
                self.e.line(format!("const {name} = {discriminant};"));
            }
            VariantBindings::Positional(names) => {
                let fields = variant
                    .map(|v| variant_field_names(shape, v))
                    .unwrap_or_default();
                for (index, name) in names.iter().enumerate() {
                    match fields.get(index) {
                        Some(field) => self.e.line(format!(
                            "const {name} = ({discriminant} as any).{field};"
                        )),
                        None => self
                            .e
                            .line(format!("const {name} = ({discriminant} as any);")),
                    }
                }
            }
        }
    }

    fn try_stmt(&mut self, decl: &TryStatement) {
        self.e.open("try {");
        self.block(&decl.body);
        if let Some(catch) = &decl.catch {
            self.e.close(format!("}} catch ({}) {{", catch.binding));
            self.e.indent += 1;
            self.block(&catch.block);
        }
        if let Some(finally) = &decl.finally {
            self.e.close("} finally {");
            self.e.indent += 1;
            self.block(finally);
        }
        self.e.close("}");
    }

    fn entry(&mut self, decl: &EntryStatement) {
        if decl.is_async {
            self.e.open("(async () => {");
            self.block(&decl.body);
            self.e.close("})();");
        } else {
            self.e.open("function __main(): void {");
            self.block(&decl.body);
            self.e.close("}");
            self.e.line("__main();");
        }
    }

    fn cura(&mut self, decl: &CuraStatement) {
        let acquisition = match &decl.curator {
            CuratorKind::Arena => {
                self.runtime("Arena");
                "new Arena()".to_string()
            }
            CuratorKind::Pagina => {
                self.runtime("Pagina");
                "new Pagina()".to_string()
            }
            CuratorKind::Generic(resource) => self.expr(resource),
        };

        self.e.open("{");
        self.e
            .line(format!("const {} = {acquisition};", decl.binding));
        self.e.open("try {");
        self.curators.push(decl.binding.clone());
        self.block(&decl.body);
        self.curators.pop();
        if let Some(catch) = &decl.catch {
            self.e.close(format!("}} catch ({}) {{", catch.binding));
            self.e.indent += 1;
            self.block(&catch.block);
        }
        self.e.close("} finally {");
        self.e.indent += 1;
        self.e.line(format!("{}.release();", decl.binding));
        self.e.close("}");
        self.e.close("}");
    }

    fn dispatch(&mut self, decl: &DispatchStatement) {
        let helper = if decl.verb.map(|v| v.is_async()).unwrap_or(false) {
            self.runtime("faberDispatch");
            "faberDispatch"
        } else {
            self.runtime("faberDispatchSync");
            "faberDispatchSync"
        };
        let args = decl
            .args
            .iter()
            .map(|a| self.expr(a))
            .collect::<Vec<_>>()
            .join(", ");
        let call = format!(
            "{helper}(\"{}\", [{args}])",
            escape_string(&decl.target)
        );
        let call = if decl.verb.map(|v| v.is_async()).unwrap_or(false) {
            format!("await {call}")
        } else {
            call
        };

        if decl.catch.is_some() {
            self.e.open("try {");
        }

        match (&decl.binding, &decl.body) {
            (Some(binding), Some(body)) => {
                self.e.open("{");
                self.e.line(format!("const {binding} = {call};"));
                self.block(body);
                self.e.close("}");
            }
            (Some(binding), None) => {
                self.e.line(format!("const {binding} = {call};"));
            }
            (None, Some(body)) => {
                self.e.line(format!("{call};"));
                self.e.open("{");
                self.block(body);
                self.e.close("}");
            }
            (None, None) => self.e.line(format!("{call};")),
        }

        if let Some(catch) = &decl.catch {
            self.e.close(format!("}} catch ({}) {{", catch.binding));
            self.e.indent += 1;
            self.block(&catch.block);
            self.e.close("}");
        }
    }

    // --- expressions --------------------------------------------------

    fn exprs(&mut self, expressions: &[Expression]) -> Vec<String> {
        expressions.iter().map(|e| self.expr(e)).collect()
    }

    fn expr(&mut self, expression: &Expression) -> String {
        match expression {
            Expression::Identifier(id) => self.identifier(&id.name),
            Expression::SelfRef(_) => "this".to_string(),
            Expression::Literal(literal) => match &literal.value {
                LiteralValue::String(value) => format!("\"{}\"", escape_string(value)),
                LiteralValue::Integer(value) => value.to_string(),
                LiteralValue::Float(value) => format_float(*value),
                LiteralValue::BigInt(digits) => format!("{digits}n"),
                LiteralValue::Boolean(value) => value.to_string(),
                LiteralValue::Null => "null".to_string(),
            },
            Expression::TemplateString(template) => {
                let mut rendered = String::from("`");
                for part in &template.parts {
                    match part {
                        TemplatePart::Text(text) => rendered.push_str(text),
                        TemplatePart::Interpolation(inner) => {
                            let inner = self.expr(inner);
                            rendered.push_str(&format!("${{{inner}}}"));
                        }
                    }
                }
                rendered.push('`');
                rendered
            }
            Expression::FormatString(format) => {
                let fmt = self.expr(&format.format);
                let args = self.exprs(&format.args).join(", ");
                self.runtime("faberFormat");
                format!("faberFormat({fmt}, [{args}])")
            }
            Expression::Regex(regex) => {
                format!("new RegExp(\"{}\")", escape_string(&regex.pattern))
            }
            Expression::ReadInput(read) => {
                self.runtime("faberReadLine");
                match &read.prompt {
                    Some(prompt) => {
                        let prompt = self.expr(prompt);
                        format!("faberReadLine({prompt})")
                    }
                    None => "faberReadLine()".to_string(),
                }
            }
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
                        format!("{}: {value}", entry.key)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{ {entries} }}")
            }
            Expression::Range(range) => {
                self.runtime("faberRange");
                let start = self.expr(&range.start);
                let end = self.expr(&range.end);
                format!("faberRange({start}, {end}, {})", range.inclusive)
            }
            Expression::Binary(binary) => {
                let lhs = self.expr(&binary.lhs);
                let rhs = self.expr(&binary.rhs);
                format!("({lhs} {} {rhs})", ts_operator(binary.operator))
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
                format!("({condition} ? {consequent} : {alternative})")
            }
            Expression::Assignment(assignment) => self.assignment(assignment),
            Expression::TypeCheck(check) => {
                let value = self.expr(&check.value);
                match check.annotation.name.as_str() {
                    "numerus" | "fractus" => format!("(typeof {value} === \"number\")"),
                    "magnus" => format!("(typeof {value} === \"bigint\")"),
                    "textus" => format!("(typeof {value} === \"string\")"),
                    "bivalens" => format!("(typeof {value} === \"boolean\")"),
                    "nihil" => format!("({value} === null)"),
                    name => format!("({value} instanceof {name})"),
                }
            }
            Expression::Cast(cast) => {
                let value = self.expr(&cast.value);
                let ty = self.ann(&cast.annotation);
                format!("({value} as {ty})")
            }
            Expression::Conversion(conversion) => {
                let value = self.expr(&conversion.value);
                match conversion.kind {
                    ConversionKind::Numeratum => format!("Math.trunc(Number({value}))"),
                    ConversionKind::Textatum => format!("String({value})"),
                    ConversionKind::Fractatum => format!("Number({value})"),
                    ConversionKind::Bivalentum => format!("Boolean({value})"),
                }
            }
            Expression::Native(native) => {
                let args = self.exprs(&native.args).join(", ");
                match native.target_type.name.as_str() {
                    "lista" => format!("[{args}]"),
                    "tabula" => format!("new Map([{args}])"),
                    "copia" => format!("new Set([{args}])"),
                    name => format!("new {name}({args})"),
                }
            }
            Expression::Call(call) => self.call(call),
            Expression::Member(member) => self.member(member),
            Expression::Index(index) => {
                let object = self.expr(&index.object);
                let key = self.expr(&index.index);
                if receiver_generic(&index.object) == Some("tabula".to_string()) {
                    format!("{object}.get({key})")
                } else {
                    format!("{object}[{key}]")
                }
            }
            Expression::New(new) => {
                let args = self.exprs(&new.args).join(", ");
                format!("new {}({args})", new.type_name)
            }
            Expression::Variant(variant) => {
                let fields = variant_field_names(&variant.shape, &variant.variant);
                let mut entries = vec![format!("tag: \"{}\"", variant.variant)];
                for (index, arg) in variant.args.iter().enumerate() {
                    let value = self.expr(arg);
                    match fields.get(index) {
                        Some(field) => entries.push(format!("{field}: {value}")),
                        None => entries.push(format!("campus{index}: {value}")),
                    }
                }
                format!("{{ {} }}", entries.join(", "))
            }
            Expression::Lambda(lambda) => {
                let params = self.parameters(&lambda.params);
                let prefix = if lambda.is_async { "async " } else { "" };
                match &lambda.body {
                    LambdaBody::Expression(body) => {
                        let body = self.expr(body);
                        format!("{prefix}({params}) => {body}")
                    }
                    LambdaBody::Block(block) => {
                        let mut nested = TypeScriptGenerator::new();
                        nested.e.indent = self.e.indent + 1;
                        nested.block(block);
                        let body = nested.e.out;
                        for header in nested.e.headers {
                            self.e.require(header);
                        }
                        self.e.diagnostics.append(&mut nested.e.diagnostics);
                        let indent = "    ".repeat(self.e.indent);
                        format!("{prefix}({params}) => {{\n{body}{indent}}}")
                    }
                }
            }
            Expression::Await(await_expr) => {
                let value = self.expr(&await_expr.value);
                format!("await {value}")
            }
            Expression::Comptime(comptime) => {
                self.e.diagnostics.push(crate::diagnostics::Diagnostic::warning(
                    crate::diagnostics::ErrorCode::UnsupportedConstruct,
                    "praefixum has no compile-time evaluation on TypeScript",
                    comptime.position,
                ));
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
                        format!("{source}.slice(0, {count})")
                    }
                    PipelineOp::Ultima => {
                        let count = pipeline
                            .count
                            .as_ref()
                            .map(|c| self.expr(c))
                            .unwrap_or_else(|| "1".to_string());
                        format!("{source}.slice(-{count})")
                    }
                    PipelineOp::Summa => {
                        format!("{source}.reduce((a, b) => a + b, 0)")
                    }
                }
            }
            Expression::Filter(filter) => {
                let source = self.expr(&filter.source);
                let predicate = self.expr(&filter.predicate);
                format!("{source}.filter(({}) => {predicate})", filter.binding)
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
                match receiver_generic(&membership.collection).as_deref() {
                    Some("copia") | Some("tabula") => format!("{collection}.has({value})"),
                    _ => format!("{collection}.includes({value})"),
                }
            }
        }
    }

    fn identifier(&mut self, name: &str) -> String {
        if let Some(value) = duration_constant(name) {
            return value.to_string();
        }
        match name {
            "PI" => "Math.PI".to_string(),
            "TAU" => "(2 * Math.PI)".to_string(),
            "EULERUS" => "Math.E".to_string(),
            "sin" => "Math.sin".to_string(),
            "cos" => "Math.cos".to_string(),
            "tan" => "Math.tan".to_string(),
            "radix" => "Math.sqrt".to_string(),
            "potentia" => "Math.pow".to_string(),
            "absolutus" => "Math.abs".to_string(),
            "tectum" => "Math.ceil".to_string(),
            "solum" => "Math.floor".to_string(),
            "alea" => "Math.random".to_string(),
            "nunc" => "Date.now".to_string(),
            other => other.to_string(),
        }
    }

    fn assignment(&mut self, assignment: &AssignmentExpression) -> String {
        // map-index stores go through Map.set
        if let Expression::Index(index) = &assignment.target {
            if receiver_generic(&index.object) == Some("tabula".to_string()) {
                let object = self.expr(&index.object);
                let key = self.expr(&index.index);
                let value = self.expr(&assignment.value);
                return format!("{object}.set({key}, {value})");
            }
        }

        let target = self.expr(&assignment.target);
        let value = self.expr(&assignment.value);
        format!("{target} = {value}")
    }

    fn call(&mut self, call: &CallExpression) -> String {
        let args = self.exprs(&call.args);

        // collection method dispatch keyed on the receiver's generic head
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
                .unwrap_or_else(|| "undefined".to_string());
            args.push(curator);
        }
        let args = args.join(", ");

        if call.optional_chain {
            format!("{callee}?.({args})")
        } else if call.non_null {
            format!("{callee}!({args})")
        } else {
            format!("{callee}({args})")
        }
    }

    fn collection_method(
        &mut self,
        member: &MemberExpression,
        head: &str,
        args: &[String],
    ) -> Option<String> {
        let recv = self.expr(&member.object);
        let joined = args.join(", ");
        let rendered = match (head, member.property.as_str()) {
            ("lista", "adde") => format!("{recv}.push({joined})"),
            ("lista", "demite") => format!("{recv}.pop()"),
            ("lista", "continet") => format!("{recv}.includes({joined})"),
            ("lista", "inverte") => format!("[...{recv}].reverse()"),
            ("lista", "ordina") => format!("[...{recv}].sort()"),
            ("lista", "iunge") => format!("{recv}.join({joined})"),
            ("tabula", "pone") => format!("{recv}.set({joined})"),
            ("tabula", "accipe") => format!("{recv}.get({joined})"),
            ("tabula", "dele") => format!("{recv}.delete({joined})"),
            ("tabula", "habet") => format!("{recv}.has({joined})"),
            ("tabula", "claves") => format!("[...{recv}.keys()]"),
            ("tabula", "valores") => format!("[...{recv}.values()]"),
            ("copia", "adde") => format!("{recv}.add({joined})"),
            ("copia", "habet") => format!("{recv}.has({joined})"),
            ("copia", "dele") => format!("{recv}.delete({joined})"),
            (_, "maiuscula") => format!("{recv}.toUpperCase()"),
            (_, "minuscula") => format!("{recv}.toLowerCase()"),
            (_, "recide") => format!("{recv}.trim()"),
            (_, "scinde") => format!("{recv}.split({joined})"),
            _ => return None,
        };
        Some(rendered)
    }

    fn member(&mut self, member: &MemberExpression) -> String {
        let object = self.expr(&member.object);
        let head = receiver_generic(&member.object);

        if member.property == "longitudo" {
            return match head.as_deref() {
                Some("tabula") | Some("copia") => format!("{object}.size"),
                _ => format!("{object}.length"),
            };
        }
        if member.property == "caput" {
            return format!("{object}[0]");
        }
        if member.property == "cauda" {
            return format!("{object}.slice(1)");
        }

        let accessor = if member.optional_chain {
            "?."
        } else if member.non_null {
            "!."
        } else {
            "."
        };
        format!("{object}{accessor}{}", member.property)
    }
}

fn ts_operator(operator: BinaryOperator) -> &'static str {
    match operator {
        BinaryOperator::Add => "+",
        BinaryOperator::Subtract => "-",
        BinaryOperator::Multiply => "*",
        BinaryOperator::Divide => "/",
        BinaryOperator::Modulo => "%",
        BinaryOperator::Equals => "===",
        BinaryOperator::NotEquals => "!==",
        BinaryOperator::LessThan => "<",
        BinaryOperator::LessOrEqual => "<=",
        BinaryOperator::GreaterThan => ">",
        BinaryOperator::GreaterOrEqual => ">=",
        BinaryOperator::And => "&&",
        BinaryOperator::Or => "||",
        BinaryOperator::NullCoalesce => "??",
    }
}
