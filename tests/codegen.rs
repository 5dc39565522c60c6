//! Emission checks per target against the construct mapping tables.

use faber::codegen::{generate, Target};
use faber::parser::parse_source;
use faber::semantic::analyze;

fn emit(source: &str, target: Target) -> String {
    let parsed = parse_source(source);
    assert!(
        parsed.diagnostics.is_empty(),
        "parse diagnostics: {:?}",
        parsed.diagnostics
    );
    let program = parsed.program.expect("program");
    analyze(&program);
    generate(&program, target).source
}

const EVENT: &str = "discretio Event { Click { numerus x, numerus y } Quit }\n";

#[test]
fn cpp_null_coalesce_uses_pointer_test() {
    let out = emit("varia a = nihil\nvaria b = 2\nvaria c = a ?? b", Target::Cpp);
    assert!(out.contains("(a != nullptr ? a : b)"), "{out}");
}

#[test]
fn rust_null_coalesce_uses_unwrap_or() {
    let out = emit("varia a = nihil\nvaria b = 2\nvaria c = a ?? b", Target::Rust);
    assert!(out.contains("a.unwrap_or(b)"), "{out}");
}

#[test]
fn typescript_null_coalesce_passes_through() {
    let out = emit(
        "varia a = nihil\nvaria b = 2\nvaria c = a ?? b",
        Target::TypeScript,
    );
    assert!(out.contains("(a ?? b)"), "{out}");
}

#[test]
fn python_null_coalesce_uses_is_not_none() {
    let out = emit(
        "varia a = nihil\nvaria b = 2\nvaria c = a ?? b",
        Target::Python,
    );
    assert!(out.contains("(a if a is not None else b)"), "{out}");
}

#[test]
fn range_test_exclusive_and_inclusive() {
    let source = "varia x = 5\nvaria a = x intra 0..10\nvaria b = x intra 0..=10";
    let cpp = emit(source, Target::Cpp);
    assert!(cpp.contains("(x >= 0 && x < 10)"), "{cpp}");
    assert!(cpp.contains("(x >= 0 && x <= 10)"), "{cpp}");

    let py = emit(source, Target::Python);
    assert!(py.contains("(0 <= x < 10)"), "{py}");
    assert!(py.contains("(0 <= x <= 10)"), "{py}");
}

#[test]
fn membership_per_target() {
    let source = "varia seq = [1, 2, 3]\nvaria x = 2\nvaria intus = x inter seq";
    assert!(emit(source, Target::Cpp).contains("std::ranges::contains(seq, x)"));
    assert!(emit(source, Target::Rust).contains("seq.contains(&x)"));
    assert!(emit(source, Target::TypeScript).contains("seq.includes(x)"));
    assert!(emit(source, Target::Python).contains("(x in seq)"));
}

#[test]
fn variant_construction_per_target() {
    let source = &format!("{EVENT}varia e = finge Event.Click(1, 2)");
    assert!(emit(source, Target::Cpp).contains("Click{.x = 1, .y = 2}"));
    assert!(emit(source, Target::Rust).contains("Event::Click { x: 1, y: 2 }"));
    assert!(emit(source, Target::TypeScript).contains("{ tag: \"Click\", x: 1, y: 2 }"));
    assert!(emit(source, Target::Python).contains("Event_Click(x=1, y=2)"));
    assert!(emit(source, Target::Zig).contains("Event{ .Click = .{.x = 1, .y = 2} }"));
}

#[test]
fn string_concat_literal_promotes_in_cpp() {
    let out = emit(
        "functio saluta(textus nomen) -> textus { redde \"ave \" + nomen }",
        Target::Cpp,
    );
    assert!(out.contains("(std::string(\"ave \") + nomen)"), "{out}");
}

#[test]
fn template_string_per_target() {
    let source = "varia nomen = \"munde\"\nvaria s = `ave ${nomen}`";
    assert!(emit(source, Target::TypeScript).contains("`ave ${nomen}`"));
    assert!(emit(source, Target::Rust).contains("format!(\"ave {}\", nomen)"));
    assert!(emit(source, Target::Cpp).contains("std::format(\"ave {}\", nomen)"));
    assert!(emit(source, Target::Python).contains("f\"ave {nomen}\""));
}

#[test]
fn self_reference_per_target() {
    let source = "genus Punctum {\n\
                  numerus x,\n\
                  functio valor() -> numerus { redde ipse.x }\n\
                  }";
    assert!(emit(source, Target::Cpp).contains("this->x"));
    assert!(emit(source, Target::Rust).contains("self.x"));
    assert!(emit(source, Target::TypeScript).contains("this.x"));
    assert!(emit(source, Target::Python).contains("self.x"));
}

#[test]
fn value_switch_shapes() {
    let source = "varia x = 2\nelige x { casu 1, 2 { scribe 1 } ceterum { scribe 0 } }";
    let rust = emit(source, Target::Rust);
    assert!(rust.contains("match x {"), "{rust}");
    assert!(rust.contains("1 | 2 => {"), "{rust}");

    let cpp = emit(source, Target::Cpp);
    assert!(cpp.contains("if (discrimen == 1 || discrimen == 2) {"), "{cpp}");
}

#[test]
fn variant_switch_shapes() {
    let source = &format!(
        "{EVENT}functio handle(Event e) {{\n\
           discerne e {{\n\
             casu Click pro x, y {{ scribe x + y }}\n\
             casu Quit {{ redde }}\n\
           }}\n\
         }}"
    );
    let rust = emit(source, Target::Rust);
    assert!(rust.contains("match e {"), "{rust}");
    assert!(rust.contains("Event::Click { x, y } => {"), "{rust}");

    let cpp = emit(source, Target::Cpp);
    assert!(cpp.contains("std::holds_alternative<Click>(e)"), "{cpp}");

    let ts = emit(source, Target::TypeScript);
    assert!(ts.contains("switch ((e).tag) {"), "{ts}");
    assert!(ts.contains("case \"Click\":"), "{ts}");

    let py = emit(source, Target::Python);
    assert!(py.contains("isinstance(e, Event_Click)"), "{py}");

    let zig = emit(source, Target::Zig);
    assert!(zig.contains("switch (e) {"), "{zig}");
    assert!(zig.contains(".Click => |electum| {"), "{zig}");
}

#[test]
fn throw_mapping() {
    let source = "functio f() { iace \"malum\" }\nfunctio g() { mori \"peius\" }";
    let rust = emit(source, Target::Rust);
    assert!(rust.contains("return Err((\"malum\").into());"), "{rust}");
    assert!(rust.contains("panic!"), "{rust}");

    let cpp = emit(source, Target::Cpp);
    assert!(cpp.contains("throw \"malum\";"), "{cpp}");
    assert!(cpp.contains("throw \"peius\";"), "{cpp}");
}

#[test]
fn cura_arena_per_target() {
    let source = "cura arena a { scribe 1 }";
    assert!(emit(source, Target::Cpp).contains("faber::Arena a;"));
    assert!(emit(source, Target::Rust).contains("let mut a = Arena::new();"));
    assert!(emit(source, Target::TypeScript).contains("a.release();"));
    assert!(emit(source, Target::Python).contains("with Arena() as a:"));
    assert!(emit(source, Target::Zig)
        .contains("var a = std.heap.ArenaAllocator.init(std.heap.page_allocator);"));
}

#[test]
fn curator_injection_threads_the_arena() {
    let source = "functio operarius() {\n\
                  cura arena a { scribe 1 }\n\
                  }\n\
                  functio vocans() {\n\
                  cura arena b { operarius() }\n\
                  }";
    let cpp = emit(source, Target::Cpp);
    assert!(cpp.contains("operarius(b)"), "{cpp}");
}

#[test]
fn headers_are_deduplicated() {
    let source = "scribe 1\nscribe 2\nscribe 3";
    let cpp = emit(source, Target::Cpp);
    assert_eq!(cpp.matches("#include <iostream>").count(), 1, "{cpp}");
}

#[test]
fn rust_use_lines_are_alphabetized() {
    let source = "varia t = innatum tabula(1)\nvaria s = innatum copia(2)";
    let parsed = parse_source(source);
    let program = parsed.program.expect("program");
    analyze(&program);
    let module = generate(&program, Target::Rust);
    let sorted = {
        let mut headers = module.headers.clone();
        headers.sort();
        headers
    };
    assert_eq!(module.headers, sorted);
}

#[test]
fn intrinsic_constants_per_target() {
    let source = "ex \"norma\" importa PI\nvaria x = PI";
    assert!(emit(source, Target::Cpp).contains("std::numbers::pi"));
    assert!(emit(source, Target::Rust).contains("std::f64::consts::PI"));
    assert!(emit(source, Target::TypeScript).contains("Math.PI"));
    assert!(emit(source, Target::Python).contains("math.pi"));
}

#[test]
fn duration_constants_are_fixed_numbers() {
    let source = "ex \"norma\" importa SECUNDUM, HORA\nvaria s = SECUNDUM\nvaria h = HORA";
    for target in Target::all() {
        let out = emit(source, *target);
        assert!(out.contains("1000"), "{target}: {out}");
        assert!(out.contains("3600000"), "{target}: {out}");
    }
}

#[test]
fn collection_methods_dispatch_on_receiver_type() {
    let source = "varia xs = [1, 2]\n\
                  xs.adde(3)\n\
                  varia t = innatum tabula<textus, numerus>()\n\
                  t.pone(\"unus\", 1)";
    let ts = emit(source, Target::TypeScript);
    assert!(ts.contains("xs.push(3)"), "{ts}");
    assert!(ts.contains("t.set(\"unus\", 1)"), "{ts}");

    let py = emit(source, Target::Python);
    assert!(py.contains("xs.append(3)"), "{py}");

    let rust = emit(source, Target::Rust);
    assert!(rust.contains("xs.push(3)"), "{rust}");
    assert!(rust.contains("t.insert(\"unus\", 1)"), "{rust}");
}

#[test]
fn pipeline_and_filter_emission() {
    let source = "varia xs = [1, 2, 3]\n\
                  varia primae = prima 2 ex xs\n\
                  varia totum = summa ex xs\n\
                  varia magna = ab xs pro n ubi n > 1";
    let ts = emit(source, Target::TypeScript);
    assert!(ts.contains("xs.slice(0, 2)"), "{ts}");
    assert!(ts.contains("xs.reduce((a, b) => a + b, 0)"), "{ts}");
    assert!(ts.contains("xs.filter((n) => (n > 1))"), "{ts}");

    let py = emit(source, Target::Python);
    assert!(py.contains("xs[:2]"), "{py}");
    assert!(py.contains("sum(xs)"), "{py}");
    assert!(py.contains("[n for n in xs if (n > 1)]"), "{py}");
}

#[test]
fn entry_points_per_target() {
    let source = "fit { scribe 1 }";
    assert!(emit(source, Target::Cpp).contains("int main() {"));
    assert!(emit(source, Target::Rust).contains("fn main() {"));
    assert!(emit(source, Target::TypeScript).contains("__main();"));
    assert!(emit(source, Target::Python).contains("if __name__ == \"__main__\":"));
    assert!(emit(source, Target::Zig).contains("pub fn main() !void {"));
}

#[test]
fn async_entry_per_target() {
    let source = "fiet { scribe 1 }";
    assert!(emit(source, Target::TypeScript).contains("(async () => {"));
    assert!(emit(source, Target::Python).contains("asyncio.run(__main())"));
    assert!(emit(source, Target::Rust).contains("futures::executor::block_on(principale());"));
}

#[test]
fn test_constructs_per_target() {
    let source = "probatio \"calculi\" {\n\
                  ante { varia x = 1 }\n\
                  exemplum \"additio\" { adfirma 1 + 1 == 2 }\n\
                  }";
    let ts = emit(source, Target::TypeScript);
    assert!(ts.contains("describe(\"calculi\", () => {"), "{ts}");
    assert!(ts.contains("it(\"additio\", () => {"), "{ts}");
    assert!(ts.contains("beforeEach(() => {"), "{ts}");

    let py = emit(source, Target::Python);
    assert!(py.contains("class TestCalculi(unittest.TestCase):"), "{py}");
    assert!(py.contains("def test_additio(self):"), "{py}");
    assert!(py.contains("def setUp(self):"), "{py}");

    let rust = emit(source, Target::Rust);
    assert!(rust.contains("#[cfg(test)]"), "{rust}");
    assert!(rust.contains("#[test]"), "{rust}");

    let zig = emit(source, Target::Zig);
    assert!(zig.contains("test \"additio\" {"), "{zig}");
}

#[test]
fn unsupported_constructs_emit_diagnostic_and_placeholder() {
    let parsed = parse_source("varia x = praefixum 1 + 2");
    let program = parsed.program.expect("program");
    analyze(&program);

    let module = generate(&program, Target::Python);
    assert!(!module.diagnostics.is_empty());
    assert!(module.source.contains("# praefixum"), "{}", module.source);
}

#[test]
fn zig_praefixum_is_comptime() {
    let out = emit("varia x = praefixum 1 + 2", Target::Zig);
    assert!(out.contains("comptime"), "{out}");
}

#[test]
fn empty_program_emits_valid_output() {
    for target in Target::all() {
        let parsed = parse_source("");
        let program = parsed.program.expect("program");
        analyze(&program);
        let module = generate(&program, *target);
        assert!(module.diagnostics.is_empty(), "{target}");
        assert!(module.headers.is_empty(), "{target}");
    }
}
