//! Semantic analyzer behavior: forward references, error codes, scope
//! rules and the boundary cases the front end promises to handle.

use faber::diagnostics::{ErrorCode, Severity};
use faber::parser::ast::{Expression, Program, Statement};
use faber::parser::parse_source;
use faber::semantic::{analyze, Type};

fn analyzed(source: &str) -> (Program, Vec<faber::diagnostics::Diagnostic>) {
    let parsed = parse_source(source);
    assert!(
        parsed.diagnostics.is_empty(),
        "unexpected parse diagnostics: {:?}",
        parsed.diagnostics
    );
    let program = parsed.program.expect("program");
    let analysis = analyze(&program);
    (program, analysis.diagnostics)
}

fn initializer(program: &Program, index: usize) -> &Expression {
    match &program.statements[index] {
        Statement::Variable(decl) => &decl.initializer,
        other => panic!("expected variable declaration, got {other:?}"),
    }
}

#[test]
fn forward_reference_function_call_resolves() {
    let (program, diagnostics) = analyzed(
        "functio caller() -> numerus { redde callee(3) }\n\
         functio callee(numerus x) -> numerus { redde x * 2 }",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");

    // the call inside caller's redde resolved to the numeric return type
    let Statement::Function(caller) = &program.statements[0] else {
        panic!("expected function");
    };
    let Statement::Return(redde) = &caller.body.statements[0] else {
        panic!("expected redde");
    };
    let call = redde.value.as_ref().expect("redde value");
    assert_eq!(call.resolved_type(), Some(Type::numerus()));
}

#[test]
fn incompatible_comparison_reports_and_continues() {
    let (program, diagnostics) = analyzed("varia ok = \"abc\" > 5");
    assert_eq!(diagnostics.len(), 1, "{diagnostics:?}");
    assert_eq!(diagnostics[0].code, ErrorCode::IncompatibleComparison);

    // analysis continues: the comparison still types as bivalens
    assert_eq!(
        initializer(&program, 0).resolved_type(),
        Some(Type::bivalens())
    );
}

#[test]
fn borrowed_parameter_with_default_is_s011() {
    let (_, diagnostics) = analyzed("functio f(de textus s vel \"x\") {}");
    assert_eq!(diagnostics.len(), 1, "{diagnostics:?}");
    assert_eq!(diagnostics[0].code, ErrorCode::InvalidParameter);
    assert_eq!(diagnostics[0].code.code(), "S011");
}

#[test]
fn required_after_optional_is_s011() {
    let (_, diagnostics) = analyzed("functio f(numerus a vel 1, numerus b) {}");
    assert_eq!(diagnostics.len(), 1, "{diagnostics:?}");
    assert_eq!(diagnostics[0].code, ErrorCode::InvalidParameter);
}

#[test]
fn rest_parameter_may_follow_optional() {
    let (_, diagnostics) = analyzed("functio f(numerus a vel 1, ceteri numerus b) {}");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn variant_pattern_bindings_resolve_to_field_types() {
    let (program, diagnostics) = analyzed(
        "discretio Event { Click { numerus x, numerus y } Quit }\n\
         functio handle(Event e) {\n\
           discerne e {\n\
             casu Click pro x, y { scribe x + y }\n\
             casu Quit { redde }\n\
           }\n\
         }",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");

    let Statement::Function(handle) = &program.statements[1] else {
        panic!("expected function");
    };
    let Statement::VariantSwitch(switch) = &handle.body.statements[0] else {
        panic!("expected discerne");
    };
    let Statement::Print(print) = &switch.arms[0].body.statements[0] else {
        panic!("expected scribe");
    };
    // x + y where both bind to the Click fields
    assert_eq!(print.value.resolved_type(), Some(Type::numerus()));
}

#[test]
fn circular_type_alias_reported() {
    let (_, diagnostics) = analyzed("typus A = B\ntypus B = A");
    assert!(!diagnostics.is_empty());
    assert!(diagnostics
        .iter()
        .all(|d| d.code == ErrorCode::CircularTypeAlias));
}

#[test]
fn alias_chain_resolves_in_any_order() {
    let (_, diagnostics) = analyzed(
        "typus A = B\ntypus B = C\ntypus C = numerus\n\
         functio f(A a) -> numerus { redde a }",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn self_referential_alias_reported() {
    let (_, diagnostics) = analyzed("typus A = A");
    assert!(diagnostics
        .iter()
        .any(|d| d.code == ErrorCode::CircularTypeAlias));
}

#[test]
fn undefined_variable_is_s001() {
    let (_, diagnostics) = analyzed("varia x = ignotus");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, ErrorCode::UndefinedVariable);
    assert_eq!(diagnostics[0].code.code(), "S001");
}

#[test]
fn duplicate_definition_names_the_original_line() {
    let (_, diagnostics) = analyzed("varia x = 1\nvaria x = 2");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, ErrorCode::DuplicateDefinition);
    assert!(diagnostics[0].message.contains("line 1"), "{diagnostics:?}");
}

#[test]
fn immutable_assignment_is_s003() {
    let (_, diagnostics) = analyzed("fixum x = 1\nx = 2");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, ErrorCode::ImmutableAssignment);
}

#[test]
fn mutable_assignment_checks_types() {
    let (_, diagnostics) = analyzed("varia numerus x = 1\nx = \"textus\"");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, ErrorCode::TypeMismatch);
}

#[test]
fn return_outside_function_is_s006() {
    let (_, diagnostics) = analyzed("redde 5");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, ErrorCode::ReturnOutsideFunction);
}

#[test]
fn return_type_mismatch_is_s004() {
    let (_, diagnostics) = analyzed("functio f() -> numerus { redde \"malum\" }");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, ErrorCode::TypeMismatch);
}

#[test]
fn await_outside_async_is_s007() {
    let (_, diagnostics) = analyzed("functio f() { varia x = expecta aliquid() }");
    assert!(diagnostics
        .iter()
        .any(|d| d.code == ErrorCode::AwaitOutsideAsync));
}

#[test]
fn await_inside_async_function_is_fine() {
    let (_, diagnostics) = analyzed(
        "functio fiet lentum() -> promissum<numerus> { redde 1 }\n\
         functio fiet f() -> promissum<numerus> {\n\
           figendum x = lentum()\n\
           redde x + 1\n\
         }",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn figendum_outside_async_is_s007() {
    let (_, diagnostics) = analyzed("functio f() { figendum x = 1 }");
    assert!(diagnostics
        .iter()
        .any(|d| d.code == ErrorCode::AwaitOutsideAsync));
}

#[test]
fn mutual_recursion_type_checks() {
    let (_, diagnostics) = analyzed(
        "functio par(numerus n) -> bivalens {\n\
           si n == 0 { redde verum }\n\
           redde impar(n - 1)\n\
         }\n\
         functio impar(numerus n) -> bivalens {\n\
           si n == 0 { redde falsum }\n\
           redde par(n - 1)\n\
         }",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn empty_program_analyzes_cleanly() {
    let (program, diagnostics) = analyzed("");
    assert!(program.statements.is_empty());
    assert!(diagnostics.is_empty());
}

#[test]
fn empty_function_body_infers_void() {
    let (_, diagnostics) = analyzed("functio f() {}\nfunctio g() { f() }");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn single_member_declarations_accepted() {
    let (_, diagnostics) = analyzed(
        "ordo Unus { Solus }\n\
         discretio Una { Sola { numerus x } }\n\
         genus Unum { numerus solum }",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn empty_discretio_warns_but_continues() {
    let (_, diagnostics) = analyzed("discretio Vacua { }");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Warning);
}

#[test]
fn deeply_nested_parens_resolve() {
    let (program, diagnostics) = analyzed("varia x = ((((((42))))))");
    assert!(diagnostics.is_empty());
    assert_eq!(
        initializer(&program, 0).resolved_type(),
        Some(Type::numerus())
    );
}

#[test]
fn analysis_is_idempotent() {
    let parsed = parse_source("varia ok = \"abc\" > 5\nfixum x = 1\nx = 2");
    let program = parsed.program.expect("program");

    let first = analyze(&program).diagnostics;
    let second = analyze(&program).diagnostics;
    assert_eq!(first, second);
}

#[test]
fn enum_member_access_types_as_the_enum() {
    let (program, diagnostics) = analyzed("ordo Color { Ruber, Viridis }\nvaria c = Color.Ruber");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(
        initializer(&program, 1).resolved_type(),
        Some(Type::User("Color".to_string()))
    );
}

#[test]
fn genus_member_access_resolves_fields_and_methods() {
    let (_, diagnostics) = analyzed(
        "genus Punctum {\n\
           numerus x,\n\
           numerus y,\n\
           functio summa() -> numerus { redde ipse.x + ipse.y }\n\
         }\n\
         functio f(Punctum p) -> numerus { redde p.x + p.summa() }",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn unknown_genus_member_is_reported() {
    let (_, diagnostics) = analyzed(
        "genus Punctum { numerus x }\n\
         functio f(Punctum p) -> numerus { redde p.inexistens }",
    );
    assert!(diagnostics
        .iter()
        .any(|d| d.code == ErrorCode::UndefinedVariable));
}

#[test]
fn nihil_assigns_only_into_nullable() {
    let (_, diagnostics) = analyzed("varia numerus? licitum = nihil");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");

    let (_, diagnostics) = analyzed("varia numerus vetitum = nihil");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, ErrorCode::TypeMismatch);
}

#[test]
fn numeric_widening_accepts_narrow_into_wide() {
    let (_, diagnostics) = analyzed(
        "functio f(numerus<32> angustum) -> numerus { redde angustum }",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn call_argument_mismatch_is_s004() {
    let (_, diagnostics) = analyzed(
        "functio f(numerus x) -> numerus { redde x }\n\
         varia y = f(\"textus\")",
    );
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, ErrorCode::TypeMismatch);
}

#[test]
fn lambda_parameters_live_in_a_fresh_scope() {
    let (_, diagnostics) = analyzed(
        "varia duplica = (x) => x * 2\n\
         varia y = x",
    );
    // x escapes only inside the lambda; the second x is undefined
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, ErrorCode::UndefinedVariable);
}

#[test]
fn filter_binding_scoped_to_predicate() {
    let (_, diagnostics) = analyzed(
        "varia magna = ab [1, 2, 3] pro n ubi n > 1\n\
         varia post = n",
    );
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, ErrorCode::UndefinedVariable);
}

#[test]
fn stdlib_import_binds_specifiers() {
    let (_, diagnostics) = analyzed(
        "ex \"norma/math\" importa sin, cos\n\
         varia x = sin(1.0) + cos(2.0)",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn stdlib_wildcard_injects_everything() {
    let (_, diagnostics) = analyzed(
        "ex \"norma/math\" importa *\n\
         varia x = radix(9.0)",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn stdlib_missing_export_is_reported() {
    let (_, diagnostics) = analyzed("ex \"norma/math\" importa inexistens");
    assert!(diagnostics.iter().any(|d| d.code == ErrorCode::ModuleError));
}

#[test]
fn unknown_bare_module_passes_through() {
    let (_, diagnostics) = analyzed(
        "ex \"sodalicium-externum\" importa res\n\
         varia x = res",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn every_expression_gets_a_resolved_type() {
    let (program, _) = analyzed(
        "varia a = 1 + 2\n\
         varia b = `valor ${a}`\n\
         varia c = a intra 0..10 ? \"intus\" : \"foris\"\n\
         varia d = [a, 2, 3]\n\
         varia e = summa ex d",
    );

    for statement in &program.statements {
        let Statement::Variable(decl) = statement else {
            continue;
        };
        assert!(
            decl.initializer.resolved_type().is_some(),
            "initializer of {} left untyped",
            decl.name
        );
    }
}
