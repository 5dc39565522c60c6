//! End-to-end pipeline runs: a feature-rich program compiles for every
//! target without errors, and the public entry points compose.

use faber::codegen::Target;
use faber::compile;
use faber::diagnostics::Severity;

const PROGRAM: &str = r#"
ex "norma/math" importa radix

// figurae planae
pactum Forma {
    functio area() -> fractus
}

genus Rectangulum implet Forma {
    fractus latitudo,
    fractus altitudo,
    functio area() -> fractus { redde ipse.latitudo * ipse.altitudo }
}

ordo Color { Ruber, Viridis = 3, Caeruleus }

discretio Eventus {
    Click { numerus x, numerus y }
    Pressum { textus clavis }
    Quit
}

typus Index = numerus

functio describe(Eventus e) -> textus {
    discerne e {
        casu Click pro x, y {
            redde `punctum ${x}, ${y}`
        }
        casu Pressum pro clavis {
            redde clavis
        }
        casu Quit {
            redde "finis"
        }
    }
    redde "ignotum"
}

functio hypotenusa(fractus a, fractus b) -> fractus {
    redde radix(a * a + b * b)
}

functio numera(numerus limes) -> numerus {
    varia summa_ = 0
    pro n ex 0..limes {
        si n % 2 == 0 {
            summa_ = summa_ + n
        } secus {
            perge
        }
    }
    redde summa_
}

fit {
    fixum eventus = finge Eventus.Click(3, 4)
    scribe describe(eventus)

    varia numeri = [1, 2, 3, 4]
    numeri.adde(5)
    varia magni = ab numeri pro n ubi n > 2
    varia totum = summa ex numeri
    scribe totum

    dum totum > 10 {
        rumpe
    }

    elige totum {
        casu 15 { scribe "quindecim" }
        ceterum { mone "inexspectatum" }
    }

    custodi totum intra 0..100 secus {
        mori "extra fines"
    }

    cura arena memoria {
        vide hypotenusa(3.0, 4.0)
    }
}
"#;

#[test]
fn rich_program_compiles_for_every_target() {
    for target in Target::all() {
        let result = compile(PROGRAM, *target);
        let errors: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect();
        assert!(errors.is_empty(), "{target}: {errors:?}");

        let module = result.output.expect("output");
        assert!(!module.source.is_empty(), "{target}");
    }
}

#[test]
fn diagnostics_carry_positions_for_rendering() {
    let source = "varia ok = \"abc\" > 5";
    let result = compile(source, Target::TypeScript);
    assert_eq!(result.diagnostics.len(), 1);

    let rendered = result.diagnostics[0].render_with_source(source);
    assert!(rendered.contains("S005"), "{rendered}");

    let plain = result.diagnostics[0].render();
    assert!(plain.starts_with("S005"), "{plain}");
}

#[test]
fn parse_failure_still_returns_diagnostics() {
    let result = compile("functio } {", Target::Rust);
    assert!(result.has_errors());
}

#[test]
fn header_manifest_is_sorted_and_deduplicated() {
    let result = compile(
        "varia a = innatum tabula<textus, numerus>()\n\
         varia b = innatum tabula<textus, textus>()\n\
         scribe 1",
        Target::Rust,
    );
    let module = result.output.expect("output");
    let mut sorted = module.headers.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(module.headers, sorted);
}

#[test]
fn empty_source_yields_empty_valid_module() {
    for target in Target::all() {
        let result = compile("", *target);
        assert!(!result.has_errors(), "{target}");
        let module = result.output.expect("output");
        assert!(module.headers.is_empty(), "{target}");
    }
}
