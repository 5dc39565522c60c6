use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use log::LevelFilter;

use faber::codegen::Target;
use faber::diagnostics::Severity;
use faber::parser::parse_source;
use faber::semantic::ModuleContext;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Faber source file to compile
    file: PathBuf,

    /// Target language: cpp, rust, typescript, python or zig
    #[arg(short, long, default_value = "typescript")]
    target: String,

    /// Write the emitted source here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Dump the parsed AST as JSON and exit
    #[arg(long)]
    ast_dump: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .context("failed to initialize the logger")?;

    let source = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;
    let target: Target = cli
        .target
        .parse()
        .map_err(anyhow::Error::msg)
        .context("invalid --target")?;

    if cli.ast_dump {
        let parsed = parse_source(&source);
        for diagnostic in &parsed.diagnostics {
            eprintln!("{}", diagnostic.render_with_source(&source));
        }
        let Some(program) = parsed.program else {
            bail!("the source could not be parsed");
        };
        println!("{}", serde_json::to_string_pretty(&program)?);
        return Ok(());
    }

    let context = ModuleContext::new();
    let result = faber::compile_file(&source, &cli.file, target, context);

    for diagnostic in &result.diagnostics {
        eprintln!("{}", diagnostic.render_with_source(&source));
    }

    let errors = result
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    if errors > 0 {
        bail!("compilation failed with {errors} error(s)");
    }

    let Some(module) = result.output else {
        bail!("the source could not be parsed");
    };

    match &cli.out {
        Some(out) => {
            std::fs::write(out, &module.source)
                .with_context(|| format!("failed to write {}", out.display()))?;
            log::info!("wrote {} ({} target)", out.display(), target);
        }
        None => print!("{}", module.source),
    }

    Ok(())
}
