//! `forgecc`: a thin command-line driver over the `forgecc` core. Wires one
//! compilation session together — target registry → target context → pass
//! manager → selector → allocator → emitter — the way the spec's §6 "CLI
//! surface" describes it, shown here for completeness rather than as part
//! of the core contract itself.

mod ir_text;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Parser;

use forgecc::diag::{DiagnosticSink, StderrSink};
use forgecc::emit::{Emitter, OutputFormat};
use forgecc::pass::passes::{
    common_subexpression_elimination, constant_propagation, dead_code_elimination, loop_invariant_code_motion,
    peephole,
};
use forgecc::pass::{OptLevel, PassManager};
use forgecc::select::Selector;
use forgecc::target::registry::TargetRegistry;
use forgecc::target::x86_64::X86_64Target;

/// Exit code 1: malformed input IR or config.
const EXIT_INPUT_ERROR: u8 = 1;
/// Exit code 2: an invariant of the core was violated mid-session.
const EXIT_INTERNAL_ERROR: u8 = 2;
/// Exit code 3: unknown target, unsupported feature, or unsupported output.
const EXIT_TARGET_ERROR: u8 = 3;

#[derive(Parser, Debug)]
#[command(name = "forgecc", about = "Retargetable low-level assembler / code generator")]
struct Args {
    /// Input file in the driver's minimal textual IR format.
    input: PathBuf,

    /// Output file path.
    #[arg(short = 'o')]
    output: PathBuf,

    /// Optimisation level: 0, 1, 2, 3, or s (size).
    #[arg(short = 'O', default_value = "0")]
    opt_level: String,

    /// Emit debug info (accepted, currently a no-op: forgecc carries no
    /// separate debug-info side table yet).
    #[arg(short = 'g', default_value_t = false)]
    debug_info: bool,

    /// Target name, e.g. "x86_64".
    #[arg(long, default_value = "x86_64")]
    target: String,

    /// Enable (`+name`) or disable (`-name`) a target feature. Repeatable.
    #[arg(long = "feature")]
    features: Vec<String>,

    /// Output format: "obj" or "asm".
    #[arg(long = "emit", default_value = "obj")]
    emit: String,
}

fn parse_opt_level(s: &str) -> Result<OptLevel> {
    Ok(match s {
        "0" => OptLevel::O0,
        "1" => OptLevel::O1,
        "2" => OptLevel::O2,
        "3" => OptLevel::O3,
        "s" => OptLevel::Size,
        other => anyhow::bail!("unknown optimisation level '{other}'"),
    })
}

fn build_pass_manager(opt_level: OptLevel) -> Result<PassManager> {
    let mut pm = PassManager::new();
    pm.register_module("peephole", None, None)?;
    pm.register_module("dce", None, None)?;
    pm.register_module("constprop", None, None)?;
    pm.register_module("cse", None, None)?;
    pm.register_module("licm", None, None)?;

    pm.register_pass(Some("peephole"), "peephole", "fold zero-identities, collapse NOPs", Box::new(peephole), OptLevel::O1)?;
    pm.register_pass(Some("dce"), "dce", "remove dead instructions", Box::new(dead_code_elimination), OptLevel::O1)?;
    pm.register_pass(
        Some("constprop"),
        "constprop",
        "forward MOV-immediate values",
        Box::new(constant_propagation),
        OptLevel::O2,
    )?;
    pm.register_pass(
        Some("cse"),
        "cse",
        "reuse equivalent extended-basic-block computations",
        Box::new(common_subexpression_elimination),
        OptLevel::O2,
    )?;
    pm.register_pass(
        Some("licm"),
        "licm",
        "hoist loop-invariant pure instructions to a preheader",
        Box::new(loop_invariant_code_motion),
        OptLevel::O3,
    )?;

    pm.create_pipeline("default")?;
    for pass in ["peephole", "dce", "constprop", "cse", "licm"] {
        pm.add_pass_to_pipeline("default", pass)?;
    }
    pm.set_pipeline("default")?;
    pm.set_opt_level(opt_level);
    Ok(pm)
}

fn run(args: Args) -> Result<()> {
    let opt_level = parse_opt_level(&args.opt_level)?;
    let output_format = match args.emit.as_str() {
        "obj" => OutputFormat::Object,
        "asm" => OutputFormat::Assembly,
        other => anyhow::bail!("unsupported --emit value '{other}' (expected obj or asm)"),
    };

    let text = fs::read_to_string(&args.input).with_context(|| format!("reading '{}'", args.input.display()))?;
    let mut function = ir_text::parse_function("main", &text)?;

    let mut pm = build_pass_manager(opt_level)?;
    pm.run(&mut function)?;

    let mut registry = TargetRegistry::new();
    registry.register_target(
        "x86_64",
        Box::new(|| Box::new(X86_64Target::new()) as Box<dyn forgecc::target::TargetDescriptor>),
    )?;

    let mut ctx = registry.create_context(&args.target)?;
    for feature in &args.features {
        let (enable, name) = match feature.strip_prefix('+') {
            Some(n) => (true, n),
            None => (false, feature.strip_prefix('-').unwrap_or(feature.as_str())),
        };
        if enable && !ctx.has_feature(name) {
            let mut sink = StderrSink;
            sink.report(forgecc::diag::Diagnostic::new(
                forgecc::diag::Severity::Warning,
                forgecc::diag::Category::Target,
                1,
                format!("target '{}' has no feature '{name}'", args.target),
            ));
        }
    }

    let selector = Selector::new();
    let mut emitter = Emitter::new();
    selector.select_function(&function, &mut ctx, &mut emitter)?;
    emitter.finalize(output_format)?;

    fs::write(&args.output, emitter.get_buffer()).with_context(|| format!("writing '{}'", args.output.display()))?;
    log::info!("wrote {} bytes to {}", emitter.get_buffer().len(), args.output.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::new().filter("FORGECC_LOG")).init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("forgecc: error: {e:#}");
            let code = classify_error(&e);
            ExitCode::from(code)
        }
    }
}

fn classify_error(err: &anyhow::Error) -> u8 {
    if let Some(forgecc_err) = err.downcast_ref::<forgecc::Error>() {
        return match forgecc_err {
            forgecc::Error::BadEncoding(_) | forgecc::Error::BadArgument(_) => EXIT_INPUT_ERROR,
            forgecc::Error::UnknownName(_) | forgecc::Error::Unsupported(_) => EXIT_TARGET_ERROR,
            _ => EXIT_INTERNAL_ERROR,
        };
    }
    EXIT_INPUT_ERROR
}
