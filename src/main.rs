use miette::{miette, IntoDiagnostic, Result, WrapErr};
use sequence_arena::{
    config::ArenaConfig,
    diagnostics,
    language::{interface::InterfaceSpecification, wire::parse_sheets},
    logging,
    runtime::{actuation::ActuationSheet, record::ObservationKey, registry::TypeRegistry},
    tools::demo,
    Arena, ArenaOutcome,
};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const USAGE: &str = "Usage: sequence-arena [run|check] <sheet.jsonl> [interface.json] [--config arena.toml] [--actuation]";

struct Command {
    name: String,
    sheet: PathBuf,
    interface: Option<PathBuf>,
    config: Option<PathBuf>,
    actuation: bool,
}

fn parse_args(args: &[String]) -> Option<Command> {
    let (name, rest) = args.split_first()?;
    let mut positional = Vec::new();
    let mut config = None;
    let mut actuation = false;
    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => config = Some(PathBuf::from(iter.next()?)),
            "--actuation" => actuation = true,
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    let mut positional = positional.into_iter();
    let sheet = positional.next()?;
    let interface = positional.next();
    if positional.next().is_some() {
        return None;
    }
    Some(Command {
        name: name.clone(),
        sheet,
        interface,
        config,
        actuation,
    })
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = parse_args(&args) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    let config = ArenaConfig::discover(command.config.as_deref()).into_diagnostic()?;
    if let Err(err) = logging::init(&config.logging) {
        eprintln!("logging disabled: {err}");
    }

    match command.name.as_str() {
        "run" | "check" => execute(&command, &config),
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }
}

fn load_interface(path: Option<&Path>) -> Result<Arc<InterfaceSpecification>> {
    let text = match path {
        Some(path) => fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", path.display()))?,
        None => demo::STACK_INTERFACE_JSON.to_string(),
    };
    let interface = InterfaceSpecification::from_json(&text).into_diagnostic()?;
    Ok(Arc::new(interface))
}

fn execute(command: &Command, config: &ArenaConfig) -> Result<()> {
    let text = fs::read_to_string(&command.sheet)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", command.sheet.display()))?;
    let sheets = parse_sheets(&text)
        .map_err(|err| diagnostics::wire_report(&command.sheet, &text, &err))?;
    let interface = load_interface(command.interface.as_deref())?;
    let registry = Arc::new(TypeRegistry::with_builtins().into_diagnostic()?);
    let candidates = demo::candidates().into_diagnostic()?;
    let arena = Arena::new(registry, config.engine);

    let execution = command
        .sheet
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let key = ObservationKey {
        execution,
        abstraction: interface.class_name.clone(),
        action: command.name.clone(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut excluded = 0usize;
    for sequence in &sheets {
        if command.name == "check" {
            for candidate in &candidates {
                if let Err(err) = arena.build(sequence, &interface, candidate) {
                    diagnostics::report_build_error(
                        &command.sheet,
                        &text,
                        sequence,
                        &candidate.name,
                        &err,
                    );
                    excluded += 1;
                }
            }
            continue;
        }

        for candidate in &candidates {
            let mut sheet = ActuationSheet::new();
            let reports = arena.run_with(
                sequence,
                &interface,
                std::slice::from_ref(candidate),
                &mut sheet,
            );
            for report in reports {
                match &report.outcome {
                    ArenaOutcome::Executed(executed) => {
                        for observation in executed.observations(&key) {
                            let line = serde_json::to_string(&observation).into_diagnostic()?;
                            writeln!(out, "{line}").into_diagnostic()?;
                        }
                        if command.actuation {
                            write!(out, "{}", sheet.to_json_lines()).into_diagnostic()?;
                        }
                    }
                    ArenaOutcome::Excluded(err) => {
                        diagnostics::report_build_error(
                            &command.sheet,
                            &text,
                            sequence,
                            &report.candidate,
                            err,
                        );
                        excluded += 1;
                    }
                }
            }
        }
    }

    if command.name == "check" && excluded > 0 {
        return Err(miette!("{excluded} candidate binding(s) failed"));
    }
    Ok(())
}
