use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use goscript::analysis::{Analysis, FuncKind};
use goscript::ast::Package;
use goscript::config::CompileConfig;
use goscript::diagnostics::{self, CompileError};

#[derive(Parser)]
#[command(name = "goscript", version, about = "Compile typed Go packages to TypeScript")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a package (typed AST as JSON) to a TypeScript module
    Compile {
        /// Package JSON produced by the front end
        file: PathBuf,
        /// Output directory (overrides goscript.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Configuration file (defaults to goscript.toml next to the input)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Do not write the runtime support module
        #[arg(long)]
        no_runtime: bool,
    },
    /// Print the boxing and async facts computed for a package
    Analyze {
        /// Package JSON produced by the front end
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(level)
        .init();

    match cli.command {
        Commands::Compile { file, output, config, no_runtime } => {
            let mut config = match load_config(&file, config.as_deref()) {
                Ok(c) => c,
                Err(err) => fail(None, &file, &err),
            };
            if let Some(dir) = output {
                config.output_dir = dir;
            }
            if no_runtime {
                config.emit_runtime = false;
            }

            let pkg = match read_package(&file) {
                Ok(p) => p,
                Err(err) => fail(None, &file, &err),
            };
            let result = goscript::compile_package(&pkg, &config)
                .and_then(|output| goscript::write_output(&output, &config).map(|written| (output, written)));
            match result {
                Ok((output, written)) => {
                    for warning in &output.warnings {
                        eprintln!("warning: {warning}");
                    }
                    for path in written {
                        println!("{}", path.display());
                    }
                }
                Err(err) => fail(Some(&pkg), &file, &err),
            }
        }
        Commands::Analyze { file } => {
            let pkg = match read_package(&file) {
                Ok(p) => p,
                Err(err) => fail(None, &file, &err),
            };
            let analysis = goscript::analyze_package(&pkg);
            print_facts(&pkg, &analysis);
        }
    }
}

fn load_config(input: &Path, explicit: Option<&Path>) -> Result<CompileConfig, CompileError> {
    match explicit {
        Some(path) => CompileConfig::load(path),
        None => {
            let dir = input.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
            CompileConfig::discover(dir)
        }
    }
}

fn read_package(file: &Path) -> Result<Package, CompileError> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| CompileError::io(format!("could not read input: {e}"), file.to_path_buf()))?;
    goscript::load_package_json(&text)
}

/// Render `err` against the source file its span points into, then exit.
fn fail(pkg: Option<&Package>, input: &Path, err: &CompileError) -> ! {
    let file = pkg.and_then(|p| err.span().and_then(|s| p.files.get(s.file_id as usize)));
    match file {
        Some(f) => diagnostics::render_error(f.source.as_deref(), &f.name, err),
        None => diagnostics::render_error(None, &input.display().to_string(), err),
    }
    std::process::exit(1);
}

fn print_facts(pkg: &Package, analysis: &Analysis) {
    println!("package {} ({})", pkg.name, pkg.path);
    println!("bindings:");
    for (i, binding) in analysis.graph().bindings().iter().enumerate() {
        let id = goscript::analysis::BindingId(i as u32);
        let mut flags = Vec::new();
        if analysis.needs_boxing(id) {
            flags.push("boxed");
        } else if analysis.needs_boxed_access(id) {
            flags.push("boxed-access");
        }
        if binding.scope.is_none() {
            flags.push("package");
        }
        if flags.is_empty() {
            continue;
        }
        println!("  {}: {}", binding.name, flags.join(", "));
    }
    println!("functions:");
    for (i, func) in analysis.graph().functions().iter().enumerate() {
        let id = goscript::analysis::FuncId(i as u32);
        let kind = match func.kind {
            FuncKind::Func { .. } => "func",
            FuncKind::Method { .. } => "method",
            FuncKind::Lit => "literal",
        };
        let state = if analysis.is_async(id) { "async" } else { "sync" };
        println!("  {kind} {}: {state}", func.name);
    }
    println!("fixpoint iterations: {}", analysis.iterations);
}
