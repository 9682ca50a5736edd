//! refconf CLI - resolve placeholders in configuration files
//!
//! Usage:
//!   refconf resolve deployment.yaml --secrets secrets.yaml -D carbon.home=/opt/carbon
//!   refconf check deployment.yaml other.json

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use indexmap::IndexMap;
use refconf_core::{context, Context, Error, Resolution, Resolver, ResolverOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::filter::LevelFilter;

/// refconf - Placeholder resolution for configuration files
#[derive(Parser)]
#[command(name = "refconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that runs the resolver
#[derive(clap::Args, Debug, Clone, Default)]
struct ResolveArgs {
    /// Secret store file (YAML or JSON mapping of alias to value)
    #[arg(short, long)]
    secrets: Option<PathBuf>,

    /// Define a system property for $sys{} placeholders (name=value)
    #[arg(short = 'D', long = "define", value_parser = parse_define)]
    defines: Vec<(String, String)>,

    /// Accept plain-text [..] secrets in the secret store
    #[arg(long)]
    allow_plain_text_secrets: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve placeholders and print the resulting configuration
    Resolve {
        /// Configuration file to resolve
        file: PathBuf,

        #[command(flatten)]
        args: ResolveArgs,

        /// Output format: yaml, json
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that every placeholder in the files resolves
    Check {
        /// Configuration file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        args: ResolveArgs,
    },
}

/// Run the CLI with the given arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Resolve {
            file,
            args,
            format,
            output,
        } => cmd_resolve(&file, &args, &format, output),
        Commands::Check { files, args } => cmd_check(&files, &args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn parse_define(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Expected name=value, got '{}'", s)),
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

fn read_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("Failed to read '{}': {}", path.display(), e)))
}

fn load_context(path: &Path) -> Result<Context, String> {
    let content = read_file(path).map_err(|e| e.to_string())?;
    let loaded = if is_json(path) {
        context::from_json(&content)
    } else {
        context::from_yaml(&content)
    };
    let ctx = loaded.map_err(|e| format!("Failed to load {}: {}", path.display(), e))?;
    log::debug!("Loaded {} key(s) from {}", ctx.len(), path.display());
    Ok(ctx)
}

fn load_secrets(path: Option<&Path>) -> Result<IndexMap<String, String>, String> {
    let Some(path) = path else {
        return Ok(IndexMap::new());
    };

    let content = read_file(path).map_err(|e| e.to_string())?;
    let parsed: Result<Option<IndexMap<String, String>>, String> = if is_json(path) {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    };
    let secrets = parsed
        .map_err(|e| format!("Failed to load secrets {}: {}", path.display(), e))?
        .unwrap_or_default();
    log::debug!("Loaded {} secret(s) from {}", secrets.len(), path.display());
    Ok(secrets)
}

/// Why a configuration file could not be resolved
#[derive(Debug)]
enum Failure {
    /// A configuration or secrets file could not be read or parsed
    Load(String),
    /// The resolver rejected the configuration
    Resolve(String),
}

impl Failure {
    fn exit_code(&self) -> u8 {
        match self {
            Failure::Load(_) => 2,
            Failure::Resolve(_) => 1,
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Load(msg) | Failure::Resolve(msg) => write!(f, "{}", msg),
        }
    }
}

fn resolve_file(path: &Path, args: &ResolveArgs) -> Result<Resolution, Failure> {
    let ctx = load_context(path).map_err(Failure::Load)?;
    let secrets = load_secrets(args.secrets.as_deref()).map_err(Failure::Load)?;

    for (name, value) in &args.defines {
        refconf_core::source::set_system_property(name.clone(), value.clone());
    }

    let options =
        ResolverOptions::default().with_require_encrypted_secrets(!args.allow_plain_text_secrets);
    Resolver::with_options(options)
        .run(ctx, &secrets)
        .map_err(|e| Failure::Resolve(e.to_string()))
}

fn render(ctx: &Context, format: &str) -> Result<String, String> {
    match format {
        "json" => serde_json::to_string_pretty(ctx)
            .map(|s| s + "\n")
            .map_err(|e| e.to_string()),
        "yaml" | "yml" => serde_yaml::to_string(ctx).map_err(|e| e.to_string()),
        other => Err(format!("Unsupported format: {}. Use yaml or json.", other)),
    }
}

fn cmd_resolve(file: &Path, args: &ResolveArgs, format: &str, output: Option<PathBuf>) -> ExitCode {
    let resolution = match resolve_file(file, args) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            return ExitCode::from(e.exit_code());
        }
    };

    let content = match render(&resolution.context, format) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            return ExitCode::from(2);
        }
    };

    if resolution.secret_vault_enabled {
        eprintln!("{} secret placeholders present, secret vault enabled", "•".cyan());
    }

    if let Some(output_path) = output {
        if let Err(e) = std::fs::write(&output_path, &content) {
            eprintln!("{}: {}", "Error writing file".red(), e);
            return ExitCode::from(2);
        }
        eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
    } else {
        print!("{}", content);
    }

    ExitCode::SUCCESS
}

fn cmd_check(files: &[PathBuf], args: &ResolveArgs) -> ExitCode {
    let mut exit_code = 0;

    for file in files {
        match resolve_file(file, args) {
            Ok(resolution) => {
                println!(
                    "{} {}: {} key(s) resolved{}",
                    "✓".green(),
                    file.display(),
                    resolution.context.len(),
                    if resolution.secret_vault_enabled {
                        ", secret vault enabled"
                    } else {
                        ""
                    }
                );
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                exit_code = exit_code.max(e.exit_code());
            }
        }
    }

    ExitCode::from(exit_code)
}
