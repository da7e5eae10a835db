use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::{Path, PathBuf};
use wrapgen_config::{CasterConfig, CasterTable, OverrideFile};
use wrapgen_lower::{init_order, lower_header, HeaderDecls, MissingReporter};

#[derive(Parser)]
#[command(name = "wrapgen")]
#[command(author, version, about = "Lowers parsed C++ declarations into binding IR")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lower one header and print the resolved declarations as JSON
    Lower {
        /// Parsed declarations of the header (JSON)
        decls: PathBuf,

        /// Override file for the header
        #[arg(short, long)]
        overrides: Option<PathBuf>,

        /// Type-caster config files
        #[arg(short, long)]
        casters: Vec<PathBuf>,

        /// Output file path
        #[arg(short = 'O', long)]
        output: Option<PathBuf>,
    },

    /// Print override scaffolding for symbols without an override entry
    CreateGen {
        /// Parsed declarations (JSON), one file per header
        #[arg(required = true)]
        decls: Vec<PathBuf>,

        /// Directory holding `<header>.toml` override files
        #[arg(short, long)]
        overrides: Option<PathBuf>,

        /// Prefix to list under `strip_prefixes` in every scaffold
        #[arg(long = "strip-prefix")]
        strip_prefixes: Vec<String>,
    },

    /// Print the order in which header modules must be initialised
    InitOrder {
        /// Parsed declarations (JSON), one file per header
        #[arg(required = true)]
        decls: Vec<PathBuf>,

        /// Directory holding `<header>.toml` override files
        #[arg(short, long)]
        overrides: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;

    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Lower {
            decls,
            overrides,
            casters,
            output,
        } => {
            let header = read_decls(&decls)?;
            let overrides = match overrides {
                Some(path) => read_overrides(&path)?,
                None => OverrideFile::default(),
            };
            let table = read_casters(&casters)?;

            let lowered = lower_header(&header, &overrides, &table)?;
            let json = serde_json::to_string_pretty(&lowered).into_diagnostic()?;

            if let Some(ref output_path) = output {
                std::fs::write(output_path, &json)
                    .map_err(|e| miette::miette!("Failed to write IR: {}", e))?;
                eprintln!("Wrote IR to {}", output_path.display());
            } else {
                println!("{}", json);
            }
        }

        Commands::CreateGen {
            decls,
            overrides,
            strip_prefixes,
        } => {
            let table = CasterTable::new();
            let mut reporter = MissingReporter::new();

            for file in &decls {
                let header = read_decls(file)?;
                let name = format!("{}.toml", header_name(file));
                let overrides = header_overrides(overrides.as_deref(), file)?;

                let lowered = lower_header(&header, &overrides, &table)
                    .wrap_err_with(|| format!("{}", file.display()))?;
                reporter.add(&name, lowered.missing);
            }

            let prefix = if strip_prefixes.is_empty() {
                String::new()
            } else {
                let mut table = toml::Table::new();
                table.insert("strip_prefixes".into(), strip_prefixes.into());
                toml::to_string(&table).into_diagnostic()? + "\n"
            };

            for (name, scaffold) in reporter.as_toml().into_diagnostic()? {
                println!("# {name}");
                println!("{prefix}{scaffold}");
            }
        }

        Commands::InitOrder { decls, overrides } => {
            let table = CasterTable::new();
            let mut hierarchies = Vec::new();

            for file in &decls {
                let header = read_decls(file)?;
                let overrides = header_overrides(overrides.as_deref(), file)?;
                let lowered = lower_header(&header, &overrides, &table)
                    .wrap_err_with(|| format!("{}", file.display()))?;
                hierarchies.push((header_name(file).to_string(), lowered.class_hierarchy));
            }

            let headers: Vec<_> = hierarchies
                .iter()
                .map(|(name, hierarchy)| (name.clone(), hierarchy))
                .collect();
            for name in init_order(&headers)? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `WRAPGEN_LOG` (default `warn`).
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_env("WRAPGEN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn header_name(path: &Path) -> &str {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("header")
}

fn read_decls(path: &Path) -> Result<HeaderDecls> {
    let content = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to parse declarations in {}", path.display()))
}

fn read_overrides(path: &Path) -> Result<OverrideFile> {
    OverrideFile::from_file(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to load overrides from {}", path.display()))
}

/// Overrides for the header `decls` describes, if `dir` has a file for it.
fn header_overrides(dir: Option<&Path>, decls: &Path) -> Result<OverrideFile> {
    let Some(dir) = dir else {
        return Ok(OverrideFile::default());
    };
    let path = dir.join(format!("{}.toml", header_name(decls)));
    if path.exists() {
        read_overrides(&path)
    } else {
        tracing::debug!(path = %path.display(), "no override file");
        Ok(OverrideFile::default())
    }
}

fn read_casters(paths: &[PathBuf]) -> Result<CasterTable> {
    let configs = paths
        .iter()
        .map(|path| {
            CasterConfig::from_file(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to load casters from {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CasterTable::from_configs(&configs))
}
