use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{bail, miette, IntoDiagnostic, Result, WrapErr};
use std::path::PathBuf;
use tracing::info;

use apilevels::cache::{self, CacheState};
use apilevels::client::{log_via_tracing, ApiClient, SdkClient, Severity};
use apilevels::config::ApiConfig;
use apilevels::database::ApiDatabase;
use apilevels::model::ApiLevel;
use apilevels::parser;
use apilevels::report::{
    InfoReport, LookupReport, RemovedReport, ReportFormat, Reporter, ValidationReport,
};

/// apilevels - Android API availability lookup for static-analysis tools
#[derive(Parser, Debug)]
#[command(name = "apilevels")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Explicit api-versions.xml path (overrides SDK discovery)
    #[arg(long, global = true, value_name = "FILE")]
    xml: Option<PathBuf>,

    /// Android SDK root (defaults to ANDROID_HOME / ANDROID_SDK_ROOT)
    #[arg(long, global = true, value_name = "DIR")]
    sdk: Option<PathBuf>,

    /// Directory for binary caches; caching is disabled without it
    #[arg(long, global = true, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Target platform API level (defaults to the discovered platform)
    #[arg(long, global = true, value_name = "N")]
    platform: Option<ApiLevel>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip the binary cache even when a cache directory is configured
    #[arg(long, global = true)]
    no_cache: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "terminal")]
    format: OutputFormat,

    /// Output file (for json format)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only output results
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up when a class became available
    Class {
        /// Class name, dot or slash separated
        name: String,
    },
    /// Look up when a method became available
    Method {
        class: String,
        name: String,
        /// JVM descriptor, e.g. (Landroid/os/Bundle;)V
        descriptor: String,
    },
    /// Look up when a field became available
    Field { class: String, name: String },
    /// API level at which a cast between two types becomes valid
    Cast { from: String, to: String },
    /// List removed members of a class
    Removed { class: String },
    /// Compile the XML description into a binary cache file
    Compile,
    /// Classify an existing binary cache file without rebuilding it
    Validate,
    /// Show database statistics
    Info,
}

#[derive(clap::ValueEnum, Clone, Debug, Default)]
enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Terminal => ReportFormat::Terminal,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

/// Resolved description source for this invocation.
struct Source {
    xml: PathBuf,
    platform: ApiLevel,
    cache_dir: Option<PathBuf>,
}

/// Client with paths fixed by CLI flags; diagnostics go to tracing.
struct CliClient {
    xml: PathBuf,
    cache_dir: Option<PathBuf>,
}

impl ApiClient for CliClient {
    fn find_api_database(&self) -> Option<PathBuf> {
        Some(self.xml.clone())
    }

    fn cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone()
    }

    fn log(
        &self,
        severity: Severity,
        error: Option<&(dyn std::error::Error + 'static)>,
        message: &str,
    ) {
        log_via_tracing(severity, error, message);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.quiet);

    info!("apilevels v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_config(&cli)?;
    let source = resolve_source(&cli, &config)?;
    let reporter = Reporter::new(cli.format.clone().into(), cli.output.clone());

    match &cli.command {
        Command::Class { name } => {
            let db = open_database(&source)?;
            let Some(since) = db.class_since(name) else {
                bail!("class '{}' not found in the API description", name);
            };
            reporter.lookup(&LookupReport {
                kind: "class",
                target: name.clone(),
                since: Some(since),
                deprecated_in: db.class_deprecated_in(name),
                removed_in: db.class_removed_in(name),
            })
        }
        Command::Method {
            class,
            name,
            descriptor,
        } => {
            let db = open_database(&source)?;
            let Some(since) = db.method_since(class, name, descriptor) else {
                bail!("method {}#{}{} not found", class, name, descriptor);
            };
            reporter.lookup(&LookupReport {
                kind: "method",
                target: format!("{}#{}{}", class, name, descriptor),
                since: Some(since),
                deprecated_in: db.method_deprecated_in(class, name, descriptor),
                removed_in: db.method_removed_in(class, name, descriptor),
            })
        }
        Command::Field { class, name } => {
            let db = open_database(&source)?;
            let Some(since) = db.field_since(class, name) else {
                bail!("field {}#{} not found", class, name);
            };
            reporter.lookup(&LookupReport {
                kind: "field",
                target: format!("{}#{}", class, name),
                since: Some(since),
                deprecated_in: db.field_deprecated_in(class, name),
                removed_in: db.field_removed_in(class, name),
            })
        }
        Command::Cast { from, to } => {
            let db = open_database(&source)?;
            let Some(since) = db.valid_cast_version(from, to) else {
                bail!("no cast relationship from '{}' to '{}'", from, to);
            };
            reporter.lookup(&LookupReport {
                kind: "cast",
                target: format!("{} -> {}", from, to),
                since: Some(since),
                deprecated_in: None,
                removed_in: None,
            })
        }
        Command::Removed { class } => {
            let db = open_database(&source)?;
            if db.class_since(class).is_none() {
                bail!("class '{}' not found in the API description", class);
            }
            reporter.removed(&RemovedReport {
                class: class.clone(),
                methods: db.removed_methods(class),
                fields: db.removed_fields(class),
            })
        }
        Command::Compile => run_compile(&source),
        Command::Validate => run_validate(&source, &reporter),
        Command::Info => {
            let db = open_database(&source)?;
            reporter.info(&InfoReport {
                source: source.xml.display().to_string(),
                platform: db.platform_version(),
                schema_version: db.schema_version(),
                classes: db.class_count(),
                packages: db.package_count(),
                highest_level: db.highest_level(),
                cache_file: db.cache_path().map(|p| p.display().to_string()),
                loaded_from_cache: db.loaded_from_cache(),
            })
        }
    }
}

fn load_config(cli: &Cli) -> Result<ApiConfig> {
    match &cli.config {
        Some(path) => ApiConfig::from_file(path),
        None => {
            let cwd = std::env::current_dir().into_diagnostic()?;
            ApiConfig::from_default_locations(&cwd)
        }
    }
}

fn resolve_source(cli: &Cli, config: &ApiConfig) -> Result<Source> {
    let cache_dir = if cli.no_cache {
        None
    } else {
        cli.cache_dir.clone().or_else(|| config.cache_dir.clone())
    };

    if let Some(xml) = cli.xml.clone().or_else(|| config.api_file.clone()) {
        if !xml.is_file() {
            bail!("API description {} does not exist", xml.display());
        }
        return Ok(Source {
            xml,
            platform: cli.platform.or(config.platform).unwrap_or(0),
            cache_dir,
        });
    }

    let sdk = cli
        .sdk
        .clone()
        .or_else(|| config.sdk_root.clone())
        .map(SdkClient::new)
        .or_else(SdkClient::from_env)
        .ok_or_else(|| {
            miette!("no API description configured; pass --xml or --sdk, or set ANDROID_HOME")
        })?;
    let (xml, discovered) = sdk
        .discover()
        .ok_or_else(|| miette!("the SDK has no platform with an api-versions.xml"))?;
    Ok(Source {
        xml,
        platform: cli.platform.or(config.platform).unwrap_or(discovered),
        cache_dir,
    })
}

fn open_database(source: &Source) -> Result<ApiDatabase> {
    let client = CliClient {
        xml: source.xml.clone(),
        cache_dir: source.cache_dir.clone(),
    };
    ApiDatabase::open(&client, source.platform)
}

fn run_compile(source: &Source) -> Result<()> {
    use indicatif::ProgressBar;
    use std::time::Duration;

    let Some(cache_dir) = source.cache_dir.clone() else {
        bail!("no cache directory configured; pass --cache-dir");
    };

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Parsing {}", source.xml.display()));

    let api = parser::parse_file(&source.xml)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to parse {}", source.xml.display()))?;

    spinner.set_message("Writing binary cache");
    std::fs::create_dir_all(&cache_dir)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to create {}", cache_dir.display()))?;
    let cache_path = cache_dir.join(cache::cache_file_name(&source.xml, source.platform));
    let client = CliClient {
        xml: source.xml.clone(),
        cache_dir: Some(cache_dir),
    };
    let written = cache::write_cache(&client, &api, source.platform, &cache_path);
    spinner.finish_and_clear();

    if !written {
        bail!("failed to write cache file {}", cache_path.display());
    }
    println!(
        "{} {} ({} classes)",
        "Compiled".green().bold(),
        cache_path.display(),
        api.classes.len()
    );
    Ok(())
}

fn run_validate(source: &Source, reporter: &Reporter) -> Result<()> {
    let Some(cache_dir) = source.cache_dir.clone() else {
        bail!("no cache directory configured; pass --cache-dir");
    };
    let cache_path = cache_dir.join(cache::cache_file_name(&source.xml, source.platform));

    let (status, classes, healthy) =
        match cache::inspect(&cache_path, &source.xml, source.platform) {
            CacheState::Valid(api) => ("valid".to_string(), Some(api.classes.len()), true),
            CacheState::Missing => ("missing".to_string(), None, false),
            CacheState::Stale => ("stale".to_string(), None, false),
            CacheState::Unsupported { found } => {
                (format!("unsupported format v{}", found), None, false)
            }
            CacheState::WrongPlatform { found } => {
                (format!("built for platform {}", found), None, false)
            }
            CacheState::Corrupt(defect) => (format!("corrupt: {}", defect), None, false),
        };

    reporter.validation(&ValidationReport {
        cache_file: cache_path.display().to_string(),
        status,
        classes,
        healthy,
    })
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
