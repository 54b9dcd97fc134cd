//! Output rendering for the CLI: colored terminal text or JSON.

use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::model::{ApiLevel, ApiMember};

/// Output format for query results
#[derive(Debug, Clone, Default)]
pub enum ReportFormat {
    #[default]
    Terminal,
    Json,
}

/// A single availability answer (class, method, field, or cast).
#[derive(Debug, Serialize)]
pub struct LookupReport {
    pub kind: &'static str,
    pub target: String,
    pub since: Option<ApiLevel>,
    pub deprecated_in: Option<ApiLevel>,
    pub removed_in: Option<ApiLevel>,
}

/// Bulk removed-member listing for one class.
#[derive(Debug, Serialize)]
pub struct RemovedReport {
    pub class: String,
    pub methods: Vec<ApiMember>,
    pub fields: Vec<ApiMember>,
}

/// Database statistics.
#[derive(Debug, Serialize)]
pub struct InfoReport {
    pub source: String,
    pub platform: ApiLevel,
    pub schema_version: u32,
    pub classes: usize,
    pub packages: usize,
    pub highest_level: ApiLevel,
    pub cache_file: Option<String>,
    pub loaded_from_cache: bool,
}

/// Classification of a cache file on disk.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub cache_file: String,
    pub status: String,
    pub classes: Option<usize>,
    pub healthy: bool,
}

/// Renders reports in the selected format, to stdout or a file.
pub struct Reporter {
    format: ReportFormat,
    output_path: Option<PathBuf>,
}

impl Reporter {
    pub fn new(format: ReportFormat, output_path: Option<PathBuf>) -> Self {
        Self {
            format,
            output_path,
        }
    }

    pub fn lookup(&self, report: &LookupReport) -> Result<()> {
        match self.format {
            ReportFormat::Json => self.emit_json(report),
            ReportFormat::Terminal => {
                println!("{} ({})", report.target.cyan().bold(), report.kind);
                println!("  since:      {}", level(report.since, "unknown").green());
                println!(
                    "  deprecated: {}",
                    match report.deprecated_in {
                        Some(l) => format!("API {}", l).yellow(),
                        None => "never".normal(),
                    }
                );
                println!(
                    "  removed:    {}",
                    match report.removed_in {
                        Some(l) => format!("API {}", l).red(),
                        None => "never".normal(),
                    }
                );
                Ok(())
            }
        }
    }

    pub fn removed(&self, report: &RemovedReport) -> Result<()> {
        match self.format {
            ReportFormat::Json => self.emit_json(report),
            ReportFormat::Terminal => {
                if report.methods.is_empty() && report.fields.is_empty() {
                    println!(
                        "{} has no removed members",
                        report.class.cyan().bold()
                    );
                    return Ok(());
                }
                println!("Removed members of {}:", report.class.cyan().bold());
                if !report.methods.is_empty() {
                    println!("  {}", "methods".yellow().bold());
                    for member in &report.methods {
                        println!("    {}", member);
                    }
                }
                if !report.fields.is_empty() {
                    println!("  {}", "fields".yellow().bold());
                    for member in &report.fields {
                        println!("    {}", member);
                    }
                }
                Ok(())
            }
        }
    }

    pub fn info(&self, report: &InfoReport) -> Result<()> {
        match self.format {
            ReportFormat::Json => self.emit_json(report),
            ReportFormat::Terminal => {
                println!("{}", "API database".cyan().bold());
                println!("  source:        {}", report.source);
                println!("  platform:      API {}", report.platform);
                println!("  schema:        v{}", report.schema_version);
                println!("  classes:       {}", report.classes);
                println!("  packages:      {}", report.packages);
                println!("  highest level: API {}", report.highest_level);
                match &report.cache_file {
                    Some(cache_file) => println!(
                        "  cache:         {} ({})",
                        cache_file,
                        if report.loaded_from_cache {
                            "hit".green()
                        } else {
                            "rebuilt".yellow()
                        }
                    ),
                    None => println!("  cache:         disabled"),
                }
                Ok(())
            }
        }
    }

    pub fn validation(&self, report: &ValidationReport) -> Result<()> {
        match self.format {
            ReportFormat::Json => self.emit_json(report),
            ReportFormat::Terminal => {
                let status = if report.healthy {
                    report.status.green().bold()
                } else {
                    report.status.red().bold()
                };
                println!("{}: {}", report.cache_file, status);
                if let Some(classes) = report.classes {
                    println!("  classes: {}", classes);
                }
                Ok(())
            }
        }
    }

    fn emit_json<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value).into_diagnostic()?;
        if let Some(path) = &self.output_path {
            std::fs::write(path, &json).into_diagnostic()?;
            println!("Report written to: {}", path.display());
        } else {
            println!("{}", json);
        }
        Ok(())
    }
}

fn level(value: Option<ApiLevel>, fallback: &str) -> String {
    match value {
        Some(level) => format!("API {}", level),
        None => fallback.to_string(),
    }
}
