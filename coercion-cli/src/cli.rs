use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use coercion::{Source, TypeRegistry, ValidationOutcome, ValidationReport, Validator, output};
use tracing::info;

use crate::input::{decode_native, load_registry, read_input};
use crate::logging;

/// Process exit code when the input fails validation.
pub const EXIT_INVALID: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "coercion", version, about = "Strict/lax type coercion and validation")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a value against a type expression
    Validate {
        /// Type expression, e.g. `list[int]` or `dict[str, optional[float]]`
        #[arg(long = "type", value_name = "EXPR")]
        type_expr: String,

        /// Schema document whose enums and schemas the expression may name
        #[arg(long, value_name = "FILE")]
        schema: Option<PathBuf>,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Validate a value against a schema from a definition document
    Check {
        /// Schema document (JSON or YAML)
        #[arg(long, value_name = "FILE")]
        schema: PathBuf,

        /// Name of the schema to validate against
        #[arg(long)]
        model: String,

        #[command(flatten)]
        run: RunArgs,
    },
    /// List the type names available to type expressions
    Types {
        /// Schema document whose enums and schemas are listed too
        #[arg(long, value_name = "FILE")]
        schema: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Validate in strict mode
    #[arg(long, conflicts_with = "lax")]
    pub strict: bool,

    /// Validate in lax mode, overriding a strict schema config
    #[arg(long)]
    pub lax: bool,

    /// How the input is interpreted
    #[arg(long, value_enum, default_value_t = SourceArg::Json)]
    pub source: SourceArg,

    /// Read the input from a file (`-` for stdin)
    #[arg(long, value_name = "FILE", conflicts_with = "value")]
    pub input: Option<PathBuf>,

    /// Take the input inline
    #[arg(long, value_name = "TEXT")]
    pub value: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Human)]
    pub format: Format,

    /// Fold container failures into one record per container
    #[arg(long)]
    pub group: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceArg {
    /// Decoded JSON text
    Json,
    /// Native values written as tagged JSON
    Python,
}

impl From<SourceArg> for Source {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Json => Source::Json,
            SourceArg::Python => Source::Python,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Human,
    Json,
}

impl RunArgs {
    fn strict_override(&self) -> Option<bool> {
        if self.strict {
            Some(true)
        } else if self.lax {
            Some(false)
        } else {
            None
        }
    }

    /// Run one validation and write its report.
    fn validate_with(
        &self,
        label: &str,
        json: impl FnOnce(&str, Option<bool>) -> ValidationOutcome,
        native: impl FnOnce(&coercion::Value, Option<bool>) -> ValidationOutcome,
        out: &mut dyn Write,
    ) -> Result<bool> {
        let text = read_input(self.input.as_deref(), self.value.as_deref())?;
        let strict = self.strict_override();
        let outcome = match self.source {
            SourceArg::Json => json(&text, strict),
            SourceArg::Python => native(&decode_native(&text)?, strict),
        };
        let report =
            ValidationReport::from_outcome(label, self.source.into(), strict, outcome, self.group);
        info!(target_type = label, ok = report.ok, errors = report.errors_count(), "validated");
        write_report(&report, self.format, out)?;
        Ok(report.ok)
    }
}

fn write_report(report: &ValidationReport, format: Format, out: &mut dyn Write) -> Result<()> {
    match format {
        Format::Json => output::write_json(report, out),
        Format::Human => {
            let mut plain = Vec::new();
            output::write_human(report, &mut plain)?;
            let plain = String::from_utf8(plain).context("report is not UTF-8")?;
            for line in plain.lines() {
                if line.starts_with('\u{2713}') {
                    writeln!(out, "{}", line.green().bold())?;
                } else if line.starts_with('\u{2717}') {
                    writeln!(out, "{}", line.red().bold())?;
                } else if line.starts_with("  COERCION") {
                    writeln!(out, "{}", line.bold())?;
                } else {
                    writeln!(out, "{line}")?;
                }
            }
            Ok(())
        }
    }
}

/// Parse arguments, run the command, and report whether the input was valid.
///
/// # Errors
///
/// Returns an error for unreadable files, invalid schema documents or type
/// expressions, and malformed native input.
pub fn run() -> Result<bool> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&cli, &mut out)
}

/// Run a parsed command, writing its output to `out`.
///
/// Returns `Ok(false)` when the input fails validation.
///
/// # Errors
///
/// See [`run`].
pub fn execute(cli: &Cli, out: &mut dyn Write) -> Result<bool> {
    match &cli.command {
        Commands::Validate {
            type_expr,
            schema,
            run,
        } => {
            let registry = match schema {
                Some(path) => load_registry(path)?,
                None => TypeRegistry::new(),
            };
            let target = registry
                .parse(type_expr)
                .with_context(|| format!("invalid type expression '{type_expr}'"))?;
            let label = target.to_string();
            let validator = Validator::new(target);
            run.validate_with(
                &label,
                |text, strict| validator.validate_json(text, strict),
                |value, strict| validator.validate_python(value, strict),
                out,
            )
        }
        Commands::Check { schema, model, run } => {
            let registry = load_registry(schema)?;
            let found = registry
                .schema(model)
                .ok_or_else(|| anyhow!("schema '{model}' is not defined in {}", schema.display()))?;
            run.validate_with(
                found.name(),
                |text, strict| found.validate_json(text, strict),
                |value, strict| found.validate_python(value, strict),
                out,
            )
        }
        Commands::Types { schema } => {
            let registry = match schema {
                Some(path) => load_registry(path)?,
                None => TypeRegistry::new(),
            };
            for name in registry.type_names() {
                writeln!(out, "{name}")?;
            }
            Ok(true)
        }
    }
}
