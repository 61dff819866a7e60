//! CLI command implementations
//!
//! Every command reads JSON requests from stdin, one per line, and answers
//! each with exactly one JSON response line on stdout. A request that fails
//! to parse or compile gets an error response; processing continues with
//! the next line. Configuration and I/O failures end the command.

use std::io::{self, BufRead, Write};
use std::path::Path;

use serde_json::{json, Value};

use crate::compiler::{compile, PlaceholderValues};
use crate::filter::{select_filter, IndexSelector};
use crate::model::{Expr, Index};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};

use super::args::{Cli, Command};
use super::config::Config;
use super::errors::CliResult;
use super::io::{parse_request, write_error, write_response, Request};

/// Counts of one command run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli)
}

/// Run a parsed command against stdin/stdout
pub fn run_command(cli: Cli) -> CliResult<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut input = stdin.lock();
    let mut output = stdout.lock();

    match cli.command {
        Command::Compile => {
            configure_logging(cli.verbose, Severity::Info);
            compile_requests(&mut input, &mut output)?;
        }
        Command::Explain { config } => {
            let (config, indexes) = load_catalog(&config, cli.verbose)?;
            explain_requests(&mut input, &mut output, &config.namespace, &indexes)?;
        }
        Command::Batch { config } => {
            let (config, indexes) = load_catalog(&config, cli.verbose)?;
            batch_requests(&mut input, &mut output, &config.namespace, &indexes)?;
        }
    }

    Ok(())
}

fn configure_logging(verbose: bool, configured: Severity) {
    let severity = if verbose { Severity::Trace } else { configured };
    Logger::set_min_severity(severity);
}

/// Loads the config and applies its log level before anything is logged
fn load_catalog(path: &Path, verbose: bool) -> CliResult<(Config, Vec<Index>)> {
    let config = Config::load(path)?;
    configure_logging(verbose, config.severity()?);

    let indexes = config.build_indexes()?;
    let count = indexes.len().to_string();
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("namespace", &config.namespace), ("indexes", &count)],
    );

    Ok((config, indexes))
}

/// `compile`: the typed tree of each request
pub fn compile_requests<R: BufRead, W: Write>(input: R, output: &mut W) -> CliResult<BatchSummary> {
    process(input, output, |request| {
        let expr = compile_request(request)?;
        Ok(json!({
            "expression": request.expression,
            "type": expr.value_type().as_str(),
            "rendered": expr.to_string(),
            "tree": serde_json::to_value(&expr)?,
        }))
    })
}

/// `explain`: how index selection treats each request
pub fn explain_requests<R: BufRead, W: Write>(
    input: R,
    output: &mut W,
    namespace: &str,
    indexes: &[Index],
) -> CliResult<BatchSummary> {
    let selector = IndexSelector::new(namespace, indexes);
    process(input, output, |request| {
        let expr = compile_request(request)?;
        let explain = selector.explain(&expr, request.hint.as_ref());
        Ok(json!({
            "expression": request.expression,
            "explain": serde_json::to_value(&explain)?,
            "text": explain.to_string(),
        }))
    })
}

/// `batch`: the index filter and residual of each request
pub fn batch_requests<R: BufRead, W: Write>(
    input: R,
    output: &mut W,
    namespace: &str,
    indexes: &[Index],
) -> CliResult<BatchSummary> {
    process(input, output, |request| {
        let expr = compile_request(request)?;
        let selection = select_filter(&expr, namespace, indexes, request.hint.as_ref());
        Ok(json!({
            "expression": request.expression,
            "filter": serde_json::to_value(&selection.filter)?,
            "filter_text": selection.filter.as_ref().map(ToString::to_string),
            "residual": selection.residual.as_ref().map(ToString::to_string),
        }))
    })
}

fn compile_request(request: &Request) -> CliResult<Expr> {
    let values = PlaceholderValues::from_json(&request.values)?;
    Ok(compile(&request.expression, Some(&values))?)
}

fn process<R, W, F>(input: R, output: &mut W, handle: F) -> CliResult<BatchSummary>
where
    R: BufRead,
    W: Write,
    F: Fn(&Request) -> CliResult<Value>,
{
    let mut summary = BatchSummary::default();

    for (number, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match parse_request(&line).and_then(|request| handle(&request)) {
            Ok(data) => {
                summary.succeeded += 1;
                write_response(output, data)?;
            }
            Err(e) => {
                summary.failed += 1;
                let line_number = (number + 1).to_string();
                log_event_with_fields(
                    Event::RequestRejected,
                    &[
                        ("line", &line_number),
                        ("code", e.code_str()),
                        ("message", e.message()),
                    ],
                );
                write_error(output, e.code_str(), e.message())?;
            }
        }
    }

    let succeeded = summary.succeeded.to_string();
    let failed = summary.failed.to_string();
    log_event_with_fields(
        Event::BatchComplete,
        &[("succeeded", &succeeded), ("failed", &failed)],
    );

    Ok(summary)
}
