//! Command-line interface for inspecting the clipsearch query pipeline.
//!
//! Each subcommand exposes one stage of the pipeline: `tokens` for the
//! lexer, `parse` for the AST plus diagnostics, and `filter` for the final
//! structured filter a backend would receive.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use clipsearch_query::{Diagnostic, FieldTable, normalize, parse, parse_query, tokenize};
use comfy_table::{Cell, Table, presets::UTF8_FULL_CONDENSED};

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "clipsearch")]
#[command(about = "Inspect how clipsearch parses search queries")]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Show the token stream for a query
    Tokens {
        /// The query string
        query: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the parsed and normalized AST with diagnostics
    Parse {
        /// The query string
        query: String,
    },

    /// Show the structured filter as JSON
    Filter {
        /// The query string
        query: String,

        /// Output compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,

        /// Exit nonzero if the query produced any diagnostics
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Tokens { query, json } => cmd_tokens(&query, json),
        Commands::Parse { query } => cmd_parse(&query),
        Commands::Filter {
            query,
            compact,
            strict,
        } => cmd_filter(&query, compact, strict),
    }
}

/// Implements `clipsearch tokens`.
fn cmd_tokens(query: &str, json: bool) -> ExitCode {
    let tokens = tokenize(query);

    if json {
        match serde_json::to_string_pretty(&tokens) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("error: could not serialize tokens: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Kind", "Value", "Line", "Column", "Offset"]);
    for token in &tokens {
        table.add_row(vec![
            Cell::new(format!("{:?}", token.kind)),
            Cell::new(&token.value),
            Cell::new(token.position.line.to_string()),
            Cell::new(token.position.column.to_string()),
            Cell::new(token.position.offset.to_string()),
        ]);
    }
    println!("{table}");

    ExitCode::SUCCESS
}

/// Implements `clipsearch parse`.
fn cmd_parse(query: &str) -> ExitCode {
    let tokens = tokenize(query);
    let parsed = parse(&tokens);
    let mut diagnostics = parsed.diagnostics;

    match parsed.expr {
        Some(expr) => {
            let normalized = normalize(expr, &FieldTable::default());
            diagnostics.extend(normalized.diagnostics);
            print!("{}", normalized.expr);
        }
        None => println!("(empty query)"),
    }

    report_diagnostics(query, &diagnostics);
    ExitCode::SUCCESS
}

/// Implements `clipsearch filter`.
fn cmd_filter(query: &str, compact: bool, strict: bool) -> ExitCode {
    let parsed = parse_query(query);

    let rendered = if compact {
        serde_json::to_string(&parsed.filter)
    } else {
        serde_json::to_string_pretty(&parsed.filter)
    };
    match rendered {
        Ok(out) => println!("{out}"),
        Err(e) => {
            eprintln!("error: could not serialize filter: {e}");
            return ExitCode::FAILURE;
        }
    }

    report_diagnostics(query, &parsed.diagnostics);
    if strict && !parsed.diagnostics.is_empty() {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Prints each diagnostic to stderr with caret context where available.
fn report_diagnostics(query: &str, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic.format_with_context(query));
    }
}
