use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use sheetsync_parse::{Binding, SpecialValue};

#[derive(Parser, Debug)]
#[command(
    name = "binding-lint",
    about = "Decode sheetsync layer names (or special values) and print them as JSON"
)]
struct Cli {
    /// Inputs to decode. Reads one input per line from stdin when empty.
    inputs: Vec<String>,

    /// Decode inputs as chained special values instead of layer names.
    #[arg(long)]
    chained: bool,

    /// Pretty-print each JSON document.
    #[arg(long)]
    pretty: bool,

    /// Exit with a non-zero code when an input decodes to nothing.
    #[arg(long)]
    strict: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Decoded {
    Binding(Binding),
    Special(SpecialValue),
}

#[derive(Serialize)]
struct Report<'a> {
    input: &'a str,
    decoded: Decoded,
}

fn decode(input: &str, chained: bool) -> (Decoded, bool) {
    if chained {
        let value = SpecialValue::parse(input);
        let empty = value.is_empty();
        (Decoded::Special(value), empty)
    } else {
        let binding = Binding::parse(input);
        let empty = !binding.has_binding() && !binding.is_ignored();
        (Decoded::Binding(binding), empty)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let inputs = if cli.inputs.is_empty() {
        io::stdin()
            .lock()
            .lines()
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read inputs from stdin")?
    } else {
        cli.inputs.clone()
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut empty_inputs = Vec::new();
    for input in &inputs {
        let (decoded, empty) = decode(input, cli.chained);
        if empty {
            tracing::warn!(input = %input, "input decoded to nothing");
            empty_inputs.push(input.as_str());
        }
        let report = Report { input, decoded };
        let json = if cli.pretty {
            serde_json::to_string_pretty(&report)
        } else {
            serde_json::to_string(&report)
        }
        .context("failed to serialize decoded input")?;
        writeln!(out, "{json}").context("failed to write output")?;
    }

    if cli.strict && !empty_inputs.is_empty() {
        anyhow::bail!(
            "{} input(s) decoded to nothing: {:?}",
            empty_inputs.len(),
            empty_inputs
        );
    }
    Ok(())
}
