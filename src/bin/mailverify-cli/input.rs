use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result, bail};
use mailverify_lib::Row;
use serde_json::Value;

use crate::args::Commands;

/// Reads the rows named by a `batch` command.
pub fn load(cmd: &Commands, field: &str) -> Result<Vec<Row>> {
    let Commands::Batch { stdin, input, .. } = cmd else {
        return Ok(Vec::new());
    };
    let source = open_source(*stdin, input.as_deref())?;

    #[cfg(feature = "with-csv")]
    if let Commands::Batch { csv: true, .. } = cmd {
        return read_csv(source, field);
    }

    read_lines(BufReader::new(source), field)
}

fn open_source(stdin: bool, input: Option<&Path>) -> Result<Box<dyn Read>> {
    match (stdin, input) {
        (true, None) => Ok(Box::new(io::stdin().lock())),
        (false, Some(path)) => {
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            Ok(Box::new(file))
        }
        (true, Some(_)) => bail!("--stdin and --input are mutually exclusive"),
        (false, None) => bail!("batch needs --stdin or --input FILE"),
    }
}

/// One address per line; blank lines are skipped.
pub fn read_lines<R: BufRead>(reader: R, field: &str) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line.context("read input")?;
        let address = line.trim();
        if address.is_empty() {
            continue;
        }
        let mut row = Row::new();
        row.insert(field.to_string(), Value::String(address.to_string()));
        rows.push(row);
    }
    Ok(rows)
}

/// CSV with a header row. The address column is the first header containing
/// "email" (any case); every column is kept as an extra field and the address
/// is copied under `field`.
#[cfg(feature = "with-csv")]
pub fn read_csv<R: Read>(reader: R, field: &str) -> Result<Vec<Row>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().context("read CSV header")?.clone();
    let Some(column) = headers
        .iter()
        .position(|h| h.to_lowercase().contains("email"))
    else {
        bail!("no email column found in CSV");
    };

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.context("read CSV record")?;
        let mut row = Row::new();
        for (name, value) in headers.iter().zip(record.iter()) {
            row.insert(name.to_string(), Value::String(value.to_string()));
        }
        let address = record.get(column).unwrap_or_default();
        row.insert(field.to_string(), Value::String(address.to_string()));
        rows.push(row);
    }
    Ok(rows)
}
