use anyhow::{Result, bail};
#[cfg(feature = "with-csv")]
use anyhow::Context;
use mailverify_lib::Row;
use mailverify_lib::batch::{REASON_FIELD, RESULT_FIELD};
use serde_json::Value;

pub fn write_reports(rows: &[Row], format: &str, out: Option<&str>, field: &str) -> Result<()> {
    let bytes = render(rows, format, field)?;
    match out {
        Some(path) => write_all_atomically(path, &bytes),
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

pub fn any_invalid(rows: &[Row]) -> bool {
    rows.iter()
        .any(|row| row.get(RESULT_FIELD).and_then(Value::as_str) != Some("Valid"))
}

fn render(rows: &[Row], format: &str, field: &str) -> Result<Vec<u8>> {
    match format {
        "human" => Ok(render_human(rows, field).into_bytes()),
        "json" => {
            let mut s = serde_json::to_string_pretty(rows)?;
            s.push('\n');
            Ok(s.into_bytes())
        }
        "ndjson" => {
            let mut buf = Vec::new();
            for row in rows {
                buf.extend_from_slice(serde_json::to_string(row)?.as_bytes());
                buf.push(b'\n');
            }
            Ok(buf)
        }
        "csv" => render_csv(rows),
        other => bail!("unknown --format '{other}', use: human|json|ndjson|csv"),
    }
}

fn render_human(rows: &[Row], field: &str) -> String {
    let mut out = String::new();
    for row in rows {
        let address = row.get(field).and_then(Value::as_str).unwrap_or("");
        let reason = row.get(REASON_FIELD).and_then(Value::as_str).unwrap_or("");
        let tag = match row.get(RESULT_FIELD).and_then(Value::as_str) {
            Some("Valid") => "[VALID]  ",
            _ => "[INVALID]",
        };
        out.push_str(&format!("{tag} {address} :: {reason}\n"));
    }
    out
}

#[cfg(feature = "with-csv")]
fn render_csv(rows: &[Row]) -> Result<Vec<u8>> {
    // colonnes dans l'ordre de première apparition
    let mut headers: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !headers.contains(&key.as_str()) {
                headers.push(key.as_str());
            }
        }
    }

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(&headers)?;
    for row in rows {
        wtr.write_record(headers.iter().map(|h| cell(row.get(*h))))?;
    }
    wtr.into_inner().context("flush CSV")
}

#[cfg(not(feature = "with-csv"))]
fn render_csv(_rows: &[Row]) -> Result<Vec<u8>> {
    bail!("format=csv nécessite la feature 'with-csv'")
}

#[cfg(feature = "with-csv")]
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    use std::io::Write;
    let tmp = format!("{}.tmp", path);
    {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Row> {
        let a = json!({"email": "a@x.com", "name": "Ann",
                       "validation_result": "Valid",
                       "validation_reason": "Email format and mail server verified"});
        let b = json!({"email": "bad", "validation_result": "Invalid",
                       "validation_reason": "Invalid email format"});
        [a, b]
            .into_iter()
            .map(|v| match v {
                Value::Object(map) => map,
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn human_lines_carry_tag_and_reason() {
        let text = render_human(&rows(), "email");
        assert_eq!(
            text,
            "[VALID]   a@x.com :: Email format and mail server verified\n\
             [INVALID] bad :: Invalid email format\n"
        );
    }

    #[test]
    fn ndjson_is_one_object_per_line() {
        let bytes = render(&rows(), "ndjson", "email").expect("render");
        let text = String::from_utf8(bytes).expect("utf8");
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with(r#"{"email":"a@x.com","name":"Ann""#));
    }

    #[test]
    fn any_invalid_spots_invalid_rows() {
        assert!(any_invalid(&rows()));
        assert!(!any_invalid(&rows()[..1]));
    }

    #[cfg(feature = "with-csv")]
    #[test]
    fn csv_uses_union_of_columns() {
        let bytes = render(&rows(), "csv", "email").expect("render");
        let text = String::from_utf8(bytes).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("email,name,validation_result,validation_reason")
        );
        assert_eq!(
            lines.next(),
            Some("a@x.com,Ann,Valid,Email format and mail server verified")
        );
        assert_eq!(lines.next(), Some("bad,,Invalid,Invalid email format"));
    }
}
