//! Output formatting helpers for human-readable and JSON output.

use docfields::{
    doc::{ChangeSet, FlushMode},
    value::{Document, json},
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Print a table with aligned columns in human-readable format.
///
/// `headers` and each row in `rows` must have the same length.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }

    let col_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:<width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_line.join("  "));

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .take(col_count)
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect();
        println!("{}", line.join("  "));
    }
}

/// Print the paths a save wrote and removed.
pub fn print_changes(changes: &ChangeSet, format: OutputFormat) -> Result<(), serde_json::Error> {
    let mode = match changes.mode {
        FlushMode::Full => "full",
        FlushMode::Incremental => "incremental",
    };
    match format {
        OutputFormat::Human => {
            if changes.is_empty() {
                println!("Nothing to save.");
                return Ok(());
            }
            let mut rows: Vec<Vec<String>> = changes
                .set
                .iter()
                .map(|(path, value)| vec!["set".to_string(), path.clone(), value.to_string()])
                .collect();
            rows.extend(
                changes
                    .unset
                    .iter()
                    .map(|path| vec!["unset".to_string(), path.clone(), String::new()]),
            );
            println!("Saved ({mode}):");
            print_table(&["OP", "PATH", "VALUE"], &rows);
        }
        OutputFormat::Json => {
            let set: serde_json::Map<String, serde_json::Value> = changes
                .set
                .iter()
                .map(|(path, value)| (path.clone(), json::to_json(value)))
                .collect();
            let value = serde_json::json!({
                "mode": mode,
                "set": set,
                "unset": changes.unset,
            });
            println!("{}", serde_json::to_string(&value)?);
        }
    }
    Ok(())
}

/// Print a whole stored document.
pub fn print_document(document: &Document, format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Human => {
            let rows: Vec<Vec<String>> = document
                .iter()
                .map(|(name, value)| vec![name.to_string(), value.to_string()])
                .collect();
            print_table(&["FIELD", "VALUE"], &rows);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&json::document_to_json(document))?);
        }
    }
    Ok(())
}
