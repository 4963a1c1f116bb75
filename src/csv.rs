//! Minimal CSV encoding and decoding for result files.
//!
//! Rows are comma separated and terminated by `\n`. A field is quoted when
//! it contains a comma, a double quote, CR or LF, or starts with whitespace;
//! embedded quotes are doubled. Null cells are written as empty fields.

use std::io::{self, Write};

/// Returns true if `field` has to be wrapped in quotes.
fn needs_quotes(field: &str) -> bool {
    if field.is_empty() {
        return false;
    }
    field.contains([',', '"', '\r', '\n']) || field.starts_with(char::is_whitespace)
}

/// Appends one CSV-escaped field to `out`.
fn push_field(out: &mut String, field: &str) {
    if needs_quotes(field) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

/// Encodes a row as a single CSV line including the trailing newline.
pub fn encode_row(row: &[Option<String>]) -> String {
    let mut line = String::new();
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        push_field(&mut line, cell.as_deref().unwrap_or(""));
    }
    line.push('\n');
    line
}

/// Writes CSV rows to an underlying writer.
pub struct CsvWriter<W: Write> {
    inner: W,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_row(&mut self, row: &[Option<String>]) -> io::Result<()> {
        self.inner.write_all(encode_row(row).as_bytes())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Parses at most `max` records from CSV text.
///
/// Quoted fields may span lines. A malformed quote yields an error naming
/// the record it was found in.
pub fn parse_records(input: &str, max: usize) -> Result<Vec<Vec<String>>, String> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if records.len() == max {
            return Ok(records);
        }
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => {
                    in_quotes = false;
                    match chars.peek() {
                        None | Some(',') | Some('\n') | Some('\r') => {}
                        Some(other) => {
                            return Err(format!(
                                "record {}: unexpected {other:?} after closing quote",
                                records.len() + 1
                            ))
                        }
                    }
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if !field_started => {
                in_quotes = true;
                field_started = true;
            }
            '"' => {
                return Err(format!(
                    "record {}: bare quote in unquoted field",
                    records.len() + 1
                ))
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                field_started = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                field_started = false;
            }
            _ => {
                field.push(c);
                field_started = true;
            }
        }
    }

    if in_quotes {
        return Err(format!(
            "record {}: unterminated quoted field",
            records.len() + 1
        ));
    }
    if (field_started || !record.is_empty()) && records.len() < max {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}
