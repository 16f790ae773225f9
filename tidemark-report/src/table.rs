//! Minimal delimited-text table.
//!
//! Cells are plain strings and the empty string doubles as the null
//! rendering, which is exactly what the report flows need. Parsing and
//! writing follow RFC 4180: `,` delimiter, `"` quoting with doubled
//! quotes, quoted fields may span lines. Blank lines are skipped on
//! read, matching the usual tabular-tool behaviour.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::ReportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Position of a named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Append a column. `values` must carry exactly one entry per row.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<String>) {
        debug_assert_eq!(values.len(), self.rows.len(), "one value per row");
        self.headers.push(name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    /// Load a table from a CSV file. The first record is the header row;
    /// every data record must have the same number of fields.
    pub fn read_csv_path(path: &Path) -> Result<Self, ReportError> {
        let content = fs::read_to_string(path).map_err(|source| ReportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        parse_str(&content).map_err(|(line, message)| ReportError::Csv {
            path: path.to_path_buf(),
            line,
            message,
        })
    }

    /// Render as CSV with `\n` line endings, quoting only fields that
    /// need it.
    ///
    /// ```
    /// use tidemark_report::Table;
    ///
    /// let mut t = Table::new(vec!["a".into(), "b".into()]);
    /// t.rows.push(vec!["1".into(), "x,y".into()]);
    /// assert_eq!(t.to_csv_string(), "a,b\n1,\"x,y\"\n");
    /// ```
    pub fn to_csv_string(&self) -> String {
        let mut out = String::new();
        write_record(&mut out, &self.headers);
        for row in &self.rows {
            write_record(&mut out, row);
        }
        out
    }

    /// Write the table to `path` through a sibling temp file and an
    /// atomic rename. Readers observe either the old file or the new
    /// one, never a partial write.
    pub fn write_csv_path_atomic(&self, path: &Path) -> Result<(), ReportError> {
        let content = self.to_csv_string();
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(parent).map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tmp.write_all(content.as_bytes())
            .map_err(|source| ReportError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        tmp.persist(path).map_err(|e| ReportError::Write {
            path: path.to_path_buf(),
            source: e.error,
        })?;
        Ok(())
    }
}

fn write_record(out: &mut String, fields: &[String]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_field(out, field);
    }
    out.push('\n');
}

fn write_field(out: &mut String, field: &str) {
    let needs_quoting = field.contains(',')
        || field.contains('"')
        || field.contains('\n')
        || field.contains('\r');
    if !needs_quoting {
        out.push_str(field);
        return;
    }
    out.push('"');
    for ch in field.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
}

fn parse_str(content: &str) -> Result<Table, (usize, String)> {
    let mut records = parse_records(content)?;
    if records.is_empty() {
        return Err((1, "no header row".to_string()));
    }
    let (_, headers) = records.remove(0);
    let expected = headers.len();
    let mut rows = Vec::with_capacity(records.len());
    for (line, row) in records {
        if row.len() != expected {
            return Err((
                line,
                format!("expected {expected} fields, found {}", row.len()),
            ));
        }
        rows.push(row);
    }
    Ok(Table { headers, rows })
}

/// Split CSV text into records, each tagged with the line it starts on.
fn parse_records(input: &str) -> Result<Vec<(usize, Vec<String>)>, (usize, String)> {
    enum State {
        FieldStart,
        Unquoted,
        Quoted,
        QuoteInQuoted,
    }

    // Close out the current record. A record that is still empty when
    // its only field is empty was a blank line and produces nothing.
    fn end_row(
        records: &mut Vec<(usize, Vec<String>)>,
        row: &mut Vec<String>,
        field: &mut String,
        had_field: bool,
        row_line: usize,
    ) {
        if had_field || !row.is_empty() {
            row.push(std::mem::take(field));
            records.push((row_line, std::mem::take(row)));
        }
    }

    let mut records: Vec<(usize, Vec<String>)> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut state = State::FieldStart;
    let mut line = 1usize;
    let mut row_line = 1usize;

    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        match state {
            State::FieldStart => match ch {
                '"' => state = State::Quoted,
                ',' => row.push(String::new()),
                '\n' => {
                    end_row(&mut records, &mut row, &mut field, false, row_line);
                    line += 1;
                    row_line = line;
                }
                '\r' if chars.peek() == Some(&'\n') => {
                    chars.next();
                    end_row(&mut records, &mut row, &mut field, false, row_line);
                    line += 1;
                    row_line = line;
                }
                _ => {
                    field.push(ch);
                    state = State::Unquoted;
                }
            },
            State::Unquoted => match ch {
                ',' => {
                    row.push(std::mem::take(&mut field));
                    state = State::FieldStart;
                }
                '\n' => {
                    end_row(&mut records, &mut row, &mut field, true, row_line);
                    line += 1;
                    row_line = line;
                    state = State::FieldStart;
                }
                '\r' if chars.peek() == Some(&'\n') => {
                    chars.next();
                    end_row(&mut records, &mut row, &mut field, true, row_line);
                    line += 1;
                    row_line = line;
                    state = State::FieldStart;
                }
                // Stray quotes and lone carriage returns stay literal.
                _ => field.push(ch),
            },
            State::Quoted => match ch {
                '"' => state = State::QuoteInQuoted,
                '\n' => {
                    field.push('\n');
                    line += 1;
                }
                _ => field.push(ch),
            },
            State::QuoteInQuoted => match ch {
                '"' => {
                    field.push('"');
                    state = State::Quoted;
                }
                ',' => {
                    row.push(std::mem::take(&mut field));
                    state = State::FieldStart;
                }
                '\n' => {
                    end_row(&mut records, &mut row, &mut field, true, row_line);
                    line += 1;
                    row_line = line;
                    state = State::FieldStart;
                }
                '\r' if chars.peek() == Some(&'\n') => {
                    chars.next();
                    end_row(&mut records, &mut row, &mut field, true, row_line);
                    line += 1;
                    row_line = line;
                    state = State::FieldStart;
                }
                other => {
                    return Err((
                        line,
                        format!("unexpected {other:?} after closing quote"),
                    ));
                }
            },
        }
    }

    match state {
        State::Quoted => Err((row_line, "unterminated quoted field".to_string())),
        State::FieldStart => {
            if !row.is_empty() {
                row.push(String::new());
                records.push((row_line, row));
            }
            Ok(records)
        }
        State::Unquoted | State::QuoteInQuoted => {
            row.push(field);
            records.push((row_line, row));
            Ok(records)
        }
    }
}
