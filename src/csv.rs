use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::mem::take;
use std::path::Path;

use tracing::warn;

use crate::Result;

pub const NAME_COLUMN: &str = "Artist Name";

/// One CSV row keyed by header.
pub type Record = HashMap<String, String>;

/// Rows of a dataset keyed by artist name.
pub type Snapshot = BTreeMap<String, Record>;

/* ---------------- Writing ---------------- */

/// Writes one row with every field quoted.
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            w.write_all(b",")?;
        } else {
            first = false;
        }
        write!(w, "\"{}\"", cell.as_ref().replace('"', "\"\""))?;
    }
    w.write_all(b"\r\n")
}

pub fn write_rows<W, H, R>(mut w: W, header: &[H], rows: R) -> io::Result<()>
where
    W: Write,
    H: AsRef<str>,
    R: IntoIterator,
    R::Item: AsRef<[String]>,
{
    write_row(&mut w, header)?;
    for row in rows {
        write_row(&mut w, row.as_ref())?;
    }
    w.flush()
}

/* ---------------- Parsing ---------------- */

/// Quote-aware CSV parser, tolerant of CRLF and a missing final newline.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

/// Builds a name-keyed snapshot. The first row is the header; rows without a
/// name are dropped.
pub fn parse_snapshot(text: &str) -> Snapshot {
    let mut rows = parse_rows(text).into_iter();
    let Some(header) = rows.next() else {
        return Snapshot::new();
    };

    let mut snapshot = Snapshot::new();
    for row in rows {
        let record: Record = header.iter().cloned().zip(row).collect();
        match record.get(NAME_COLUMN) {
            Some(name) if !name.is_empty() => {
                snapshot.insert(name.clone(), record);
            }
            _ => {}
        }
    }
    snapshot
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_snapshot(&text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("csv file not found: {}", path.display());
            Ok(Snapshot::new())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn quotes_every_field() {
        let mut out = Vec::new();
        write_rows(
            &mut out,
            &["Artist Name", "Credit"],
            [row(&["Kanye West", "say \"hi\", ok"]), row(&["", "x"])],
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\"Artist Name\",\"Credit\"\r\n\"Kanye West\",\"say \"\"hi\"\", ok\"\r\n\"\",\"x\"\r\n"
        );
    }

    #[test]
    fn parses_quoted_fields_and_newlines() {
        let rows = parse_rows("a,\"b,c\",\"d\"\"e\"\r\n\"multi\nline\",2\n\nlast,row");
        assert_eq!(
            rows,
            vec![
                row(&["a", "b,c", "d\"e"]),
                row(&["multi\nline", "2"]),
                row(&["last", "row"]),
            ]
        );
    }

    #[test]
    fn snapshot_keyed_by_name() {
        let text = "\"Artist Name\",\"URL\"\r\n\"Drake\",\"https://a\"\r\n\"\",\"https://b\"\r\n\"Future\",\"https://c\"\r\n";
        let snapshot = parse_snapshot(text);

        assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["Drake", "Future"]);
        assert_eq!(snapshot["Future"]["URL"], "https://c");
    }

    #[test]
    fn written_rows_read_back() {
        let mut out = Vec::new();
        write_rows(&mut out, &[NAME_COLUMN, "URL"], [row(&["A, \"the\" artist", "u"])]).unwrap();
        let snapshot = parse_snapshot(std::str::from_utf8(&out).unwrap());

        assert_eq!(snapshot["A, \"the\" artist"]["URL"], "u");
    }

    #[test]
    fn missing_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_snapshot(&dir.path().join("artists.csv")).unwrap().is_empty());
    }
}
