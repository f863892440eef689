//! Extraction of artist rows from the sheet's `table.waffle` html export.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::config::EXCLUDED_NAMES;
use crate::csv::{parse_rows, write_rows, NAME_COLUMN};
use crate::{Error, Result};

pub const HEADER: [&str; 6] = [NAME_COLUMN, "URL", "Credit", "Links Work", "Updated", "Best"];

/// Title and column header rows at the top of the sheet.
const SKIPPED_ROWS: usize = 3;

/// Rows after this marker are no longer part of the starred section.
const STARRED_SECTION_END: &str = "AI Models";

const FLAGGED: char = '🚩';

const DECORATIONS: &[char] = &['\u{2B50}', '\u{FE0F}', '🤖', '🎭'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistRow {
    pub name: String,
    pub url: String,
    pub credit: String,
    pub links_work: String,
    pub updated: String,
    pub best: bool,
}

impl ArtistRow {
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.url.clone(),
            self.credit.clone(),
            self.links_work.clone(),
            self.updated.clone(),
            star_flag(self.best).to_owned(),
        ]
    }

    /// Parses a row in [`HEADER`] column order.
    pub fn from_record(record: &[String]) -> Option<Self> {
        let [name, url, credit, links_work, updated, best, ..] = record else {
            return None;
        };
        Some(Self {
            name: name.clone(),
            url: url.clone(),
            credit: credit.clone(),
            links_work: links_work.clone(),
            updated: updated.clone(),
            best: best == "Yes",
        })
    }
}

pub fn star_flag(starred: bool) -> &'static str {
    if starred {
        "Yes"
    } else {
        "No"
    }
}

pub fn clean_artist_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| !DECORATIONS.contains(c))
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Sheet helper rows like "BPM & Key" trackers slip in under varying names.
fn is_bpm_key_tracker(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("bpm") && lower.contains("key")
}

/// Parses every artist row of the sheet, in sheet order. Repeated names are
/// all kept.
pub fn parse_artists(html: &str) -> Result<Vec<ArtistRow>> {
    let lc = html.to_ascii_lowercase();
    let (body_start, body_end) = waffle_body(&lc).ok_or(Error::TableNotFound)?;

    let mut rows = Vec::new();
    let mut starred = true;

    for (index, (row_start, row_end)) in elements(&lc, "tr", body_start, body_end).enumerate() {
        if index < SKIPPED_ROWS {
            continue;
        }

        let cells: Vec<(usize, usize)> = elements(&lc, "td", row_start, row_end).collect();
        if cells.len() < 4 {
            continue;
        }

        let cell = |i: usize| inner_text(&html[cells[i].0..cells[i].1]);
        let (name_start, name_end) = cells[0];

        let raw_name = cell(0);
        let url = first_href(&html[name_start..name_end], &lc[name_start..name_end]).unwrap_or_default();
        if raw_name.is_empty() || url.is_empty() {
            continue;
        }

        if raw_name.contains(STARRED_SECTION_END) {
            starred = false;
        }

        let name = clean_artist_name(&raw_name);
        if EXCLUDED_NAMES.contains(&name.as_str()) || raw_name.contains(FLAGGED) || is_bpm_key_tracker(&name) {
            debug!(%name, "skipping row");
            continue;
        }

        rows.push(ArtistRow {
            name,
            url,
            credit: cell(1),
            links_work: cell(3),
            updated: cell(2),
            best: starred,
        });
    }

    Ok(rows)
}

/// Appends manual rows for artists the sheet does not list.
pub fn merge_manual_rows(rows: &mut Vec<ArtistRow>, manual: impl IntoIterator<Item = ArtistRow>) {
    let mut seen: HashSet<String> = rows.iter().map(|r| r.name.clone()).collect();
    for row in manual {
        if is_bpm_key_tracker(&row.name) || !seen.insert(row.name.clone()) {
            continue;
        }
        rows.push(row);
    }
}

/// Starred artists first, then by name ignoring case.
pub fn sort_rows(rows: &mut [ArtistRow]) {
    rows.sort_by(|a, b| match b.best.cmp(&a.best) {
        Ordering::Equal => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        other => other,
    });
}

pub fn read_manual_rows(path: &Path) -> Result<Vec<ArtistRow>> {
    let text = fs::read_to_string(path)?;
    let rows = parse_rows(&text)
        .into_iter()
        .filter(|r| r.first().map(String::as_str) != Some(NAME_COLUMN))
        .filter_map(|r| {
            let row = ArtistRow::from_record(&r);
            if row.is_none() {
                warn!(?r, "ignoring manual row with fewer than {} columns", HEADER.len());
            }
            row
        })
        .collect();
    Ok(rows)
}

/// Regenerates the csv dataset from the mirrored sheet html.
#[instrument(skip_all, fields(html = %html_path.display(), csv = %csv_path.display()))]
pub fn generate_csv(html_path: &Path, csv_path: &Path, manual_rows: Option<&Path>) -> Result<usize> {
    info!("generating csv");
    let html = fs::read_to_string(html_path)?;
    let mut rows = parse_artists(&html)?;

    if let Some(path) = manual_rows {
        match read_manual_rows(path) {
            Ok(manual) => merge_manual_rows(&mut rows, manual),
            Err(e) => warn!("failed to read manual rows from {}: {}", path.display(), e),
        }
    }

    sort_rows(&mut rows);

    let file = BufWriter::new(File::create(csv_path)?);
    write_rows(file, &HEADER, rows.iter().map(ArtistRow::to_record))?;

    info!(rows = rows.len(), "generated csv");
    Ok(rows.len())
}

/* ---------------- Markup scanning ---------------- */

/// Position right after the opening `<tbody ...>` of the first waffle table
/// and the position of its `</tbody>`.
fn waffle_body(lc: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(start) = find_tag(lc, "table", from) {
        let open_end = lc[start..].find('>')? + start + 1;
        let open_tag = &lc[start..open_end];
        if attr_value(open_tag, open_tag, "class").is_some_and(|c| c.split_whitespace().any(|c| c == "waffle")) {
            let table_end = lc[open_end..].find("</table").map_or(lc.len(), |i| i + open_end);
            let body = find_tag(&lc[..table_end], "tbody", open_end)?;
            let body_start = lc[body..].find('>')? + body + 1;
            let body_end = lc[body_start..table_end].find("</tbody").map_or(table_end, |i| i + body_start);
            return Some((body_start, body_end));
        }
        from = open_end;
    }
    None
}

/// Finds `<tag` followed by whitespace, `>` or `/`.
fn find_tag(lc: &str, tag: &str, from: usize) -> Option<usize> {
    let pattern = format!("<{tag}");
    let mut from = from;
    while let Some(i) = lc.get(from..)?.find(&pattern) {
        let start = from + i;
        let next = lc[start + pattern.len()..].chars().next();
        if matches!(next, Some(c) if c == '>' || c == '/' || c.is_ascii_whitespace()) {
            return Some(start);
        }
        from = start + pattern.len();
    }
    None
}

/// Inner ranges of the `<tag>` elements between `from` and `to`.
fn elements<'a>(lc: &'a str, tag: &'a str, from: usize, to: usize) -> impl Iterator<Item = (usize, usize)> + 'a {
    let close = format!("</{tag}");
    let mut pos = from;
    std::iter::from_fn(move || {
        let start = find_tag(&lc[..to], tag, pos)?;
        let inner_start = lc[start..to].find('>')? + start + 1;
        let inner_end = lc[inner_start..to].find(&close).map_or(to, |i| i + inner_start);
        pos = inner_end;
        Some((inner_start, inner_end))
    })
}

/// Value of `name` inside an opening tag. `lc` is the lowercased tag.
fn attr_value(tag: &str, lc: &str, name: &str) -> Option<String> {
    let pattern = format!("{name}=");
    let mut from = 0;
    while let Some(i) = lc[from..].find(&pattern) {
        let start = from + i;
        from = start + pattern.len();
        if !lc[..start].ends_with(|c: char| c.is_ascii_whitespace()) {
            continue;
        }

        let rest = &tag[from..];
        let value = match rest.chars().next() {
            Some(q @ ('"' | '\'')) => rest[1..].split(q).next().unwrap_or_default(),
            _ => rest
                .split(|c: char| c.is_ascii_whitespace() || c == '>')
                .next()
                .unwrap_or_default(),
        };
        return Some(decode_entities(value));
    }
    None
}

fn first_href(inner: &str, lc: &str) -> Option<String> {
    let start = find_tag(lc, "a", 0)?;
    let end = lc[start..].find('>')? + start;
    attr_value(&inner[start..end], &lc[start..end], "href")
}

/// Text of the markup with tags removed; each text node is trimmed and the
/// nodes are joined without separators.
fn inner_text(markup: &str) -> String {
    let mut out = String::new();
    let mut node = String::new();
    let mut in_tag = false;

    for ch in markup.chars() {
        match ch {
            '<' => {
                in_tag = true;
                out.push_str(decode_entities(&node).trim());
                node.clear();
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => node.push(ch),
            _ => {}
        }
    }
    out.push_str(decode_entities(&node).trim());
    out
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_owned();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest[1..].find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &rest[1..semi + 1];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{A0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(|n| n.ok())
                    .and_then(char::from_u32),
            };
            ch.map(|ch| (ch, semi + 2))
        });

        match decoded {
            Some((ch, len)) => {
                out.push(ch);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
