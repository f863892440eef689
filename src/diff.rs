use crate::csv::Snapshot;

const SUMMARY_HEADER: &str = "**Tracker Update Detected:**";

/// Per-column change lines, in column order.
const TRACKED_COLUMNS: &[(&str, &str)] = &[
    ("URL", "🔗 Link changed for"),
    ("Credit", "✏️ Credit changed for"),
    ("Links Work", "🔄 Links Work status changed for"),
    ("Updated", "🕒 Updated date changed for"),
    ("Best", "⭐ Best flag changed for"),
];

/// Lists removed artists, then added ones, then column changes of the
/// artists present in both snapshots. Every group is sorted by name.
pub fn detect_changes(old: &Snapshot, new: &Snapshot) -> Vec<String> {
    let mut changes = Vec::new();

    for name in old.keys().filter(|name| !new.contains_key(*name)) {
        changes.push(format!("❌ Removed: **{name}**"));
    }

    for name in new.keys().filter(|name| !old.contains_key(*name)) {
        changes.push(format!("➕ Added: **{name}**"));
    }

    for (name, old_row) in old {
        let Some(new_row) = new.get(name) else {
            continue;
        };

        for (column, message) in TRACKED_COLUMNS {
            if old_row.get(*column) != new_row.get(*column) {
                changes.push(format!("{message} **{name}**"));
            }
        }
    }

    changes
}

pub fn summary(changes: &[String]) -> String {
    format!("{SUMMARY_HEADER}\n{}", changes.join("\n"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::csv::Record;

    fn record(name: &str, url: &str, credit: &str, best: &str) -> (String, Record) {
        let record = [
            ("Artist Name", name),
            ("URL", url),
            ("Credit", credit),
            ("Links Work", "Yes"),
            ("Updated", "Yes"),
            ("Best", best),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
        (name.to_owned(), record)
    }

    #[test]
    fn identical_snapshots_have_no_changes() {
        let snapshot: Snapshot = [record("Drake", "u", "c", "Yes")].into_iter().collect();
        assert!(detect_changes(&snapshot, &snapshot).is_empty());
    }

    #[test]
    fn reports_removed_added_then_modified() {
        let old: Snapshot = [
            record("Drake", "u1", "c", "Yes"),
            record("Beta", "u", "c", "Yes"),
            record("Alpha", "u", "c", "Yes"),
        ]
        .into_iter()
        .collect();
        let new: Snapshot = [
            record("Drake", "u2", "c2", "No"),
            record("Zed", "u", "c", "No"),
            record("Carti", "u", "c", "No"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            detect_changes(&old, &new),
            vec![
                "❌ Removed: **Alpha**",
                "❌ Removed: **Beta**",
                "➕ Added: **Carti**",
                "➕ Added: **Zed**",
                "🔗 Link changed for **Drake**",
                "✏️ Credit changed for **Drake**",
                "⭐ Best flag changed for **Drake**",
            ]
        );
    }

    #[test]
    fn everything_is_added_against_empty() {
        let new: Snapshot = [record("Drake", "u", "c", "Yes")].into_iter().collect();
        assert_eq!(detect_changes(&Snapshot::new(), &new), vec!["➕ Added: **Drake**"]);
    }

    #[test]
    fn summary_has_header_line() {
        let changes = vec!["➕ Added: **A**".to_owned(), "❌ Removed: **B**".to_owned()];
        assert_eq!(
            summary(&changes),
            "**Tracker Update Detected:**\n➕ Added: **A**\n❌ Removed: **B**"
        );
    }
}
