//! The outbound links shown on the landing page.

use serde::Serialize;

use crate::config::{Settings, REPOSITORY_URL};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behavior {
    /// Opens the target in a new browsing context.
    OpenInNewContext,
    /// Asks the browser to save the target under `filename`.
    TriggerDownload { filename: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IconKind {
    Github,
    Download,
    Document,
    Spreadsheet,
}

impl IconKind {
    /// Inline lucide icon markup, stroked with `currentColor`.
    pub fn svg(self) -> &'static str {
        match self {
            IconKind::Github => concat!(
                r#"<svg class="icon" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" aria-hidden="true">"#,
                r#"<path d="M15 22v-4a4.8 4.8 0 0 0-1-3.5c3 0 6-2 6-5.5.08-1.25-.27-2.48-1-3.5.28-1.15.28-2.35 0-3.5 0 0-1 0-3 1.5-2.64-.5-5.36-.5-8 0C6 2 5 2 5 2c-.3 1.15-.3 2.35 0 3.5A5.403 5.403 0 0 0 4 9c0 3.5 3 5.5 6 5.5-.39.49-.68 1.05-.85 1.65-.17.6-.22 1.23-.15 1.85v4"/>"#,
                r#"<path d="M9 18c-4.51 2-5-2-7-2"/></svg>"#
            ),
            IconKind::Download => concat!(
                r#"<svg class="icon" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" aria-hidden="true">"#,
                r#"<path d="M15 2H6a2 2 0 0 0-2 2v16a2 2 0 0 0 2 2h12a2 2 0 0 0 2-2V7Z"/><path d="M14 2v4a2 2 0 0 0 2 2h4"/>"#,
                r#"<path d="M12 18v-6"/><path d="m9 15 3 3 3-3"/></svg>"#
            ),
            IconKind::Document => concat!(
                r#"<svg class="icon" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" aria-hidden="true">"#,
                r#"<path d="M15 2H6a2 2 0 0 0-2 2v16a2 2 0 0 0 2 2h12a2 2 0 0 0 2-2V7Z"/><path d="M14 2v4a2 2 0 0 0 2 2h4"/>"#,
                r#"<path d="M10 9H8"/><path d="M16 13H8"/><path d="M16 17H8"/></svg>"#
            ),
            IconKind::Spreadsheet => concat!(
                r#"<svg class="icon" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" aria-hidden="true">"#,
                r#"<path d="M15 2H6a2 2 0 0 0-2 2v16a2 2 0 0 0 2 2h12a2 2 0 0 0 2-2V7Z"/><path d="M14 2v4a2 2 0 0 0 2 2h4"/>"#,
                r#"<path d="M8 13h2"/><path d="M14 13h2"/><path d="M8 17h2"/><path d="M14 17h2"/></svg>"#
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAction {
    pub label: String,
    pub url: String,
    pub behavior: Behavior,
    pub icon: IconKind,
}

impl LinkAction {
    fn external(label: &str, url: String, icon: IconKind) -> Self {
        Self {
            label: label.to_owned(),
            url,
            behavior: Behavior::OpenInNewContext,
            icon,
        }
    }

    fn download(label: &str, url: String, filename: &str, icon: IconKind) -> Self {
        Self {
            label: label.to_owned(),
            url,
            behavior: Behavior::TriggerDownload {
                filename: filename.to_owned(),
            },
            icon,
        }
    }

    pub fn opens_new_context(&self) -> bool {
        matches!(self.behavior, Behavior::OpenInNewContext)
    }

    pub fn download_filename(&self) -> Option<&str> {
        match &self.behavior {
            Behavior::TriggerDownload { filename } => Some(filename),
            Behavior::OpenInNewContext => None,
        }
    }
}

/// Buttons in display order: repository first, then the three dataset formats.
pub fn landing_actions(settings: &Settings) -> Vec<LinkAction> {
    vec![
        LinkAction::external("View on GitHub", REPOSITORY_URL.to_owned(), IconKind::Github),
        LinkAction::download(
            "Download CSV",
            settings.public_file_url("artists.csv"),
            "artists.csv",
            IconKind::Download,
        ),
        LinkAction::external("View HTML", settings.public_file_url("artists.html"), IconKind::Document),
        LinkAction::download(
            "Download XLSX",
            settings.public_file_url("artists.xlsx"),
            "ArtistGrid.xlsx",
            IconKind::Spreadsheet,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn filename_present_only_for_downloads() {
        for action in landing_actions(&Settings::default()) {
            assert_ne!(action.opens_new_context(), action.download_filename().is_some(), "{}", action.label);
        }
    }

    #[test]
    fn default_actions_match_public_urls() {
        let actions = landing_actions(&Settings::default());
        let summary: Vec<_> = actions
            .iter()
            .map(|a| (a.label.as_str(), a.url.as_str(), a.download_filename()))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("View on GitHub", "https://github.com/ArtistGrid/Sheets", None),
                ("Download CSV", "https://sheets.artistgrid.cx/artists.csv", Some("artists.csv")),
                ("View HTML", "https://sheets.artistgrid.cx/artists.html", None),
                ("Download XLSX", "https://sheets.artistgrid.cx/artists.xlsx", Some("ArtistGrid.xlsx")),
            ]
        );
    }

    #[test]
    fn labels_and_targets_are_distinct() {
        let actions = landing_actions(&Settings::default());
        let labels: HashSet<_> = actions.iter().map(|a| &a.label).collect();
        let urls: HashSet<_> = actions.iter().map(|a| &a.url).collect();

        assert_eq!(labels.len(), actions.len());
        assert_eq!(urls.len(), actions.len());
    }
}
