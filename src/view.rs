use std::sync::LazyLock;

use minijinja::{context, AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;

use crate::config::{Settings, CSV_FILENAME, HTML_FILENAME, XLSX_FILENAME};
use crate::links::{landing_actions, IconKind, LinkAction};
use crate::status::StatusInfo;
use crate::Result;

pub const TITLE: &str = "ArtistGrid Sheets";

const NOT_AVAILABLE: &str = "N/A";

static TEMPLATES: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    // icon markup goes out verbatim, everything else passes through `esc`
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.add_filter("esc", escape_html);

    // templates are embedded at compile time, a parse error here is a build defect
    env.add_template("landing.html", include_str!("templates/landing.html"))
        .expect("landing template is valid");
    env.add_template("info.html", include_str!("templates/info.html"))
        .expect("info template is valid");
    env.add_template("not_found.html", include_str!("templates/not_found.html"))
        .expect("not_found template is valid");
    env
});

fn escape_html(value: String) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Presentation of the landing page. Only styling changes between themes,
/// the controls and their attributes stay the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Button grid inside a bordered card
    #[default]
    Card,
    /// Large centred heading above a row of buttons
    Hero,
}

/// One activatable control as it ends up in the markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Control {
    pub label: String,
    pub href: String,
    pub new_context: bool,
    pub download: Option<String>,
    pub icon: IconKind,
    pub icon_svg: &'static str,
}

impl From<&LinkAction> for Control {
    fn from(action: &LinkAction) -> Self {
        Self {
            label: action.label.clone(),
            href: action.url.clone(),
            new_context: action.opens_new_context(),
            download: action.download_filename().map(str::to_owned),
            icon: action.icon,
            icon_svg: action.icon.svg(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LandingView {
    spreadsheet_url: String,
    actions: Vec<LinkAction>,
    theme: Theme,
}

impl LandingView {
    pub fn new(settings: &Settings) -> Self {
        Self {
            spreadsheet_url: settings.tracker_view_url(),
            actions: landing_actions(settings),
            theme: settings.theme,
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn spreadsheet_url(&self) -> &str {
        &self.spreadsheet_url
    }

    pub fn actions(&self) -> &[LinkAction] {
        &self.actions
    }

    pub fn controls(&self) -> Vec<Control> {
        self.actions.iter().map(Control::from).collect()
    }

    pub fn render(&self) -> Result<String> {
        let template = TEMPLATES.get_template("landing.html")?;
        let html = template.render(context! {
            title => TITLE,
            theme => self.theme,
            spreadsheet_url => &self.spreadsheet_url,
            controls => self.controls(),
        })?;
        Ok(html)
    }
}

#[derive(Debug, Serialize)]
struct InfoRow {
    name: &'static str,
    hash: String,
    archived: Option<String>,
}

/// Human readable rendering of `info/status.json`.
pub fn render_info(status: &StatusInfo) -> Result<String> {
    let hash = |name: &str| {
        status
            .files
            .get(name)
            .and_then(|f| f.hash.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_owned())
    };
    let html_archived = status
        .files
        .get(HTML_FILENAME)
        .and_then(|f| f.last_archived.clone())
        .unwrap_or_else(|| NOT_AVAILABLE.to_owned());

    let files = [
        InfoRow {
            name: HTML_FILENAME,
            hash: hash(HTML_FILENAME),
            archived: Some(html_archived),
        },
        InfoRow {
            name: CSV_FILENAME,
            hash: hash(CSV_FILENAME),
            archived: None,
        },
        InfoRow {
            name: XLSX_FILENAME,
            hash: hash(XLSX_FILENAME),
            archived: None,
        },
    ];

    let template = TEMPLATES.get_template("info.html")?;
    Ok(template.render(context! {
        last_updated => status.last_updated.as_deref().unwrap_or(NOT_AVAILABLE),
        files => files,
    })?)
}

pub fn render_not_found() -> Result<String> {
    let template = TEMPLATES.get_template("not_found.html")?;
    Ok(template.render(context! { title => TITLE })?)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::status::FileInfo;

    fn view() -> LandingView {
        LandingView::new(&Settings::default())
    }

    #[test]
    fn heading_rendered_once() {
        let html = view().render().unwrap();
        assert_eq!(html.matches("<h1>").count(), 1);
        assert!(html.contains("<h1>ArtistGrid Sheets</h1>"));
    }

    #[test]
    fn spreadsheet_link_opens_new_context() {
        let view = view();
        let html = view.render().unwrap();
        let expected = format!(
            r#"<a href="{}" target="_blank" rel="noopener noreferrer">TrackerHub</a>"#,
            view.spreadsheet_url()
        );
        assert!(html.contains(&expected), "{html}");
        assert_eq!(
            view.spreadsheet_url(),
            "https://docs.google.com/spreadsheets/d/1zoOIaNbBvfuL3sS3824acpqGxOdSZSIHM8-nI9C-Vfc/htmlview"
        );
    }

    #[test]
    fn one_anchor_per_control() {
        let view = view();
        let html = view.render().unwrap();
        assert_eq!(html.matches(r#"<a class="button""#).count(), view.controls().len());
        assert_eq!(view.controls().len(), 4);
    }

    #[test]
    fn download_controls_carry_filename() {
        let html = view().render().unwrap();
        assert!(html.contains(
            r#"<a class="button" href="https://sheets.artistgrid.cx/artists.csv" download="artists.csv">"#
        ));
        assert!(html.contains(
            r#"<a class="button" href="https://sheets.artistgrid.cx/artists.xlsx" download="ArtistGrid.xlsx">"#
        ));
    }

    #[test]
    fn themes_only_change_styling() {
        let card = view().with_theme(Theme::Card);
        let hero = view().with_theme(Theme::Hero);

        assert_eq!(card.controls(), hero.controls());
        assert!(card.render().unwrap().contains(r#"<body class="theme-card">"#));
        assert!(hero.render().unwrap().contains(r#"<body class="theme-hero">"#));
    }

    #[test]
    fn escapes_text() {
        assert_eq!(escape_html("a < b & \"c\"".to_owned()), "a &lt; b &amp; &quot;c&quot;");
    }

    #[test]
    fn info_page_fills_gaps() {
        let mut status = StatusInfo {
            last_updated: Some("2025-06-01T12:00:00+00:00".to_owned()),
            ..StatusInfo::default()
        };
        status.files.insert(
            CSV_FILENAME.to_owned(),
            FileInfo {
                hash: Some("abc123".to_owned()),
                last_archived: None,
            },
        );

        let html = render_info(&status).unwrap();
        assert!(html.contains("<strong>Last Updated:</strong> 2025-06-01T12:00:00+00:00"));
        assert!(html.contains("Hash: abc123"));
        assert!(html.contains("Archived: N/A"));
        assert_eq!(html.matches("Hash: N/A").count(), 2);
    }

    #[test]
    fn not_found_links_home() {
        let html = render_not_found().unwrap();
        assert!(html.contains("<h1>404</h1>"));
        assert!(html.contains(r#"<a href="/">"#));
    }
}
