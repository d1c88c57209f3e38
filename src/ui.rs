//! Terminal rendering for the `diagnose` command

use owo_colors::{OwoColorize, Style};
use std::sync::OnceLock;
use tabled::{settings::Style as TableStyle, Table, Tabled};

use crate::query::{DiagnosticFailure, DiagnosticReport, Record};

static THEME: OnceLock<Theme> = OnceLock::new();

pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const DATABASE: &str = "🗄️";
    pub const STATS: &str = "📊";
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub dim: Style,
}

impl Theme {
    pub fn detect() -> Self {
        if !console::Term::stdout().is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            dim: Style::new().white().dimmed(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            dim: Style::new(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Relation")]
    relation: &'static str,
    #[tabled(rename = "Rows")]
    rows: i64,
    #[tabled(rename = "Sampled")]
    sampled: usize,
}

/// Row counts and sample sizes as a rounded table
pub fn counts_table(report: &DiagnosticReport) -> String {
    let rows = [
        CountRow {
            relation: "metadata",
            rows: report.metadata_count,
            sampled: report.metadata_sample.len(),
        },
        CountRow {
            relation: "annotations_terms",
            rows: report.annotations_terms_count,
            sampled: report.annotations_terms_sample.len(),
        },
        CountRow {
            relation: "coordinates",
            rows: report.coordinates_count,
            sampled: report.coordinates_sample.len(),
        },
    ];
    Table::new(rows).with(TableStyle::rounded()).to_string()
}

pub fn print_report(report: &DiagnosticReport) {
    println!(
        "{} {}",
        Icons::CHECK,
        "Store reachable".style(theme().success.clone())
    );
    println!(
        "{} {} {}",
        Icons::DATABASE,
        report.dialect.style(theme().dim.clone()),
        report.version
    );
    println!();
    println!("{} {}", Icons::STATS, "Relations".style(theme().header.clone()));
    println!("{}", counts_table(report));

    print_sample("coordinates", &report.coordinates_sample);
    print_sample("metadata", &report.metadata_sample);
    print_sample("annotations_terms", &report.annotations_terms_sample);
}

fn print_sample(relation: &str, rows: &[Record]) {
    println!();
    println!("━{}━", format!(" {} sample ", relation).style(theme().header.clone()));
    if rows.is_empty() {
        println!("  {}", "(unavailable)".style(theme().dim.clone()));
        return;
    }
    for row in rows {
        println!("  {}", serde_json::Value::Object(row.clone()));
    }
}

pub fn print_failure(failure: &DiagnosticFailure) {
    eprintln!(
        "{} {} ({})",
        Icons::CROSS,
        failure.error.style(theme().error.clone()),
        failure.dialect
    );
}
