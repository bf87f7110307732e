//! Markdown summary generation
//!
//! This module writes a human-readable markdown report of the article store
//! and its recent runs.

use crate::output::{HarvestReport, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary to `output_path`
///
/// # Arguments
///
/// * `report` - The harvest report data
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_summary(report: &HarvestReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a harvest report as markdown
pub fn format_markdown_summary(report: &HarvestReport) -> String {
    let stats = &report.statistics;
    let mut md = String::new();

    md.push_str("# Article Harvest Summary\n\n");

    md.push_str("## Latest Run\n\n");
    match &report.latest_run {
        Some(run) => {
            md.push_str(&format!("- **Run ID**: {}\n", run.id));
            md.push_str(&format!("- **Started**: {}\n", run.started_at));
            if let Some(finished) = &run.finished_at {
                md.push_str(&format!("- **Finished**: {}\n", finished));
            }
            if let Some(duration) = report.duration_seconds {
                md.push_str(&format!(
                    "- **Duration**: {} seconds ({:.2} minutes)\n",
                    duration,
                    duration as f64 / 60.0
                ));
            }
            md.push_str(&format!("- **Status**: {}\n", run.status.to_db_string()));
            md.push_str(&format!("- **Start Page**: {}\n", run.start_page));
            if let Some(last_page) = run.last_page {
                md.push_str(&format!("- **Last Page**: {}\n", last_page));
            }
            md.push_str(&format!("- **Saved**: {}\n", run.saved_count));
            md.push_str(&format!("- **Config Hash**: {}\n\n", run.config_hash));
        }
        None => md.push_str("No runs recorded.\n\n"),
    }

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Stored Articles**: {}\n\n", stats.total_articles));

    if !stats.runs.is_empty() {
        md.push_str("## Recent Runs\n\n");
        md.push_str("| Run | Status | Pages | Saved | Started |\n");
        md.push_str("|-----|--------|-------|-------|---------|\n");

        for run in &stats.runs {
            let pages = match run.last_page {
                Some(last) => format!("{}..{}", run.start_page, last),
                None => format!("{}..", run.start_page),
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                run.id,
                run.status.to_db_string(),
                pages,
                run.saved_count,
                run.started_at
            ));
        }
        md.push('\n');
    }

    if !stats.latest_articles.is_empty() {
        md.push_str("## Latest Articles\n\n");
        md.push_str("| Title | Published | URL |\n");
        md.push_str("|-------|-----------|-----|\n");

        for article in &stats.latest_articles {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                escape_cell(&article.title),
                escape_cell(article.published_at.as_deref().unwrap_or("-")),
                article.url
            ));
        }
        md.push('\n');
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
