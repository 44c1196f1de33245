//! Markdown comparison report from annotated results

use crate::models::AnnotatedEntry;
use std::path::{Path, PathBuf};

const REPORT_SUFFIX: &str = "_report.md";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Annotated results file '{}' not found", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{}' as a list of results", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write report to '{}'", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Entries of one category, grouped by model in first-seen order
#[derive(Debug)]
struct CategoryGroup<'a> {
    name: &'a str,
    models: Vec<(&'a str, Vec<&'a AnnotatedEntry>)>,
}

/// `results.json` -> `results_report.md`
pub fn report_path_for(input: &Path) -> PathBuf {
    let name = input.to_string_lossy();
    let stem = name.strip_suffix(".json").unwrap_or(&name);
    PathBuf::from(format!("{stem}{REPORT_SUFFIX}"))
}

/// Read annotated results from `input` and write the Markdown report next
/// to it. Nothing is written when the input can't be loaded.
pub fn generate_report(input: &Path) -> Result<PathBuf, ReportError> {
    if !input.is_file() {
        return Err(ReportError::NotFound(input.to_path_buf()));
    }

    let content = std::fs::read_to_string(input).map_err(|source| ReportError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let entries: Vec<AnnotatedEntry> =
        serde_json::from_str(&content).map_err(|source| ReportError::Parse {
            path: input.to_path_buf(),
            source,
        })?;

    let output = report_path_for(input);
    std::fs::write(&output, render_markdown(&entries)).map_err(|source| ReportError::Write {
        path: output.clone(),
        source,
    })?;

    tracing::info!(entries = entries.len(), path = %output.display(), "Report written");
    Ok(output)
}

/// Render one `##` section with a table per category
pub fn render_markdown(entries: &[AnnotatedEntry]) -> String {
    let mut lines = vec!["# AI Model Comparison Results".to_string(), String::new()];

    for group in group_entries(entries) {
        lines.push(format!("## {}", group.name));
        lines.push(String::new());
        lines.push(
            "| Model Evaluated | Task Description | Rating | Latency (s) | Comments |".to_string(),
        );
        lines.push(
            "|-----------------|--------------------|--------|---------------|----------|"
                .to_string(),
        );

        for (model, tasks) in &group.models {
            for task in tasks {
                let rating = task.rating.as_deref().unwrap_or("N/A");
                let latency = task
                    .latency_seconds
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "N/A".to_string());
                let comments = task.comments.as_deref().unwrap_or("");

                lines.push(format!(
                    "| {} | {} | {} | {} | {} |",
                    cell(model),
                    cell(&task.task_description),
                    cell(rating),
                    latency,
                    cell(comments)
                ));
            }
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

fn group_entries(entries: &[AnnotatedEntry]) -> Vec<CategoryGroup<'_>> {
    let mut groups: Vec<CategoryGroup<'_>> = Vec::new();

    for entry in entries {
        let index = match groups.iter().position(|g| g.name == entry.category) {
            Some(index) => index,
            None => {
                groups.push(CategoryGroup {
                    name: entry.category.as_str(),
                    models: Vec::new(),
                });
                groups.len() - 1
            }
        };

        let models = &mut groups[index].models;
        match models.iter_mut().find(|(name, _)| *name == entry.model_name) {
            Some((_, tasks)) => tasks.push(entry),
            None => models.push((entry.model_name.as_str(), vec![entry])),
        }
    }

    groups
}

/// Keep free text from breaking the table row
fn cell(text: &str) -> String {
    text.replace('|', "\\|")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}
