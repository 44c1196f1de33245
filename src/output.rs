use crate::config::{BackendKind, Config};
use crate::runner::RunOutcome;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Print configured models and prompts in the specified format
pub fn print_config(config: &Config, format: OutputFormat) {
    match format {
        OutputFormat::Plain => print!("{}", render_config_plain(config)),
        OutputFormat::Json => print_json(config),
    }
}

fn render_config_plain(config: &Config) -> String {
    let mut out = String::new();

    out.push_str("MODELS\n");
    out.push_str(&format!("{:<28} {:<10} {}\n", "Name", "Backend", "Model ID"));
    out.push_str(&format!("{}\n", "-".repeat(70)));
    for model in &config.models {
        out.push_str(&format!(
            "{:<28} {:<10} {}\n",
            model.name, model.backend, model.model_id
        ));
    }

    out.push_str(&format!(
        "Supported backends: {}\n",
        BackendKind::ALL.map(|k| k.as_str()).join(", ")
    ));

    out.push('\n');
    out.push_str("PROMPTS\n");
    for category in &config.categories {
        out.push_str(&format!("{} ({})\n", category.name, category.prompts.len()));
        for prompt in &category.prompts {
            out.push_str(&format!("  • {:<28} {}\n", prompt.id, prompt.task_description));
        }
    }

    out
}

/// Print the collection summary and the annotation instructions
pub fn print_run_summary(outcome: &RunOutcome) {
    print!("{}", render_run_summary(outcome));
}

fn render_run_summary(outcome: &RunOutcome) -> String {
    let path = outcome.path.display();
    let failed = outcome.results.iter().filter(|r| r.error.is_some()).count();

    let mut out = String::new();
    out.push_str("\n--- Evaluation Collection Complete ---\n");
    out.push_str(&format!("Collected {} results.\n", outcome.results.len()));
    if failed > 0 {
        out.push_str(&format!("{} of them recorded an error.\n", failed));
    }
    out.push_str(&format!("Raw results saved to: {}\n", path));
    out.push_str("\nNext Steps:\n");
    out.push_str(&format!("1. Review the responses in '{}'.\n", path));
    out.push_str("2. For each entry, fill in the 'rating' and 'comments' fields.\n");
    out.push_str(&format!(
        "3. Run `prompt-eval report {}` to build the Markdown comparison table.\n",
        path
    ));
    out
}

/// Print a value as pretty JSON
fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing to JSON: {}", e),
    }
}
