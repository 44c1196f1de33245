use crate::backend::{Backend, Backends};
use crate::config::{Config, ConfigError, ModelConfig, PromptItem};
use crate::models::ResultEntry;
use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::Instant;

const RESULTS_FILE_PREFIX: &str = "ai_evaluation_raw_results_";

/// Where and how raw results are written
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory receiving the timestamped results file
    pub output_dir: PathBuf,
    /// Rewrite the results file after every entry instead of once at the end
    pub checkpoint: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            checkpoint: false,
        }
    }
}

/// Results of a completed run and the file they were written to
#[derive(Debug)]
pub struct RunOutcome {
    pub path: PathBuf,
    pub results: Vec<ResultEntry>,
}

/// Sends every configured prompt to every configured model, one at a time
pub struct Runner {
    config: Config,
    backends: Backends,
    options: RunOptions,
}

/// `ai_evaluation_raw_results_<timestamp>.json`
pub fn results_file_name(timestamp: &str) -> String {
    format!("{RESULTS_FILE_PREFIX}{timestamp}.json")
}

impl Runner {
    pub fn new(config: Config, backends: Backends, options: RunOptions) -> Self {
        Self {
            config,
            backends,
            options,
        }
    }

    /// Run models × categories × prompts and write the raw results file
    pub async fn run(&self) -> Result<RunOutcome> {
        let timestamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
        let path = self.options.output_dir.join(results_file_name(&timestamp));
        let mut results =
            Vec::with_capacity(self.config.models.len() * self.config.prompt_count());

        for model in &self.config.models {
            tracing::info!(model = %model.name, model_id = %model.model_id, "Evaluating model");

            for category in &self.config.categories {
                tracing::info!(category = %category.name, "Category");

                for prompt in &category.prompts {
                    let entry = self.evaluate_prompt(model, &category.name, prompt).await;
                    results.push(entry);

                    if self.options.checkpoint {
                        store_results(&results, &path)?;
                    }
                }
            }
        }

        store_results(&results, &path)?;
        tracing::info!(count = results.len(), path = %path.display(), "Raw results saved");

        Ok(RunOutcome { path, results })
    }

    /// Send one prompt to one model and record the outcome. Never fails: a
    /// configuration problem is recorded on the entry.
    async fn evaluate_prompt(
        &self,
        model: &ModelConfig,
        category: &str,
        prompt: &PromptItem,
    ) -> ResultEntry {
        tracing::info!(
            task = %prompt.task_description,
            prompt_id = %prompt.id,
            "Running task"
        );

        let start = Instant::now();
        let (response_text, error) = match self.dispatch(model) {
            Ok(backend) => {
                let reply = backend.invoke(&model.model_id, &prompt.prompt).await;
                (reply.text, reply.error)
            }
            Err(err) => {
                tracing::error!(model = %model.name, error = %err, "Configuration error");
                (format!("ERROR DURING API CALL: {err}"), Some(err.to_string()))
            }
        };
        let latency = start.elapsed().as_secs_f64();

        let entry = ResultEntry::new(model, category, prompt, response_text, latency, error);
        match &entry.error {
            Some(err) => {
                tracing::warn!(latency_seconds = entry.latency_seconds, error = %err, "Task failed")
            }
            None => tracing::info!(latency_seconds = entry.latency_seconds, "Task done"),
        }
        entry
    }

    /// Pick the adapter for the model's backend type
    fn dispatch(&self, model: &ModelConfig) -> Result<&dyn Backend, ConfigError> {
        let kind = model.backend_kind()?;
        self.backends
            .get(kind)
            .ok_or_else(|| ConfigError::UnknownBackend(model.backend.clone()))
    }
}

/// Write results to a JSON file, creating the parent directory if needed
pub fn store_results(results: &[ResultEntry], path: &Path) -> Result<()> {
    let json_content =
        serde_json::to_string_pretty(results).context("Failed to serialize results to JSON")?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, json_content)
        .with_context(|| format!("Failed to write results to: {}", path.display()))
}
