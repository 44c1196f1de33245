use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Default configuration compiled into the binary.
const BUILTIN_CONFIG: &str = include_str!("../eval.toml");

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_OLLAMA_API_URL: &str = "http://localhost:3000/api/generate";
const DEFAULT_AWS_REGION: &str = "us-east-1";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown model type: {0}")]
    UnknownBackend(String),

    #[error("duplicate prompt id: {0}")]
    DuplicatePromptId(String),

    #[error("duplicate model id: {0}")]
    DuplicateModelId(String),

    #[error("no {0} configured")]
    Empty(&'static str),

    #[error("no {kind} named {name:?}")]
    UnknownSelection { kind: &'static str, name: String },
}

/// The closed set of backends a model can be served by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    OpenAi,
    BedrockAnthropic,
    Google,
    Ollama,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::OpenAi,
        BackendKind::BedrockAnthropic,
        BackendKind::Google,
        BackendKind::Ollama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::BedrockAnthropic => "anthropic",
            BackendKind::Google => "google",
            BackendKind::Ollama => "ollama",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(BackendKind::OpenAi),
            "anthropic" | "anthropic-bedrock" | "bedrock" => Ok(BackendKind::BedrockAnthropic),
            "google" => Ok(BackendKind::Google),
            "ollama" => Ok(BackendKind::Ollama),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// A model to evaluate
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Display name used in reports
    pub name: String,
    /// Backend type. Kept as a string so an unknown value only fails the
    /// entries that use it.
    pub backend: String,
    /// Identifier passed to the backend
    pub model_id: String,
}

impl ModelConfig {
    pub fn backend_kind(&self) -> Result<BackendKind, ConfigError> {
        self.backend.parse()
    }
}

/// A single evaluation prompt
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptItem {
    /// Unique prompt identifier
    pub id: String,
    /// Short human-readable description of the task
    pub task_description: String,
    /// Text sent to the model
    pub prompt: String,
}

/// Named group of related prompts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptCategory {
    pub name: String,
    #[serde(default)]
    pub prompts: Vec<PromptItem>,
}

/// Root configuration: models to evaluate and the categorized prompt set
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub models: Vec<ModelConfig>,
    pub categories: Vec<PromptCategory>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to load config: {}", path.display()))
    }

    /// The default model and prompt set shipped with the binary
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_CONFIG).context("Failed to load built-in config")
    }

    fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would break the one-entry-per
    /// (model_id, prompt_id) guarantee of a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.is_empty() {
            return Err(ConfigError::Empty("models"));
        }
        if self.categories.is_empty() {
            return Err(ConfigError::Empty("categories"));
        }

        let mut model_ids = HashSet::new();
        for model in &self.models {
            if !model_ids.insert(model.model_id.as_str()) {
                return Err(ConfigError::DuplicateModelId(model.model_id.clone()));
            }
        }

        let mut prompt_ids = HashSet::new();
        for prompt in self.categories.iter().flat_map(|c| &c.prompts) {
            if !prompt_ids.insert(prompt.id.as_str()) {
                return Err(ConfigError::DuplicatePromptId(prompt.id.clone()));
            }
        }

        Ok(())
    }

    /// Restrict the configuration to the named models and categories.
    /// `None` keeps everything.
    pub fn select(
        mut self,
        models: Option<&[String]>,
        categories: Option<&[String]>,
    ) -> Result<Self, ConfigError> {
        if let Some(names) = models {
            for name in names {
                if !self.models.iter().any(|m| &m.name == name) {
                    return Err(ConfigError::UnknownSelection {
                        kind: "model",
                        name: name.clone(),
                    });
                }
            }
            self.models.retain(|m| names.contains(&m.name));
        }

        if let Some(names) = categories {
            for name in names {
                if !self.categories.iter().any(|c| &c.name == name) {
                    return Err(ConfigError::UnknownSelection {
                        kind: "category",
                        name: name.clone(),
                    });
                }
            }
            self.categories.retain(|c| names.contains(&c.name));
        }

        self.validate()?;
        Ok(self)
    }

    pub fn prompt_count(&self) -> usize {
        self.categories.iter().map(|c| c.prompts.len()).sum()
    }
}

/// Credentials and endpoints for every backend, read from the environment
#[derive(Clone, Default)]
pub struct Settings {
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub bedrock_token: String,
    pub aws_region: String,
    /// Overrides the regional Bedrock runtime endpoint
    pub bedrock_endpoint: Option<String>,
    pub google_api_key: String,
    pub google_api_base: String,
    pub ollama_api_url: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_api_base", &self.openai_api_base)
            .field("bedrock_token", &redact(&self.bedrock_token))
            .field("aws_region", &self.aws_region)
            .field("bedrock_endpoint", &self.bedrock_endpoint)
            .field("google_api_key", &redact(&self.google_api_key))
            .field("google_api_base", &self.google_api_base)
            .field("ollama_api_url", &self.ollama_api_url)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<REDACTED>" }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable lookup. Empty values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let or = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        Self {
            openai_api_key: or("OPENAI_API_KEY", ""),
            openai_api_base: or("OPENAI_API_BASE", DEFAULT_OPENAI_API_BASE),
            bedrock_token: or("AWS_BEARER_TOKEN_BEDROCK", ""),
            aws_region: or("AWS_REGION_NAME", DEFAULT_AWS_REGION),
            bedrock_endpoint: var("BEDROCK_ENDPOINT"),
            google_api_key: or("GOOGLE_API_KEY", ""),
            google_api_base: or("GOOGLE_API_BASE", DEFAULT_GOOGLE_API_BASE),
            ollama_api_url: or("OLLAMA_API_URL", DEFAULT_OLLAMA_API_URL),
        }
    }

    pub fn bedrock_base_url(&self) -> String {
        match &self.bedrock_endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", self.aws_region),
        }
    }
}
