use crate::config::{ModelConfig, PromptItem};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Outcome of sending one prompt to one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub model_name: String,
    pub model_id: String,
    pub category: String,
    pub prompt_id: String,
    pub task_description: String,
    pub prompt_text: String,
    pub response_text: String,
    /// Wall-clock time of the backend call, millisecond precision
    pub latency_seconds: f64,
    pub error: Option<String>,
    /// Filled in by hand after the run
    pub rating: String,
    /// Filled in by hand after the run
    pub comments: String,
}

impl ResultEntry {
    pub fn new(
        model: &ModelConfig,
        category: &str,
        prompt: &PromptItem,
        response_text: String,
        latency_seconds: f64,
        error: Option<String>,
    ) -> Self {
        Self {
            model_name: model.name.clone(),
            model_id: model.model_id.clone(),
            category: category.to_string(),
            prompt_id: prompt.id.clone(),
            task_description: prompt.task_description.clone(),
            prompt_text: prompt.prompt.clone(),
            response_text,
            latency_seconds: round_millis(latency_seconds),
            error,
            rating: String::new(),
            comments: String::new(),
        }
    }
}

fn round_millis(seconds: f64) -> f64 {
    (seconds.max(0.0) * 1000.0).round() / 1000.0
}

/// A result entry as read back after manual annotation. Hand-edited files
/// may drop or null out fields, so only the grouping keys are required.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotatedEntry {
    pub category: String,
    pub model_name: String,
    pub task_description: String,
    #[serde(default)]
    pub latency_seconds: Option<f64>,
    #[serde(default, deserialize_with = "annotation_text")]
    pub rating: Option<String>,
    #[serde(default, deserialize_with = "annotation_text")]
    pub comments: Option<String>,
}

/// Accept whatever an annotator typed (`4`, `"4/5"`, `true`) as text.
/// `null` counts as missing.
fn annotation_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_rounds_latency() {
        let model = ModelConfig {
            name: "Local".to_string(),
            backend: "ollama".to_string(),
            model_id: "llama3".to_string(),
        };
        let prompt = PromptItem {
            id: "hello".to_string(),
            task_description: "Greeting".to_string(),
            prompt: "Say hi".to_string(),
        };

        let entry = ResultEntry::new(&model, "AppDev", &prompt, "hi".to_string(), 1.23456, None);
        assert_eq!(entry.latency_seconds, 1.235);
        assert_eq!(entry.prompt_text, "Say hi");
        assert!(entry.rating.is_empty());
        assert!(entry.comments.is_empty());
    }

    #[test]
    fn test_entry_serializes_null_error() {
        let model = ModelConfig {
            name: "Local".to_string(),
            backend: "ollama".to_string(),
            model_id: "llama3".to_string(),
        };
        let prompt = PromptItem {
            id: "hello".to_string(),
            task_description: "Greeting".to_string(),
            prompt: "Say hi".to_string(),
        };
        let entry = ResultEntry::new(&model, "AppDev", &prompt, "hi".to_string(), 0.5, None);

        let value = serde_json::to_value(&entry).unwrap();
        assert!(value["error"].is_null());
        assert_eq!(value["rating"], "");
        assert_eq!(value["latency_seconds"], 0.5);
    }

    #[test]
    fn test_annotated_entry_tolerates_missing_fields() {
        let json = r#"{"category": "Data", "model_name": "Gemini", "task_description": "SQL", "rating": null}"#;
        let entry: AnnotatedEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.rating, None);
        assert_eq!(entry.comments, None);
        assert_eq!(entry.latency_seconds, None);
    }

    #[test]
    fn test_annotated_entry_accepts_non_string_annotations() {
        let json = r#"{"category": "Data", "model_name": "Gemini", "task_description": "SQL", "rating": 4, "comments": true}"#;
        let entry: AnnotatedEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.rating.as_deref(), Some("4"));
        assert_eq!(entry.comments.as_deref(), Some("true"));

        let json = r#"{"category": "Data", "model_name": "Gemini", "task_description": "SQL", "rating": 4.5}"#;
        let entry: AnnotatedEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.rating.as_deref(), Some("4.5"));
        assert_eq!(entry.comments, None);
    }
}
