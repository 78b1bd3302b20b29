//! Prompt templates for Klipp.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub rag: RagPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompt for answer generation.
///
/// `{{context}}` receives the ranked chunks as a JSON array and
/// `{{question}}` receives the user query verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub template: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            template: r#"You are a knowledgeable assistant helping users find where topics are discussed in a library of transcribed videos.

## Context Data
Below are the most relevant video chunks, one record per chunk. "start" and "end" are in seconds:

{{context}}

## User Question
{{question}}

## Instructions
1. Analyze the provided video chunks carefully
2. Use specific information from the chunks to support your answer
3. If the question is unrelated to the provided content, say that you don't have relevant information
4. Convert timestamps from seconds to MM:SS format (e.g., 90 seconds = 01:30)
5. Be concise but informative

## Response Format
Don't try to answer the question itself. Tell the user in which video and at what time the relevant content is found.
Simply give output as: Video_Name - Time_Stamp => Brief info description

Do not ask any counter questions or provide suggestions.
"#
            .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are substituted in a single left-to-right pass, so text
    /// inserted for one variable is never expanded again. Unknown
    /// placeholders are left as-is.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            result.push_str(&rest[..open]);
            let after_open = &rest[open + 2..];

            match after_open.find("}}") {
                Some(close) => {
                    let key = &after_open[..close];
                    match vars.get(key.trim()) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push_str("{{");
                            result.push_str(key);
                            result.push_str("}}");
                        }
                    }
                    rest = &after_open[close + 2..];
                }
                None => {
                    result.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }

        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
