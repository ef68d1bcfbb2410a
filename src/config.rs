use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Flattened fragment list written by the ingestion job
    pub fragments_path: String,
    /// Dense embedding matrix, one row per fragment, same order
    pub embeddings_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub backtrace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub dimension: usize,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_embed_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_model() -> String {
    "gpt-4o".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// LibreTranslate-compatible endpoint
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_translate_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_translate_timeout_secs() -> u64 {
    5
}

/// Identity the chatbot speaks as. Drives both the generation system prompt
/// and the canned fallback templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub name: String,
    pub headline: String,
    pub location: String,
    pub email: String,
    pub linkedin: String,
    pub github: String,
    /// Short identity lines surfaced in the system prompt (degrees, projects, hobbies)
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub corpus: CorpusConfig,
    pub logging: LoggingConfig,
    pub embeddings: EmbeddingsConfig,
    pub llm: LlmConfig,
    pub translation: TranslationConfig,
    pub persona: PersonaConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from default config file path
    pub fn load() -> crate::Result<Self> {
        // Try to load from config.toml first, then fall back to config.example.toml
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            eprintln!(
                "Warning: Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")
        } else {
            Err(crate::ResumeRagError::Config(
                "No config file found. Please create config.toml or config.example.toml"
                    .to_string(),
            ))
        }
    }

    /// Get fragment artifact path
    pub fn fragments_path(&self) -> &str {
        &self.corpus.fragments_path
    }

    /// Get embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.dimension
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            corpus: CorpusConfig {
                fragments_path: "db/resume_fragments.json".to_string(),
                embeddings_path: "db/resume_embeddings.json".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                backtrace: true,
            },
            embeddings: EmbeddingsConfig {
                endpoint: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: "text-embedding-3-large".to_string(),
                dimension: 3072,
                timeout_secs: default_embed_timeout_secs(),
            },
            llm: LlmConfig {
                endpoint: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: default_llm_model(),
                timeout_secs: default_llm_timeout_secs(),
            },
            translation: TranslationConfig {
                endpoint: "http://localhost:5000".to_string(),
                api_key: None,
                timeout_secs: default_translate_timeout_secs(),
            },
            persona: PersonaConfig {
                name: "Sarmitha".to_string(),
                headline: "AI/ML Engineer".to_string(),
                location: "Coimbatore, Tamil Nadu".to_string(),
                email: "sarmi8822@gmail.com".to_string(),
                linkedin: "linkedin.com/in/sarmithas".to_string(),
                github: "github.com/sarmi2325".to_string(),
                highlights: vec![
                    "B.E. Electronics & Instrumentation (CGPA: 9.12)".to_string(),
                    "Projects: Interactive Linear Algebra Toolkit, AI for Pneumonia Detection, \
                     AI-Portfolio, TalentSynth Resume Analyzer"
                        .to_string(),
                    "Hobbies: sketching, painting, dancing, watching movies".to_string(),
                ],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_complete() {
        let config = AppConfig::default();
        assert_eq!(config.embedding_dimension(), 3072);
        assert!(config.fragments_path().ends_with(".json"));
        assert!(!config.persona.name.is_empty());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = AppConfig::default();
        let toml_text = toml::to_string(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_text).unwrap();
        assert_eq!(parsed.llm.model, config.llm.model);
        assert_eq!(parsed.corpus.fragments_path, config.corpus.fragments_path);
    }

    #[test]
    fn test_optional_fields_default() {
        let toml_text = r#"
            [corpus]
            fragments_path = "db/f.json"
            embeddings_path = "db/e.json"

            [logging]
            level = "debug"
            backtrace = false

            [embeddings]
            endpoint = "https://api.openai.com/v1"
            api_key = "k"
            model = "text-embedding-3-large"
            dimension = 3072

            [llm]
            endpoint = "https://api.openai.com/v1"
            api_key = "k"

            [translation]
            endpoint = "http://localhost:5000"

            [persona]
            name = "Ada"
            headline = "Engineer"
            location = "London"
            email = "ada@example.com"
            linkedin = "linkedin.com/in/ada"
            github = "github.com/ada"
        "#;
        let config: AppConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.translation.timeout_secs, 5);
        assert!(config.persona.highlights.is_empty());
    }
}
