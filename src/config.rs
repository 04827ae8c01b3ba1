//! Configuração do parecer carregada a partir de `parecer.toml`.
//!
//! A struct [`ParecerConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `ANTHROPIC_API_KEY` tem precedência sobre o arquivo.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ParecerError;

/// Configuração de nível superior carregada de `parecer.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ParecerConfig {
    /// Chave da API Anthropic. Vazia = painel em modo simulado.
    #[serde(default)]
    pub api_key: String,

    /// Nível de modelo padrão quando não especificado via CLI.
    #[serde(default = "default_model_tier")]
    pub default_model_tier: String,

    /// Prazo em segundos para cada chamada de agente.
    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: u64,

    /// Máximo de tokens por resposta de agente.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Máximo de trechos do documento enviados aos agentes.
    #[serde(default = "default_max_excerpts")]
    pub max_excerpts: usize,
}

// Valor padrão para o nível de modelo: "sonnet".
fn default_model_tier() -> String {
    "sonnet".to_string()
}

// Valor padrão para o prazo por agente: 60s.
fn default_worker_timeout_secs() -> u64 {
    60
}

// Valor padrão para tokens por resposta: 2048.
fn default_max_tokens() -> u32 {
    2048
}

// Valor padrão para trechos por documento: 12.
fn default_max_excerpts() -> usize {
    12
}

impl Default for ParecerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            default_model_tier: default_model_tier(),
            worker_timeout_secs: default_worker_timeout_secs(),
            max_tokens: default_max_tokens(),
            max_excerpts: default_max_excerpts(),
        }
    }
}

impl ParecerConfig {
    /// Carrega a configuração de `parecer.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self, ParecerError> {
        Self::load_from(Path::new("parecer.toml"))
    }

    /// Carrega a configuração de um caminho específico.
    pub fn load_from(path: &Path) -> Result<Self, ParecerError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<ParecerConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo de
        // configuração para a chave API.
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY")
            && !key.is_empty()
        {
            config.api_key = key;
        }

        Ok(config)
    }

    /// Mapeia um nível de modelo ("haiku", "sonnet", "opus") para o
    /// identificador de modelo da API Anthropic.
    pub fn model_id_for_tier(tier: &str) -> Option<&'static str> {
        match tier {
            "haiku" => Some("claude-haiku-4-5-20251001"),
            "sonnet" => Some("claude-sonnet-4-5-20250929"),
            "opus" => Some("claude-opus-4-6"),
            _ => None,
        }
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = ParecerConfig::default();
        assert_eq!(config.default_model_tier, "sonnet");
        assert_eq!(config.worker_timeout_secs, 60);
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.max_excerpts, 12);
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            api_key = "sk-test-123"
            worker_timeout_secs = 30
        "#;
        let config: ParecerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_key, "sk-test-123");
        assert_eq!(config.worker_timeout_secs, 30);
        assert_eq!(config.default_model_tier, "sonnet");
        assert_eq!(config.max_tokens, 2048);
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parecer.toml");
        std::fs::write(&path, "default_model_tier = \"opus\"\n").unwrap();

        let config = ParecerConfig::load_from(&path).unwrap();
        assert_eq!(config.default_model_tier, "opus");
    }

    #[test]
    fn load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ParecerConfig::load_from(&dir.path().join("ausente.toml")).unwrap();
        assert_eq!(config.worker_timeout_secs, 60);
    }

    #[test]
    fn load_from_invalid_toml_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parecer.toml");
        std::fs::write(&path, "max_tokens = \"muitos\"\n").unwrap();
        assert!(ParecerConfig::load_from(&path).is_err());
    }

    #[test]
    fn model_tier_mapping() {
        assert_eq!(
            ParecerConfig::model_id_for_tier("haiku"),
            Some("claude-haiku-4-5-20251001")
        );
        assert_eq!(
            ParecerConfig::model_id_for_tier("sonnet"),
            Some("claude-sonnet-4-5-20250929")
        );
        assert_eq!(ParecerConfig::model_id_for_tier("opus"), Some("claude-opus-4-6"));
        assert_eq!(ParecerConfig::model_id_for_tier("gpt"), None);
    }

    #[test]
    fn worker_timeout_converts_to_duration() {
        let config = ParecerConfig {
            worker_timeout_secs: 5,
            ..ParecerConfig::default()
        };
        assert_eq!(config.worker_timeout(), Duration::from_secs(5));
    }
}
