use thiserror::Error;

/// Erros de inicialização e configuração do binário.
///
/// Os erros de domínio vivem nos seus módulos: `StoreError` no registro de
/// jobs, `ResultError` na superfície de polling e `AnthropicError` no
/// cliente da API.
#[derive(Debug, Error)]
pub enum ParecerError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ParecerError::Config("unknown model tier: gpt".into());
        assert_eq!(err.to_string(), "Config error: unknown model tier: gpt");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ParecerError = io.into();
        assert!(matches!(err, ParecerError::Io(_)));
    }
}
