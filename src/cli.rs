//! Interface de linha de comando do parecer baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (analisar, demo,
//! agentes) e flags globais (--model, --verbose).

use clap::{Parser, Subcommand, ValueEnum};

/// parecer — Orquestrador de pareceres jurídicos multi-agente.
#[derive(Debug, Parser)]
#[command(name = "parecer", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Nível de modelo a usar nesta sessão.
    #[arg(long, global = true)]
    pub model: Option<ModelArg>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Argumento de modelo aceito pela CLI, mapeado para o identificador de
/// modelo da API via [`ParecerConfig`](parecer::ParecerConfig).
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModelArg {
    /// Modelo rápido e econômico para análises simples.
    Haiku,
    /// Modelo equilibrado para análises de complexidade média.
    Sonnet,
    /// Modelo mais capaz para casos complexos.
    Opus,
}

impl ModelArg {
    pub fn tier(self) -> &'static str {
        match self {
            ModelArg::Haiku => "haiku",
            ModelArg::Sonnet => "sonnet",
            ModelArg::Opus => "opus",
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analisa um documento jurídico com o painel de agentes.
    Analisar {
        /// Caminho do arquivo de texto com o caso a analisar.
        arquivo: String,

        /// Agentes especialistas a consultar (separados por vírgula).
        /// Sem o flag, consulta todo o elenco.
        #[arg(long, value_delimiter = ',')]
        agentes: Vec<String>,

        /// Escopo de recuperação repassado ao estágio de contexto.
        #[arg(long)]
        escopo: Option<String>,
    },

    /// Executa a demonstração embutida com agentes simulados.
    Demo,

    /// Lista os agentes disponíveis no elenco.
    Agentes,
}
