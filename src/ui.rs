//! Interface de terminal do parecer — spinner de acompanhamento e saída
//! colorida.
//!
//! Usa as crates `indicatif` para o spinner de progresso e `console` para
//! estilização com cores. O [`JobProgress`] acompanha visualmente o polling
//! de um job até o estado terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use parecer::{JobStatus, StatusView};

/// Indicador visual de progresso para o polling de um job no terminal.
///
/// Exibe um spinner animado com o percentual e a etapa corrente, e
/// mensagens coloridas para sucesso (verde) e falha (vermelho).
pub struct JobProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
}

impl JobProgress {
    /// Inicia o spinner com a descrição do job.
    pub fn start(description: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(format!("[  0%] {description}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    /// Atualiza a mensagem do spinner a partir do status consultado.
    pub fn update(&self, status: &StatusView) {
        self.pb.set_message(format!(
            "[{:>3}%] {}",
            status.progress_percent, status.stage_label
        ));
    }

    /// Finaliza o spinner e exibe o desfecho do job.
    pub fn complete(&self, status: &StatusView) {
        self.pb.finish_and_clear();
        match status.status {
            JobStatus::Succeeded => {
                println!(
                    "  {} Análise concluída ({})",
                    self.green.apply_to("✓"),
                    status.id
                );
            }
            _ => {
                let detail = status
                    .error
                    .as_ref()
                    .map(|failure| failure.to_string())
                    .unwrap_or_else(|| "sem detalhes".to_string());
                println!("  {} Análise falhou: {detail}", self.red.apply_to("✗"));
            }
        }
    }

    /// Imprime o parecer compilado formatado em JSON.
    pub fn print_opinion(&self, opinion: &serde_json::Value) {
        println!();
        println!("{}", self.green.apply_to("─── Parecer ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(opinion).unwrap_or_default()
        );
    }
}
