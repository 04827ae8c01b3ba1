mod cli;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use console::Style;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use parecer::agents::{self, OpinionPanel};
use parecer::{JobKind, JobRequest, JobService, JobStore, ParecerConfig, ResultError};
use ui::JobProgress;

// Intervalo entre consultas de status na CLI.
const POLL_INTERVAL: Duration = Duration::from_millis(400);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "parecer=debug" } else { "parecer=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = ParecerConfig::load()?;
    let tier = cli
        .model
        .map(|model| model.tier().to_string())
        .unwrap_or_else(|| config.default_model_tier.clone());

    match cli.command {
        Command::Analisar {
            arquivo,
            agentes,
            escopo,
        } => analisar(&config, &tier, &arquivo, agentes, escopo).await,
        Command::Demo => demo().await,
        Command::Agentes => {
            listar_agentes();
            Ok(())
        }
    }
}

async fn analisar(
    config: &ParecerConfig,
    tier: &str,
    arquivo: &str,
    agentes: Vec<String>,
    escopo: Option<String>,
) -> anyhow::Result<()> {
    let document = std::fs::read_to_string(arquivo)?;
    let panel = OpinionPanel::from_config(config, tier)?;

    let service = JobService::new(Arc::new(JobStore::new()), Arc::new(panel))
        .with_worker_timeout(config.worker_timeout());

    let workers = if agentes.is_empty() {
        agents::roster::ids_especialistas()
            .into_iter()
            .map(String::from)
            .collect()
    } else {
        agentes
    };

    let job_id = service.create_job(
        JobKind::Analysis,
        JobRequest {
            document,
            scope: escopo,
            workers,
        },
    )?;
    acompanhar(&service, &job_id).await
}

async fn demo() -> anyhow::Result<()> {
    let document = "\
Reclamatória trabalhista. O reclamante alega ter trabalhado por seis anos \
como operador de empilhadeira em galpão frigorífico, exposto a frio intenso \
sem os devidos equipamentos de proteção.

Laudo médico particular aponta lombalgia crônica e sugere nexo com a \
atividade. A reclamada nega o nexo e junta PPRA e PCMSO do período.

Pede-se adicional de insalubridade, indenização por danos morais e \
estabilidade acidentária.";

    let service = JobService::new(
        Arc::new(JobStore::new()),
        Arc::new(OpinionPanel::stub()),
    );

    let job_id = service.create_job(
        JobKind::Analysis,
        JobRequest {
            document: document.to_string(),
            scope: None,
            workers: agents::roster::ids_especialistas()
                .into_iter()
                .map(String::from)
                .collect(),
        },
    )?;
    acompanhar(&service, &job_id).await
}

/// Consulta o status do job até o estado terminal, exibindo o progresso.
async fn acompanhar<P: parecer::AgentPanel>(
    service: &JobService<P>,
    job_id: &str,
) -> anyhow::Result<()> {
    let progress = JobProgress::start("iniciando análise");
    loop {
        let status = service.get_status(job_id)?;
        if status.status.is_terminal() {
            progress.complete(&status);
            match service.get_result(job_id) {
                Ok(opinion) => progress.print_opinion(&opinion),
                Err(ResultError::Failed(_)) => {
                    // Já exibido por complete().
                }
                Err(err) => return Err(err.into()),
            }
            return Ok(());
        }
        progress.update(&status);
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn listar_agentes() {
    let bold = Style::new().bold();
    let dim = Style::new().dim();

    println!("{}", bold.apply_to("Especialistas (fan-out):"));
    for profile in agents::ESPECIALISTAS {
        println!("  {:<16} {}", profile.id, dim.apply_to(profile.title));
    }
    println!();
    println!("{}", bold.apply_to("Sequenciais (pós fan-out):"));
    for profile in agents::SEQUENCIAIS {
        println!("  {:<16} {}", profile.id, dim.apply_to(profile.title));
    }
}
