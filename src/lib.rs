//! Núcleo de orquestração de análises jurídicas multi-agente.
//!
//! A biblioteca expõe quatro peças que uma camada HTTP externa consome:
//!
//! - [`job::JobStore`] — registro em memória de jobs com máquina de estados
//!   `CREATED → RUNNING → SUCCEEDED | FAILED` e progresso monotônico;
//! - [`engine::ExecutionEngine`] — fan-out/fan-in de agentes independentes
//!   com prazo por agente e falhas isoladas;
//! - [`orchestrator::JobOrchestrator`] — pipeline contexto → especialistas →
//!   agentes sequenciais → compilação, sempre terminando em estado terminal;
//! - [`service::JobService`] — contrato criar/consultar/resultado/cancelar
//!   usado pelos handlers de requisição.
//!
//! O comportamento dos agentes fica atrás do trait
//! [`orchestrator::AgentPanel`]; [`agents::OpinionPanel`] é a implementação
//! apoiada na API Anthropic, com modo simulado para uso offline.

pub mod agents;
pub mod anthropic;
pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod progress;
pub mod service;

pub use config::ParecerConfig;
pub use error::ParecerError;
pub use job::{FailureClass, JobFailure, JobKind, JobRecord, JobStatus, JobStore, StoreError};
pub use orchestrator::{AgentPanel, JobOrchestrator, JobRequest};
pub use service::{JobService, ResultError, StatusView};
