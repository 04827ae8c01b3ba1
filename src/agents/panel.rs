//! Painel de agentes baseado na API Anthropic.
//!
//! [`OpinionPanel`] é a implementação concreta de
//! [`AgentPanel`](crate::orchestrator::AgentPanel): recupera contexto
//! fatiando o documento em trechos, consulta um agente por vez via
//! [`MessageSender`] e compila o parecer final de forma determinística.
//! Sem cliente configurado o painel opera em modo simulado, útil para a
//! demonstração offline e para testes.

use anyhow::{anyhow, bail};
use serde_json::{Value, json};

use crate::anthropic::{AnthropicClient, Message, MessageSender, MessagesRequest};
use crate::config::ParecerConfig;
use crate::engine::StageResult;
use crate::error::ParecerError;
use crate::orchestrator::{AgentPanel, CaseContext, JobRequest};

use super::roster;

// Limite de caracteres por trecho enviado aos agentes.
const EXCERPT_CHAR_LIMIT: usize = 1500;

/// Painel de agentes jurídicos dirigido por LLM, com modo simulado quando
/// nenhum cliente é fornecido.
pub struct OpinionPanel<M = AnthropicClient> {
    client: Option<M>,
    model: String,
    max_tokens: u32,
    max_excerpts: usize,
}

impl OpinionPanel<AnthropicClient> {
    /// Painel totalmente simulado, sem chamadas de rede.
    pub fn stub() -> Self {
        Self::new(None, "claude-sonnet-4-5-20250929")
    }

    /// Constrói o painel a partir da configuração carregada: com cliente
    /// real quando há chave de API, simulado caso contrário.
    pub fn from_config(config: &ParecerConfig, tier: &str) -> Result<Self, ParecerError> {
        let model = ParecerConfig::model_id_for_tier(tier)
            .ok_or_else(|| ParecerError::Config(format!("unknown model tier: {tier}")))?;
        let client = if config.api_key.is_empty() {
            None
        } else {
            Some(AnthropicClient::new(config.api_key.clone()))
        };
        Ok(Self::new(client, model)
            .with_max_tokens(config.max_tokens)
            .with_max_excerpts(config.max_excerpts))
    }
}

impl<M: MessageSender> OpinionPanel<M> {
    pub fn new(client: Option<M>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: 2048,
            max_excerpts: 12,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_max_excerpts(mut self, max_excerpts: usize) -> Self {
        self.max_excerpts = max_excerpts;
        self
    }

    fn user_prompt(context: &CaseContext) -> String {
        let mut prompt = String::new();
        if let Some(scope) = &context.scope {
            prompt.push_str(&format!("Escopo: {scope}\n\n"));
        }
        prompt.push_str("Trechos do caso em análise:\n\n");
        prompt.push_str(&context.joined());
        prompt.push_str("\n\nElabore seu parecer técnico sobre o caso acima.");
        prompt
    }
}

impl<M: MessageSender + 'static> AgentPanel for OpinionPanel<M> {
    async fn retrieve_context(&self, request: &JobRequest) -> anyhow::Result<CaseContext> {
        if request.document.trim().is_empty() {
            bail!("document is empty");
        }
        let excerpts: Vec<String> = request
            .document
            .split("\n\n")
            .map(str::trim)
            .filter(|paragraph| !paragraph.is_empty())
            .take(self.max_excerpts)
            .map(|paragraph| paragraph.chars().take(EXCERPT_CHAR_LIMIT).collect())
            .collect();
        Ok(CaseContext {
            excerpts,
            scope: request.scope.clone(),
        })
    }

    async fn run_worker(
        &self,
        worker_id: &str,
        context: &CaseContext,
        _request: &JobRequest,
    ) -> anyhow::Result<Value> {
        let profile =
            roster::perfil(worker_id).ok_or_else(|| anyhow!("unknown agent: {worker_id}"))?;

        let Some(client) = &self.client else {
            // Modo simulado: mesma forma de saída do caminho real.
            return Ok(json!({
                "agente": profile.id,
                "titulo": profile.title,
                "parecer": format!(
                    "[simulado] {} avaliou {} trecho(s) do caso.",
                    profile.title,
                    context.excerpts.len()
                ),
            }));
        };

        let req = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(profile.system_prompt.to_string()),
            temperature: Some(0.2),
            messages: vec![Message::user(Self::user_prompt(context))],
        };
        let response = client.send_message(&req).await?;
        Ok(json!({
            "agente": profile.id,
            "titulo": profile.title,
            "parecer": response.text(),
        }))
    }

    fn compile(
        &self,
        context: &CaseContext,
        fanout: &StageResult<Value>,
        sequential: &[(String, Value)],
    ) -> anyhow::Result<Value> {
        let secoes: Vec<Value> = fanout
            .succeeded
            .iter()
            .map(|item| json!({"agente": item.worker_id, "conteudo": item.output}))
            .collect();
        let complementos: Vec<Value> = sequential
            .iter()
            .map(|(worker_id, output)| json!({"agente": worker_id, "conteudo": output}))
            .collect();
        Ok(json!({
            "tipo": "parecer",
            "escopo": context.scope,
            "trechos_considerados": context.excerpts.len(),
            "secoes": secoes,
            "complementos": complementos,
            "agentes_falhos": serde_json::to_value(&fanout.failed)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anthropic::types::{ContentBlock, MessagesResponse, Usage};
    use crate::anthropic::AnthropicError;
    use crate::engine::{FailedWork, WorkItem, WorkerFailure};
    use std::sync::Mutex;

    /// Cliente simulado que registra as requisições recebidas.
    struct MockClient {
        reply: String,
        requests: Mutex<Vec<MessagesRequest>>,
    }

    impl MockClient {
        fn replying(text: &str) -> Self {
            Self {
                reply: text.to_string(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl MessageSender for MockClient {
        async fn send_message(
            &self,
            req: &MessagesRequest,
        ) -> Result<MessagesResponse, AnthropicError> {
            self.requests.lock().unwrap().push(req.clone());
            Ok(MessagesResponse {
                id: "mock".into(),
                content: vec![ContentBlock {
                    content_type: "text".into(),
                    text: self.reply.clone(),
                }],
                model: "mock".into(),
                stop_reason: Some("end_turn".into()),
                usage: Usage {
                    input_tokens: 0,
                    output_tokens: 0,
                },
            })
        }
    }

    fn request(document: &str) -> JobRequest {
        JobRequest {
            document: document.into(),
            scope: None,
            workers: Vec::new(),
        }
    }

    fn context(excerpts: &[&str]) -> CaseContext {
        CaseContext {
            excerpts: excerpts.iter().map(|e| e.to_string()).collect(),
            scope: None,
        }
    }

    #[tokio::test]
    async fn retrieve_context_splits_paragraphs() {
        let panel = OpinionPanel::stub();
        let doc = "Primeiro parágrafo.\n\n\n\nSegundo parágrafo.\n\nTerceiro.";
        let ctx = panel.retrieve_context(&request(doc)).await.unwrap();
        assert_eq!(
            ctx.excerpts,
            vec!["Primeiro parágrafo.", "Segundo parágrafo.", "Terceiro."]
        );
    }

    #[tokio::test]
    async fn retrieve_context_rejects_empty_document() {
        let panel = OpinionPanel::stub();
        assert!(panel.retrieve_context(&request("   \n \n")).await.is_err());
    }

    #[tokio::test]
    async fn retrieve_context_honors_excerpt_cap() {
        let panel = OpinionPanel::stub().with_max_excerpts(2);
        let doc = "um\n\ndois\n\ntres\n\nquatro";
        let ctx = panel.retrieve_context(&request(doc)).await.unwrap();
        assert_eq!(ctx.excerpts.len(), 2);
    }

    #[tokio::test]
    async fn retrieve_context_truncates_long_paragraphs() {
        let panel = OpinionPanel::stub();
        let long = "x".repeat(EXCERPT_CHAR_LIMIT * 2);
        let ctx = panel.retrieve_context(&request(&long)).await.unwrap();
        assert_eq!(ctx.excerpts[0].chars().count(), EXCERPT_CHAR_LIMIT);
    }

    #[tokio::test]
    async fn stub_worker_produces_simulated_finding() {
        let panel = OpinionPanel::stub();
        let out = panel
            .run_worker("medico", &context(&["trecho"]), &request("doc"))
            .await
            .unwrap();
        assert_eq!(out["agente"], "medico");
        assert_eq!(out["titulo"], "Perito médico");
        assert!(out["parecer"].as_str().unwrap().starts_with("[simulado]"));
    }

    #[tokio::test]
    async fn unknown_agent_is_an_error() {
        let panel = OpinionPanel::stub();
        let err = panel
            .run_worker("astrologo", &context(&["trecho"]), &request("doc"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown agent"));
    }

    #[tokio::test]
    async fn llm_worker_uses_profile_system_prompt() {
        let client = MockClient::replying("Nexo causal confirmado.");
        let panel = OpinionPanel::new(Some(client), "claude-sonnet-4-5-20250929");
        let ctx = CaseContext {
            excerpts: vec!["Laudo médico anexo.".into()],
            scope: Some("processo-123".into()),
        };

        let out = panel
            .run_worker("medico", &ctx, &request("doc"))
            .await
            .unwrap();
        assert_eq!(out["parecer"], "Nexo causal confirmado.");

        let requests = panel.client.as_ref().unwrap().requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let sent = &requests[0];
        assert_eq!(
            sent.system.as_deref(),
            Some(roster::perfil("medico").unwrap().system_prompt)
        );
        assert_eq!(sent.temperature, Some(0.2));
        assert!(sent.messages[0].content.contains("Escopo: processo-123"));
        assert!(sent.messages[0].content.contains("Laudo médico anexo."));
    }

    #[test]
    fn compile_is_deterministic_and_structured() {
        let panel = OpinionPanel::stub();
        let ctx = context(&["a", "b"]);
        let fanout = StageResult {
            succeeded: vec![
                WorkItem {
                    worker_id: "civel".into(),
                    output: json!({"parecer": "ok"}),
                },
                WorkItem {
                    worker_id: "medico".into(),
                    output: json!({"parecer": "nexo"}),
                },
            ],
            failed: vec![FailedWork {
                worker_id: "seguranca".into(),
                reason: WorkerFailure::TimedOut { after_ms: 100 },
            }],
        };
        let sequential = vec![("estrategista".to_string(), json!({"plano": "acordo"}))];

        let first = panel.compile(&ctx, &fanout, &sequential).unwrap();
        let second = panel.compile(&ctx, &fanout, &sequential).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );

        assert_eq!(first["tipo"], "parecer");
        assert_eq!(first["trechos_considerados"], 2);
        assert_eq!(first["secoes"][0]["agente"], "civel");
        assert_eq!(first["secoes"][1]["agente"], "medico");
        assert_eq!(first["complementos"][0]["agente"], "estrategista");
        assert_eq!(first["agentes_falhos"][0]["worker_id"], "seguranca");
    }

    #[test]
    fn from_config_validates_tier() {
        let config = ParecerConfig::default();
        assert!(OpinionPanel::from_config(&config, "sonnet").is_ok());
        assert!(OpinionPanel::from_config(&config, "gpt").is_err());
    }
}
