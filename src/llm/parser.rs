//! Turn an utterance into the assistant's JSON reply
//!
//! The model answers with `{actions, response}`. Each action keeps its
//! `type`/`action` tags as plain strings here; validating them against the
//! known vocabulary happens per action when the batch is executed, so one
//! bad entry never discards its siblings.

use crate::core::error::{OdrnaError, Result};
use crate::llm::client::CompletionService;
use crate::llm::context::AssistantContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One action exactly as the model wrote it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    /// Entity type tag: `task`, `event` or `transaction`
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Verb tag: `create`, `update`, `delete` or `list`
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

/// The `{actions, response}` object returned by the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    #[serde(default)]
    pub actions: Vec<RawAction>,
    #[serde(default)]
    pub response: String,
}

/// Ask the completion service for a reply to `input`
pub async fn request_reply(
    service: &dyn CompletionService,
    input: &str,
    context: &AssistantContext<'_>,
) -> Result<AssistantReply> {
    let system_prompt = format!(
        "{}\n\nCONTEXTO ATUAL DO USUÁRIO:\n{}",
        ASSISTANT_SYSTEM_PROMPT,
        context.summary()
    );

    let response = service.complete(&system_prompt, input).await?;
    parse_reply(&response)
}

/// Parse model output into a reply
pub fn parse_reply(response: &str) -> Result<AssistantReply> {
    let json_str = extract_json(response)?;
    serde_json::from_str(json_str).map_err(|e| {
        OdrnaError::LlmMalformed(format!(
            "Failed to parse reply: {} - Response: {}",
            e, response
        ))
    })
}

/// Extract the JSON object from model output (code fences, surrounding prose)
fn extract_json(response: &str) -> Result<&str> {
    let text = response.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .map(|s| s.trim_end().trim_end_matches("```"))
        .unwrap_or(text);

    let start = text
        .find('{')
        .ok_or_else(|| OdrnaError::LlmMalformed("No JSON found in response".into()))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| OdrnaError::LlmMalformed("No closing brace found in JSON response".into()))?;
    if end < start {
        return Err(OdrnaError::LlmMalformed("Malformed JSON in response".into()));
    }
    Ok(&text[start..=end])
}

/// System prompt for the assistant
const ASSISTANT_SYSTEM_PROMPT: &str = r#"Você é o assistente de produtividade do Odrna. Interprete o pedido do usuário e converta-o em ações estruturadas sobre tarefas, eventos e transações financeiras. Você também pode apenas conversar.

AÇÕES DISPONÍVEIS (cada ação tem os campos "type", "action" e "data"):

1. TAREFAS (type: "task")
   - create: data { title, category?, priority?, dueDate? (AAAA-MM-DD), description? }
   - update: data { id, updates: { title?, completed?, category?, priority?, dueDate?, description? } }
   - delete: data { id }
   - list:   data {}

2. EVENTOS (type: "event")
   - create: data { title, date (AAAA-MM-DD), time? (HH:MM), category?, description? }
   - update: data { id, updates: { title?, date?, time?, category?, description? } }
   - delete: data { id }
   - list:   data {}

3. TRANSAÇÕES (type: "transaction")
   - create: data { description, amount (número positivo), type ("income" | "expense"), category?, date? }
   - update: data { id, updates: { description?, amount?, type?, category?, date? } }
   - delete: data { id }
   - list:   data {}

VALORES PERMITIDOS:
- category de tarefas e eventos: "trabalho" | "estudos" | "saude" | "pessoal"
- priority: "low" | "medium" | "high"
- category de transações: "alimentacao" | "transporte" | "saude" | "lazer" | "salario" | "outros"

REGRAS:
- Use apenas ids que aparecem no contexto para update e delete.
- "Crie 2 tarefas: X e Y" gera duas ações create de task, na ordem pedida.
- Datas relativas (hoje, amanhã, próxima segunda) devem virar datas absolutas a partir da DATA E HORA ATUAL.
- Um horário específico ("18h", "às 14:30") indica um EVENTO com date e time.
- Estudar, curso, prova: "estudos". Médico, academia, exercício: "saude". Reunião, trabalho, cliente: "trabalho".
- Salário e pagamentos recebidos são "income" com categoria "salario". Mercado e restaurante são "expense" com categoria "alimentacao".
- O valor (amount) é sempre positivo; a direção vem de "type".
- Se for só conversa, retorne actions vazio e responda de forma amigável.

RESPOSTA (somente JSON):
{"actions": [...], "response": "mensagem curta e amigável para o usuário"}

EXEMPLOS:
Usuário: "Crie 2 tarefas: estudar inglês e fazer exercícios"
{"actions": [{"type": "task", "action": "create", "data": {"title": "Estudar inglês", "category": "estudos"}}, {"type": "task", "action": "create", "data": {"title": "Fazer exercícios", "category": "saude"}}], "response": "Pronto! Criei 2 tarefas: Estudar inglês (Estudos) e Fazer exercícios (Saúde)."}

Usuário: "Meu salário de R$ 1400 caiu"
{"actions": [{"type": "transaction", "action": "create", "data": {"description": "Salário", "amount": 1400, "type": "income", "category": "salario"}}], "response": "Registrei sua receita de R$ 1.400,00 (Salário)."}

Usuário: "Liste minhas tarefas"
{"actions": [{"type": "task", "action": "list", "data": {}}], "response": "Aqui estão suas tarefas."}"#;
