use crate::client::{ChatClient, ChatMessage, ChatRequest, GenerationError, OpenAiClient};
use planpilot_core::{RefinerConfig, TaskMap, TokenUsage};

const REFINER_PERSONA: &str =
    "You are an assistant that improves and adds crucial points to plans in .md format.";

/// A revised plan plus what the revision cost.
#[derive(Debug, Clone)]
pub struct Refinement {
    pub text: String,
    pub usage: TokenUsage,
}

/// Produces a revised plan from the current text and task status.
///
/// Any error means "keep the old plan"; implementations must never
/// return partial output.
pub trait PlanRefiner {
    fn refine(&self, plan: &str, tasks: &TaskMap) -> Result<Refinement, GenerationError>;
}

/// Refiner backed by a chat-completion endpoint.
pub struct ChatRefiner<C = OpenAiClient> {
    client: C,
    cfg: RefinerConfig,
}

impl ChatRefiner<OpenAiClient> {
    pub fn from_config(cfg: RefinerConfig) -> Result<Self, GenerationError> {
        let client = OpenAiClient::new(cfg.clone())?;
        Ok(Self { client, cfg })
    }
}

impl<C: ChatClient> ChatRefiner<C> {
    pub fn with_client(client: C, cfg: RefinerConfig) -> Self {
        Self { client, cfg }
    }

    fn revision_messages(plan: &str, tasks: &TaskMap) -> Vec<ChatMessage> {
        let task_status = serde_json::to_string(tasks).unwrap_or_else(|_| "{}".to_string());
        vec![
            ChatMessage::System {
                content: REFINER_PERSONA.to_string(),
            },
            ChatMessage::User {
                content: format!(
                    "Update the following plan given the task status below, keep the .md format:\n\
                     {plan}\n\
                     Include the current tasks in the improved plan, keep mind of their status and \
                     track them with a checklist:\n\
                     {task_status}\n \
                     Revised version should comply with the contents of the tasks at hand:"
                ),
            },
        ]
    }
}

impl<C: ChatClient> PlanRefiner for ChatRefiner<C> {
    fn refine(&self, plan: &str, tasks: &TaskMap) -> Result<Refinement, GenerationError> {
        let request = ChatRequest {
            model: self.cfg.model.clone(),
            messages: Self::revision_messages(plan, tasks),
            max_tokens: self.cfg.max_output_tokens,
            temperature: self.cfg.temperature,
        };
        let completion = self.client.complete(&request)?;
        if completion.text.trim().is_empty() {
            return Err(GenerationError::EmptyCompletion);
        }
        Ok(Refinement {
            text: completion.text,
            usage: completion.usage,
        })
    }
}
