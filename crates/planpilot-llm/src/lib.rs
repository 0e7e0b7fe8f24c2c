//! Chat-completion client and the plan refiner built on it.
//!
//! The client is deliberately synchronous: the host agent issues one
//! command at a time and blocks on the result, so the only concession to
//! resilience is bounded backoff around the remote call.

mod client;
mod refiner;

pub use client::{
    ChatClient, ChatCompletion, ChatMessage, ChatRequest, GenerationError, OpenAiClient,
};
pub use refiner::{ChatRefiner, PlanRefiner, Refinement};
