//! LLM provider implementations for colloquy.
//!
//! Any endpoint speaking the OpenAI chat-completions dialect (OpenAI,
//! Ollama, vLLM, proxies) is reachable through `OpenAiCompatProvider`.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
