pub mod noop;
pub mod ollama;
