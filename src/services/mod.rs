pub mod clipboard;
pub mod export;
pub mod gemini;
pub mod generation;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod setup;
pub mod workflow;
