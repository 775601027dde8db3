pub mod llm;
pub mod outline;
pub mod pipeline;
pub mod pricing;
pub mod prompts;
pub mod sanitizer;
