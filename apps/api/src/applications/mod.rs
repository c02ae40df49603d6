pub mod analysis;
pub mod analytics;
pub mod cover_letter;
pub mod handlers;
pub mod prompts;
pub mod status;
pub mod workflow;
