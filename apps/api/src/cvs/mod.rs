pub mod adaptation;
pub mod handlers;
pub mod parser;
pub mod prompts;
