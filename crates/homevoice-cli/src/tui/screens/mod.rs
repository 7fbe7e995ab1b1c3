pub mod chat;
pub mod dashboard;
pub mod devices;
pub mod llm;
pub mod models;
pub mod training;
