pub mod agent;
pub mod apply_edit;
pub mod editor;
pub mod executor;
pub mod llm_client;
pub mod plan_validator;
pub mod prompt_builder;
pub mod registry;
pub mod store;
