pub mod pipeline_service;
pub mod pipeline_store;
pub mod transition_service;
