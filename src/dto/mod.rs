pub mod pipeline_dto;
pub mod transition_dto;
