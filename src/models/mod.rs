pub mod candidate;
pub mod dialog;
pub mod job;
pub mod stage;
