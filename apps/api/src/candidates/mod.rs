// Candidate Registry: id generation, persistence and the registration flow.

pub mod handlers;
pub mod id;
pub mod registry;
pub mod repository;
