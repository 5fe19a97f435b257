pub mod dialogue;
pub mod error;
pub mod llm_client;
pub mod orchestrator;
pub mod persona;
pub mod register;
pub mod relationship;
pub mod session;
pub mod store;
pub mod topic;

pub use error::{CoachError, ErrorKind, Result};
