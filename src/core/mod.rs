pub mod composer;
pub mod engine;
pub mod mapper;
pub mod reader;
pub mod renderer;
pub mod text;

pub use crate::domain::model::{RunSummary, StudentRecord};
pub use crate::domain::ports::{Mailer, Storage};
pub use crate::utils::error::Result;
