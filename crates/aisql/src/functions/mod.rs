//! The SQL function catalogue
//!
//! - [`catalog`]: static description of every function
//! - [`runner`]: binds arguments, calls the provider and shapes the result
//! - [`response`]: the success/error envelope handed back to SQL

pub mod catalog;
pub mod embedding;
pub mod prompts;
pub mod response;
pub mod runner;

use std::collections::BTreeMap;

pub use catalog::{AiFunction, Category, FunctionSpec, ModelSlot, Param, ParamKind};
pub use response::{PROVIDER_UNAVAILABLE, UdfResponse};
pub use runner::FunctionRunner;

/// Named arguments of one call, as the SQL engine passes them: strings
pub type FunctionArgs = BTreeMap<String, String>;

/// Argument that overrides the configured model for any function
pub const MODEL_ARG: &str = "model_name";
