pub mod commands;
pub mod error;
pub mod output;

pub use commands::{CallCommand, ConfigCommand, ExtractCommand, FunctionsCommand, ReassembleCommand};
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, read_input, truncate_string};
