pub mod call;
pub mod config;
pub mod extract;
pub mod functions;
pub mod reassemble;

pub use call::CallCommand;
pub use config::ConfigCommand;
pub use extract::ExtractCommand;
pub use functions::FunctionsCommand;
pub use reassemble::ReassembleCommand;
