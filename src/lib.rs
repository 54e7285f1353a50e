pub mod browser;
pub mod cli;
pub mod completion;
pub mod digest;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod server;
pub mod utils;
