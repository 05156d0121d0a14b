//! Transport layer: the terminal driver

pub mod cli;

pub use cli::StdoutSink;
