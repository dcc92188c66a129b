//! Output channels for scan results.

pub mod console;

pub use console::ConsoleOutput;
