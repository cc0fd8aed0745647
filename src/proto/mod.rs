pub mod command;
pub mod parser;

pub use command::{Command, c2_wrap, serialize, wrap};
pub use parser::{ParseError, format_command};
