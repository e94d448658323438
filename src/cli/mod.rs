pub mod arg_parser;

pub use arg_parser::Cli;
