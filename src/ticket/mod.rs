pub mod draft;
pub mod parser;
