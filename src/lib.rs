pub mod error_handling;
pub mod generator;
pub mod grammar;
pub mod parser;
pub mod recognizer;
