// Text
pub mod clean;
pub mod parse;

// Pipeline
pub mod classify;
pub mod fetch;
