//! Small shared helpers with no domain knowledge.

pub mod text;
