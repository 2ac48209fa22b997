//! Model backend implementations

pub mod openai;
