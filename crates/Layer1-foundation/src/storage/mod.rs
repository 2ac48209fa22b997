//! Storage module for Loom
//!
//! - `json`: JSON - 설정/스냅샷 파일 저장/로드

mod json;

pub use json::{JsonStore, STATE_DIR};
