//! Parser - 모델 출력 해석

pub mod action;

pub use action::{extract_json_objects, parse_action, strip_json_blocks};
