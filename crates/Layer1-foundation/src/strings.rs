//! String utilities
//!
//! UTF-8 경계를 지키는 자르기 헬퍼

/// 최대 `max_chars` 문자까지 자른 슬라이스 (문자 경계 보장)
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// 잘렸으면 접미사를 붙인 문자열
pub fn truncate_with_suffix(text: &str, max_chars: usize, suffix: &str) -> String {
    let head = truncate_chars(text, max_chars);
    if head.len() == text.len() {
        text.to_string()
    } else {
        format!("{}{}", head, suffix)
    }
}
