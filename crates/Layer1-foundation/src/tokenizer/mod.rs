//! Tokenizer Module - 토큰 수 추정
//!
//! 모델별 토크나이저 없이 문자 수와 단어 수로 보수적으로 추정합니다.
//!
//! ```ignore
//! use loom_foundation::tokenizer::estimate_tokens;
//!
//! let tokens = estimate_tokens("Hello, world!");
//! ```

/// 평균 토큰당 문자 수
pub const CHARS_PER_TOKEN: usize = 4;

/// 토큰 수 추정: max(문자 수 / 4, 단어 수), 빈 문자열은 0
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let by_chars = text.chars().count() / CHARS_PER_TOKEN;
    let by_words = text.split_whitespace().count();
    by_chars.max(by_words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_char_based() {
        let text = "a".repeat(400);
        assert_eq!(estimate_tokens(&text), 100);
    }

    #[test]
    fn test_word_based_wins_for_short_words() {
        // 9 chars / 4 = 2, but 5 words
        assert_eq!(estimate_tokens("a b c d e"), 5);
    }
}
