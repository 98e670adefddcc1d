//! Text helpers for comparing typed answers.

use unicode_normalization::UnicodeNormalization;

/// Prepare a typed answer (or an accepted solution) for comparison.
///
/// Surrounding whitespace never matters, including the full-width space an IME produces. When
/// `case_sensitive` is false the text is NFKC-folded and lowercased, so `Ａ` and `a` compare
/// equal and half-width katakana matches its full-width form.
pub fn normalize_answer(text: &str, case_sensitive: bool) -> String {
    let trimmed = text.trim();
    if case_sensitive {
        return trimmed.to_string();
    }

    trimmed.nfkc().collect::<String>().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_ascii_and_ideographic_space() {
        assert_eq!(normalize_answer("  は\u{3000}", true), "は");
    }

    #[test]
    fn test_case_sensitive_keeps_case() {
        assert_eq!(normalize_answer(" Tokyo ", true), "Tokyo");
    }

    #[test]
    fn test_case_insensitive_folds_full_width() {
        assert_eq!(normalize_answer("ＴＯＫＹＯ", false), "tokyo");
        assert_eq!(normalize_answer("Tokyo", false), "tokyo");
        assert_eq!(normalize_answer("ひらがな", false), "ひらがな");
    }

    #[test]
    fn test_case_insensitive_folds_half_width_katakana() {
        assert_eq!(normalize_answer("ｶﾀｶﾅ", false), "カタカナ");
        assert_eq!(normalize_answer("ｶﾞｯｺｳ", false), "ガッコウ");
        assert_eq!(normalize_answer("ｶﾀｶﾅ", true), "ｶﾀｶﾅ", "case-sensitive answers are compared as typed");
    }
}
