use unicode_normalization::UnicodeNormalization;

const IDEOGRAPHIC_SPACE: char = '\u{3000}';

/// Comparison key for a tag name. Never stored.
///
/// Applies NFKC, lower-cases, folds any remaining full-width alphanumerics
/// and ideographic spaces to ASCII, then trims. NFKC can expand a spacing
/// mark such as `´` into a space and a combining mark, so trimming is last.
pub fn normalize(tag_name: &str) -> String {
    let folded: String = tag_name
        .nfkc()
        .flat_map(char::to_lowercase)
        .map(fold_width)
        .collect();
    folded.trim().to_string()
}

fn fold_width(c: char) -> char {
    match c {
        '\u{FF10}'..='\u{FF19}' | '\u{FF21}'..='\u{FF3A}' | '\u{FF41}'..='\u{FF5A}' => {
            char::from_u32(c as u32 - 0xFEE0).unwrap_or(c)
        }
        IDEOGRAPHIC_SPACE => ' ',
        _ => c,
    }
}

/// Whitespace-separated tokens of a tag, with U+3000 treated as a space.
/// Order is kept; repeats collapse onto their first occurrence.
pub fn tokens(tag_name: &str) -> Vec<String> {
    let spaced = tag_name.replace(IDEOGRAPHIC_SPACE, " ");
    let mut out: Vec<String> = Vec::new();
    for token in spaced.split_whitespace() {
        if !out.iter().any(|t| t == token) {
            out.push(token.to_string());
        }
    }
    out
}

/// Number of raw tokens before de-duplication.
pub(crate) fn raw_token_count(tag_name: &str) -> usize {
    tag_name.replace(IDEOGRAPHIC_SPACE, " ").split_whitespace().count()
}
