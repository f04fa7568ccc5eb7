//! Question helpers.

const VOWELS: &str = "aeiouäöü";

/// Default width of abbreviated questions in log lines.
pub const DEFAULT_COMPRESSED_LEN: usize = 44;

/// Match a question against a comma-separated filter, ignoring case.
///
/// With a leading `-` none of the terms may appear, otherwise all of them
/// must.
pub fn filter_question(question: &str, filter: &str) -> bool {
    let question = question.to_lowercase();
    match filter.strip_prefix('-') {
        Some(negated) => !negated
            .split(',')
            .map(|term| term.replace('-', "").trim().to_lowercase())
            .any(|term| question.contains(&term)),
        None => filter
            .split(',')
            .map(|term| term.trim().to_lowercase())
            .all(|term| question.contains(&term)),
    }
}

fn is_vowel(c: char) -> bool {
    VOWELS.contains(c)
}

/// Drop the vowels of a word, except the first and last letter and vowels
/// next to another vowel.
pub fn compress_word(word: &str) -> String {
    let chars: Vec<char> = word.to_lowercase().chars().collect();
    if chars.len() <= 2 || !chars.iter().copied().any(is_vowel) {
        return chars.into_iter().collect();
    }

    let last = chars.len() - 1;
    chars
        .iter()
        .enumerate()
        .filter(|&(i, &c)| {
            i == 0 || i == last || !is_vowel(c) || is_vowel(chars[i - 1]) || is_vowel(chars[i + 1])
        })
        .map(|(_, &c)| c)
        .collect()
}

/// Compress every word and cut the result to `max_len` characters,
/// marking the cut with `..`.
pub fn compress_sentence(sentence: &str, max_len: usize) -> String {
    let compressed = sentence
        .split_whitespace()
        .map(compress_word)
        .collect::<Vec<_>>()
        .join(" ");

    if compressed.chars().count() <= max_len {
        return compressed;
    }
    let mut cut: String = compressed.chars().take(max_len.saturating_sub(2)).collect();
    cut.push_str("..");
    cut
}
