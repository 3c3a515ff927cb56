const STOP_WORDS: &[&str] = &[
    "find", "search", "get", "show", "me", "the", "a", "an", "is", "are", "of", "for", "with",
    "about", "where", "in", "on", "at", "to", "from", "by",
];

pub(crate) fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Reduce a request to its search terms.
///
/// Lower-cases, drops stop words and tokens of two characters or fewer.
/// Returns the original text when nothing survives.
pub fn reduce(text: &str) -> String {
    let lowered = text.to_lowercase();
    let kept: Vec<&str> = lowered
        .split_whitespace()
        .filter(|word| !is_stop_word(word) && word.chars().count() > 2)
        .collect();

    if kept.is_empty() {
        text.to_string()
    } else {
        kept.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_fillers_and_short_tokens() {
        assert_eq!(reduce("Find me the Dune books by Herbert"), "dune books herbert");
        assert_eq!(reduce("show a TV guide"), "guide");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(reduce("  search   galaxy\tquest  "), "galaxy quest");
    }

    #[test]
    fn empty_reduction_returns_original() {
        assert_eq!(reduce("find me a"), "find me a");
    }
}
