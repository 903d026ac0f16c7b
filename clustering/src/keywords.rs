use std::collections::HashMap;

pub const MAX_KEYWORDS: usize = 5;
pub const NAME_KEYWORDS: usize = 3;
pub const UNNAMED_CLUSTER: &str = "Unnamed Cluster";

const MIN_WORD_LEN: usize = 3;
const TRIM_CHARS: &[char] = &['.', ',', '!', '?', '"', '\'', '(', ')', '[', ']', '{', '}'];

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do",
    "does", "did", "will", "would", "could", "should", "may", "might", "must", "this", "that",
    "these", "those", "i", "you", "he", "she", "it", "we", "they", "what", "which", "who",
    "when", "where", "why", "how", "all", "each", "every", "both", "few", "more", "most",
    "other", "some", "such", "no", "not", "only", "own", "same", "so", "than", "too", "very",
    "just", "can", "about", "into", "through", "during", "before", "after", "above", "below",
    "up", "down", "out", "off", "over", "under", "again", "further", "then", "once",
];

/// Most frequent non-stopword words across `contents`, at most
/// [`MAX_KEYWORDS`]. Equal counts are ordered alphabetically.
pub fn extract_keywords<S: AsRef<str>>(contents: &[S]) -> Vec<String> {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for content in contents {
        for word in content.as_ref().to_lowercase().split_whitespace() {
            let word = word.trim_matches(TRIM_CHARS);
            if word.len() < MIN_WORD_LEN || STOPWORDS.contains(&word) {
                continue;
            }
            *freq.entry(word.to_string()).or_insert(0) += 1;
        }
    }

    let mut counts: Vec<(String, usize)> = freq.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(word, _)| word)
        .collect()
}

/// Up to three keywords joined with " & ".
pub fn cluster_name(keywords: &[String]) -> String {
    if keywords.is_empty() {
        return UNNAMED_CLUSTER.to_string();
    }
    keywords
        .iter()
        .take(NAME_KEYWORDS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" & ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_filter_stopwords_and_short_words() {
        let keywords = extract_keywords(&[
            "The retry logic, again!",
            "Retry with backoff (retry).",
            "Backoff is an ok idea"
        ]);
        assert_eq!(keywords[0], "retry");
        assert_eq!(keywords[1], "backoff");
        assert!(!keywords.contains(&"the".to_string()));
        assert!(!keywords.contains(&"ok".to_string()));
        assert!(keywords.len() <= MAX_KEYWORDS);
    }

    #[test]
    fn test_name_uses_top_three() {
        let words: Vec<String> = ["rust", "async", "tokio", "futures"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        assert_eq!(cluster_name(&words), "rust & async & tokio");
        assert_eq!(cluster_name(&[]), UNNAMED_CLUSTER);
    }

    #[test]
    fn test_ties_are_alphabetical() {
        let keywords = extract_keywords(&["zebra apple mango"]);
        assert_eq!(keywords, vec!["apple", "mango", "zebra"]);
    }
}
