//! Keyword relevance shared by the memory stores.

use convoy_core::memory::Memory;

/// Words shorter than this are ignored when matching.
const MIN_KEYWORD_LEN: usize = 3;

fn keywords(prompt: &str) -> Vec<String> {
    prompt
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN)
        .map(str::to_lowercase)
        .collect()
}

/// Memories sharing at least one keyword with `prompt`, best matches first.
///
/// A prompt with no usable keywords recalls everything in stored order.
pub(crate) fn keyword_recall(memories: &[Memory], prompt: &str) -> Vec<Memory> {
    let words = keywords(prompt);
    if words.is_empty() {
        return memories.to_vec();
    }

    let mut scored: Vec<(usize, &Memory)> = memories
        .iter()
        .filter_map(|m| {
            let content = m.content.to_lowercase();
            let hits = words.iter().filter(|w| content.contains(w.as_str())).count();
            (hits > 0).then_some((hits, m))
        })
        .collect();

    // stable: equal scores keep insertion order
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, m)| m.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_by_keyword_hits() {
        let memories = vec![
            Memory::new("The user likes tea"),
            Memory::new("The user's favourite language is Rust"),
            Memory::new("Rust language meetups happen on Tuesdays"),
        ];

        let recalled = keyword_recall(&memories, "Which language, Rust or Go?");
        assert_eq!(recalled.len(), 2);
        assert!(recalled[0].content.contains("Rust"));
        assert!(!recalled.iter().any(|m| m.content.contains("tea")));
    }

    #[test]
    fn short_prompt_recalls_everything() {
        let memories = vec![Memory::new("a"), Memory::new("b")];
        assert_eq!(keyword_recall(&memories, "hi?").len(), 2);
    }
}
