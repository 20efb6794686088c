//! Character-trigram text similarity.
//!
//! Deterministic, content-aware vectors built from character trigrams and
//! word frequencies. Not semantically accurate like a neural model, but
//! consistent and offline, which is all the reranker and the local retriever
//! need to order short travel queries and records.

use std::collections::{HashMap, HashSet};

/// Vector width used when no other is configured.
pub const DEFAULT_DIMENSIONS: usize = 384;

const STOP_WORDS: [&str; 33] = [
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what",
];

/// Unit-length trigram vector of `text`. All zeros when the text has no
/// usable words.
pub fn trigram_vector(text: &str, dimensions: usize) -> Vec<f32> {
    let mut vector = vec![0.0; dimensions.max(1)];
    let dims = vector.len();

    let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    let lower = text.to_lowercase();

    let mut word_freq: HashMap<&str, u32> = HashMap::new();
    for word in lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2 && !stop_words.contains(w))
    {
        *word_freq.entry(word).or_insert(0) += 1;
    }

    for (word, freq) in &word_freq {
        let chars: Vec<char> = word.chars().collect();
        for window in chars.windows(3) {
            let hash = window
                .iter()
                .fold(0u64, |acc, c| acc.wrapping_mul(37).wrapping_add(*c as u64));
            vector[(hash as usize) % dims] += (*freq as f32).sqrt();
        }

        let word_hash = word
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        vector[(word_hash as usize) % dims] += *freq as f32;
    }

    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }

    vector
}

/// Cosine similarity of two vectors of equal width; 0.0 for zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Trigram cosine similarity of two texts.
pub fn text_similarity(a: &str, b: &str) -> f32 {
    cosine_similarity(
        &trigram_vector(a, DEFAULT_DIMENSIONS),
        &trigram_vector(b, DEFAULT_DIMENSIONS),
    )
}
