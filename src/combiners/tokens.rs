//! Word frequency over free text.

use super::CombineFn;
use super::count::Tally;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;

/// Frequency of case-folded alphabetic tokens of at least `min_len` letters.
///
/// Text is lower-cased, then every maximal run of ASCII letters bounded by
/// word boundaries counts as one token. Digits, punctuation, and tokens
/// shorter than `min_len` never match, so they never enter the table.
///
/// - Accumulator: `HashMap<String, u64>`
/// - Output: [`Tally<String>`]
#[derive(Clone, Debug)]
pub struct TokenFrequency {
    min_len: usize,
    pattern: Regex,
}

impl TokenFrequency {
    /// # Errors
    /// Fails if `min_len` is zero.
    pub fn new(min_len: usize) -> Result<Self> {
        anyhow::ensure!(min_len > 0, "minimum token length must be at least 1");
        let pattern = Regex::new(&format!(r"\b[a-z]{{{min_len},}}\b"))
            .with_context(|| format!("build tokenizer for min length {min_len}"))?;
        Ok(Self { min_len, pattern })
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Tokens of `text`, in order of appearance.
    pub fn tokenize<'t>(&self, lowered: &'t str) -> impl Iterator<Item = &'t str> + use<'t, '_> {
        self.pattern.find_iter(lowered).map(|m| m.as_str())
    }
}

impl<'a> CombineFn<&'a str, HashMap<String, u64>, Tally<String>> for TokenFrequency {
    fn create(&self) -> HashMap<String, u64> {
        HashMap::new()
    }

    fn add_input(&self, acc: &mut HashMap<String, u64>, text: &'a str) {
        let lowered = text.to_lowercase();
        for token in self.tokenize(&lowered) {
            match acc.get_mut(token) {
                Some(n) => *n += 1,
                None => {
                    acc.insert(token.to_string(), 1);
                }
            }
        }
    }

    fn merge(&self, acc: &mut HashMap<String, u64>, other: HashMap<String, u64>) {
        if acc.is_empty() {
            *acc = other;
            return;
        }
        for (token, n) in other {
            *acc.entry(token).or_insert(0) += n;
        }
    }

    fn finish(&self, acc: HashMap<String, u64>) -> Tally<String> {
        acc.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_case_folded_tokens() {
        let tf = TokenFrequency::new(3).unwrap();
        let acc = tf.build_from_batch(["Cats And Dogs", "dogs are cats"]);
        let tally = tf.finish(acc);
        assert_eq!(tally.len(), 4);
        assert_eq!(tally.get(&"cats".to_string()), 2);
        assert_eq!(tally.get(&"dogs".to_string()), 2);
        assert_eq!(tally.get(&"and".to_string()), 1);
        assert_eq!(tally.get(&"are".to_string()), 1);
    }

    #[test]
    fn skips_short_numeric_and_punctuated_tokens() {
        let tf = TokenFrequency::new(3).unwrap();
        let lowered = "an ox, covid-19 in 2020: r2d2 isn't real!".to_string();
        let tokens: Vec<&str> = tf.tokenize(&lowered).collect();
        assert_eq!(tokens, vec!["covid", "real"]);
    }

    #[test]
    fn rejects_zero_min_len() {
        assert!(TokenFrequency::new(0).is_err());
    }
}
