//! Stimulus sources: what is played each trial and how an answer is scored.

use crate::config::{StimulusConfig, StimulusKind};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Spoken digit vocabulary. Zero is left out: "zero"/"oh" are too easily confused in noise.
pub const DIGIT_WORDS: [&str; 9] = [
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];

/// One test item. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stimulus {
    /// Text handed to the vocalizer.
    pub prompt: String,
    /// Tokens a correct answer has to contain.
    pub expected: Vec<String>,
}

/// Produces stimuli and scores answers against the most recent one.
pub trait StimulusSource {
    /// Draw the next stimulus. It becomes the reference for `check_answer`.
    fn get_stimuli(&mut self) -> Stimulus;

    /// Score a response against the current stimulus. False if none was drawn.
    fn check_answer(&self, response_text: &str) -> bool;
}

/// Lower-case, turn typed numerals into words and split on anything that is
/// not a letter.
pub fn normalize_response(response: &str) -> Vec<String> {
    let mut spaced = String::with_capacity(response.len() * 2);
    for ch in response.chars() {
        match ch.to_digit(10) {
            Some(d) if d >= 1 => {
                spaced.push(' ');
                spaced.push_str(DIGIT_WORDS[d as usize - 1]);
                spaced.push(' ');
            }
            Some(_) => spaced.push_str(" zero "),
            None if ch.is_alphabetic() => spaced.extend(ch.to_lowercase()),
            None => spaced.push(' '),
        }
    }
    spaced.split_whitespace().map(str::to_string).collect()
}

/// Count expected tokens found in `response`. Each response token can satisfy
/// at most one expected token.
pub fn count_matches(expected: &[String], response: &str) -> usize {
    let mut remaining = normalize_response(response);
    let mut matched = 0;
    for token in expected {
        let token = token.to_lowercase();
        if let Some(pos) = remaining.iter().position(|w| w.contains(token.as_str())) {
            remaining.swap_remove(pos);
            matched += 1;
        }
    }
    matched
}

/// Random digit triplets (or n-tuples) drawn with replacement.
pub struct DigitQuestions {
    digits: usize,
    min_matches: usize,
    rng: Pcg32,
    current: Option<Stimulus>,
}

impl DigitQuestions {
    pub fn new(digits: usize, min_matches: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => Pcg32::seed_from_u64(s),
            None => Pcg32::from_entropy(),
        };
        Self {
            digits,
            min_matches: min_matches.min(digits),
            rng,
            current: None,
        }
    }

    pub fn from_config(config: &StimulusConfig) -> Self {
        Self::new(config.digits, config.min_matches, config.seed)
    }

    pub fn current(&self) -> Option<&Stimulus> {
        self.current.as_ref()
    }
}

impl StimulusSource for DigitQuestions {
    fn get_stimuli(&mut self) -> Stimulus {
        let expected: Vec<String> = (0..self.digits)
            .map(|_| DIGIT_WORDS[self.rng.gen_range(0..DIGIT_WORDS.len())].to_string())
            .collect();
        let stimulus = Stimulus {
            prompt: expected.join(" "),
            expected,
        };
        debug!(prompt = %stimulus.prompt, "Drew digit stimulus");
        self.current = Some(stimulus.clone());
        stimulus
    }

    fn check_answer(&self, response_text: &str) -> bool {
        match &self.current {
            Some(stimulus) => {
                count_matches(&stimulus.expected, response_text) >= self.min_matches
            }
            None => false,
        }
    }
}

/// Agreement expressed in a free-text answer.
pub fn extract_yes_no(answer: &str) -> Option<bool> {
    let tokens = normalize_response(answer);
    if tokens.iter().any(|t| t == "yes") {
        Some(true)
    } else if tokens.iter().any(|t| t == "no") {
        Some(false)
    } else {
        None
    }
}

const STATEMENTS: &[(&str, bool)] = &[
    ("Is this statement true? London is a city.", true),
    ("Do reject and decline have the same meaning?", true),
    ("Are reindeer and camels both animals?", true),
    ("Is ice hotter than fire?", false),
    ("Do fish live in trees?", false),
    ("Is a week longer than a year?", false),
];

/// Yes/no statements; the answer is correct when its agreement matches.
pub struct StatementQuestions {
    rng: Pcg32,
    current: Option<(Stimulus, bool)>,
}

impl StatementQuestions {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => Pcg32::seed_from_u64(s),
            None => Pcg32::from_entropy(),
        };
        Self { rng, current: None }
    }
}

impl StimulusSource for StatementQuestions {
    fn get_stimuli(&mut self) -> Stimulus {
        let (prompt, truth) = STATEMENTS[self.rng.gen_range(0..STATEMENTS.len())];
        let stimulus = Stimulus {
            prompt: prompt.to_string(),
            expected: vec![if truth { "yes" } else { "no" }.to_string()],
        };
        self.current = Some((stimulus.clone(), truth));
        stimulus
    }

    fn check_answer(&self, response_text: &str) -> bool {
        match (&self.current, extract_yes_no(response_text)) {
            (Some((_, truth)), Some(agree)) => *truth == agree,
            _ => false,
        }
    }
}

/// Build the configured stimulus source.
pub fn build_stimulus_source(config: &StimulusConfig) -> Box<dyn StimulusSource> {
    match config.kind {
        StimulusKind::Digits => Box::new(DigitQuestions::from_config(config)),
        StimulusKind::Statements => Box::new(StatementQuestions::new(config.seed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_expected(expected: &[&str], min_matches: usize) -> DigitQuestions {
        let mut q = DigitQuestions::new(expected.len(), min_matches, Some(7));
        q.current = Some(Stimulus {
            prompt: expected.join(" "),
            expected: expected.iter().map(|s| s.to_string()).collect(),
        });
        q
    }

    #[test]
    fn full_match_is_correct() {
        let q = with_expected(&["one", "two"], 2);
        assert!(q.check_answer("one two"));
    }

    #[test]
    fn partial_match_below_minimum_is_incorrect() {
        let q = with_expected(&["one", "two"], 2);
        assert!(!q.check_answer("one"));
    }

    #[test]
    fn matching_ignores_case() {
        let q = with_expected(&["one", "two"], 2);
        assert!(q.check_answer("ONE Two"));
    }

    #[test]
    fn repeated_word_counts_once() {
        let q = with_expected(&["one", "one", "two"], 3);
        assert!(!q.check_answer("one two"));
        assert!(q.check_answer("one one two"));
        assert_eq!(count_matches(&["four".to_string(), "four".to_string()], "four"), 1);
    }

    #[test]
    fn two_of_three_passes_default_policy() {
        let q = with_expected(&["three", "eight", "five"], 2);
        assert!(q.check_answer("three eight nine"));
        assert!(!q.check_answer("three"));
    }

    #[test]
    fn expected_word_inside_a_longer_word_counts() {
        let expected = vec!["eight".to_string(), "four".to_string()];
        assert_eq!(count_matches(&expected, "eighth fours"), 2);
        // one response word cannot satisfy two expected words
        assert_eq!(count_matches(&expected, "foureight"), 1);
        let q = with_expected(&["eight", "four"], 2);
        assert!(q.check_answer("Eighth, fours"));
    }

    #[test]
    fn typed_numerals_are_words() {
        assert_eq!(normalize_response("3, 8 5"), vec!["three", "eight", "five"]);
        assert_eq!(normalize_response("385"), vec!["three", "eight", "five"]);
        let q = with_expected(&["three", "eight", "five"], 3);
        assert!(q.check_answer("385"));
    }

    #[test]
    fn no_current_stimulus_is_incorrect() {
        let q = DigitQuestions::new(3, 2, Some(1));
        assert!(!q.check_answer("one two three"));
    }

    #[test]
    fn draws_requested_number_of_digits() {
        let mut q = DigitQuestions::new(3, 2, Some(42));
        let s = q.get_stimuli();
        assert_eq!(s.expected.len(), 3);
        assert!(s.expected.iter().all(|d| DIGIT_WORDS.contains(&d.as_str())));
        assert_eq!(s.prompt, s.expected.join(" "));
        assert_eq!(q.current(), Some(&s));
        assert!(q.check_answer(&s.prompt));
    }

    #[test]
    fn seeded_sources_repeat() {
        let mut a = DigitQuestions::new(3, 2, Some(9));
        let mut b = DigitQuestions::new(3, 2, Some(9));
        for _ in 0..5 {
            assert_eq!(a.get_stimuli(), b.get_stimuli());
        }
    }

    #[test]
    fn yes_no_extraction() {
        assert_eq!(extract_yes_no("Yes, it is"), Some(true));
        assert_eq!(extract_yes_no("no way"), Some(false));
        assert_eq!(extract_yes_no("I know"), None);
        assert_eq!(extract_yes_no(""), None);
    }

    #[test]
    fn statement_scoring_follows_truth() {
        let mut q = StatementQuestions::new(Some(3));
        let s = q.get_stimuli();
        let right = s.expected[0].clone();
        let wrong = if right == "yes" { "no" } else { "yes" };
        assert!(q.check_answer(&right));
        assert!(!q.check_answer(wrong));
        assert!(!q.check_answer("maybe"));
    }
}
