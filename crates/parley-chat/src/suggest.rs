//! Fuzzy completions for partial input.
//!
//! The corpus is the configured topics plus the distinct texts the user has
//! typed. Matching is approximate-substring: the query is compared against
//! every window of the candidate of roughly the query's length, and the best
//! window's edit distance (relative to the query length) plus a small
//! penalty for how far into the candidate it starts gives the score. Lower
//! is better; `0.0` is an exact prefix match.

use parley_core::config::SuggestionConfig;

/// How much a match starting one character later costs.
const LOCATION_PENALTY: f64 = 0.01;

/// Ranked completion source. Cheap to rebuild; holds no external state.
#[derive(Debug, Clone)]
pub struct SuggestionEngine {
    topics: Vec<String>,
    utterances: Vec<String>,
    threshold: f64,
    min_input_chars: usize,
    max_results: usize,
}

impl SuggestionEngine {
    pub fn new(config: &SuggestionConfig) -> Self {
        Self {
            topics: config.topics.clone(),
            utterances: Vec::new(),
            threshold: config.threshold,
            min_input_chars: config.min_input_chars,
            max_results: config.max_results,
        }
    }

    /// Engine over a fixed topic list with default tuning.
    pub fn with_topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut engine = Self::new(&SuggestionConfig::default());
        engine.topics = topics.into_iter().map(Into::into).collect();
        engine
    }

    /// Add a user-authored text to the corpus. Blank and repeated texts are
    /// ignored.
    pub fn record_utterance(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() || self.utterances.iter().any(|u| u == text) {
            return;
        }
        self.utterances.push(text.to_string());
    }

    /// Drop every recorded utterance, keeping the topics.
    pub fn clear_utterances(&mut self) {
        self.utterances.clear();
    }

    pub fn utterance_count(&self) -> usize {
        self.utterances.len()
    }

    /// Title-cased, de-duplicated matches for `partial`, best first, capped
    /// at the configured maximum. Empty when the input is too short.
    pub fn suggest(&self, partial: &str) -> Vec<String> {
        let query = partial.trim().to_lowercase();
        let query_len = query.chars().count();
        if query_len < self.min_input_chars.max(1) {
            return Vec::new();
        }
        let query: Vec<char> = query.chars().collect();

        let mut ranked: Vec<(f64, String)> = Vec::new();
        for candidate in self.topics.iter().chain(self.utterances.iter()) {
            let Some(score) = match_score(&query, candidate) else {
                continue;
            };
            if score > self.threshold {
                continue;
            }
            let display = title_case(candidate);
            match ranked.iter_mut().find(|(_, d)| *d == display) {
                Some(existing) => existing.0 = existing.0.min(score),
                None => ranked.push((score, display)),
            }
        }

        // Stable: ties keep corpus order, topics first.
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
        ranked
            .into_iter()
            .take(self.max_results)
            .map(|(_, display)| display)
            .collect()
    }
}

/// Best score of `query` (lowercased chars) against any window of
/// `candidate`. `None` for an empty candidate.
fn match_score(query: &[char], candidate: &str) -> Option<f64> {
    let text: Vec<char> = candidate.to_lowercase().chars().collect();
    if text.is_empty() || query.is_empty() {
        return None;
    }
    let qlen = query.len();
    let query: String = query.iter().collect();

    if text.len() < qlen {
        let distance = strsim::levenshtein(&query, &text.iter().collect::<String>());
        return Some(distance as f64 / qlen as f64);
    }

    let mut best = f64::MAX;
    for width in qlen.saturating_sub(1).max(1)..=qlen + 1 {
        if width > text.len() {
            break;
        }
        for start in 0..=text.len() - width {
            let window: String = text[start..start + width].iter().collect();
            let distance = strsim::levenshtein(&query, &window);
            let score = distance as f64 / qlen as f64 + start as f64 * LOCATION_PENALTY;
            if score < best {
                best = score;
            }
            if best == 0.0 {
                return Some(best);
            }
        }
    }
    Some(best)
}

/// First character upper-case, the rest lower-case.
fn title_case(text: &str) -> String {
    let text = text.trim();
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_match() {
        let engine = SuggestionEngine::with_topics(["Admissions", "Departments"]);
        assert_eq!(engine.suggest("admi"), vec!["Admissions"]);
    }

    #[test]
    fn test_short_input_has_no_suggestions() {
        let engine = SuggestionEngine::with_topics(["Admissions", "Departments"]);
        assert!(engine.suggest("a").is_empty());
        assert!(engine.suggest("").is_empty());
        assert!(engine.suggest("   d  ").is_empty());
    }

    #[test]
    fn test_typo_still_matches() {
        let engine = SuggestionEngine::with_topics(["Admissions", "Scholarships"]);
        assert_eq!(engine.suggest("admsi"), vec!["Admissions"]);
        assert_eq!(engine.suggest("schol"), vec!["Scholarships"]);
    }

    #[test]
    fn test_unrelated_query_has_no_suggestions() {
        let engine = SuggestionEngine::with_topics(["Admissions", "Departments"]);
        assert!(engine.suggest("xyzzy").is_empty());
    }

    #[test]
    fn test_ranked_by_match_quality() {
        let engine = SuggestionEngine::with_topics(["Placement cell", "Placements"]);
        // Both contain "place" at the start; an exact window ties, so order
        // falls back to corpus order. A later match ranks below.
        let engine2 = SuggestionEngine::with_topics(["Campus events", "Events"]);
        assert_eq!(engine.suggest("place"), vec!["Placement cell", "Placements"]);
        assert_eq!(engine2.suggest("events"), vec!["Events", "Campus events"]);
    }

    #[test]
    fn test_title_case_and_dedup() {
        let mut engine = SuggestionEngine::with_topics(["Admissions"]);
        engine.record_utterance("ADMISSIONS");
        engine.record_utterance("admission deadline");
        let got = engine.suggest("admis");
        assert_eq!(got, vec!["Admissions", "Admission deadline"]);
    }

    #[test]
    fn test_recorded_utterances_join_corpus() {
        let mut engine = SuggestionEngine::with_topics(["Admissions"]);
        assert!(engine.suggest("hostel").is_empty());

        engine.record_utterance("Hostel fees");
        engine.record_utterance("Hostel fees");
        engine.record_utterance("   ");
        assert_eq!(engine.utterance_count(), 1);
        assert_eq!(engine.suggest("hostel"), vec!["Hostel fees"]);

        engine.clear_utterances();
        assert!(engine.suggest("hostel").is_empty());
        assert_eq!(engine.suggest("admi"), vec!["Admissions"]);
    }

    #[test]
    fn test_results_capped() {
        let config = SuggestionConfig {
            topics: (1..=10).map(|i| format!("Event {}", i)).collect(),
            max_results: 3,
            ..SuggestionConfig::default()
        };
        let engine = SuggestionEngine::new(&config);
        assert_eq!(engine.suggest("event").len(), 3);
    }

    #[test]
    fn test_threshold_from_config() {
        let config = SuggestionConfig {
            topics: vec!["Admissions".to_string()],
            threshold: 0.0,
            ..SuggestionConfig::default()
        };
        let engine = SuggestionEngine::new(&config);
        assert_eq!(engine.suggest("admi"), vec!["Admissions"]);
        assert!(engine.suggest("admsi").is_empty());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("hELLO world"), "Hello world");
        assert_eq!(title_case(""), "");
        assert_eq!(title_case("élan"), "Élan");
    }

    #[test]
    fn test_match_score_exact_prefix_is_zero() {
        let q: Vec<char> = "adm".chars().collect();
        assert_eq!(match_score(&q, "Admissions"), Some(0.0));
        assert_eq!(match_score(&q, ""), None);
    }
}
