pub mod sentiment;

pub use sentiment::*;

use crate::models::Score;

/// Marker vocabulary for the keyword sentiment scorer
///
/// Families are checked in fixed priority: agreement, then disagreement,
/// then neutral. Markers are matched as lower-case substrings.
#[derive(Debug, Clone)]
pub struct SentimentConfig {
    /// Agreement markers, scored as satisfied
    pub agreement: Vec<String>,
    /// Disagreement markers, scored as dissatisfied
    pub disagreement: Vec<String>,
    /// Indifference markers, scored as neutral
    pub neutral: Vec<String>,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            agreement: vec!["concordo".to_string()],
            disagreement: vec!["discordo".to_string()],
            neutral: vec!["indiferente".to_string()],
        }
    }
}

impl SentimentConfig {
    /// Add markers to each family, keeping the built-in ones first
    pub fn extended(
        mut self,
        agreement: &[String],
        disagreement: &[String],
        neutral: &[String],
    ) -> Self {
        let lowered = |words: &[String]| -> Vec<String> {
            words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        };
        self.agreement.extend(lowered(agreement));
        self.disagreement.extend(lowered(disagreement));
        self.neutral.extend(lowered(neutral));
        self
    }

    /// Marker families in matching priority
    pub fn families(&self) -> [(Score, &[String]); 3] {
        [
            (Score::Satisfied, self.agreement.as_slice()),
            (Score::Dissatisfied, self.disagreement.as_slice()),
            (Score::Neutral, self.neutral.as_slice()),
        ]
    }
}
