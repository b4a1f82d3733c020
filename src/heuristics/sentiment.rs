use serde::Serialize;

use crate::models::{CanonicalRecord, Score};

use super::SentimentConfig;

/// Score tallies from one scoring pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoringSummary {
    pub satisfied: usize,
    pub neutral: usize,
    pub dissatisfied: usize,
    /// Responses matching no marker family
    pub unscored: usize,
}

impl ScoringSummary {
    pub fn scored(&self) -> usize {
        self.satisfied + self.neutral + self.dissatisfied
    }

    fn record(&mut self, score: Option<Score>) {
        match score {
            Some(Score::Satisfied) => self.satisfied += 1,
            Some(Score::Neutral) => self.neutral += 1,
            Some(Score::Dissatisfied) => self.dissatisfied += 1,
            None => self.unscored += 1,
        }
    }
}

/// Score a free-text response by marker containment
///
/// The text is lower-cased and trimmed, then checked against each marker
/// family in priority order; the first family with a contained marker
/// decides. A marker embedded in a longer sentence counts the same as a
/// one-word answer, and texts holding markers of several families are not
/// reported as ambiguous.
pub fn score_response(response: Option<&str>, config: &SentimentConfig) -> Option<Score> {
    let text = response?.trim().to_lowercase();

    config.families().into_iter().find_map(|(score, markers)| {
        markers
            .iter()
            .any(|marker| text.contains(marker.to_lowercase().as_str()))
            .then_some(score)
    })
}

/// Fill PONTUACAO for every record from its RESPOSTA
pub fn score_records(records: &mut [CanonicalRecord], config: &SentimentConfig) -> ScoringSummary {
    let mut summary = ScoringSummary::default();

    for record in records.iter_mut() {
        record.pontuacao = score_response(record.resposta.as_deref(), config);
        summary.record(record.pontuacao);
    }

    summary
}
