use drill_content::AnswerRecord;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize, tsify::Tsify, PartialEq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Between 0 and 1. Not rounded; presentation does that.
    pub accuracy: f64,
    pub correct_count: usize,
    pub total_count: usize,
    /// In answer order. A question answered wrong twice appears twice.
    pub wrong_question_ids: Vec<String>,
}

pub fn summarize(log: &[AnswerRecord]) -> SessionSummary {
    let total_count = log.len();
    if total_count == 0 {
        return SessionSummary::default();
    }

    let correct_count = log.iter().filter(|record| record.is_correct).count();
    let wrong_question_ids = log
        .iter()
        .filter(|record| !record.is_correct)
        .map(|record| record.question_id.clone())
        .collect();

    SessionSummary {
        accuracy: correct_count as f64 / total_count as f64,
        correct_count,
        total_count,
        wrong_question_ids,
    }
}
