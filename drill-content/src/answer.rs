use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the learner submitted.
///
/// On the wire this is either a plain string or an array of `[left, right]` index pairs.
#[derive(Clone, Debug, Serialize, Deserialize, tsify::Tsify, PartialEq, Eq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(untagged)]
pub enum UserAnswer {
    Text(String),
    Pairs(Vec<(usize, usize)>),
}

impl From<&str> for UserAnswer {
    fn from(text: &str) -> Self {
        UserAnswer::Text(text.to_string())
    }
}

impl From<Vec<(usize, usize)>> for UserAnswer {
    fn from(pairs: Vec<(usize, usize)>) -> Self {
        UserAnswer::Pairs(pairs)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, tsify::Tsify, PartialEq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_id: String,
    pub user_answer: UserAnswer,
    pub is_correct: bool,
    pub feedback: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[tsify(type = "number")]
    pub answered_at: DateTime<Utc>,
}
