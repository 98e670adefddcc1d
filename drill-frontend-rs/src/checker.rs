use drill_content::text::normalize_answer;
use drill_content::{FillQuestion, MatchQuestion, QuestionRecord, SingleQuestion, UserAnswer};
use serde::{Deserialize, Serialize};

pub const FEEDBACK_CORRECT: &str = "正確！";
pub const FEEDBACK_MATCH_FORMAT: &str = "配對格式錯誤";
pub const FEEDBACK_MATCH_COUNT: &str = "配對數量不符";
pub const FEEDBACK_MATCH_WRONG: &str = "配對錯誤，請重新檢查";
pub const FEEDBACK_NEEDS_TEXT: &str = "請輸入文字答案";

#[derive(Clone, Debug, Serialize, Deserialize, tsify::Tsify, PartialEq, Eq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub is_correct: bool,
    pub feedback: String,
}

impl CheckResult {
    fn correct() -> Self {
        Self {
            is_correct: true,
            feedback: FEEDBACK_CORRECT.to_string(),
        }
    }

    fn wrong(feedback: impl Into<String>) -> Self {
        Self {
            is_correct: false,
            feedback: feedback.into(),
        }
    }
}

/// Grade `answer` against `question`. Never fails: malformed input is just a wrong answer.
pub fn check(question: &QuestionRecord, answer: &UserAnswer) -> CheckResult {
    match question {
        QuestionRecord::Single(q) => check_single(q, answer),
        QuestionRecord::Match(q) => check_match(q, answer),
        QuestionRecord::Fill(q) => check_fill(q, answer),
    }
}

fn check_single(q: &SingleQuestion, answer: &UserAnswer) -> CheckResult {
    let correct_option = q.options.get(q.answer_index).map(String::as_str).unwrap_or_default();
    let UserAnswer::Text(text) = answer else {
        return CheckResult::wrong(FEEDBACK_NEEDS_TEXT);
    };
    if text == correct_option {
        CheckResult::correct()
    } else {
        CheckResult::wrong(format!("錯誤。正確答案是：{correct_option}"))
    }
}

fn check_match(q: &MatchQuestion, answer: &UserAnswer) -> CheckResult {
    // Some hosts send the pairs JSON-encoded.
    let mut candidate = match answer {
        UserAnswer::Pairs(pairs) => pairs.clone(),
        UserAnswer::Text(text) => match serde_json::from_str::<Vec<(usize, usize)>>(text) {
            Ok(pairs) => pairs,
            Err(_) => return CheckResult::wrong(FEEDBACK_MATCH_FORMAT),
        },
    };

    if candidate.len() != q.pairs.len() {
        return CheckResult::wrong(FEEDBACK_MATCH_COUNT);
    }

    let mut expected = q.pairs.clone();
    candidate.sort_unstable();
    expected.sort_unstable();

    if candidate == expected {
        CheckResult::correct()
    } else {
        CheckResult::wrong(FEEDBACK_MATCH_WRONG)
    }
}

fn check_fill(q: &FillQuestion, answer: &UserAnswer) -> CheckResult {
    let accepted: Vec<&str> = q.solutions.iter().flatten().map(String::as_str).collect();
    let UserAnswer::Text(text) = answer else {
        return CheckResult::wrong(FEEDBACK_NEEDS_TEXT);
    };

    let case_sensitive = q.is_case_sensitive();
    let candidate = normalize_answer(text, case_sensitive);
    if accepted
        .iter()
        .any(|solution| normalize_answer(solution, case_sensitive) == candidate)
    {
        CheckResult::correct()
    } else {
        CheckResult::wrong(format!("錯誤。可接受答案：{}", accepted.join("、")))
    }
}
