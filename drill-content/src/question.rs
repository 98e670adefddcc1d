use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;

#[derive(
    Copy,
    Clone,
    Debug,
    Serialize,
    Deserialize,
    tsify::Tsify,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Vocabulary,
    Grammar,
    Kanji,
    Listening,
    Reading,
    Particle,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Vocabulary,
        Category::Grammar,
        Category::Kanji,
        Category::Listening,
        Category::Reading,
        Category::Particle,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Vocabulary => write!(f, "vocabulary"),
            Category::Grammar => write!(f, "grammar"),
            Category::Kanji => write!(f, "kanji"),
            Category::Listening => write!(f, "listening"),
            Category::Reading => write!(f, "reading"),
            Category::Particle => write!(f, "particle"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, tsify::Tsify, PartialEq, Eq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct SingleQuestion {
    pub id: String,
    pub category: Category,
    pub difficulty: u8,
    pub prompt: String,
    pub options: Vec<String>,
    pub answer_index: usize,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, tsify::Tsify, PartialEq, Eq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct MatchQuestion {
    pub id: String,
    pub category: Category,
    pub difficulty: u8,
    #[serde(alias = "prompt")]
    pub instruction: String,
    pub left: Vec<String>,
    pub right: Vec<String>,
    /// `(left index, right index)`, one per left item.
    pub pairs: Vec<(usize, usize)>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, tsify::Tsify, PartialEq, Eq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct FillQuestion {
    pub id: String,
    pub category: Category,
    pub difficulty: u8,
    pub prompt: String,
    pub blanks: usize,
    /// Acceptable answers, one set per blank.
    pub solutions: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FillQuestion {
    /// Matching is case sensitive unless the question opts out.
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive != Some(false)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, tsify::Tsify, PartialEq, Eq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuestionRecord {
    Single(SingleQuestion),
    Match(MatchQuestion),
    Fill(FillQuestion),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QuestionError {
    #[error("question has an empty id")]
    EmptyId,
    #[error("question {id}: difficulty {difficulty} is outside 1..=5")]
    DifficultyOutOfRange { id: String, difficulty: u8 },
    #[error("question {id}: needs at least two options, has {count}")]
    TooFewOptions { id: String, count: usize },
    #[error("question {id}: answer index {index} but only {count} options")]
    AnswerIndexOutOfRange {
        id: String,
        index: usize,
        count: usize,
    },
    #[error("question {id}: {pairs} pairs for {left} left items")]
    PairCountMismatch { id: String, pairs: usize, left: usize },
    #[error("question {id}: pair ({left}, {right}) points outside the lists")]
    PairOutOfRange { id: String, left: usize, right: usize },
    #[error("question {id}: pairs reuse a left or right item")]
    PairsNotOneToOne { id: String },
    #[error("question {id}: must have at least one blank")]
    NoBlanks { id: String },
    #[error("question {id}: {solutions} solution sets for {blanks} blanks")]
    SolutionCountMismatch {
        id: String,
        solutions: usize,
        blanks: usize,
    },
    #[error("question {id}: blank {blank} has no acceptable answers")]
    EmptySolutionSet { id: String, blank: usize },
}

impl QuestionRecord {
    pub fn id(&self) -> &str {
        match self {
            QuestionRecord::Single(q) => &q.id,
            QuestionRecord::Match(q) => &q.id,
            QuestionRecord::Fill(q) => &q.id,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            QuestionRecord::Single(q) => q.category,
            QuestionRecord::Match(q) => q.category,
            QuestionRecord::Fill(q) => q.category,
        }
    }

    pub fn difficulty(&self) -> u8 {
        match self {
            QuestionRecord::Single(q) => q.difficulty,
            QuestionRecord::Match(q) => q.difficulty,
            QuestionRecord::Fill(q) => q.difficulty,
        }
    }

    /// The text shown above the answer area.
    pub fn prompt(&self) -> &str {
        match self {
            QuestionRecord::Single(q) => &q.prompt,
            QuestionRecord::Match(q) => &q.instruction,
            QuestionRecord::Fill(q) => &q.prompt,
        }
    }

    pub fn explanation(&self) -> &str {
        match self {
            QuestionRecord::Single(q) => &q.explanation,
            QuestionRecord::Match(q) => &q.explanation,
            QuestionRecord::Fill(q) => &q.explanation,
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            QuestionRecord::Single(q) => &q.tags,
            QuestionRecord::Match(q) => &q.tags,
            QuestionRecord::Fill(q) => &q.tags,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            QuestionRecord::Single(_) => "single",
            QuestionRecord::Match(_) => "match",
            QuestionRecord::Fill(_) => "fill",
        }
    }

    pub fn validate(&self) -> Result<(), QuestionError> {
        let id = self.id();
        if id.is_empty() {
            return Err(QuestionError::EmptyId);
        }
        let difficulty = self.difficulty();
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
            return Err(QuestionError::DifficultyOutOfRange {
                id: id.to_string(),
                difficulty,
            });
        }

        match self {
            QuestionRecord::Single(q) => {
                if q.options.len() < 2 {
                    return Err(QuestionError::TooFewOptions {
                        id: q.id.clone(),
                        count: q.options.len(),
                    });
                }
                if q.answer_index >= q.options.len() {
                    return Err(QuestionError::AnswerIndexOutOfRange {
                        id: q.id.clone(),
                        index: q.answer_index,
                        count: q.options.len(),
                    });
                }
            }
            QuestionRecord::Match(q) => {
                if q.pairs.len() != q.left.len() {
                    return Err(QuestionError::PairCountMismatch {
                        id: q.id.clone(),
                        pairs: q.pairs.len(),
                        left: q.left.len(),
                    });
                }
                let mut lefts = BTreeSet::new();
                let mut rights = BTreeSet::new();
                for &(left, right) in &q.pairs {
                    if left >= q.left.len() || right >= q.right.len() {
                        return Err(QuestionError::PairOutOfRange {
                            id: q.id.clone(),
                            left,
                            right,
                        });
                    }
                    if !lefts.insert(left) || !rights.insert(right) {
                        return Err(QuestionError::PairsNotOneToOne { id: q.id.clone() });
                    }
                }
            }
            QuestionRecord::Fill(q) => {
                if q.blanks == 0 {
                    return Err(QuestionError::NoBlanks { id: q.id.clone() });
                }
                if q.solutions.len() != q.blanks {
                    return Err(QuestionError::SolutionCountMismatch {
                        id: q.id.clone(),
                        solutions: q.solutions.len(),
                        blanks: q.blanks,
                    });
                }
                if let Some(blank) = q.solutions.iter().position(|set| set.is_empty()) {
                    return Err(QuestionError::EmptySolutionSet {
                        id: q.id.clone(),
                        blank,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single() -> QuestionRecord {
        serde_json::from_str(
            r#"{
                "type": "single",
                "id": "n5-v-001",
                "category": "vocabulary",
                "difficulty": 1,
                "prompt": "「みず」の意味は？",
                "options": ["fire", "water", "tree"],
                "answerIndex": 1
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_missing_optional_fields_get_defaults() {
        let q = single();
        assert_eq!(q.explanation(), "");
        assert!(q.tags().is_empty());
        assert_eq!(q.kind(), "single");
        assert_eq!(q.validate(), Ok(()));
    }

    #[test]
    fn test_serializes_with_type_tag_and_camel_case() {
        let value = serde_json::to_value(single()).unwrap();
        assert_eq!(value["type"], "single");
        assert_eq!(value["answerIndex"], 1);
        assert_eq!(value["category"], "vocabulary");
    }

    #[test]
    fn test_match_accepts_prompt_alias() {
        let q: QuestionRecord = serde_json::from_str(
            r#"{
                "type": "match",
                "id": "m1",
                "category": "kanji",
                "difficulty": 2,
                "prompt": "漢字と読み方を合わせてください",
                "left": ["山", "川"],
                "right": ["かわ", "やま"],
                "pairs": [[0, 1], [1, 0]]
            }"#,
        )
        .unwrap();
        assert_eq!(q.prompt(), "漢字と読み方を合わせてください");
        assert_eq!(q.validate(), Ok(()));
    }

    #[test]
    fn test_single_invariants() {
        let QuestionRecord::Single(mut q) = single() else {
            panic!("expected a single question");
        };
        q.answer_index = 3;
        assert!(matches!(
            QuestionRecord::Single(q.clone()).validate(),
            Err(QuestionError::AnswerIndexOutOfRange { index: 3, count: 3, .. })
        ));

        q.answer_index = 0;
        q.options.truncate(1);
        assert!(matches!(
            QuestionRecord::Single(q.clone()).validate(),
            Err(QuestionError::TooFewOptions { count: 1, .. })
        ));

        q.options.push("b".to_string());
        q.difficulty = 6;
        assert!(matches!(
            QuestionRecord::Single(q).validate(),
            Err(QuestionError::DifficultyOutOfRange { difficulty: 6, .. })
        ));
    }

    #[test]
    fn test_match_pairs_must_be_one_to_one() {
        let mut q = MatchQuestion {
            id: "m".to_string(),
            category: Category::Vocabulary,
            difficulty: 1,
            instruction: "合わせて".to_string(),
            left: vec!["a".into(), "b".into()],
            right: vec!["x".into(), "y".into(), "z".into()],
            pairs: vec![(0, 2), (1, 0)],
            explanation: String::new(),
            tags: vec![],
        };
        assert_eq!(QuestionRecord::Match(q.clone()).validate(), Ok(()));

        q.pairs = vec![(0, 1), (1, 1)];
        assert!(matches!(
            QuestionRecord::Match(q.clone()).validate(),
            Err(QuestionError::PairsNotOneToOne { .. })
        ));

        q.pairs = vec![(0, 1)];
        assert!(matches!(
            QuestionRecord::Match(q.clone()).validate(),
            Err(QuestionError::PairCountMismatch { pairs: 1, left: 2, .. })
        ));

        q.pairs = vec![(0, 1), (1, 3)];
        assert!(matches!(
            QuestionRecord::Match(q).validate(),
            Err(QuestionError::PairOutOfRange { right: 3, .. })
        ));
    }

    #[test]
    fn test_fill_invariants() {
        let mut q = FillQuestion {
            id: "f".to_string(),
            category: Category::Particle,
            difficulty: 1,
            prompt: "わたし＿＿がくせいです".to_string(),
            blanks: 1,
            solutions: vec![vec!["は".to_string()]],
            case_sensitive: None,
            explanation: String::new(),
            tags: vec![],
        };
        assert_eq!(QuestionRecord::Fill(q.clone()).validate(), Ok(()));
        assert!(q.is_case_sensitive());

        q.blanks = 2;
        assert!(matches!(
            QuestionRecord::Fill(q.clone()).validate(),
            Err(QuestionError::SolutionCountMismatch { solutions: 1, blanks: 2, .. })
        ));

        q.solutions.push(vec![]);
        assert!(matches!(
            QuestionRecord::Fill(q.clone()).validate(),
            Err(QuestionError::EmptySolutionSet { blank: 1, .. })
        ));

        q.blanks = 0;
        q.solutions.clear();
        assert!(matches!(
            QuestionRecord::Fill(q).validate(),
            Err(QuestionError::NoBlanks { .. })
        ));
    }
}
