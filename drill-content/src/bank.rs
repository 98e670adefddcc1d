use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::question::{Category, QuestionRecord};

const N5_BATCHES: &[(&str, &str)] = &[
    ("n5-day-1", include_str!("../data/n5-batch-day-1.json")),
    ("n5-day-2", include_str!("../data/n5-batch-day-2.json")),
];

/// Where questions come from when the cache has none.
///
/// Selections are shuffled here, so two calls may return different questions.
pub trait QuestionBank {
    /// At most `count` questions. Fewer if the bank is smaller.
    fn daily_questions(&self, count: usize) -> Vec<QuestionRecord>;

    fn by_category(&self, category: Category, count: usize) -> Vec<QuestionRecord>;

    fn by_difficulty(&self, difficulty: u8, count: usize) -> Vec<QuestionRecord>;

    fn stats(&self) -> BankStats;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BankStats {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_category: BTreeMap<Category, usize>,
    pub by_difficulty: BTreeMap<u8, usize>,
}

#[derive(Deserialize)]
struct Batch {
    questions: Vec<serde_json::Value>,
}

/// A bank compiled into the binary.
#[derive(Clone, Debug, Default)]
pub struct StaticQuestionBank {
    questions: Vec<QuestionRecord>,
}

impl StaticQuestionBank {
    /// The built-in JLPT N5 questions.
    pub fn n5() -> Self {
        let mut questions = Vec::new();
        for (name, json) in N5_BATCHES {
            match Self::parse_batch(json) {
                Ok(batch) => questions.extend(batch),
                Err(e) => log::error!("Failed to parse question batch {name}: {e:?}"),
            }
        }
        Self::from_questions(questions)
    }

    /// Parse a batch file (`{"questions": [...]}`). Records that don't parse are skipped.
    pub fn parse_batch(json: &str) -> Result<Vec<QuestionRecord>, serde_json::Error> {
        let batch: Batch = serde_json::from_str(json)?;
        Ok(batch
            .questions
            .into_iter()
            .filter_map(|value| {
                serde_json::from_value::<QuestionRecord>(value)
                    .inspect_err(|e| log::warn!("Skipping unreadable question: {e}"))
                    .ok()
            })
            .collect())
    }

    /// Build a bank, dropping records that break their invariants.
    pub fn from_questions(questions: Vec<QuestionRecord>) -> Self {
        let questions = questions
            .into_iter()
            .filter(|question| match question.validate() {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Dropping invalid question: {e}");
                    false
                }
            })
            .collect();
        Self { questions }
    }

    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn daily_questions_with_rng<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> Vec<QuestionRecord> {
        pick(self.questions.iter(), count, rng)
    }
}

fn pick<'a, R: Rng + ?Sized>(
    candidates: impl Iterator<Item = &'a QuestionRecord>,
    count: usize,
    rng: &mut R,
) -> Vec<QuestionRecord> {
    if count == 0 {
        return Vec::new();
    }
    let mut chosen: Vec<QuestionRecord> = candidates.cloned().collect();
    chosen.shuffle(rng);
    chosen.truncate(count);
    chosen
}

impl QuestionBank for StaticQuestionBank {
    fn daily_questions(&self, count: usize) -> Vec<QuestionRecord> {
        if self.questions.is_empty() {
            log::warn!("No questions available in question bank");
        }
        self.daily_questions_with_rng(count, &mut rand::thread_rng())
    }

    fn by_category(&self, category: Category, count: usize) -> Vec<QuestionRecord> {
        let selection = pick(
            self.questions.iter().filter(|q| q.category() == category),
            count,
            &mut rand::thread_rng(),
        );
        if selection.is_empty() && count > 0 {
            log::warn!("No questions found for category: {category}");
        }
        selection
    }

    fn by_difficulty(&self, difficulty: u8, count: usize) -> Vec<QuestionRecord> {
        let selection = pick(
            self.questions.iter().filter(|q| q.difficulty() == difficulty),
            count,
            &mut rand::thread_rng(),
        );
        if selection.is_empty() && count > 0 {
            log::warn!("No questions found for difficulty: {difficulty}");
        }
        selection
    }

    fn stats(&self) -> BankStats {
        let mut stats = BankStats {
            total: self.questions.len(),
            ..BankStats::default()
        };
        for question in &self.questions {
            *stats.by_type.entry(question.kind().to_string()).or_default() += 1;
            *stats.by_category.entry(question.category()).or_default() += 1;
            *stats.by_difficulty.entry(question.difficulty()).or_default() += 1;
        }
        stats
    }
}
