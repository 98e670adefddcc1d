//! Snake as a drill: each round puts the answer options on the grid as food and the learner
//! steers into the right one.

use chrono::{DateTime, Utc};
use drill_content::QuestionRecord;
use serde::{Deserialize, Serialize};
use snake_core::{Direction, Food, FoodSeed, GameConfig, GameError, GameState};

use crate::telemetry::{TelemetryEvent, TelemetrySink};

/// More labels than this don't fit on the grid legibly.
pub const MAX_FOOD_LABELS: usize = 4;
pub const FALLBACK_LABELS: [&str; MAX_FOOD_LABELS] = ["①", "②", "③", "④"];
/// Eating the wrong food costs this much, applied after the bite has already scored and grown.
pub const WRONG_BITE_POINTS: u32 = 2;
pub const WRONG_BITE_SEGMENTS: usize = 2;

#[derive(Clone, Debug, Serialize, Deserialize, tsify::Tsify, PartialEq, Eq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct GameRound {
    pub question_id: Option<String>,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_label: String,
}

impl GameRound {
    pub fn from_question(question: &QuestionRecord) -> Self {
        let (options, correct_label) = match question {
            QuestionRecord::Single(q) => {
                let mut options: Vec<String> =
                    q.options.iter().take(MAX_FOOD_LABELS).cloned().collect();
                let correct = q.options.get(q.answer_index).cloned().unwrap_or_default();
                // The answer must be edible even when it sits past the cut.
                if q.answer_index >= MAX_FOOD_LABELS && !correct.is_empty() {
                    if let Some(last) = options.last_mut() {
                        *last = correct.clone();
                    }
                }
                (options, correct)
            }
            QuestionRecord::Match(q) => {
                let options: Vec<String> = q.left.iter().take(MAX_FOOD_LABELS).cloned().collect();
                let correct = options.first().cloned().unwrap_or_default();
                (options, correct)
            }
            QuestionRecord::Fill(q) => {
                let options: Vec<String> = q
                    .solutions
                    .first()
                    .map(|set| set.iter().take(MAX_FOOD_LABELS).cloned().collect())
                    .unwrap_or_default();
                let correct = options.first().cloned().unwrap_or_default();
                (options, correct)
            }
        };

        if options.is_empty() || correct_label.is_empty() {
            return Self {
                question_id: Some(question.id().to_string()),
                prompt: question.prompt().to_string(),
                ..Self::fallback()
            };
        }

        Self {
            question_id: Some(question.id().to_string()),
            prompt: question.prompt().to_string(),
            options,
            correct_label,
        }
    }

    pub fn fallback() -> Self {
        Self {
            question_id: None,
            prompt: String::new(),
            options: FALLBACK_LABELS.iter().map(|label| label.to_string()).collect(),
            correct_label: FALLBACK_LABELS[0].to_string(),
        }
    }

    pub fn food_seeds(&self) -> Vec<FoodSeed> {
        self.options
            .iter()
            .enumerate()
            .map(|(i, label)| FoodSeed {
                id: format!("opt-{i}"),
                label: label.clone(),
            })
            .collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, tsify::Tsify, PartialEq, Eq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct Bite {
    /// As it was on the grid when eaten.
    pub food: Food,
    pub is_correct: bool,
    pub question_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, tsify::Tsify, PartialEq, Eq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct TickOutcome {
    pub bite: Option<Bite>,
    pub score: u32,
    pub game_over: bool,
}

pub struct ImmersiveSession<S> {
    questions: Vec<QuestionRecord>,
    round_index: usize,
    round: GameRound,
    state: GameState,
    telemetry: S,
}

impl<S: TelemetrySink> ImmersiveSession<S> {
    pub fn new(
        questions: Vec<QuestionRecord>,
        config: GameConfig,
        telemetry: S,
        now: DateTime<Utc>,
    ) -> Result<Self, GameError> {
        let round = round_at(&questions, 0);
        let state = GameState::new(config, &round.food_seeds())?;
        telemetry.emit(TelemetryEvent::ImmersiveEntered {
            mode: "snake".to_string(),
            client_ts: now.timestamp_millis(),
        });
        Ok(Self {
            questions,
            round_index: 0,
            round,
            state,
            telemetry,
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn round(&self) -> &GameRound {
        &self.round
    }

    pub fn round_index(&self) -> usize {
        self.round_index
    }

    /// One engine step. A bite is judged, reported and then moves the game to the next round
    /// whether or not it was the right food.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let (mut next, eaten) = self.state.clone().step();

        let Some(food) = eaten else {
            self.state = next;
            return TickOutcome {
                bite: None,
                score: self.state.score,
                game_over: self.state.game_over,
            };
        };

        self.telemetry.emit(TelemetryEvent::SnakeFoodConsumed {
            label: food.label.clone(),
            score: next.score,
            tick: next.tick,
            client_ts: now.timestamp_millis(),
        });

        let is_correct = food.label == self.round.correct_label;
        if !is_correct {
            next = next.penalize(WRONG_BITE_POINTS, WRONG_BITE_SEGMENTS);
        }
        log::debug!(
            "Ate {:?} on tick {}, expected {:?}",
            food.label,
            next.tick,
            self.round.correct_label
        );
        let bite = Bite {
            food,
            is_correct,
            question_id: self.round.question_id.clone(),
        };

        self.round_index = (self.round_index + 1) % self.questions.len().max(1);
        self.round = round_at(&self.questions, self.round_index);
        self.state = next.relabel_foods(&self.round.food_seeds());

        TickOutcome {
            bite: Some(bite),
            score: self.state.score,
            game_over: self.state.game_over,
        }
    }

    pub fn change_direction(&mut self, direction: Direction) {
        self.state = self.state.clone().change_direction(direction);
    }

    pub fn set_speed(&mut self, tick_interval_ms: u32) {
        self.state = self.state.clone().update_speed(tick_interval_ms);
    }

    pub fn set_wrap(&mut self, wrap: bool) {
        self.state = self.state.clone().update_wrap(wrap);
    }

    /// New snake on the current round, keeping speed and wrap.
    pub fn restart(&mut self) -> Result<(), GameError> {
        self.state = GameState::new(self.state.config.clone(), &self.round.food_seeds())?;
        Ok(())
    }
}

fn round_at(questions: &[QuestionRecord], index: usize) -> GameRound {
    questions
        .get(index)
        .map(GameRound::from_question)
        .unwrap_or_else(GameRound::fallback)
}
