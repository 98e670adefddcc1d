use chrono::{DateTime, Utc};
use drill_content::{AnswerRecord, QuestionBank, QuestionRecord, UserAnswer};
use satchel::StorageBackend;
use serde::{Deserialize, Serialize};

use crate::cache::OfflineQuestionCache;
use crate::checker;
use crate::clock::Clock;
use crate::scheduler::{self, ScheduleError};
use crate::summary::{self, SessionSummary};
use crate::telemetry::{TelemetryEvent, TelemetrySink};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SessionError {
    #[error("question {0} is not part of this session")]
    UnknownQuestion(String),
    #[error("session {0} is already completed")]
    AlreadyCompleted(String),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// What the host shows on the results screen.
#[derive(Clone, Debug, Serialize, Deserialize, tsify::Tsify, PartialEq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    pub summary: SessionSummary,
    pub next_review_delay_ms: i64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[tsify(type = "number")]
    pub next_review_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, tsify::Tsify, PartialEq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[tsify(type = "number")]
    pub created_at: DateTime<Utc>,
    pub questions: Vec<QuestionRecord>,
    pub answers: Vec<AnswerRecord>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    #[tsify(type = "number | null")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// One sitting of the daily drill. The question list is fixed when the session starts and the
/// answer log only grows.
pub struct DrillSession<S> {
    id: String,
    created_at: DateTime<Utc>,
    questions: Vec<QuestionRecord>,
    answers: Vec<AnswerRecord>,
    completed_at: Option<DateTime<Utc>>,
    last_activity_at: DateTime<Utc>,
    telemetry: S,
}

impl<S: TelemetrySink> DrillSession<S> {
    pub fn new(questions: Vec<QuestionRecord>, telemetry: S, now: DateTime<Utc>) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        telemetry.emit(TelemetryEvent::drill_started(&id, questions.len(), now));
        Self {
            id,
            created_at: now,
            questions,
            answers: Vec::new(),
            completed_at: None,
            last_activity_at: now,
            telemetry,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn question(&self, question_id: &str) -> Option<&QuestionRecord> {
        self.questions.iter().find(|q| q.id() == question_id)
    }

    /// Grade and log an answer. The same question may be answered more than once.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        answer: UserAnswer,
        now: DateTime<Utc>,
    ) -> Result<AnswerRecord, SessionError> {
        if self.completed_at.is_some() {
            return Err(SessionError::AlreadyCompleted(self.id.clone()));
        }
        let question = self
            .question(question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))?;

        let result = checker::check(question, &answer);
        let record = AnswerRecord {
            question_id: question_id.to_string(),
            user_answer: answer,
            is_correct: result.is_correct,
            feedback: result.feedback,
            answered_at: now,
        };

        let latency_ms = (now - self.last_activity_at).num_milliseconds().max(0);
        self.last_activity_at = now;
        self.telemetry.emit(TelemetryEvent::answer(
            &self.id,
            question_id,
            record.is_correct,
            latency_ms,
            now,
        ));

        self.answers.push(record.clone());
        Ok(record)
    }

    pub fn summary(&self) -> SessionSummary {
        summary::summarize(&self.answers)
    }

    /// Close the session and work out when to review again.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<SessionOutcome, SessionError> {
        if self.completed_at.is_some() {
            return Err(SessionError::AlreadyCompleted(self.id.clone()));
        }

        let summary = self.summary();
        let correct = summary.correct_count as i64;
        let incorrect = (summary.total_count - summary.correct_count) as i64;
        let delay = scheduler::next_review_delay(correct, incorrect)?;
        let next_review_at = scheduler::next_review_at(now, correct, incorrect)?;

        self.completed_at = Some(now);
        self.telemetry.emit(TelemetryEvent::SessionCompleted {
            session_id: self.id.clone(),
            total: summary.total_count,
            correct: summary.correct_count,
            accuracy: summary.accuracy,
            duration_ms: (now - self.created_at).num_milliseconds().max(0),
            client_ts: now.timestamp_millis(),
        });
        log::info!(
            "Session {} finished with {}/{} correct, next review at {next_review_at}",
            self.id,
            summary.correct_count,
            summary.total_count
        );

        Ok(SessionOutcome {
            summary,
            next_review_delay_ms: delay.num_milliseconds(),
            next_review_at,
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            created_at: self.created_at,
            questions: self.questions.clone(),
            answers: self.answers.clone(),
            completed_at: self.completed_at,
        }
    }
}

/// Start today's drill, serving from the offline cache when it has questions.
///
/// On a miss the bank is asked for `count` questions and they are written back to the cache. A
/// failed write is logged and the session goes ahead with the fresh questions.
pub async fn start_today_session<B, C, Q, S>(
    cache: &OfflineQuestionCache<B, C>,
    bank: &Q,
    telemetry: S,
    clock: &impl Clock,
    count: usize,
) -> DrillSession<S>
where
    B: StorageBackend,
    C: Clock,
    Q: QuestionBank + ?Sized,
    S: TelemetrySink,
{
    let mut questions = cache.load().await;
    if questions.is_empty() {
        questions = bank.daily_questions(count);
        log::info!("Question cache miss, drew {} questions from the bank", questions.len());
        if !questions.is_empty() {
            if let Err(e) = cache.save(&questions).await {
                log::warn!("Continuing without caching today's questions: {e}");
            }
        }
    } else {
        log::info!("Serving {} questions from the offline cache", questions.len());
    }

    DrillSession::new(questions, telemetry, clock.now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::telemetry::MemorySink;
    use chrono::{Duration, TimeZone};
    use drill_content::{Category, SingleQuestion, StaticQuestionBank};
    use futures::executor::block_on;
    use satchel::MemoryBackend;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 7, 30, 0).unwrap()
    }

    fn abc_question(id: &str) -> QuestionRecord {
        QuestionRecord::Single(SingleQuestion {
            id: id.to_string(),
            category: Category::Vocabulary,
            difficulty: 1,
            prompt: "?".to_string(),
            options: vec!["a".into(), "b".into(), "c".into()],
            answer_index: 1,
            explanation: String::new(),
            tags: vec![],
        })
    }

    #[test]
    fn test_record_answer_grades_and_reports_latency() {
        let sink = MemorySink::default();
        let mut session =
            DrillSession::new(vec![abc_question("q1"), abc_question("q2")], sink.clone(), start());

        let record = session
            .record_answer("q1", "b".into(), start() + Duration::seconds(4))
            .unwrap();
        assert!(record.is_correct);
        let record = session
            .record_answer("q2", "a".into(), start() + Duration::seconds(10))
            .unwrap();
        assert!(!record.is_correct);

        assert_eq!(
            sink.kinds(),
            vec!["drill_started", "answer_correct", "answer_incorrect"]
        );
        let events = sink.events();
        let TelemetryEvent::AnswerIncorrect { latency_ms, .. } = &events[2] else {
            panic!("expected answer_incorrect, got {:?}", events[2]);
        };
        assert_eq!(*latency_ms, 6_000, "latency counts from the previous answer");
    }

    #[test]
    fn test_unknown_question_is_rejected() {
        let mut session = DrillSession::new(vec![abc_question("q1")], MemorySink::default(), start());
        assert_eq!(
            session.record_answer("nope", "b".into(), start()),
            Err(SessionError::UnknownQuestion("nope".to_string()))
        );
        assert!(session.answers().is_empty());
    }

    #[test]
    fn test_complete_summarizes_and_schedules() {
        let sink = MemorySink::default();
        let mut session =
            DrillSession::new(vec![abc_question("q1"), abc_question("q2")], sink.clone(), start());
        session.record_answer("q1", "b".into(), start()).unwrap();
        session.record_answer("q2", "b".into(), start()).unwrap();

        let finished = start() + Duration::minutes(5);
        let outcome = session.complete(finished).unwrap();
        assert_eq!(outcome.summary.accuracy, 1.0);
        assert_eq!(outcome.next_review_delay_ms, Duration::days(6).num_milliseconds());
        assert_eq!(outcome.next_review_at, finished + Duration::days(6));
        assert!(session.is_completed());

        let events = sink.events();
        let Some(TelemetryEvent::SessionCompleted { duration_ms, total, .. }) = events.last() else {
            panic!("expected session_completed last");
        };
        assert_eq!((*duration_ms, *total), (300_000, 2));

        assert!(matches!(
            session.complete(finished),
            Err(SessionError::AlreadyCompleted(_))
        ));
        assert!(matches!(
            session.record_answer("q1", "b".into(), finished),
            Err(SessionError::AlreadyCompleted(_))
        ));
    }

    #[test]
    fn test_start_fills_cache_on_miss_then_reads_it() {
        let backend = MemoryBackend::default();
        let clock = ManualClock::new(start());
        let cache = OfflineQuestionCache::new(backend.clone(), &clock);
        let bank = StaticQuestionBank::n5();
        let sink = MemorySink::default();

        let first = block_on(start_today_session(&cache, &bank, sink.clone(), &clock, 10));
        assert_eq!(first.questions().len(), 10);
        assert!(backend.raw(crate::cache::STORAGE_KEY).is_some());

        clock.advance(Duration::hours(2));
        let second = block_on(start_today_session(&cache, &bank, sink.clone(), &clock, 10));
        assert_eq!(
            second.questions(),
            first.questions(),
            "the second session of the day reuses the cached snapshot"
        );
        assert_ne!(first.id(), second.id());
        assert_eq!(sink.kinds(), vec!["drill_started", "drill_started"]);
    }

    #[test]
    fn test_start_survives_unwritable_cache() {
        let backend = MemoryBackend::default();
        backend.set_fail_writes(true);
        let clock = ManualClock::new(start());
        let cache = OfflineQuestionCache::new(backend.clone(), &clock);

        let session = block_on(start_today_session(
            &cache,
            &StaticQuestionBank::n5(),
            MemorySink::default(),
            &clock,
            4,
        ));
        assert_eq!(session.questions().len(), 4);
        assert!(backend.is_empty());
    }

    #[test]
    fn test_snapshot_wire_shape() {
        let mut session = DrillSession::new(vec![abc_question("q1")], MemorySink::default(), start());
        session.record_answer("q1", "c".into(), start()).unwrap();

        let value = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(value["createdAt"], start().timestamp_millis());
        assert_eq!(value["completedAt"], serde_json::Value::Null);
        assert_eq!(value["answers"][0]["isCorrect"], false);
    }
}
