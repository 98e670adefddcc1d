use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    #[serde(rename_all = "camelCase")]
    DrillStarted {
        session_id: String,
        /// `YYYY-MM-DD`, UTC.
        date: String,
        question_count: usize,
        client_ts: i64,
    },
    #[serde(rename_all = "camelCase")]
    AnswerCorrect {
        session_id: String,
        question_id: String,
        is_correct: bool,
        latency_ms: i64,
        client_ts: i64,
    },
    #[serde(rename_all = "camelCase")]
    AnswerIncorrect {
        session_id: String,
        question_id: String,
        is_correct: bool,
        latency_ms: i64,
        client_ts: i64,
    },
    #[serde(rename_all = "camelCase")]
    SessionCompleted {
        session_id: String,
        total: usize,
        correct: usize,
        accuracy: f64,
        duration_ms: i64,
        client_ts: i64,
    },
    #[serde(rename_all = "camelCase")]
    ImmersiveEntered { mode: String, client_ts: i64 },
    #[serde(rename_all = "camelCase")]
    SnakeFoodConsumed {
        label: String,
        score: u32,
        tick: u64,
        client_ts: i64,
    },
}

impl TelemetryEvent {
    pub fn drill_started(session_id: &str, question_count: usize, now: DateTime<Utc>) -> Self {
        TelemetryEvent::DrillStarted {
            session_id: session_id.to_string(),
            date: now.format("%Y-%m-%d").to_string(),
            question_count,
            client_ts: now.timestamp_millis(),
        }
    }

    pub fn answer(
        session_id: &str,
        question_id: &str,
        is_correct: bool,
        latency_ms: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let session_id = session_id.to_string();
        let question_id = question_id.to_string();
        let client_ts = now.timestamp_millis();
        if is_correct {
            TelemetryEvent::AnswerCorrect {
                session_id,
                question_id,
                is_correct,
                latency_ms,
                client_ts,
            }
        } else {
            TelemetryEvent::AnswerIncorrect {
                session_id,
                question_id,
                is_correct,
                latency_ms,
                client_ts,
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryEvent::DrillStarted { .. } => "drill_started",
            TelemetryEvent::AnswerCorrect { .. } => "answer_correct",
            TelemetryEvent::AnswerIncorrect { .. } => "answer_incorrect",
            TelemetryEvent::SessionCompleted { .. } => "session_completed",
            TelemetryEvent::ImmersiveEntered { .. } => "immersive_entered",
            TelemetryEvent::SnakeFoodConsumed { .. } => "snake_food_consumed",
        }
    }
}

/// Receives telemetry. Delivery is the sink's problem: `emit` never reports failure.
pub trait TelemetrySink {
    fn emit(&self, event: TelemetryEvent);
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for &T {
    fn emit(&self, event: TelemetryEvent) {
        (**self).emit(event)
    }
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for Rc<T> {
    fn emit(&self, event: TelemetryEvent) {
        (**self).emit(event)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn emit(&self, _event: TelemetryEvent) {}
}

/// Writes every event to the log at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn emit(&self, event: TelemetryEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => log::debug!("telemetry {json}"),
            Err(e) => log::warn!("Could not serialize {} event: {e}", event.kind()),
        }
    }
}

/// Keeps events in memory. Mostly for tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Rc<RefCell<Vec<TelemetryEvent>>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.borrow().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.borrow().iter().map(TelemetryEvent::kind).collect()
    }
}

impl TelemetrySink for MemorySink {
    fn emit(&self, event: TelemetryEvent) {
        self.events.borrow_mut().push(event);
    }
}

/// Hands each event to a JavaScript callback as a plain object.
#[derive(Debug, Clone)]
pub struct JsSink {
    callback: js_sys::Function,
}

impl JsSink {
    pub fn new(callback: js_sys::Function) -> Self {
        Self { callback }
    }
}

impl TelemetrySink for JsSink {
    fn emit(&self, event: TelemetryEvent) {
        #[cfg(target_arch = "wasm32")]
        {
            let serializer =
                serde_wasm_bindgen::Serializer::new().serialize_maps_as_objects(true);
            match event.serialize(&serializer) {
                Ok(value) => {
                    let _ = self
                        .callback
                        .call1(&wasm_bindgen::JsValue::NULL, &value)
                        .inspect_err(|e| log::warn!("Telemetry callback threw: {e:?}"));
                }
                Err(e) => log::warn!("Could not convert {} event: {e:?}", event.kind()),
            }
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = (&self.callback, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_wire_shape() {
        let now = Utc.with_ymd_and_hms(2025, 5, 4, 10, 0, 0).unwrap();
        let value = serde_json::to_value(TelemetryEvent::drill_started("s-1", 10, now)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "drill_started",
                "sessionId": "s-1",
                "date": "2025-05-04",
                "questionCount": 10,
                "clientTs": now.timestamp_millis(),
            })
        );

        let value =
            serde_json::to_value(TelemetryEvent::answer("s-1", "q-9", false, 1500, now)).unwrap();
        assert_eq!(value["type"], "answer_incorrect");
        assert_eq!(value["latencyMs"], 1500);
        assert_eq!(value["isCorrect"], false);
    }

    #[test]
    fn test_snake_event_shape() {
        let event = TelemetryEvent::SnakeFoodConsumed {
            label: "たべる".to_string(),
            score: 1,
            tick: 3,
            client_ts: 0,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "snake_food_consumed");
        assert_eq!(value["label"], "たべる");
        assert_eq!(value["score"], 1);
        assert_eq!(event.kind(), "snake_food_consumed");
    }

    #[test]
    fn test_memory_sink_through_rc() {
        let sink = Rc::new(MemorySink::default());
        let shared: Rc<dyn TelemetrySink> = sink.clone();
        shared.emit(TelemetryEvent::ImmersiveEntered {
            mode: "snake".to_string(),
            client_ts: 1,
        });
        assert_eq!(sink.kinds(), vec!["immersive_entered"]);
    }
}
