#![deny(clippy::string_slice)]

pub mod cache;
pub mod checker;
pub mod clock;
pub mod config;
pub mod immersive;
pub mod scheduler;
pub mod session;
pub mod summary;
pub mod telemetry;
mod utils;

pub use cache::{CacheEntry, CacheError, CacheInfo, OfflineQuestionCache};
pub use checker::{CheckResult, check};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::DrillConfig;
pub use immersive::{GameRound, ImmersiveSession, TickOutcome};
pub use session::{DrillSession, SessionError, SessionOutcome, SessionSnapshot, start_today_session};
pub use summary::{SessionSummary, summarize};
pub use telemetry::{TelemetryEvent, TelemetrySink};

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::LazyLock;

use drill_content::{AnswerRecord, QuestionBank as _, QuestionRecord, StaticQuestionBank, UserAnswer};
use satchel::AnyBackend;
use snake_core::{Direction, GameConfig, GameState};
use wasm_bindgen::prelude::*;

use crate::utils::to_js_error;

type SharedSink = Rc<dyn TelemetrySink>;

// putting this inside LOGGER keeps the logger from being initialized twice
#[allow(clippy::declare_interior_mutable_const)]
const LOGGER: LazyLock<()> = LazyLock::new(|| {
    utils::set_panic_hook();

    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Logging initialized");
});

#[wasm_bindgen]
pub struct Drill {
    // never hold a borrow across an .await, so the RefCells can't panic
    session: RefCell<Option<DrillSession<SharedSink>>>,
    cache: OfflineQuestionCache<AnyBackend, SystemClock>,
    bank: StaticQuestionBank,
    telemetry: SharedSink,
    config: DrillConfig,
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
impl Drill {
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen(constructor))]
    pub async fn new(
        config: Option<DrillConfig>,
        telemetry: Option<js_sys::Function>,
    ) -> Result<Self, JsValue> {
        #[allow(clippy::borrow_interior_mutable_const)]
        *LOGGER;

        let config = config.unwrap_or_default();
        config.game.validate().map_err(to_js_error)?;

        let backend = AnyBackend::open_or_memory(&config.storage_directory).await;
        log::info!("Question cache backed by {}", backend.kind());
        let cache = OfflineQuestionCache::new(backend, SystemClock);

        // An old entry that can't be migrated is just a cache miss later on.
        let _ = cache
            .migrate_if_needed()
            .await
            .inspect_err(|e| log::error!("Error migrating question cache: {e:?}"));
        cache.clear_expired().await;

        Ok(Self {
            session: RefCell::new(None),
            cache,
            bank: StaticQuestionBank::n5(),
            telemetry: utils::telemetry_sink(telemetry),
            config,
        })
    }

    /// Begin today's drill, replacing any session in progress.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn start_session(&self) -> SessionSnapshot {
        let session = start_today_session(
            &self.cache,
            &self.bank,
            self.telemetry.clone(),
            &SystemClock,
            self.config.daily_question_count,
        )
        .await;
        let snapshot = session.snapshot();
        *self.session.borrow_mut() = Some(session);
        snapshot
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn session(&self) -> Option<SessionSnapshot> {
        self.session.borrow().as_ref().map(DrillSession::snapshot)
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn record_answer(
        &self,
        question_id: String,
        answer: UserAnswer,
    ) -> Result<AnswerRecord, JsValue> {
        let mut session = self.session.borrow_mut();
        let session = session
            .as_mut()
            .ok_or_else(|| JsValue::from_str("no drill session has been started"))?;
        session
            .record_answer(&question_id, answer, SystemClock.now())
            .map_err(to_js_error)
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn complete_session(&self) -> Result<SessionOutcome, JsValue> {
        let mut session = self.session.borrow_mut();
        let session = session
            .as_mut()
            .ok_or_else(|| JsValue::from_str("no drill session has been started"))?;
        session.complete(SystemClock.now()).map_err(to_js_error)
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn summary(&self) -> Option<SessionSummary> {
        self.session.borrow().as_ref().map(DrillSession::summary)
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn cache_info(&self) -> Option<CacheInfo> {
        self.cache.info().await
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn clear_cache(&self) -> Result<(), JsValue> {
        self.cache.clear_all().await.map_err(to_js_error)
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn storage_kind(&self) -> String {
        self.cache.backend().kind().to_string()
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn bank_stats(&self) -> Result<JsValue, JsValue> {
        let serializer = serde_wasm_bindgen::Serializer::new().serialize_maps_as_objects(true);
        serde::Serialize::serialize(&self.bank.stats(), &serializer).map_err(to_js_error)
    }

    /// Play the current session's questions as snake rounds, or a fresh draw if no session is
    /// running.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn enter_immersive(&self) -> Result<Immersive, JsValue> {
        let questions = match self.session.borrow().as_ref() {
            Some(session) => session.questions().to_vec(),
            None => self.bank.daily_questions(self.config.daily_question_count),
        };
        Immersive::from_questions(questions, self.config.game.clone(), self.telemetry.clone())
    }
}

#[wasm_bindgen]
pub struct Immersive {
    session: RefCell<ImmersiveSession<SharedSink>>,
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
impl Immersive {
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen(constructor))]
    pub fn new(
        config: Option<GameConfig>,
        telemetry: Option<js_sys::Function>,
    ) -> Result<Self, JsValue> {
        #[allow(clippy::borrow_interior_mutable_const)]
        *LOGGER;

        let questions = StaticQuestionBank::n5().daily_questions(config::DEFAULT_DAILY_QUESTION_COUNT);
        Self::from_questions(
            questions,
            config.unwrap_or_default(),
            utils::telemetry_sink(telemetry),
        )
    }

    /// Call on the host's timer, every `tick_interval_ms`.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn tick(&self) -> TickOutcome {
        self.session.borrow_mut().tick(SystemClock.now())
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn change_direction(&self, direction: Direction) {
        self.session.borrow_mut().change_direction(direction);
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn set_speed(&self, tick_interval_ms: u32) {
        self.session.borrow_mut().set_speed(tick_interval_ms);
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn set_wrap(&self, wrap: bool) {
        self.session.borrow_mut().set_wrap(wrap);
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn restart(&self) -> Result<(), JsValue> {
        self.session.borrow_mut().restart().map_err(to_js_error)
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn state(&self) -> GameState {
        self.session.borrow().state().clone()
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn round(&self) -> GameRound {
        self.session.borrow().round().clone()
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn tick_interval_ms(&self) -> u32 {
        self.session.borrow().state().config.tick_interval_ms
    }
}

impl Immersive {
    fn from_questions(
        questions: Vec<QuestionRecord>,
        config: GameConfig,
        telemetry: SharedSink,
    ) -> Result<Self, JsValue> {
        let session = ImmersiveSession::new(questions, config, telemetry, SystemClock.now())
            .inspect_err(|e| log::error!("Error starting immersive mode: {e:?}"))
            .map_err(to_js_error)?;
        Ok(Self {
            session: RefCell::new(session),
        })
    }
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
pub fn check_answer(question: QuestionRecord, answer: UserAnswer) -> CheckResult {
    checker::check(&question, &answer)
}

/// Milliseconds until the next review. Counts must be non-negative whole numbers.
#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
pub fn next_review_delay_ms(correct: f64, incorrect: f64) -> Result<f64, JsValue> {
    let correct = scheduler::count_from_f64(correct, "correct").map_err(to_js_error)?;
    let incorrect = scheduler::count_from_f64(incorrect, "incorrect").map_err(to_js_error)?;
    let delay = scheduler::next_review_delay(correct, incorrect).map_err(to_js_error)?;
    Ok(delay.num_milliseconds() as f64)
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
pub fn summarize_answers(answers: Vec<AnswerRecord>) -> SessionSummary {
    summarize(&answers)
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
pub fn scheduling_params() -> scheduler::SchedulingParams {
    scheduler::scheduling_params()
}
