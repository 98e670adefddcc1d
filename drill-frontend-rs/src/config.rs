use serde::{Deserialize, Serialize};
use snake_core::GameConfig;

pub const DEFAULT_DAILY_QUESTION_COUNT: usize = 10;
pub const DEFAULT_STORAGE_DIRECTORY: &str = "jp-study-cache";

/// Settings passed in by the host page. Every field is optional on the wire.
#[derive(Clone, Debug, Serialize, Deserialize, tsify::Tsify, PartialEq, Eq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase", default)]
pub struct DrillConfig {
    pub daily_question_count: usize,
    /// OPFS directory that holds the question cache.
    pub storage_directory: String,
    pub game: GameConfig,
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            daily_question_count: DEFAULT_DAILY_QUESTION_COUNT,
            storage_directory: DEFAULT_STORAGE_DIRECTORY.to_string(),
            game: GameConfig::default(),
        }
    }
}
