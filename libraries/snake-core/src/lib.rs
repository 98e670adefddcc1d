//! Deterministic grid simulation behind the immersive drill mode.
//!
//! The engine never schedules itself. The host calls [`GameState::step`] on its own timer, and
//! every transition is a pure function of the previous state, so a run can be replayed exactly.

pub mod placement;

pub use placement::place_food;

use serde::{Deserialize, Serialize};

/// Fastest tick interval the engine accepts.
pub const MIN_TICK_INTERVAL_MS: u32 = 40;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GameError {
    #[error("invalid game config: {0}")]
    InvalidConfig(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    fn advance(self, pos: GridPos) -> GridPos {
        match self {
            Direction::Up => GridPos { x: pos.x, y: pos.y - 1 },
            Direction::Down => GridPos { x: pos.x, y: pos.y + 1 },
            Direction::Left => GridPos { x: pos.x - 1, y: pos.y },
            Direction::Right => GridPos { x: pos.x + 1, y: pos.y },
        }
    }
}

/// A food before it has a place on the grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct FoodSeed {
    pub id: String,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Food {
    pub id: String,
    pub label: String,
    pub pos: GridPos,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    pub cols: i32,
    pub rows: i32,
    pub tick_interval_ms: u32,
    /// Leaving the grid comes back in on the other side instead of ending the game.
    pub wrap: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            cols: 20,
            rows: 14,
            tick_interval_ms: 200,
            wrap: false,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), GameError> {
        if self.cols < 2 || self.rows < 1 {
            return Err(GameError::InvalidConfig(format!(
                "grid must be at least 2x1, got {}x{}",
                self.cols, self.rows
            )));
        }
        if self.cols.checked_mul(self.rows).is_none() {
            return Err(GameError::InvalidConfig(format!(
                "grid {}x{} is too large",
                self.cols, self.rows
            )));
        }
        if self.tick_interval_ms < MIN_TICK_INTERVAL_MS {
            return Err(GameError::InvalidConfig(format!(
                "tick interval {}ms is below the {MIN_TICK_INTERVAL_MS}ms floor",
                self.tick_interval_ms
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub config: GameConfig,
    /// Head first. Never empty.
    pub snake: Vec<GridPos>,
    pub direction: Direction,
    pub foods: Vec<Food>,
    pub score: u32,
    pub game_over: bool,
    pub tick: u64,
}

impl GameState {
    pub fn new(config: GameConfig, seeds: &[FoodSeed]) -> Result<Self, GameError> {
        config.validate()?;

        let head = GridPos {
            x: config.cols / 2,
            y: config.rows / 2,
        };
        let snake = vec![head, GridPos { x: head.x - 1, y: head.y }];

        let mut foods: Vec<Food> = Vec::with_capacity(seeds.len());
        for (salt, seed) in seeds.iter().enumerate() {
            match place_food(&config, &snake, &foods, salt as u64) {
                Some(pos) => foods.push(Food {
                    id: seed.id.clone(),
                    label: seed.label.clone(),
                    pos,
                }),
                None => log::warn!("No room on the grid for food {}", seed.id),
            }
        }

        Ok(Self {
            config,
            snake,
            direction: Direction::Right,
            foods,
            score: 0,
            game_over: false,
            tick: 0,
        })
    }

    pub fn head(&self) -> GridPos {
        // `snake` is never empty
        self.snake[0]
    }

    /// Advance one tick. Returns the food that was eaten, as it was before it respawned.
    pub fn step(mut self) -> (Self, Option<Food>) {
        if self.game_over {
            return (self, None);
        }

        let mut next = self.direction.advance(self.head());
        let inside =
            next.x >= 0 && next.x < self.config.cols && next.y >= 0 && next.y < self.config.rows;
        if !inside {
            if self.config.wrap {
                next = GridPos {
                    x: next.x.rem_euclid(self.config.cols),
                    y: next.y.rem_euclid(self.config.rows),
                };
            } else {
                self.game_over = true;
                return (self, None);
            }
        }

        if self.snake.contains(&next) {
            self.game_over = true;
            return (self, None);
        }

        self.snake.insert(0, next);
        self.tick += 1;

        let Some(eaten_index) = self.foods.iter().position(|food| food.pos == next) else {
            self.snake.pop();
            return (self, None);
        };

        self.score += 1;
        let eaten = self.foods[eaten_index].clone();
        match place_food(&self.config, &self.snake, &self.foods, self.tick) {
            Some(pos) => self.foods[eaten_index].pos = pos,
            None => {
                log::info!("Grid is full, dropping food {}", eaten.id);
                self.foods.remove(eaten_index);
            }
        }

        (self, Some(eaten))
    }

    /// Turning straight back is ignored.
    pub fn change_direction(mut self, direction: Direction) -> Self {
        if direction != self.direction.opposite() {
            self.direction = direction;
        }
        self
    }

    pub fn update_speed(mut self, tick_interval_ms: u32) -> Self {
        if tick_interval_ms < MIN_TICK_INTERVAL_MS {
            log::warn!("Ignoring tick interval of {tick_interval_ms}ms");
            return self;
        }
        self.config.tick_interval_ms = tick_interval_ms;
        self
    }

    pub fn update_wrap(mut self, wrap: bool) -> Self {
        self.config.wrap = wrap;
        self
    }

    /// Take away points and tail segments. The head always stays.
    pub fn penalize(mut self, points: u32, segments: usize) -> Self {
        self.score = self.score.saturating_sub(points);
        let keep = self.snake.len().saturating_sub(segments).max(1);
        self.snake.truncate(keep);
        self
    }

    /// Give the foods new labels for the next round.
    ///
    /// Slots that survive keep their cell, extra labels get a new cell and surplus slots are dropped.
    pub fn relabel_foods(mut self, labels: &[FoodSeed]) -> Self {
        self.foods.truncate(labels.len());
        for (slot, food) in self.foods.iter_mut().enumerate() {
            food.id = labels[slot].id.clone();
            food.label = labels[slot].label.clone();
        }

        for (salt, seed) in labels.iter().enumerate().skip(self.foods.len()) {
            match place_food(&self.config, &self.snake, &self.foods, salt as u64) {
                Some(pos) => self.foods.push(Food {
                    id: seed.id.clone(),
                    label: seed.label.clone(),
                    pos,
                }),
                None => log::warn!("No room on the grid for food {}", seed.id),
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeds(labels: &[&str]) -> Vec<FoodSeed> {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| FoodSeed {
                id: format!("opt-{i}"),
                label: label.to_string(),
            })
            .collect()
    }

    fn config(cols: i32, rows: i32, wrap: bool) -> GameConfig {
        GameConfig {
            cols,
            rows,
            wrap,
            ..GameConfig::default()
        }
    }

    #[test]
    fn test_new_places_snake_and_foods() {
        let state = GameState::new(config(10, 8, false), &seeds(&["あ", "い"])).unwrap();

        assert_eq!(state.snake, vec![GridPos { x: 5, y: 4 }, GridPos { x: 4, y: 4 }]);
        assert_eq!(state.direction, Direction::Right);
        assert_eq!(state.foods[0].pos, GridPos { x: 7, y: 1 });
        assert_eq!(state.foods[1].pos, GridPos { x: 0, y: 2 });
        assert_eq!(state.foods[1].label, "い");
        assert_eq!((state.score, state.tick, state.game_over), (0, 0, false));
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        assert!(GameState::new(config(1, 8, false), &[]).is_err());
        assert!(GameState::new(config(4, 0, false), &[]).is_err());
        let too_fast = GameConfig {
            tick_interval_ms: 39,
            ..GameConfig::default()
        };
        assert!(matches!(
            GameState::new(too_fast, &[]),
            Err(GameError::InvalidConfig(_))
        ));
        assert!(GameState::new(config(2, 1, false), &[]).is_ok());
    }

    #[test]
    fn test_plain_step_moves_forward() {
        let state = GameState::new(config(10, 8, false), &[]).unwrap();
        let (state, eaten) = state.step();

        assert!(eaten.is_none());
        assert_eq!(state.snake, vec![GridPos { x: 6, y: 4 }, GridPos { x: 5, y: 4 }]);
        assert_eq!(state.tick, 1);
    }

    #[test]
    fn test_eating_grows_scores_and_respawns() {
        let mut state = GameState::new(config(8, 6, false), &seeds(&["ねこ"])).unwrap();
        assert_eq!(state.head(), GridPos { x: 4, y: 3 });
        state.foods[0].pos = GridPos { x: 5, y: 3 };

        let (state, eaten) = state.step();
        let eaten = eaten.expect("food directly ahead should be eaten");

        assert_eq!(eaten.label, "ねこ");
        assert_eq!(eaten.pos, GridPos { x: 5, y: 3 });
        assert_eq!(state.score, 1);
        assert_eq!(state.snake.len(), 3);
        assert_eq!(state.foods[0].pos, GridPos { x: 2, y: 0 });
        assert!(
            !state.snake.contains(&state.foods[0].pos),
            "respawned food must not sit on the snake"
        );
    }

    #[test]
    fn test_wall_ends_game_and_freezes_state() {
        let state = GameState::new(config(3, 3, false), &[]).unwrap();
        let (state, _) = state.step();
        let (state, _) = state.step();

        assert!(state.game_over);
        assert_eq!(state.snake, vec![GridPos { x: 2, y: 1 }, GridPos { x: 1, y: 1 }]);
        assert_eq!(state.tick, 1, "the fatal move should not count as a tick");

        let (after, eaten) = state.clone().step();
        assert_eq!(after, state);
        assert!(eaten.is_none());
    }

    #[test]
    fn test_wrap_comes_back_on_the_other_side() {
        let state = GameState::new(config(4, 3, true), &[]).unwrap();
        let (state, _) = state.step();
        assert_eq!(state.head(), GridPos { x: 3, y: 1 });
        let (state, _) = state.step();
        assert_eq!(state.head(), GridPos { x: 0, y: 1 });
        assert!(!state.game_over);

        let state = state.change_direction(Direction::Up);
        let (state, _) = state.step();
        let (state, _) = state.step();
        assert_eq!(state.head(), GridPos { x: 0, y: 2 });
    }

    #[test]
    fn test_running_into_self_ends_game() {
        let mut state = GameState::new(config(6, 6, false), &[]).unwrap();
        state.snake = vec![
            GridPos { x: 2, y: 2 },
            GridPos { x: 2, y: 1 },
            GridPos { x: 3, y: 1 },
            GridPos { x: 3, y: 2 },
            GridPos { x: 3, y: 3 },
        ];
        let before = state.snake.clone();

        let (state, _) = state.step();
        assert!(state.game_over);
        assert_eq!(state.snake, before);
    }

    #[test]
    fn test_reversal_is_ignored() {
        let state = GameState::new(GameConfig::default(), &[]).unwrap();
        let state = state.change_direction(Direction::Left);
        assert_eq!(state.direction, Direction::Right);
        let state = state.change_direction(Direction::Up);
        assert_eq!(state.direction, Direction::Up);
        let state = state.change_direction(Direction::Down);
        assert_eq!(state.direction, Direction::Up);
    }

    #[test]
    fn test_speed_floor_and_wrap_setter() {
        let state = GameState::new(GameConfig::default(), &[]).unwrap();
        let state = state.update_speed(39);
        assert_eq!(state.config.tick_interval_ms, 200);
        let state = state.update_speed(120).update_wrap(true);
        assert_eq!(state.config.tick_interval_ms, 120);
        assert!(state.config.wrap);
    }

    #[test]
    fn test_same_inputs_same_run() {
        let play = || {
            let mut state =
                GameState::new(config(12, 9, true), &seeds(&["は", "が", "を", "に"])).unwrap();
            for i in 0..60 {
                if i == 7 {
                    state = state.change_direction(Direction::Down);
                }
                if i == 19 {
                    state = state.change_direction(Direction::Left);
                }
                state = state.step().0;
            }
            state
        };
        assert_eq!(play(), play());
    }

    #[test]
    fn test_penalize_keeps_head() {
        let mut state = GameState::new(config(8, 6, false), &seeds(&["x"])).unwrap();
        state.foods[0].pos = GridPos { x: 5, y: 3 };
        let (state, _) = state.step();
        assert_eq!((state.score, state.snake.len()), (1, 3));

        let state = state.penalize(2, 2);
        assert_eq!(state.score, 0);
        assert_eq!(state.snake, vec![GridPos { x: 5, y: 3 }]);

        let state = state.penalize(1, 5);
        assert_eq!((state.score, state.snake.len()), (0, 1));
    }

    #[test]
    fn test_relabel_keeps_positions() {
        let state = GameState::new(config(10, 8, false), &seeds(&["a", "b"])).unwrap();

        let grown = state.clone().relabel_foods(&seeds(&["c", "d", "e"]));
        assert_eq!(grown.foods.len(), 3);
        assert_eq!(grown.foods[0].pos, GridPos { x: 7, y: 1 });
        assert_eq!(grown.foods[0].label, "c");
        assert_eq!(grown.foods[1].pos, GridPos { x: 0, y: 2 });
        assert_eq!(grown.foods[2].pos, GridPos { x: 3, y: 3 });

        let shrunk = state.relabel_foods(&seeds(&["z"]));
        assert_eq!(shrunk.foods.len(), 1);
        assert_eq!(shrunk.foods[0].pos, GridPos { x: 7, y: 1 });
        assert_eq!(shrunk.foods[0].label, "z");
    }

    #[test]
    fn test_config_from_host_json() {
        let config: GameConfig = serde_json::from_str(r#"{"cols":12,"wrap":true}"#).unwrap();
        assert_eq!(config.cols, 12);
        assert_eq!(config.rows, 14);
        assert_eq!(config.tick_interval_ms, 200);
        assert!(config.wrap);
    }
}
