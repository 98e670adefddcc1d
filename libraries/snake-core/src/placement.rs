use crate::{Food, GameConfig, GridPos};

const HASH_MULTIPLIER: u64 = 9301;
const HASH_INCREMENT: u64 = 49297;
const HASH_MODULUS: u64 = 233280;
const SALT_MULTIPLIER: u64 = 233;

/// Pick a cell that is not covered by the snake or any food.
///
/// The probe is a positional hash of the attempt index and `salt`, so the same grid, occupancy and
/// salt always give the same cell. The probe does not visit every cell, so if it comes up empty we
/// scan row by row. `None` means the grid is full.
pub fn place_food(
    config: &GameConfig,
    snake: &[GridPos],
    foods: &[Food],
    salt: u64,
) -> Option<GridPos> {
    let cols = u64::try_from(config.cols).ok()?;
    let rows = u64::try_from(config.rows).ok()?;
    if cols == 0 || rows == 0 {
        return None;
    }
    let occupied = |pos: GridPos| {
        snake.contains(&pos) || foods.iter().any(|food| food.pos == pos)
    };

    // Reducing the salt first keeps the product small without changing the result.
    let salted = (salt % HASH_MODULUS) * SALT_MULTIPLIER;
    for i in 0..cols * rows {
        let r = (i * HASH_MULTIPLIER + HASH_INCREMENT + salted) % HASH_MODULUS;
        let pos = GridPos {
            x: ((r + i * 13) % cols) as i32,
            y: ((r + i * 29) % rows) as i32,
        };
        if !occupied(pos) {
            return Some(pos);
        }
    }

    for y in 0..config.rows {
        for x in 0..config.cols {
            let pos = GridPos { x, y };
            if !occupied(pos) {
                return Some(pos);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(cols: i32, rows: i32) -> GameConfig {
        GameConfig {
            cols,
            rows,
            ..GameConfig::default()
        }
    }

    #[test]
    fn test_first_probe_on_empty_grid() {
        assert_eq!(
            place_food(&grid(10, 8), &[], &[], 0),
            Some(GridPos { x: 7, y: 1 })
        );
        assert_eq!(
            place_food(&grid(10, 8), &[], &[], 1),
            Some(GridPos { x: 0, y: 2 })
        );
    }

    #[test]
    fn test_occupied_probe_moves_on() {
        let food = Food {
            id: "a".to_string(),
            label: "あ".to_string(),
            pos: GridPos { x: 7, y: 1 },
        };
        let pos = place_food(&grid(10, 8), &[], std::slice::from_ref(&food), 0).unwrap();
        assert_ne!(pos, food.pos);
    }

    #[test]
    fn test_scan_finds_cell_the_probe_misses() {
        // On a 2x1 grid with salt 0 every probe lands on x = 1.
        let snake = [GridPos { x: 1, y: 0 }];
        assert_eq!(
            place_food(&grid(2, 1), &snake, &[], 0),
            Some(GridPos { x: 0, y: 0 })
        );
    }

    #[test]
    fn test_full_grid_has_no_cell() {
        let snake = [GridPos { x: 1, y: 0 }, GridPos { x: 0, y: 0 }];
        assert_eq!(place_food(&grid(2, 1), &snake, &[], 0), None);
    }

    #[test]
    fn test_huge_salt_is_reduced() {
        let config = grid(10, 8);
        assert_eq!(
            place_food(&config, &[], &[], HASH_MODULUS + 1),
            place_food(&config, &[], &[], 1)
        );
    }
}
