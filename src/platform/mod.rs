//! Input adapter
//!
//! Maps raw key names (as reported by `KeyboardEvent.key`) to commands.
//! Directions produce press and release commands; everything else fires on
//! key down only.

use crate::games::GameKind;
use crate::sim::{Command, Direction, Spin};

/// Translate one key transition
pub fn command_for_key(key: &str, down: bool, game: GameKind) -> Option<Command> {
    if let Some(dir) = direction_for_key(key, game) {
        return Some(Command::Move { dir, active: down });
    }
    if !down {
        return None;
    }
    match key {
        " " | "Spacebar" => Some(Command::Fire),
        "Enter" => Some(Command::Start),
        "p" | "P" | "Escape" => Some(Command::Pause),
        "r" | "R" => Some(Command::Reset),
        "x" | "X" => Some(Command::Rotate(Spin::Clockwise)),
        "z" | "Z" => Some(Command::Rotate(Spin::CounterClockwise)),
        "c" | "C" | "Shift" => Some(Command::Hold),
        _ => None,
    }
}

/// Arrows and WASD steer. In Pong the two sets belong to different players:
/// W/S drive the left paddle (up/down) and the arrows drive the right one,
/// which reads the left/right pair.
fn direction_for_key(key: &str, game: GameKind) -> Option<Direction> {
    if game == GameKind::Pong {
        return match key {
            "w" | "W" => Some(Direction::Up),
            "s" | "S" => Some(Direction::Down),
            "ArrowUp" => Some(Direction::Left),
            "ArrowDown" => Some(Direction::Right),
            _ => None,
        };
    }
    match key {
        "ArrowLeft" | "a" | "A" => Some(Direction::Left),
        "ArrowRight" | "d" | "D" => Some(Direction::Right),
        "ArrowUp" | "w" | "W" => Some(Direction::Up),
        "ArrowDown" | "s" | "S" => Some(Direction::Down),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrows_and_wasd_agree() {
        for (arrow, letter) in [("ArrowLeft", "a"), ("ArrowUp", "W"), ("ArrowDown", "s")] {
            assert_eq!(
                command_for_key(arrow, true, GameKind::Snake),
                command_for_key(letter, true, GameKind::Snake)
            );
        }
    }

    #[test]
    fn test_release_only_for_directions() {
        assert_eq!(
            command_for_key("ArrowRight", false, GameKind::Asteroids),
            Some(Command::Move {
                dir: Direction::Right,
                active: false
            })
        );
        assert_eq!(command_for_key(" ", false, GameKind::Asteroids), None);
        assert_eq!(command_for_key(" ", true, GameKind::Asteroids), Some(Command::Fire));
    }

    #[test]
    fn test_pong_splits_players() {
        assert_eq!(
            command_for_key("w", true, GameKind::Pong),
            Some(Command::Move {
                dir: Direction::Up,
                active: true
            })
        );
        assert_eq!(
            command_for_key("ArrowDown", true, GameKind::Pong),
            Some(Command::Move {
                dir: Direction::Right,
                active: true
            })
        );
        assert_eq!(command_for_key("ArrowLeft", true, GameKind::Pong), None);
    }

    #[test]
    fn test_lifecycle_and_piece_keys() {
        assert_eq!(command_for_key("p", true, GameKind::Tetris), Some(Command::Pause));
        assert_eq!(command_for_key("R", true, GameKind::Tetris), Some(Command::Reset));
        assert_eq!(command_for_key("Enter", true, GameKind::Tetris), Some(Command::Start));
        assert_eq!(
            command_for_key("z", true, GameKind::Tetris),
            Some(Command::Rotate(Spin::CounterClockwise))
        );
        assert_eq!(command_for_key("c", true, GameKind::Tetris), Some(Command::Hold));
        assert_eq!(command_for_key("q", true, GameKind::Tetris), None);
    }
}
