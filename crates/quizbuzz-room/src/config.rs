//! Room limits and timing.

use std::ops::RangeInclusive;
use std::time::Duration;

use quizbuzz_protocol::{CreateRoomRequest, RoomSettings};

use crate::RoomError;

// ---------------------------------------------------------------------------
// RoomLimits
// ---------------------------------------------------------------------------

/// Accepted ranges for host-supplied room settings.
///
/// The defaults are the production limits. Tests and small deployments
/// can widen them (for example to allow single-question games).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomLimits {
    pub max_players: RangeInclusive<usize>,
    pub questions_per_game: RangeInclusive<usize>,
    /// Seconds.
    pub answer_time_limit: RangeInclusive<u32>,
    /// Used when a create request leaves `answerTimeLimit` out.
    pub default_answer_time_limit: u32,
}

impl Default for RoomLimits {
    fn default() -> Self {
        Self {
            max_players: 2..=8,
            questions_per_game: 5..=20,
            answer_time_limit: 5..=30,
            default_answer_time_limit: 15,
        }
    }
}

impl RoomLimits {
    /// Checks a create request and returns the room name with its
    /// settings.
    ///
    /// `name`, `maxPlayers`, and `questionsPerGame` are required; a blank
    /// name counts as missing. Optional fields fall back to
    /// `default_answer_time_limit`, no teams, and trivia mode.
    pub fn validate(&self, req: &CreateRoomRequest) -> Result<(String, RoomSettings), RoomError> {
        let name = req.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let (Some(name), Some(max_players), Some(questions_per_game)) =
            (name, req.max_players, req.questions_per_game)
        else {
            return Err(RoomError::Validation(
                "name, maxPlayers, and questionsPerGame are required".into(),
            ));
        };
        let answer_time_limit = req
            .answer_time_limit
            .unwrap_or(self.default_answer_time_limit);

        check_range("maxPlayers", max_players, &self.max_players)?;
        check_range("questionsPerGame", questions_per_game, &self.questions_per_game)?;
        check_range("answerTimeLimit", answer_time_limit, &self.answer_time_limit)?;

        let settings = RoomSettings {
            max_players,
            questions_per_game,
            answer_time_limit,
            allow_teams: req.allow_teams.unwrap_or(false),
            game_mode: req.game_mode.unwrap_or_default(),
        };
        Ok((name.to_string(), settings))
    }
}

fn check_range<T>(field: &str, value: T, range: &RangeInclusive<T>) -> Result<(), RoomError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(RoomError::Validation(format!(
            "{field} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        )))
    }
}

// ---------------------------------------------------------------------------
// RoomTiming
// ---------------------------------------------------------------------------

/// Delays, timeouts, and queue sizes shared by every room actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomTiming {
    /// Pause between a resolved answer and the next question.
    pub settle_delay: Duration,
    /// Upper bound on any single call to an external collaborator.
    pub collaborator_timeout: Duration,
    /// Bounded command queue per room. Senders wait when it is full.
    pub command_channel_size: usize,
    /// Events buffered per room topic before slow subscribers lag.
    pub broadcast_capacity: usize,
    /// How long a lobby listing waits for each room. Rooms that miss it
    /// are left out of that listing.
    pub list_reply_timeout: Duration,
}

impl Default for RoomTiming {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(3),
            collaborator_timeout: Duration::from_secs(10),
            command_channel_size: 64,
            broadcast_capacity: 128,
            list_reply_timeout: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizbuzz_protocol::GameMode;

    fn request() -> CreateRoomRequest {
        CreateRoomRequest {
            name: Some("Friday quiz".into()),
            max_players: Some(4),
            questions_per_game: Some(10),
            answer_time_limit: Some(20),
            allow_teams: None,
            game_mode: Some(GameMode::Code),
        }
    }

    #[test]
    fn test_validate_accepts_in_range_request() {
        let (name, settings) = RoomLimits::default().validate(&request()).unwrap();
        assert_eq!(name, "Friday quiz");
        assert_eq!(settings.max_players, 4);
        assert_eq!(settings.questions_per_game, 10);
        assert_eq!(settings.answer_time_limit, 20);
        assert!(!settings.allow_teams);
        assert_eq!(settings.game_mode, GameMode::Code);
    }

    #[test]
    fn test_validate_requires_name_and_counts() {
        let limits = RoomLimits::default();
        for req in [
            CreateRoomRequest { name: None, ..request() },
            CreateRoomRequest { name: Some("   ".into()), ..request() },
            CreateRoomRequest { max_players: None, ..request() },
            CreateRoomRequest { questions_per_game: None, ..request() },
        ] {
            assert!(matches!(limits.validate(&req), Err(RoomError::Validation(_))));
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let limits = RoomLimits::default();
        let too_many = CreateRoomRequest { max_players: Some(9), ..request() };
        let too_few = CreateRoomRequest { max_players: Some(1), ..request() };
        let short = CreateRoomRequest { questions_per_game: Some(4), ..request() };
        let slow = CreateRoomRequest { answer_time_limit: Some(31), ..request() };
        for req in [too_many, too_few, short, slow] {
            let err = limits.validate(&req).unwrap_err();
            assert!(matches!(err, RoomError::Validation(_)), "{err:?}");
        }
    }

    #[test]
    fn test_validate_fills_defaults() {
        let req = CreateRoomRequest {
            answer_time_limit: None,
            game_mode: None,
            ..request()
        };
        let (_, settings) = RoomLimits::default().validate(&req).unwrap();
        assert_eq!(settings.answer_time_limit, 15);
        assert_eq!(settings.game_mode, GameMode::Trivia);
    }

    #[test]
    fn test_relaxed_limits_allow_single_question() {
        let limits = RoomLimits {
            questions_per_game: 1..=20,
            ..RoomLimits::default()
        };
        let req = CreateRoomRequest {
            questions_per_game: Some(1),
            ..request()
        };
        assert!(limits.validate(&req).is_ok());
    }

    #[test]
    fn test_timing_defaults() {
        let timing = RoomTiming::default();
        assert_eq!(timing.settle_delay, Duration::from_secs(3));
        assert_eq!(timing.command_channel_size, 64);
    }
}
