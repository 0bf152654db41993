//! Day-transition evaluation.
//!
//! Decides which screen the session belongs on from the current instant and
//! the persisted challenge state. The evaluation is a pure function; the
//! engine applies its effects (stopping the countdown, arming a wake,
//! recomputing the target).

use crate::schedule::ProgramPosition;
use chrono::NaiveDate;

/// Everything the evaluation looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayInputs {
    pub today: NaiveDate,
    pub restricted: bool,
    pub has_start_date: bool,
    pub baseline: u32,
    pub position: ProgramPosition,
    pub last_updated_day: Option<NaiveDate>,
    pub done_for_day: Option<NaiveDate>,
    /// Countdown is running or paused
    pub timer_live: bool,
}

/// Outcome of one evaluation, checked in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing started yet
    Welcome,
    /// Started, but no baseline recorded
    AwaitingMaxTest,
    /// All fourteen days are behind us
    Completed,
    /// Reminders suppressed until the next resume boundary
    DoneForToday,
    /// A new calendar day, or a day the user has not started yet
    NextDay,
    /// Same day, keep going
    Active,
}

impl Verdict {
    /// Whether a resume wake may start the day's countdown
    pub fn is_session_eligible(&self) -> bool {
        matches!(self, Verdict::NextDay | Verdict::Active)
    }
}

pub fn evaluate(inputs: &DayInputs) -> Verdict {
    if !inputs.has_start_date && inputs.baseline == 0 {
        return Verdict::Welcome;
    }
    if inputs.baseline == 0 {
        return Verdict::AwaitingMaxTest;
    }
    if inputs.position.completed {
        return Verdict::Completed;
    }
    if inputs.restricted {
        return Verdict::DoneForToday;
    }
    if inputs.done_for_day == Some(inputs.today) {
        return Verdict::DoneForToday;
    }
    // A stopped countdown means today's session was never begun
    if inputs.last_updated_day != Some(inputs.today) || !inputs.timer_live {
        return Verdict::NextDay;
    }
    Verdict::Active
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    fn eligible() -> DayInputs {
        DayInputs {
            today: day(10),
            restricted: false,
            has_start_date: true,
            baseline: 40,
            position: ProgramPosition::from_days(3),
            last_updated_day: Some(day(10)),
            done_for_day: None,
            timer_live: true,
        }
    }

    #[test]
    fn test_welcome_before_anything() {
        let inputs = DayInputs {
            has_start_date: false,
            baseline: 0,
            ..eligible()
        };
        assert_eq!(evaluate(&inputs), Verdict::Welcome);
    }

    #[test]
    fn test_awaiting_max_test_without_baseline() {
        let inputs = DayInputs {
            baseline: 0,
            ..eligible()
        };
        assert_eq!(evaluate(&inputs), Verdict::AwaitingMaxTest);
    }

    #[test]
    fn test_completed_wins_over_restricted() {
        let inputs = DayInputs {
            position: ProgramPosition::from_days(14),
            restricted: true,
            ..eligible()
        };
        assert_eq!(evaluate(&inputs), Verdict::Completed);
    }

    #[test]
    fn test_restricted_wins_over_new_day() {
        let inputs = DayInputs {
            restricted: true,
            last_updated_day: Some(day(9)),
            ..eligible()
        };
        assert_eq!(evaluate(&inputs), Verdict::DoneForToday);
    }

    #[test]
    fn test_done_for_today_holds_until_tomorrow() {
        let inputs = DayInputs {
            done_for_day: Some(day(10)),
            ..eligible()
        };
        assert_eq!(evaluate(&inputs), Verdict::DoneForToday);

        let tomorrow = DayInputs {
            today: day(11),
            ..inputs
        };
        assert_eq!(evaluate(&tomorrow), Verdict::NextDay);
    }

    #[test]
    fn test_new_calendar_day() {
        let inputs = DayInputs {
            last_updated_day: Some(day(9)),
            ..eligible()
        };
        assert_eq!(evaluate(&inputs), Verdict::NextDay);

        let never = DayInputs {
            last_updated_day: None,
            ..eligible()
        };
        assert_eq!(evaluate(&never), Verdict::NextDay);
    }

    #[test]
    fn test_same_day_stays_active() {
        assert_eq!(evaluate(&eligible()), Verdict::Active);
        assert!(Verdict::Active.is_session_eligible());
        assert!(Verdict::NextDay.is_session_eligible());
        assert!(!Verdict::DoneForToday.is_session_eligible());
    }

    #[test]
    fn test_unbegun_day_stays_next_day() {
        let inputs = DayInputs {
            timer_live: false,
            ..eligible()
        };
        assert_eq!(evaluate(&inputs), Verdict::NextDay);

        // Done-for-today still wins over an unbegun day
        let done = DayInputs {
            done_for_day: Some(day(10)),
            ..inputs
        };
        assert_eq!(evaluate(&done), Verdict::DoneForToday);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let inputs = DayInputs {
            last_updated_day: Some(day(8)),
            ..eligible()
        };
        let first = evaluate(&inputs);
        for _ in 0..10 {
            assert_eq!(evaluate(&inputs), first);
        }
    }
}
