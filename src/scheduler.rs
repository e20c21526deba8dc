//! Box-based spaced-repetition scheduling.
//!
//! A fixed interval progression drives the low boxes; once a question climbs
//! past the table its interval grows by the ease factor. Both functions are
//! total and read no clock: `now` is always supplied by the caller.

use chrono::{DateTime, Duration, Utc};

use crate::config::SchedulerParams;
use crate::memory::{Maturity, MemoryState};

const MAX_INTERVAL_DAYS: u32 = 36_500;

pub fn advance(
    state: Option<&MemoryState>,
    correct: bool,
    now: DateTime<Utc>,
    params: &SchedulerParams,
) -> MemoryState {
    let max_box = params.max_box.max(1);

    let (box_level, ease, interval, repetitions) = match state {
        Some(s) => (
            s.box_level.clamp(1, max_box),
            s.ease_factor.min(params.max_ease).max(params.min_ease),
            s.interval_days,
            s.repetitions,
        ),
        None => (1, params.initial_ease, 0, 0),
    };

    let (box_level, ease_factor, interval_days, repetitions) = if correct {
        let box_level = box_level.saturating_add(1).min(max_box);
        let ease = round_ease(ease + params.ease_step_up)
            .min(params.max_ease)
            .max(params.min_ease);
        let interval = progression_interval(params, box_level)
            .unwrap_or_else(|| grown_interval(interval, ease));
        (box_level, ease, interval, repetitions.saturating_add(1))
    } else {
        let box_level = box_level.saturating_sub(1).max(1);
        let ease = round_ease(ease - params.ease_step_down).max(params.min_ease);
        let interval = progression_interval(params, box_level)
            .or_else(|| params.interval_progression.last().map(|d| (*d).max(1)))
            .unwrap_or(1);
        (box_level, ease, interval, 0)
    };

    MemoryState {
        box_level,
        ease_factor,
        interval_days,
        repetitions,
        last_reviewed_at: now,
        next_review_due: now + Duration::days(i64::from(interval_days)),
    }
}

pub fn classify(state: Option<&MemoryState>, params: &SchedulerParams) -> Maturity {
    let Some(state) = state else {
        return Maturity::New;
    };
    let max_box = params.max_box.max(1);

    if state.box_level >= max_box && state.repetitions >= params.mastered_min_streak {
        Maturity::Mastered
    } else if state.box_level <= 2 {
        Maturity::Learning
    } else {
        Maturity::Review
    }
}

fn progression_interval(params: &SchedulerParams, box_level: u8) -> Option<u32> {
    let index = usize::from(box_level).checked_sub(1)?;
    params
        .interval_progression
        .get(index)
        .map(|days| (*days).clamp(1, MAX_INTERVAL_DAYS))
}

fn grown_interval(previous: u32, ease: f64) -> u32 {
    let grown = (f64::from(previous.max(1)) * ease).round();
    grown.clamp(1.0, f64::from(MAX_INTERVAL_DAYS)) as u32
}

fn round_ease(ease: f64) -> f64 {
    (ease * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn three_correct_then_one_incorrect() {
        let params = SchedulerParams::default();
        let mut now = t0();

        let mut state = advance(None, true, now, &params);
        assert_eq!((state.box_level, state.interval_days), (2, 3));
        assert!(approx(state.ease_factor, 2.6));

        now = state.next_review_due;
        state = advance(Some(&state), true, now, &params);
        assert_eq!((state.box_level, state.interval_days), (3, 7));
        assert!(approx(state.ease_factor, 2.7));

        now = state.next_review_due;
        state = advance(Some(&state), true, now, &params);
        assert_eq!((state.box_level, state.interval_days), (4, 16));
        assert!(approx(state.ease_factor, 2.8));
        assert_eq!(state.repetitions, 3);

        now = state.next_review_due;
        state = advance(Some(&state), false, now, &params);
        assert_eq!(state.box_level, 3);
        assert_eq!(state.repetitions, 0);
        assert_eq!(state.interval_days, 7);
        assert!(approx(state.ease_factor, 2.6));
        assert_eq!(state.next_review_due, now + Duration::days(7));
    }

    #[test]
    fn first_answer_wrong_stays_in_box_one() {
        let params = SchedulerParams::default();
        let state = advance(None, false, t0(), &params);
        assert_eq!(state.box_level, 1);
        assert_eq!(state.interval_days, 1);
        assert_eq!(state.repetitions, 0);
        assert!(approx(state.ease_factor, 2.3));
        assert_eq!(state.next_review_due, t0() + Duration::days(1));
    }

    #[test]
    fn top_box_grows_by_ease() {
        let params = SchedulerParams::default();
        let state = MemoryState {
            box_level: 5,
            ease_factor: 2.5,
            interval_days: 16,
            repetitions: 4,
            last_reviewed_at: t0(),
            next_review_due: t0() + Duration::days(16),
        };
        let next = advance(Some(&state), true, t0(), &params);
        assert_eq!(next.box_level, 5);
        // 16 * 2.6 = 41.6
        assert_eq!(next.interval_days, 42);
        assert_eq!(classify(Some(&next), &params), Maturity::Mastered);
    }

    #[test]
    fn ease_never_drops_below_floor() {
        let params = SchedulerParams::default();
        let mut state = advance(None, false, t0(), &params);
        for _ in 0..10 {
            state = advance(Some(&state), false, t0(), &params);
        }
        assert!(approx(state.ease_factor, 1.3));
        assert_eq!(state.box_level, 1);
    }

    #[test]
    fn ease_stops_at_ceiling() {
        let params = SchedulerParams::default();
        let mut state = advance(None, true, t0(), &params);
        for _ in 0..100 {
            state = advance(Some(&state), true, state.next_review_due, &params);
        }
        assert_eq!(state.box_level, 5);
        assert!(approx(state.ease_factor, 3.0));
    }

    #[test]
    fn stored_ease_above_ceiling_is_pulled_back() {
        let params = SchedulerParams::default();
        let state = MemoryState {
            box_level: 5,
            ease_factor: 4.2,
            interval_days: 10,
            repetitions: 3,
            last_reviewed_at: t0(),
            next_review_due: t0() + Duration::days(10),
        };
        let next = advance(Some(&state), true, t0(), &params);
        assert!(approx(next.ease_factor, 3.0));
        assert_eq!(next.interval_days, 30);
    }

    #[test]
    fn corrupt_box_is_clamped() {
        let params = SchedulerParams::default();
        let state = MemoryState {
            box_level: 0,
            ease_factor: 0.5,
            interval_days: 0,
            repetitions: 0,
            last_reviewed_at: t0(),
            next_review_due: t0(),
        };
        let next = advance(Some(&state), true, t0(), &params);
        assert_eq!(next.box_level, 2);
        assert!(next.ease_factor >= params.min_ease);
    }

    #[test]
    fn maturity_classes() {
        let params = SchedulerParams::default();
        assert_eq!(classify(None, &params), Maturity::New);

        let mut state = advance(None, true, t0(), &params);
        assert_eq!(classify(Some(&state), &params), Maturity::Learning);

        state.box_level = 3;
        assert_eq!(classify(Some(&state), &params), Maturity::Review);

        state.box_level = 5;
        state.repetitions = 1;
        assert_eq!(classify(Some(&state), &params), Maturity::Review);

        state.repetitions = 2;
        assert_eq!(classify(Some(&state), &params), Maturity::Mastered);
    }
}
