use chrono::{DateTime, Utc};

use super::models::{Streak, StreakSet};
use super::outcome::OutcomeKind;

fn extend(streak: &mut Streak, date: DateTime<Utc>) {
    streak.current += 1;
    if streak.current == 1 {
        streak.current_start = Some(date);
    }
    // Strict improvement only; an equal-length run never displaces the
    // recorded one.
    if streak.current > streak.longest {
        streak.longest = streak.current;
        streak.longest_start = streak.current_start;
        streak.longest_end = Some(date);
    }
}

fn reset(streak: &mut Streak) {
    streak.current = 0;
    streak.current_start = None;
}

/// Feeds one chronological outcome into a streak set. Applied independently
/// at game and session granularity.
///
/// Unknown outcomes never reach this function; callers skip them before
/// counting anything.
pub fn apply_result(set: &mut StreakSet, result: OutcomeKind, date: DateTime<Utc>) {
    match result {
        OutcomeKind::Win => {
            extend(&mut set.win, date);
            reset(&mut set.loss);
            reset(&mut set.winless);
            extend(&mut set.undefeated, date);
        }
        OutcomeKind::Loss => {
            extend(&mut set.loss, date);
            reset(&mut set.win);
            extend(&mut set.winless, date);
            reset(&mut set.undefeated);
        }
        OutcomeKind::Draw => {
            reset(&mut set.win);
            reset(&mut set.loss);
            extend(&mut set.winless, date);
            extend(&mut set.undefeated, date);
        }
        OutcomeKind::Unknown => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 20, 0, 0).unwrap()
    }

    fn run(results: &[OutcomeKind]) -> StreakSet {
        let mut set = StreakSet::default();
        for (i, result) in results.iter().enumerate() {
            apply_result(&mut set, *result, day(i as u32 + 1));
        }
        set
    }

    use OutcomeKind::{Draw, Loss, Win};

    #[rstest]
    #[case(&[Win, Win, Win], 3, 0, 0, 3)]
    #[case(&[Win, Loss, Loss], 0, 2, 2, 0)]
    #[case(&[Loss, Draw, Draw], 0, 0, 3, 2)]
    #[case(&[Draw, Win], 1, 0, 0, 2)]
    fn current_counters_follow_the_transition_table(
        #[case] results: &[OutcomeKind],
        #[case] win: u32,
        #[case] loss: u32,
        #[case] winless: u32,
        #[case] undefeated: u32,
    ) {
        let set = run(results);
        assert_eq!(set.win.current, win);
        assert_eq!(set.loss.current, loss);
        assert_eq!(set.winless.current, winless);
        assert_eq!(set.undefeated.current, undefeated);
    }

    #[test]
    fn win_loss_and_winless_counters_are_mutually_exclusive() {
        let sequences: &[&[OutcomeKind]] = &[
            &[Win, Win, Loss, Draw, Win],
            &[Loss, Loss, Win, Win, Draw, Loss],
            &[Draw, Draw, Win, Loss],
        ];
        for seq in sequences {
            let mut set = StreakSet::default();
            for (i, result) in seq.iter().enumerate() {
                apply_result(&mut set, *result, day(i as u32 + 1));
                if set.win.current > 0 {
                    assert_eq!(set.loss.current, 0);
                    assert_eq!(set.winless.current, 0);
                }
                if set.loss.current > 0 {
                    assert_eq!(set.win.current, 0);
                }
            }
        }
    }

    #[test]
    fn longest_run_keeps_its_original_start_date() {
        // Win streak starts on day 2 and is extended through day 4.
        let set = run(&[Loss, Win, Win, Win]);
        assert_eq!(set.win.longest, 3);
        assert_eq!(set.win.longest_start, Some(day(2)));
        assert_eq!(set.win.longest_end, Some(day(4)));
    }

    #[test]
    fn shorter_later_run_does_not_displace_the_longest() {
        let set = run(&[Win, Win, Win, Loss, Win, Win]);
        assert_eq!(set.win.longest, 3);
        assert_eq!(set.win.longest_start, Some(day(1)));
        assert_eq!(set.win.longest_end, Some(day(3)));
        assert_eq!(set.win.current, 2);
        assert_eq!(set.win.current_start, Some(day(5)));
    }

    #[test]
    fn draws_extend_undefeated_and_winless_but_no_win_or_loss() {
        let set = run(&[Win, Draw, Win]);
        assert_eq!(set.undefeated.longest, 3);
        assert_eq!(set.win.longest, 1);
        assert_eq!(set.loss.longest, 0);
        // The draw started a winless run that the following win ended.
        assert_eq!(set.winless.longest, 1);
        assert_eq!(set.winless.current, 0);
    }
}
