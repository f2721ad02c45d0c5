//! Time-driven rule-set scheduling
//!
//! A schedule is an ordered list of `[*.]<time> <ruleset> [message...]`
//! entries. Weekly entries carry an offset within a 7-day cycle starting
//! Sunday; `*.`-prefixed entries repeat daily. The schedule is the only
//! automatic mutator of the engine's current rule-set pointer.

use chrono::{Datelike, Local, Timelike};

/// Advisory re-evaluation cadence while the host runs a simulated calendar.
pub const SIM_TICK_SECS: u64 = 3;
/// Advisory re-evaluation cadence in realtime mode.
pub const REALTIME_TICK_SECS: u64 = 30;

/// Seconds since the start of the weekly cycle (Sunday 00:00).
///
/// Daily entries store plain seconds-of-day in the same representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WeekTime(pub u32);

impl WeekTime {
    pub const DAY_SECS: u32 = 86_400;
    pub const WEEK_SECS: u32 = 7 * Self::DAY_SECS;

    pub fn new(day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Self(day * Self::DAY_SECS + hour * 3600 + minute * 60 + second)
    }

    pub fn time_of_day(self) -> u32 {
        self.0 % Self::DAY_SECS
    }

    pub fn day(self) -> u32 {
        self.0 / Self::DAY_SECS
    }
}

/// Source of the current time for schedule selection.
///
/// The engine never reads the wall clock directly; hosts inject a clock so
/// selection is reproducible in tests and can follow an in-simulation
/// calendar.
pub trait Clock {
    /// Current realtime position within the weekly cycle.
    fn week_now(&self) -> WeekTime;

    /// In-simulation time of day in seconds, when the host runs a
    /// simulated calendar. `None` forces realtime selection.
    fn sim_time_of_day(&self) -> Option<u32> {
        None
    }
}

/// Wall-clock implementation over the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn week_now(&self) -> WeekTime {
        let now = Local::now();
        WeekTime(
            now.weekday().num_days_from_sunday() * WeekTime::DAY_SECS
                + now.num_seconds_from_midnight(),
        )
    }
}

/// One parsed schedule line.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub text: String,
    pub time: WeekTime,
    pub is_daily: bool,
    pub ruleset: String,
    pub message: String,
}

impl ScheduleEntry {
    /// Parse `[*.]<time> <ruleset> [message...]`. Time is `[d.]hh:mm[:ss]`
    /// with `d` a 0-6 day-of-week index. Returns `None` on malformed
    /// lines; callers log and drop them.
    pub fn parse(text: &str) -> Option<ScheduleEntry> {
        let trimmed = text.trim();
        let mut tokens = trimmed.split_whitespace();
        let mut time_text = tokens.next()?;
        let ruleset = tokens.next()?.to_string();
        let message = tokens.collect::<Vec<_>>().join(" ");

        let is_daily = time_text.starts_with("*.");
        if is_daily {
            time_text = &time_text[2..];
        }

        let time = parse_time(time_text, is_daily)?;

        Some(ScheduleEntry {
            text: trimmed.to_string(),
            time,
            is_daily,
            ruleset,
            message,
        })
    }
}

fn parse_time(text: &str, daily: bool) -> Option<WeekTime> {
    let (day, clock_text) = match text.split_once('.') {
        Some((day_text, rest)) if !daily => (day_text.parse::<u32>().ok()?, rest),
        Some(_) => return None,
        None => (0, text),
    };
    if day > 6 {
        return None;
    }

    let mut fields = clock_text.split(':');
    let hour: u32 = fields.next()?.parse().ok()?;
    let minute: u32 = fields.next()?.parse().ok()?;
    let second: u32 = match fields.next() {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    if fields.next().is_some() || hour > 23 || minute > 59 || second > 59 {
        return None;
    }

    Some(WeekTime::new(day, hour, minute, second))
}

/// Compiled schedule: entries plus the derived validity state.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    pub enabled: bool,
    pub use_realtime: bool,
    pub broadcast: bool,
    pub entries: Vec<ScheduleEntry>,
    /// Requires at least two parseable entries spanning at least two
    /// distinct rule-set names; invalid schedules disable themselves.
    pub valid: bool,
}

impl Schedule {
    /// Compile entry lines, dropping malformed ones with a warning.
    pub fn compile(enabled: bool, use_realtime: bool, broadcast: bool, lines: &[String]) -> Self {
        let mut entries = Vec::with_capacity(lines.len());
        for line in lines {
            match ScheduleEntry::parse(line) {
                Some(entry) => entries.push(entry),
                None => tracing::warn!(entry = %line, "dropping invalid schedule entry"),
            }
        }

        let mut distinct: Vec<String> = Vec::new();
        for entry in &entries {
            let lower = entry.ruleset.to_ascii_lowercase();
            if !distinct.contains(&lower) {
                distinct.push(lower);
            }
        }

        let valid = entries.len() >= 2 && distinct.len() >= 2;
        Schedule {
            enabled: enabled && valid,
            use_realtime,
            broadcast,
            entries,
            valid,
        }
    }

    /// Seconds between re-evaluations while enabled.
    pub fn tick_secs(&self) -> u64 {
        if self.use_realtime {
            REALTIME_TICK_SECS
        } else {
            SIM_TICK_SECS
        }
    }

    /// Select the entry governing `clock`'s current moment.
    ///
    /// Weekly entries: the most recent one at or before now. In realtime
    /// mode the best daily entry (by time of day) is projected onto
    /// today's weekly offset and preferred when later. Returns `None`
    /// when nothing qualifies yet; the caller keeps its previous
    /// selection.
    pub fn select(&self, clock: &dyn Clock) -> Option<(&str, &str)> {
        let realtime = self.use_realtime || clock.sim_time_of_day().is_none();
        let now = if realtime {
            clock.week_now()
        } else {
            WeekTime(clock.sim_time_of_day().unwrap_or_default())
        };

        let mut best: Option<&ScheduleEntry> = None;
        for entry in &self.entries {
            if realtime && entry.is_daily {
                continue;
            }
            if entry.time <= now && best.map_or(true, |b| entry.time > b.time) {
                best = Some(entry);
            }
        }

        if realtime {
            let day_now = clock.week_now().time_of_day();
            let mut best_daily: Option<&ScheduleEntry> = None;
            for entry in &self.entries {
                if !entry.is_daily || entry.time.0 > day_now {
                    continue;
                }
                if best_daily.map_or(true, |b| entry.time > b.time) {
                    best_daily = Some(entry);
                }
            }

            if let Some(daily) = best_daily {
                let projected =
                    WeekTime(clock.week_now().day() * WeekTime::DAY_SECS + daily.time.0);
                match best {
                    Some(weekly) if projected <= weekly.time => {}
                    _ => best = Some(daily),
                }
            }
        }

        best.map(|entry| (entry.ruleset.as_str(), entry.message.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Clock pinned to a fixed weekly offset, optionally with a simulated
    /// calendar time of day.
    struct FixedClock {
        week: WeekTime,
        sim: Option<u32>,
    }

    impl Clock for FixedClock {
        fn week_now(&self) -> WeekTime {
            self.week
        }

        fn sim_time_of_day(&self) -> Option<u32> {
            self.sim
        }
    }

    fn lines(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_entry_parsing() {
        let entry = ScheduleEntry::parse("12:00 night The night is dark").unwrap();
        assert_eq!(entry.time, WeekTime::new(0, 12, 0, 0));
        assert!(!entry.is_daily);
        assert_eq!(entry.ruleset, "night");
        assert_eq!(entry.message, "The night is dark");

        let daily = ScheduleEntry::parse("*.06:30 day").unwrap();
        assert!(daily.is_daily);
        assert_eq!(daily.time.0, 6 * 3600 + 30 * 60);
        assert_eq!(daily.message, "");

        let weekly = ScheduleEntry::parse("5.23:15:30 weekend").unwrap();
        assert_eq!(weekly.time, WeekTime::new(5, 23, 15, 30));
    }

    #[test]
    fn test_entry_parse_rejects_garbage() {
        assert!(ScheduleEntry::parse("").is_none());
        assert!(ScheduleEntry::parse("12:00").is_none());
        assert!(ScheduleEntry::parse("25:00 pvp").is_none());
        assert!(ScheduleEntry::parse("8.12:00 pvp").is_none());
        assert!(ScheduleEntry::parse("*.x:00 pvp").is_none());
    }

    #[test]
    fn test_schedule_requires_two_distinct_rulesets() {
        let one = Schedule::compile(true, false, false, &lines(&["00:00 day"]));
        assert!(!one.valid);
        assert!(!one.enabled);

        let same = Schedule::compile(true, false, false, &lines(&["00:00 day", "12:00 day"]));
        assert!(!same.valid);
        assert!(!same.enabled);

        let ok = Schedule::compile(true, false, false, &lines(&["00:00 day", "12:00 night"]));
        assert!(ok.valid);
        assert!(ok.enabled);
    }

    #[test]
    fn test_invalid_entries_dropped_but_counted_out() {
        let sched = Schedule::compile(
            true,
            false,
            false,
            &lines(&["00:00 day", "nonsense", "12:00 night"]),
        );
        assert_eq!(sched.entries.len(), 2);
        assert!(sched.valid);
    }

    #[test]
    fn test_most_recent_entry_wins() {
        let sched = Schedule::compile(true, false, false, &lines(&["00:00 day", "12:00 night"]));

        let at = |secs: u32| {
            let clock = FixedClock {
                week: WeekTime(secs),
                sim: Some(secs),
            };
            sched.select(&clock).map(|(name, _)| name.to_string())
        };

        assert_eq!(at(13 * 3600), Some("night".to_string()));
        assert_eq!(at(23 * 3600), Some("night".to_string()));
        assert_eq!(at(60), Some("day".to_string()));
    }

    #[test]
    fn test_no_qualifying_entry_returns_none() {
        let sched = Schedule::compile(true, false, false, &lines(&["10:00 day", "12:00 night"]));
        let clock = FixedClock {
            week: WeekTime(3600),
            sim: Some(3600),
        };
        assert!(sched.select(&clock).is_none());
    }

    #[test]
    fn test_realtime_daily_projection_preferred_when_later() {
        // Weekly entry Sunday 00:00, daily entry 18:00. On Tuesday at
        // 19:00 the daily projects to Tuesday 18:00 > Sunday 00:00.
        let sched = Schedule::compile(
            true,
            true,
            false,
            &lines(&["0.00:00 weekly", "*.18:00 evening"]),
        );
        let clock = FixedClock {
            week: WeekTime::new(2, 19, 0, 0),
            sim: None,
        };
        let (name, _) = sched.select(&clock).unwrap();
        assert_eq!(name, "evening");

        // Before 18:00 the weekly entry still governs.
        let clock = FixedClock {
            week: WeekTime::new(2, 17, 0, 0),
            sim: None,
        };
        let (name, _) = sched.select(&clock).unwrap();
        assert_eq!(name, "weekly");
    }

    #[test]
    fn test_realtime_weekly_later_than_projected_daily_wins() {
        let sched = Schedule::compile(
            true,
            true,
            false,
            &lines(&["2.12:00 weekly", "*.06:00 morning"]),
        );
        // Tuesday 13:00: weekly (Tuesday 12:00) is later than the daily
        // projection (Tuesday 06:00).
        let clock = FixedClock {
            week: WeekTime::new(2, 13, 0, 0),
            sim: None,
        };
        let (name, _) = sched.select(&clock).unwrap();
        assert_eq!(name, "weekly");
    }

    #[test]
    fn test_broadcast_message_carried() {
        let sched = Schedule::compile(
            true,
            false,
            true,
            &lines(&["00:00 day Safe hours", "12:00 night PVP is live"]),
        );
        let clock = FixedClock {
            week: WeekTime(13 * 3600),
            sim: Some(13 * 3600),
        };
        let (_, message) = sched.select(&clock).unwrap();
        assert_eq!(message, "PVP is live");
    }

    #[test]
    fn test_tick_secs_by_mode() {
        let sim = Schedule::compile(true, false, false, &lines(&["00:00 a", "12:00 b"]));
        let real = Schedule::compile(true, true, false, &lines(&["00:00 a", "12:00 b"]));
        assert_eq!(sim.tick_secs(), SIM_TICK_SECS);
        assert_eq!(real.tick_secs(), REALTIME_TICK_SECS);
    }
}
