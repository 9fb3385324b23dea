
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Calendar day used as the key of a provider's weekly template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        };
        write!(f, "{}", label)
    }
}

/// Weekly template of consultation start times, one sorted set per day.
///
/// The template says nothing about bookings. Whether a declared slot is
/// actually free on a given date is decided against the appointment ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklySchedule {
    slots: BTreeMap<DayOfWeek, BTreeSet<NaiveTime>>,
}

impl WeeklySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used by fixtures and tests.
    pub fn with(mut self, day: DayOfWeek, times: &[NaiveTime]) -> Self {
        for time in times {
            self.declare(day, *time);
        }
        self
    }

    /// Adds a start time to the template. Re-declaring is a no-op.
    pub fn declare(&mut self, day: DayOfWeek, time: NaiveTime) {
        self.slots.entry(day).or_default().insert(time);
    }

    /// Removes a start time. Returns whether it was present.
    pub fn withdraw(&mut self, day: DayOfWeek, time: NaiveTime) -> bool {
        match self.slots.get_mut(&day) {
            Some(times) => {
                let removed = times.remove(&time);
                if times.is_empty() {
                    self.slots.remove(&day);
                }
                removed
            }
            None => false,
        }
    }

    pub fn is_declared(&self, day: DayOfWeek, time: NaiveTime) -> bool {
        self.slots
            .get(&day)
            .map(|times| times.contains(&time))
            .unwrap_or(false)
    }

    /// Start times declared for a day, in ascending order.
    pub fn slots_for(&self, day: DayOfWeek) -> impl Iterator<Item = NaiveTime> + '_ {
        self.slots.get(&day).into_iter().flatten().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn total_slots(&self) -> usize {
        self.slots.values().map(BTreeSet::len).sum()
    }
}
