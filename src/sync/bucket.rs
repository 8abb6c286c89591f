//! Due-date buckets and the classifier that assigns cards to them.
//!
//! Calendar boundaries (midnight, end of day, Monday-start weeks) are computed
//! in the timezone of the `now` instant handed to [`classify`]. The service
//! passes `chrono::Local::now()`, so boundaries follow the host clock.
//!
//! The next-week window is derived from `now + 7 days` rather than from the
//! end of the current week. Both windows are closed at millisecond precision
//! (`23:59:59.999` / `00:00:00.000`), so a due instant inside the final
//! sub-millisecond of a week belongs to neither and falls through to `Later`.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Due-date category a card is filed under.
///
/// Variants are declared in chronological order; classification never relies
/// on that order, only on the interval a due instant falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Overdue,
    Today,
    Tomorrow,
    ThisWeek,
    NextWeek,
    Later,
}

impl Bucket {
    /// Every bucket, earliest first.
    pub const ALL: [Bucket; 6] = [
        Bucket::Overdue,
        Bucket::Today,
        Bucket::Tomorrow,
        Bucket::ThisWeek,
        Bucket::NextWeek,
        Bucket::Later,
    ];

    /// Environment variable holding the list id for this bucket.
    pub fn env_key(&self) -> &'static str {
        match self {
            Bucket::Overdue => "DUE_SORT_LIST_OVERDUE",
            Bucket::Today => "DUE_SORT_LIST_TODAY",
            Bucket::Tomorrow => "DUE_SORT_LIST_TOMORROW",
            Bucket::ThisWeek => "DUE_SORT_LIST_THIS_WEEK",
            Bucket::NextWeek => "DUE_SORT_LIST_NEXT_WEEK",
            Bucket::Later => "DUE_SORT_LIST_LATER",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Bucket::Overdue => "Overdue",
            Bucket::Today => "Today",
            Bucket::Tomorrow => "Tomorrow",
            Bucket::ThisWeek => "This week",
            Bucket::NextWeek => "Next week",
            Bucket::Later => "Later",
        };
        f.write_str(label)
    }
}

/// A Monday 00:00:00.000 to Sunday 23:59:59.999 window, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WeekWindow {
    /// The Monday-start week containing `date`, with boundaries in `tz`.
    ///
    /// Sunday counts as day 7 of the week that began the previous Monday.
    pub fn containing<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Self {
        let monday = shift_days(date, -i64::from(date.weekday().num_days_from_monday()));
        let sunday = shift_days(monday, 6);
        Self {
            start: start_of_day(tz, monday),
            end: end_of_day(tz, sunday),
        }
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        self.start <= *instant && *instant <= self.end
    }
}

/// Assign a due instant to its bucket relative to `now`.
///
/// First match wins:
/// 1. before today's midnight: `Overdue`
/// 2. `[today 00:00, today 23:59:59.999)`: `Today`
/// 3. `[tomorrow 00:00, tomorrow 23:59:59.999)`: `Tomorrow`
/// 4. `[tomorrow 23:59:59.999, end of this week]`: `ThisWeek`
/// 5. inside the week containing `now + 7 days`: `NextWeek`
/// 6. anything else, including no due date: `Later`
pub fn classify<Tz: TimeZone>(due: Option<&DateTime<Utc>>, now: &DateTime<Tz>) -> Bucket {
    let Some(due) = due else {
        return Bucket::Later;
    };

    let tz = now.timezone();
    let today = now.date_naive();
    let tomorrow = shift_days(today, 1);

    let today_start = start_of_day(&tz, today);
    let today_end = end_of_day(&tz, today);
    let tomorrow_start = start_of_day(&tz, tomorrow);
    let tomorrow_end = end_of_day(&tz, tomorrow);
    let current_week = WeekWindow::containing(&tz, today);
    let next_week = WeekWindow::containing(&tz, shift_days(today, 7));

    if *due < today_start {
        Bucket::Overdue
    } else if *due < today_end {
        Bucket::Today
    } else if tomorrow_start <= *due && *due < tomorrow_end {
        Bucket::Tomorrow
    } else if tomorrow_end <= *due && *due <= current_week.end {
        Bucket::ThisWeek
    } else if next_week.contains(due) {
        Bucket::NextWeek
    } else {
        Bucket::Later
    }
}

/// Local midnight at the start of `date`.
pub fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    local_instant(tz, date.and_time(NaiveTime::MIN))
}

/// Local 23:59:59.999 on `date`.
pub fn end_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    // Wraps around midnight to 23:59:59.999.
    let last_milli = NaiveTime::MIN - TimeDelta::milliseconds(1);
    local_instant(tz, date.and_time(last_milli))
}

/// Resolve a wall-clock time in `tz` to an instant.
///
/// Ambiguous times take the earlier instant. Times skipped by a DST jump
/// resolve to the first valid instant an hour later.
fn local_instant<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            naive
                .checked_add_signed(TimeDelta::hours(1))
                .and_then(|shifted| tz.from_local_datetime(&shifted).earliest())
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(TimeDelta::days(days))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}
