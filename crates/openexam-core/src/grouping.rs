//! Bucketing of files by creation date for list views.
//!
//! Boundaries are calendar aligned in UTC: weeks start on Sunday 00:00 and
//! months on the first day at 00:00. A file lands in the first bucket whose
//! boundary it is at or after, so "this week" never repeats "today".

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::models::FileRecord;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateGroups {
    pub today: Vec<FileRecord>,
    pub this_week: Vec<FileRecord>,
    pub this_month: Vec<FileRecord>,
    pub older: Vec<FileRecord>,
}

impl DateGroups {
    pub fn is_empty(&self) -> bool {
        self.today.is_empty()
            && self.this_week.is_empty()
            && self.this_month.is_empty()
            && self.older.is_empty()
    }

    /// Non-empty groups with their display labels, newest first.
    pub fn labelled(&self) -> Vec<(&'static str, &[FileRecord])> {
        [
            ("Today", self.today.as_slice()),
            ("This week", self.this_week.as_slice()),
            ("This month", self.this_month.as_slice()),
            ("Older", self.older.as_slice()),
        ]
        .into_iter()
        .filter(|(_, files)| !files.is_empty())
        .collect()
    }
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Group files into today / this week / this month / older relative to `now`.
///
/// Input order is preserved within each bucket.
pub fn group_files_by_date(files: &[FileRecord], now: DateTime<Utc>) -> DateGroups {
    let today = now.date_naive();
    let today_start = start_of(today);
    let week_start = start_of(today - Days::new(u64::from(today.weekday().num_days_from_sunday())));
    let month_start = start_of(today - Days::new(u64::from(today.day0())));

    let mut groups = DateGroups::default();
    for file in files {
        let created = file.created_at;
        let bucket = if created >= today_start {
            &mut groups.today
        } else if created >= week_start {
            &mut groups.this_week
        } else if created >= month_start {
            &mut groups.this_month
        } else {
            &mut groups.older
        };
        bucket.push(file.clone());
    }
    groups
}
