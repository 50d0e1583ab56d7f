//! Auto backup timing

use std::time::Duration;

use crate::config::{BackupIntervalKey, Options};
use crate::error::{Result, TabGroupsError};

const HOUR_SECS: i64 = 60 * 60;
const DAY_SECS: i64 = 24 * HOUR_SECS;

/// Slack added to every wait so the next check lands after the due time
const SLACK_SECS: i64 = 10;

/// What the auto backup timer should do now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupPlan {
    /// A backup is due right away
    pub due_now: bool,
    /// The new backup replaces the previous automatic one
    pub overwrite: bool,
    /// Delay before checking again
    pub next_in: Duration,
}

/// Computes the auto backup plan at `now` (unix seconds)
///
/// Returns `None` when auto backup is disabled. Daily backups with a value
/// of 1 run every two hours and overwrite each other, so the latest state
/// is never more than two hours old.
///
/// # Errors
///
/// Returns [`TabGroupsError::Config`] if the interval value is outside
/// 1 to 20.
pub fn next_backup_plan(options: &Options, now: i64) -> Result<Option<BackupPlan>> {
    if !options.auto_backup_enable {
        return Ok(None);
    }

    let value = options.auto_backup_interval_value;
    if !(1..=20).contains(&value) {
        return Err(TabGroupsError::Config(format!(
            "invalid autoBackupIntervalValue: {value}"
        )));
    }

    let (interval, overwrite) = match options.auto_backup_interval_key {
        BackupIntervalKey::Hours => (HOUR_SECS, false),
        BackupIntervalKey::Days if value == 1 => (2 * HOUR_SECS, true),
        BackupIntervalKey::Days => (DAY_SECS, false),
    };
    let period = i64::from(value) * interval;
    let due_at = options.auto_backup_last_backup_time_stamp + period;

    let (due_now, wait) = if now > due_at {
        (true, period)
    } else {
        (false, due_at - now)
    };

    Ok(Some(BackupPlan {
        due_now,
        overwrite,
        next_in: Duration::from_secs((wait + SLACK_SECS).unsigned_abs()),
    }))
}
