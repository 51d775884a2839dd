/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike, Utc};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use parse_duration::parse;

// simple Duration ctors that do not require the experimental std minute/hour ctors
#[inline] pub fn secs (n: u64)->Duration { Duration::from_secs(n) }
#[inline] pub fn minutes (n: u64)->Duration { Duration::from_secs(n * 60) }

/* #region calendar stepping ************************************************************************/

/// midnight (UTC) of the day that contains `dt`
pub fn start_of_day (dt: &DateTime<Utc>)->DateTime<Utc> {
    dt.date_naive().and_time( NaiveTime::MIN).and_utc()
}

/// midnight (UTC) of the first day of the month following the one that contains `dt`
pub fn next_month_start (dt: &DateTime<Utc>)->DateTime<Utc> {
    let (year, month) = if dt.month() == 12 { (dt.year() + 1, 1) } else { (dt.year(), dt.month() + 1) };
    match NaiveDate::from_ymd_opt( year, month, 1) {
        Some(nd) => nd.and_time( NaiveTime::MIN).and_utc(),
        None => DateTime::<Utc>::MAX_UTC
    }
}

/// midnight (UTC) of the day following the one that contains `dt`
pub fn next_day_start (dt: &DateTime<Utc>)->DateTime<Utc> {
    start_of_day(dt) + TimeDelta::days(1)
}

/// round `dt` down to the closest multiple of `step` since midnight of its day.
/// `step` has to be positive and should evenly divide a day
pub fn floor_to (dt: &DateTime<Utc>, step: TimeDelta)->DateTime<Utc> {
    let day = start_of_day(dt);
    let step_secs = step.num_seconds().max(1);
    let elapsed = (*dt - day).num_seconds();
    day + TimeDelta::seconds( (elapsed / step_secs) * step_secs)
}

/// round `dt` up to the closest multiple of `step` since midnight of its day
pub fn ceil_to (dt: &DateTime<Utc>, step: TimeDelta)->DateTime<Utc> {
    let floor = floor_to( dt, step);
    if floor == *dt { floor } else { floor + step }
}

/* #endregion calendar stepping */

/* #region parsing and formatting *******************************************************************/

/// parse a `YYYY-MM-DD` date into a DateTime<Utc> at midnight UTC
pub fn parse_utc_date (s: &str)->Option<DateTime<Utc>> {
    NaiveDate::parse_from_str( s.trim(), "%Y-%m-%d").ok()
        .map( |nd| nd.and_time( NaiveTime::MIN).and_utc())
}

/// parse ISO 8601 UTC timestamps with or without fractional seconds (e.g. `2020-01-01T12:30:00.123Z`
/// or `2020-01-01T12:30:00Z`). Falls back to RFC 3339 with explicit offsets
pub fn parse_iso_utc (s: &str)->Option<DateTime<Utc>> {
    let s = s.trim();
    NaiveDateTime::parse_from_str( s, "%Y-%m-%dT%H:%M:%S%.fZ")
        .or_else( |_| NaiveDateTime::parse_from_str( s, "%Y-%m-%dT%H:%M:%SZ"))
        .map( |ndt| ndt.and_utc())
        .ok()
        .or_else( || DateTime::parse_from_rfc3339(s).ok().map( |dt| dt.to_utc()))
}

/// ISO 8601 with microseconds and 'Z' suffix, e.g. `2020-01-01T00:00:00.000000Z`
pub fn iso_utc_micros (dt: &DateTime<Utc>)->String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/* #endregion parsing and formatting */

/* #region serde support ****************************************************************************/

/// deserialize human readable durations such as "15m", "50min" or "2h 30min"
pub fn deserialize_duration <'a,D>(deserializer: D) -> Result<Duration,D::Error>
    where D: Deserializer<'a>
{
    String::deserialize(deserializer).and_then( |string| {
        parse(string.as_str())
            .map_err( |e| serde::de::Error::custom(format!("{:?}",e)))
    })
}

/// deserialize a duration and convert it into a chrono TimeDelta
pub fn deserialize_time_delta <'a,D>(deserializer: D) -> Result<TimeDelta,D::Error>
    where D: Deserializer<'a>
{
    let dur = deserialize_duration(deserializer)?;
    TimeDelta::from_std(dur).map_err( |e| serde::de::Error::custom(e.to_string()))
}

/* #endregion serde support */
