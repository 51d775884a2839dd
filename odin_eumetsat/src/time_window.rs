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

//! hierarchical (month / day / sub-day window) decomposition of time intervals

use std::{collections::BTreeSet, fmt};
use chrono::{DateTime, TimeDelta, Timelike, Utc};
use serde::{Serialize,Deserialize};
use odin_common::datetime::{ceil_to, floor_to, iso_utc_micros, next_day_start, next_month_start, parse_iso_utc};

use crate::errors::{Result, op_failed};

/// half-open time interval `[start, end)` with `start <= end`
#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,PartialOrd,Ord,Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new (start: DateTime<Utc>, end: DateTime<Utc>)->Result<Self> {
        if start <= end {
            Ok( TimeRange{ start, end } )
        } else {
            Err( op_failed!("invalid time range: {} > {}", start, end))
        }
    }

    pub fn contains (&self, dt: &DateTime<Utc>)->bool {
        *dt >= self.start && *dt < self.end
    }

    pub fn is_empty (&self)->bool { self.start == self.end }

    pub fn duration (&self)->TimeDelta { self.end - self.start }

    /// the part of `self` that overlaps with `other` (if any)
    pub fn intersect (&self, other: &TimeRange)->Option<TimeRange> {
        let start = self.start.max( other.start);
        let end = self.end.min( other.end);
        if start < end { Some( TimeRange{start,end}) } else { None }
    }
}

impl fmt::Display for TimeRange {
    fn fmt (&self, f: &mut fmt::Formatter<'_>)->fmt::Result {
        write!( f, "[{}, {})", self.start.format("%Y-%m-%dT%H:%M"), self.end.format("%Y-%m-%dT%H:%M"))
    }
}

/// the level of the output hierarchy a TimeRange refers to
#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,Serialize)]
pub enum Granularity { Month, Day, Window }

impl fmt::Display for Granularity {
    fn fmt (&self, f: &mut fmt::Formatter<'_>)->fmt::Result {
        match self {
            Granularity::Month => write!(f, "month"),
            Granularity::Day => write!(f, "day"),
            Granularity::Window => write!(f, "window"),
        }
    }
}

/* #region interval decomposition *******************************************************************/

/// split `range` at the boundaries computed by `next`, clipping the first and last segment to `range`
fn split_at<F> (range: TimeRange, next: F)->impl Iterator<Item=TimeRange>
    where F: Fn(&DateTime<Utc>)->DateTime<Utc>
{
    let end = range.end;
    let mut t = range.start;

    std::iter::from_fn( move || {
        if t < end {
            let t_next = next(&t).min(end);
            let r = TimeRange{ start: t, end: t_next };
            t = t_next;
            Some(r)
        } else {
            None
        }
    })
}

/// calendar months in `range` (first and last month clipped to the range)
pub fn month_ranges (range: TimeRange)->impl Iterator<Item=TimeRange> {
    split_at( range, next_month_start)
}

/// calendar days in `range` (first and last day clipped to the range)
pub fn day_ranges (range: TimeRange)->impl Iterator<Item=TimeRange> {
    split_at( range, next_day_start)
}

/// fixed size windows aligned to multiples of `window` since midnight. Only windows that start within `range`
/// are included and the last one is clipped to the range end
pub fn window_ranges (range: TimeRange, window: TimeDelta)->impl Iterator<Item=TimeRange> {
    let end = range.end;
    let mut t = ceil_to( &range.start, window);

    std::iter::from_fn( move || {
        if t < end {
            let r = TimeRange{ start: t, end: (t + window).min(end) };
            t = t + window;
            Some(r)
        } else {
            None
        }
    })
}

/// start of the time-bucket (window) that contains `dt`
#[inline]
pub fn slot_start (dt: &DateTime<Utc>, window: TimeDelta)->DateTime<Utc> {
    floor_to( dt, window)
}

/* #endregion interval decomposition */

/* #region hour-of-interest filter ******************************************************************/

/// predicate on the minute-of-hour of window start times. An empty filter accepts all minutes
#[derive(Debug,Clone,Default,PartialEq,Eq,Serialize,Deserialize)]
pub struct MinuteFilter {
    minutes: BTreeSet<u32>
}

impl MinuteFilter {
    pub fn new (minutes: impl IntoIterator<Item=u32>)->Self {
        MinuteFilter { minutes: minutes.into_iter().collect() }
    }

    pub fn all ()->Self { MinuteFilter::default() }

    pub fn accepts (&self, dt: &DateTime<Utc>)->bool {
        self.minutes.is_empty() || self.minutes.contains( &dt.minute())
    }

    pub fn minutes (&self)->impl Iterator<Item=&u32> { self.minutes.iter() }
}

/* #endregion hour-of-interest filter */

/* #region product time formats *********************************************************************/

/// timestamp format used in search queries (`dtstart`, `dtend`)
pub fn query_time (dt: &DateTime<Utc>)->String {
    iso_utc_micros(dt)
}

/// acquisition time of a product from its `date` property, which is an interval `<start>/<end>`
pub fn parse_product_date (date: &str)->Option<DateTime<Utc>> {
    date.split('/').next().and_then( parse_iso_utc)
}

/// the time-bucket key used in output and staging paths, e.g. `year=2020/month=01/day=01/time=12_30`
pub fn bucket_key (slot: &DateTime<Utc>)->String {
    slot.format("year=%Y/month=%m/day=%d/time=%H_%M").to_string()
}

/* #endregion product time formats */
