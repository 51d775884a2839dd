/*
 * Copyright © 2025, United States Government, as represented by the Administrator of 
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
#![allow(unused)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde::Deserialize;
use odin_common::datetime::*;

// run with "cargo test --test test_datetime -- --nocapture"

fn utc (y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32)->DateTime<Utc> {
    Utc.with_ymd_and_hms( y, m, d, hh, mm, ss).unwrap()
}

#[test]
fn test_calendar_stepping() {
    let dt = utc( 2020, 12, 31, 13, 47, 12);
    assert_eq!( start_of_day( &dt), utc( 2020, 12, 31, 0, 0, 0));
    assert_eq!( next_month_start( &dt), utc( 2021, 1, 1, 0, 0, 0));
    assert_eq!( next_day_start( &dt), utc( 2021, 1, 1, 0, 0, 0));
    assert_eq!( next_month_start( &utc( 2020, 2, 1, 0, 0, 0)), utc( 2020, 3, 1, 0, 0, 0));
}

#[test]
fn test_floor_ceil() {
    let step = TimeDelta::minutes(15);
    assert_eq!( floor_to( &utc( 2020, 1, 1, 12, 44, 59), step), utc( 2020, 1, 1, 12, 30, 0));
    assert_eq!( floor_to( &utc( 2020, 1, 1, 12, 45, 0), step), utc( 2020, 1, 1, 12, 45, 0));
    assert_eq!( ceil_to( &utc( 2020, 1, 1, 12, 31, 0), step), utc( 2020, 1, 1, 12, 45, 0));
    assert_eq!( ceil_to( &utc( 2020, 1, 1, 23, 50, 0), step), utc( 2020, 1, 2, 0, 0, 0));
}

#[test]
fn test_parse_and_format() {
    assert_eq!( parse_utc_date("2020-01-01"), Some( utc( 2020, 1, 1, 0, 0, 0)));
    assert_eq!( parse_utc_date("2020-13-01"), None);

    assert_eq!( parse_iso_utc("2020-01-01T12:30:09.123Z").map( |dt| dt.timestamp()), Some( utc( 2020, 1, 1, 12, 30, 9).timestamp()));
    assert_eq!( parse_iso_utc("2020-01-01T12:30:09Z"), Some( utc( 2020, 1, 1, 12, 30, 9)));
    assert_eq!( parse_iso_utc("2020-01-01T12:30:09+00:00"), Some( utc( 2020, 1, 1, 12, 30, 9)));
    assert_eq!( parse_iso_utc("yesterday"), None);

    assert_eq!( iso_utc_micros( &utc( 2020, 1, 1, 0, 0, 0)), "2020-01-01T00:00:00.000000Z");
}

#[derive(Deserialize)]
struct Durations {
    #[serde(deserialize_with="deserialize_duration")]
    max_age: std::time::Duration,
    #[serde(deserialize_with="deserialize_time_delta")]
    window: TimeDelta,
}

#[test]
fn test_deserialize_durations() {
    let d: Durations = serde_json::from_str( r#"{"max_age": "50min", "window": "15min"}"#).unwrap();
    assert_eq!( d.max_age, minutes(50));
    assert_eq!( d.window, TimeDelta::minutes(15));
}
