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

//! detection of missing output. The planner works top down: months without a month directory are
//! reported as a whole, existing months are split into days, and only existing days are checked
//! window by window for missing channel artifacts

use std::{collections::VecDeque, fmt, iter::FusedIterator};
use serde::Serialize;

use crate::layout::OutputLayout;
use crate::time_window::{day_ranges, month_ranges, window_ranges, Granularity, MinuteFilter, TimeRange};

/// a time range with missing output and the level at which it was detected
#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,Serialize)]
pub struct Gap {
    pub granularity: Granularity,
    pub range: TimeRange,
}

impl Gap {
    pub fn new (granularity: Granularity, range: TimeRange)->Self { Gap { granularity, range } }
}

impl fmt::Display for Gap {
    fn fmt (&self, f: &mut fmt::Formatter<'_>)->fmt::Result {
        write!( f, "{:6} {}", self.granularity.to_string(), self.range)
    }
}

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
enum Phase { Months, Days, Windows, Done }

/// lazy, single pass iterator over the gaps of a time range. Storage is only inspected when the next
/// gap is requested. All month gaps come first, then day gaps, then window gaps (each in ascending order)
pub struct GapPlanner {
    layout: OutputLayout,
    filter: MinuteFilter,
    phase: Phase,
    pending: VecDeque<TimeRange>, // input ranges of the current phase
    present: Vec<TimeRange>,      // ranges of the current phase that have to be refined
    windows: VecDeque<TimeRange>, // windows of the day currently checked
}

impl GapPlanner {
    pub fn new (range: TimeRange, layout: OutputLayout, filter: MinuteFilter)->Self {
        GapPlanner {
            layout,
            filter,
            phase: Phase::Months,
            pending: month_ranges( range).collect(),
            present: Vec::new(),
            windows: VecDeque::new(),
        }
    }

    pub fn layout (&self)->&OutputLayout { &self.layout }
}

impl Iterator for GapPlanner {
    type Item = Gap;

    fn next (&mut self)->Option<Gap> {
        loop {
            match self.phase {
                Phase::Months => {
                    if let Some(month) = self.pending.pop_front() {
                        if self.layout.month_dir( &month.start).is_dir() {
                            self.present.push( month)
                        } else {
                            return Some( Gap::new( Granularity::Month, month))
                        }
                    } else {
                        self.pending = self.present.drain(..).flat_map( day_ranges).collect();
                        self.phase = Phase::Days;
                    }
                }
                Phase::Days => {
                    if let Some(day) = self.pending.pop_front() {
                        if self.layout.day_dir( &day.start).is_dir() {
                            self.present.push( day)
                        } else {
                            return Some( Gap::new( Granularity::Day, day))
                        }
                    } else {
                        self.pending = self.present.drain(..).collect();
                        self.phase = Phase::Windows;
                    }
                }
                Phase::Windows => {
                    if let Some(window) = self.windows.pop_front() {
                        if self.filter.accepts( &window.start) && !self.layout.is_bucket_complete( &window.start) {
                            return Some( Gap::new( Granularity::Window, window))
                        }
                    } else if let Some(day) = self.pending.pop_front() {
                        self.windows.extend( window_ranges( day, self.layout.window()));
                    } else {
                        self.phase = Phase::Done;
                    }
                }
                Phase::Done => return None
            }
        }
    }
}

impl FusedIterator for GapPlanner {}
