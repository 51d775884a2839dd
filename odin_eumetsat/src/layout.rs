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

//! time-partitioned directory layout of output artifacts and raw staging files:
//! `<root>/year=YYYY/month=MM/day=DD/time=HH_MM/format=<channel>/<artifact_filename>`

use std::path::{Path,PathBuf};
use chrono::{DateTime, TimeDelta, Utc};

use crate::{Channel, EumetsatConfig};
use crate::time_window::{bucket_key, slot_start};

#[derive(Debug,Clone)]
pub struct OutputLayout {
    root: PathBuf,
    window: TimeDelta,
    artifact_filename: String,
    channels: Vec<Channel>,
}

impl OutputLayout {
    pub fn new (root: impl AsRef<Path>, window: TimeDelta, artifact_filename: impl ToString, channels: Vec<Channel>)->Self {
        OutputLayout {
            root: root.as_ref().to_path_buf(),
            window,
            artifact_filename: artifact_filename.to_string(),
            channels
        }
    }

    pub fn from_config (config: &EumetsatConfig)->Self {
        OutputLayout::new( &config.output_dir, config.window, &config.artifact_filename, config.channels.clone())
    }

    pub fn root (&self)->&Path { &self.root }
    pub fn window (&self)->TimeDelta { self.window }
    pub fn channels (&self)->&[Channel] { &self.channels }

    pub fn month_dir (&self, dt: &DateTime<Utc>)->PathBuf {
        self.root.join( dt.format("year=%Y/month=%m").to_string())
    }

    pub fn day_dir (&self, dt: &DateTime<Utc>)->PathBuf {
        self.root.join( dt.format("year=%Y/month=%m/day=%d").to_string())
    }

    /// the time-bucket directory for `dt`, which is rounded down to the start of its window
    pub fn bucket_dir (&self, dt: &DateTime<Utc>)->PathBuf {
        self.root.join( bucket_key( &slot_start( dt, self.window)))
    }

    pub fn channel_dir (&self, dt: &DateTime<Utc>, channel: &Channel)->PathBuf {
        self.bucket_dir(dt).join( format!("format={}", channel.name))
    }

    pub fn artifact_path (&self, dt: &DateTime<Utc>, channel: &Channel)->PathBuf {
        self.channel_dir( dt, channel).join( &self.artifact_filename)
    }

    /// a bucket is complete iff every configured channel has its artifact. Stops at the first missing one
    pub fn is_bucket_complete (&self, dt: &DateTime<Utc>)->bool {
        let bucket = self.bucket_dir(dt);
        self.channels.iter().all( |c| bucket.join( format!("format={}", c.name)).join( &self.artifact_filename).is_file())
    }

    pub fn missing_channels (&self, dt: &DateTime<Utc>)->Vec<&Channel> {
        self.channels.iter().filter( |c| !self.artifact_path( dt, c).is_file()).collect()
    }
}

/// staging location of raw product files: `<raw_dir>/<collection>/year=YYYY/month=MM/day=DD/time=HH_MM/<filename>`
#[derive(Debug,Clone)]
pub struct StagingLayout {
    root: PathBuf,
    collection_dir: String,
    window: TimeDelta,
}

impl StagingLayout {
    pub fn new (root: impl AsRef<Path>, collection_dir: impl ToString, window: TimeDelta)->Self {
        StagingLayout { root: root.as_ref().to_path_buf(), collection_dir: collection_dir.to_string(), window }
    }

    pub fn from_config (config: &EumetsatConfig)->Self {
        StagingLayout::new( &config.raw_dir, config.collection_dir(), config.window)
    }

    /// the directory all staging dirs are below (we never prune above it)
    pub fn root (&self)->&Path { &self.root }

    pub fn bucket_dir (&self, dt: &DateTime<Utc>)->PathBuf {
        self.root.join( &self.collection_dir).join( bucket_key( &slot_start( dt, self.window)))
    }

    pub fn raw_path (&self, dt: &DateTime<Utc>, filename: &str)->PathBuf {
        self.bucket_dir(dt).join( filename)
    }
}
