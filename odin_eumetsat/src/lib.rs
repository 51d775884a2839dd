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
#![allow(unused)]
#![doc = include_str!("../doc/odin_eumetsat.md")]

use std::{collections::HashSet, fmt, path::{Path,PathBuf}, time::Duration};
use serde::{Deserialize,Serialize,de::DeserializeOwned};
use chrono::{DateTime, TimeDelta, Utc};
use odin_common::{datetime::{deserialize_duration, deserialize_time_delta, minutes}, fs::filename};

mod errors;
pub use errors::*;

pub mod time_window;
pub use time_window::{TimeRange, Granularity, MinuteFilter};

pub mod layout;
pub use layout::{OutputLayout, StagingLayout};

pub mod gaps;
pub use gaps::{Gap, GapPlanner};

pub mod token;
pub use token::{Credentials, TokenProvider};

pub mod search;
pub use search::SearchClient;

pub mod queue;
pub use queue::{WorkQueue, Task, Ack};

pub mod download;
pub use download::{Downloader, ProductDownloader};

pub mod extract;
pub use extract::{ProductExtractor, ArtifactTarget, GdalExtractor};

pub mod pipeline;
pub use pipeline::{Pipeline, PipelineState, PipelineReport};

/// media type of the sip-entries link that refers to the raw (native format) product payload
pub const RAW_MEDIA_TYPE: &str = "application/octet-stream";

/// load a RON config file
pub fn load_config<C,P> (path: P) -> Result<C> where C: DeserializeOwned, P: AsRef<Path> {
    let data = std::fs::read_to_string( path.as_ref())?;
    Ok( ron::from_str( &data)? )
}

/* #region configuration ****************************************************************************/

/// one named data layer of the product. `band` is the (1-based) raster band index of the layer in the
/// decoded product
#[derive(Debug,Clone,PartialEq,Eq,Hash,Serialize,Deserialize)]
pub struct Channel {
    pub name: String,
    pub band: u32,
}

impl Channel {
    pub fn new (name: impl ToString, band: u32)->Self { Channel { name: name.to_string(), band } }
}

impl fmt::Display for Channel {
    fn fmt (&self, f: &mut fmt::Formatter<'_>)->fmt::Result { write!(f, "{}", self.name) }
}

/// the fixed target grid we resample onto
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct TargetArea {
    pub area_id: String,
    pub epsg: u32,
    /// [west, south, east, north] in target projection units (degrees for EPSG:4326)
    pub extent: [f64;4],
    pub width: u32,
    pub height: u32,
}

impl TargetArea {
    pub fn min_lon (&self)->f64 { self.extent[0] }
    pub fn min_lat (&self)->f64 { self.extent[1] }
    pub fn max_lon (&self)->f64 { self.extent[2] }
    pub fn max_lat (&self)->f64 { self.extent[3] }
}

impl Default for TargetArea {
    fn default()->Self {
        TargetArea {
            area_id: "UK".to_string(),
            epsg: 4326,
            extent: [-12.0, 48.0, 5.0, 61.0],
            width: 500,
            height: 500,
        }
    }
}

/// settings for the default (GDAL tools based) decode-and-resample capability
#[derive(Debug,Clone,Serialize,Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub gdalwarp: String,
    pub gdal_translate: String,
    pub resampling: String,
    /// additional gdal_translate args used to create the per-channel images
    pub translate_args: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default()->Self {
        ExtractorConfig {
            gdalwarp: "gdalwarp".to_string(),
            gdal_translate: "gdal_translate".to_string(),
            resampling: "bilinear".to_string(),
            translate_args: vec!["-ot".to_string(), "Byte".to_string(), "-scale".to_string()],
        }
    }
}

#[derive(Debug,Clone,Deserialize)]
#[serde(default)]
pub struct EumetsatConfig {
    /// product collection we ingest, e.g. "EO:EUM:DAT:MSG:HRSEVIRI"
    pub collection_id: String,
    pub search_url: String,
    pub token_url: String,

    /// number of features per search request
    pub page_size: usize,

    /// time-bucket size (finest gap granularity)
    #[serde(deserialize_with="deserialize_time_delta")]
    pub window: TimeDelta,

    /// minutes of the hour we want windows for. Empty means all
    pub minutes: Vec<u32>,

    /// how long a cached access token is used before it gets refreshed
    #[serde(deserialize_with="deserialize_duration")]
    pub token_max_age: Duration,

    pub download_workers: usize,
    pub extract_workers: usize,

    /// download write buffer size in kB
    pub chunk_size: usize,

    /// staging dir for raw product files (ideally a RAM disk)
    pub raw_dir: PathBuf,
    /// root of the output layout
    pub output_dir: PathBuf,
    pub artifact_filename: String,

    pub channels: Vec<Channel>,
    pub area: TargetArea,
    pub extractor: ExtractorConfig,
}

impl Default for EumetsatConfig {
    fn default()->Self {
        let channels = [
            ("HRV",12), ("VIS006",1), ("VIS008",2), ("IR_016",3), ("IR_039",4), ("WV_062",5),
            ("WV_073",6), ("IR_087",7), ("IR_097",8), ("IR_108",9), ("IR_120",10), ("IR_134",11)
        ].into_iter().map( |(name,band)| Channel::new( name, band)).collect();

        EumetsatConfig {
            collection_id: "EO:EUM:DAT:MSG:HRSEVIRI".to_string(),
            search_url: "https://api.eumetsat.int/data/search-products/os".to_string(),
            token_url: "https://api.eumetsat.int/token".to_string(),
            page_size: 100,
            window: TimeDelta::minutes(15),
            minutes: vec![30],
            token_max_age: minutes(50),
            download_workers: 2,
            extract_workers: 1,
            chunk_size: 1024,
            raw_dir: PathBuf::from("/dev/shm/EUMETSAT/RAW"),
            output_dir: PathBuf::from("./EUMETSAT/UK-EXT"),
            artifact_filename: "img.png".to_string(),
            channels,
            area: TargetArea::default(),
            extractor: ExtractorConfig::default(),
        }
    }
}

impl EumetsatConfig {
    pub fn minute_filter (&self)->MinuteFilter {
        MinuteFilter::new( self.minutes.iter().copied())
    }

    /// capacity of the download (item) queue: about 1.2 x number of download workers
    pub fn item_queue_capacity (&self)->usize {
        self.download_workers + self.download_workers / 5
    }

    /// capacity of the extract (file) queue: about 1.2 x number of extract workers plus some slack
    pub fn file_queue_capacity (&self)->usize {
        self.extract_workers + self.extract_workers / 5 + 2
    }

    /// the collection id as a path element (':' is not portable)
    pub fn collection_dir (&self)->String {
        self.collection_id.replace(':', "_")
    }

    pub fn validate (&self)->Result<()> {
        if self.download_workers == 0 { return Err( config_error!("at least one download worker required")) }
        if self.extract_workers == 0 { return Err( config_error!("at least one extract worker required")) }
        if self.page_size == 0 { return Err( config_error!("page_size has to be positive")) }
        if self.chunk_size == 0 { return Err( config_error!("chunk_size has to be positive")) }

        let window_secs = self.window.num_seconds();
        if window_secs < 60 || 3600 % window_secs != 0 {
            return Err( config_error!("window {} does not evenly divide an hour", self.window))
        }
        if let Some(m) = self.minutes.iter().find( |m| **m >= 60) {
            return Err( config_error!("invalid minute-of-hour {}", m))
        }

        if self.channels.is_empty() { return Err( config_error!("no channels configured")) }
        let mut names: HashSet<&str> = HashSet::new();
        for c in &self.channels {
            if !names.insert( c.name.as_str()) { return Err( config_error!("duplicated channel {}", c.name)) }
        }
        if self.artifact_filename.is_empty() { return Err( config_error!("empty artifact filename")) }

        Ok(())
    }
}

/* #endregion configuration */

/* #region data model *******************************************************************************/

/// download link of a discovered product
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct Link {
    #[serde(rename="mediaType")]
    pub media_type: String,
    pub href: String,
}

/// a remote catalog entry as returned by the product search. `timestamp` is the acquisition time that is
/// used for all downstream indexing
#[derive(Debug,Clone,PartialEq)]
pub struct DiscoveredItem {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub links: Vec<Link>,
}

impl DiscoveredItem {
    /// the first link that refers to a raw binary payload
    pub fn download_link (&self)->Result<&Link> {
        self.links.iter()
            .find( |l| l.media_type == RAW_MEDIA_TYPE)
            .ok_or_else( || OdinEumetsatError::LinkResolutionError( format!("no {} link for item {}", RAW_MEDIA_TYPE, self.id)))
    }
}

impl fmt::Display for DiscoveredItem {
    fn fmt (&self, f: &mut fmt::Formatter<'_>)->fmt::Result {
        write!( f, "{} ({})", self.id, self.timestamp.format("%Y-%m-%dT%H:%M:%S"))
    }
}

/// the materialized bytes of one DiscoveredItem in the staging dir. Note this is not Clone - ownership
/// is transferred from the download stage to the extract stage through the file queue
#[derive(Debug,PartialEq)]
pub struct RawFile {
    pub path: PathBuf,
    pub timestamp: DateTime<Utc>,
    pub item_id: String,
}

impl fmt::Display for RawFile {
    fn fmt (&self, f: &mut fmt::Formatter<'_>)->fmt::Result {
        write!( f, "{}", filename(&self.path).unwrap_or( self.item_id.as_str()))
    }
}

/* #endregion data model */
