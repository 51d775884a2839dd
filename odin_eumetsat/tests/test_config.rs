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

use std::{fs, sync::Arc};
use chrono::{TimeDelta, TimeZone, Utc};
use reqwest::Client;
use odin_common::datetime::minutes;
use odin_eumetsat::{load_config, Channel, Credentials, Downloader, EumetsatConfig, GdalExtractor, OdinEumetsatError,
                    Pipeline, SearchClient, TimeRange, TokenProvider};

// run with "cargo test --test test_config -- --nocapture"

#[test]
fn test_defaults() {
    let config = EumetsatConfig::default();
    assert!( config.validate().is_ok());

    assert_eq!( config.channels.len(), 12);
    assert_eq!( config.channels[0], Channel::new("HRV", 12));
    assert_eq!( config.window, TimeDelta::minutes(15));
    assert_eq!( config.minutes, vec![30]);
    assert_eq!( config.collection_dir(), "EO_EUM_DAT_MSG_HRSEVIRI");
    assert!( config.minute_filter().accepts( &Utc.with_ymd_and_hms( 2020,1,1,12,30,0).unwrap()));
    assert!( !config.minute_filter().accepts( &Utc.with_ymd_and_hms( 2020,1,1,12,45,0).unwrap()));

    assert_eq!( config.item_queue_capacity(), 2);
    assert_eq!( config.file_queue_capacity(), 3);
}

#[test]
fn test_queue_capacities() {
    let config = EumetsatConfig { download_workers: 10, extract_workers: 5, ..EumetsatConfig::default() };
    assert_eq!( config.item_queue_capacity(), 12);
    assert_eq!( config.file_queue_capacity(), 8);
}

#[test]
fn test_shipped_config() {
    // tests run in the crate dir
    let config: EumetsatConfig = load_config( "configs/eumetsat.ron").unwrap();
    let default = EumetsatConfig::default();

    assert!( config.validate().is_ok());
    assert_eq!( config.collection_id, default.collection_id);
    assert_eq!( config.window, default.window);
    assert_eq!( config.token_max_age, minutes(50));
    assert_eq!( config.channels, default.channels);
    assert_eq!( config.area, default.area);
    assert_eq!( config.extractor.translate_args, default.extractor.translate_args);
}

#[test]
fn test_partial_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.ron");
    fs::write( &path, r#"EumetsatConfig( download_workers: 4, window: "30min", minutes: [0, 30] )"#).unwrap();

    let config: EumetsatConfig = load_config( &path).unwrap();
    assert_eq!( config.download_workers, 4);
    assert_eq!( config.window, TimeDelta::minutes(30));
    assert_eq!( config.minutes, vec![0, 30]);
    assert_eq!( config.extract_workers, 1); // default
    assert_eq!( config.channels.len(), 12);
    assert!( config.validate().is_ok());
}

#[test]
fn test_malformed_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.ron");
    fs::write( &path, "EumetsatConfig( download_workers: \"many\" )").unwrap();

    let res: odin_eumetsat::Result<EumetsatConfig> = load_config( &path);
    assert!( matches!( res, Err(OdinEumetsatError::ConfigParseError(_))));

    let res: odin_eumetsat::Result<EumetsatConfig> = load_config( dir.path().join("missing.ron"));
    assert!( matches!( res, Err(OdinEumetsatError::IOError(_))));
}

#[test]
fn test_invalid_config() {
    let invalid = [
        EumetsatConfig { download_workers: 0, ..EumetsatConfig::default() },
        EumetsatConfig { extract_workers: 0, ..EumetsatConfig::default() },
        EumetsatConfig { page_size: 0, ..EumetsatConfig::default() },
        EumetsatConfig { window: TimeDelta::minutes(7), ..EumetsatConfig::default() },
        EumetsatConfig { window: TimeDelta::seconds(30), ..EumetsatConfig::default() },
        EumetsatConfig { minutes: vec![15, 60], ..EumetsatConfig::default() },
        EumetsatConfig { channels: vec![], ..EumetsatConfig::default() },
        EumetsatConfig { channels: vec![ Channel::new("IR_108", 9), Channel::new("IR_108", 10)], ..EumetsatConfig::default() },
        EumetsatConfig { artifact_filename: String::new(), ..EumetsatConfig::default() },
    ];

    for config in invalid {
        let res = config.validate();
        assert!( matches!( res, Err(OdinEumetsatError::ConfigError(_))), "accepted {:?}", config);
    }
}

#[test]
fn test_pipeline_rejects_invalid_setup() {
    let client = Client::new();
    let range = TimeRange::new( Utc.with_ymd_and_hms( 2020,1,1,0,0,0).unwrap(), Utc.with_ymd_and_hms( 2020,1,2,0,0,0).unwrap()).unwrap();
    let empty = TimeRange::new( range.start, range.start).unwrap();

    let make = |config: EumetsatConfig, range: TimeRange| {
        let tokens = Arc::new( TokenProvider::new( client.clone(), &config.token_url, Credentials::new("k", "s"), config.token_max_age));
        let search = SearchClient::from_config( client.clone(), &config);
        let downloader = Arc::new( Downloader::from_config( client.clone(), tokens, &config));
        let extractor = Arc::new( GdalExtractor::from_config( &config));
        Pipeline::new( config, range, search, downloader, extractor)
    };

    assert!( make( EumetsatConfig::default(), range).is_ok());
    assert!( make( EumetsatConfig::default(), empty).is_err());
    assert!( make( EumetsatConfig { download_workers: 0, ..EumetsatConfig::default() }, range).is_err());
}
