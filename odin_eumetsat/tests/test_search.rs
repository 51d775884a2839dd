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

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use wiremock::{Mock, MockServer, ResponseTemplate, matchers::{method, path, query_param}};
use odin_eumetsat::{DiscoveredItem, Link, MinuteFilter, OdinEumetsatError, SearchClient, TimeRange, RAW_MEDIA_TYPE};
use odin_eumetsat::search::accepts_item;

// run with "cargo test --test test_search -- --nocapture"

const COLLECTION: &str = "EO:EUM:DAT:MSG:HRSEVIRI";

fn utc (y: i32, m: u32, d: u32, hh: u32, mm: u32)->DateTime<Utc> {
    Utc.with_ymd_and_hms( y, m, d, hh, mm, 0).unwrap()
}

fn feature (i: usize)->Value {
    let dt = utc(2020,1,1,0,0) + TimeDelta::minutes( 15 * i as i64);
    json!({
        "id": format!("MSG4-SEVI-{i}"),
        "properties": {
            "date": format!("{}/{}", dt.format("%Y-%m-%dT%H:%M:%S%.3fZ"), (dt + TimeDelta::minutes(12)).format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            "links": {
                "sip-entries": [
                    { "mediaType": "application/xml", "href": format!("https://archive/{i}/metadata") },
                    { "mediaType": "application/octet-stream", "href": format!("https://archive/{i}/data") }
                ]
            }
        }
    })
}

fn page (total: usize, features: std::ops::Range<usize>)->Value {
    json!({
        "type": "FeatureCollection",
        "properties": { "totalResults": total },
        "features": features.map( feature).collect::<Vec<Value>>()
    })
}

fn client (server: &MockServer)->SearchClient {
    SearchClient::new( Client::new(), format!("{}/search", server.uri()), COLLECTION, 100)
}

fn month ()->TimeRange { TimeRange::new( utc(2020,1,1,0,0), utc(2020,2,1,0,0)).unwrap() }

#[tokio::test]
async fn test_pagination() {
    let server = MockServer::start().await;
    for (offset, features) in [(0, 0..100), (100, 100..200), (200, 200..250)] {
        Mock::given( method("GET")).and( path("/search"))
            .and( query_param("format", "json"))
            .and( query_param("pi", COLLECTION))
            .and( query_param("c", "100"))
            .and( query_param("si", offset.to_string()))
            .and( query_param("dtstart", "2020-01-01T00:00:00.000000Z"))
            .and( query_param("dtend", "2020-02-01T00:00:00.000000Z"))
            .respond_with( ResponseTemplate::new(200).set_body_json( page( 250, features)))
            .expect(1)
            .mount( &server).await;
    }

    let outcome = client( &server).search( &month()).await;
    assert!( outcome.is_complete());
    assert_eq!( outcome.n_requests, 3);
    assert_eq!( outcome.items.len(), 250);
    assert_eq!( outcome.items[0].id, "MSG4-SEVI-0");
    assert_eq!( outcome.items[2].timestamp, utc(2020,1,1,0,30));
    // expectations are verified when the server is dropped
}

#[tokio::test]
async fn test_partial_result() {
    let server = MockServer::start().await;
    Mock::given( method("GET")).and( path("/search")).and( query_param("si", "0"))
        .respond_with( ResponseTemplate::new(200).set_body_json( page( 250, 0..100)))
        .expect(1)
        .mount( &server).await;
    Mock::given( method("GET")).and( path("/search")).and( query_param("si", "100"))
        .respond_with( ResponseTemplate::new(500).set_body_string("backend down"))
        .expect(1)
        .mount( &server).await;
    Mock::given( method("GET")).and( path("/search")).and( query_param("si", "200"))
        .respond_with( ResponseTemplate::new(200).set_body_json( page( 250, 200..250)))
        .expect(0)
        .mount( &server).await;

    let outcome = client( &server).search( &month()).await;
    assert!( !outcome.is_complete());
    assert!( matches!( outcome.error, Some(OdinEumetsatError::DiscoveryError(_))));
    assert_eq!( outcome.n_requests, 2);
    assert_eq!( outcome.items.len(), 100);
}

#[tokio::test]
async fn test_empty_result() {
    let server = MockServer::start().await;
    Mock::given( method("GET")).and( path("/search"))
        .respond_with( ResponseTemplate::new(200).set_body_json( page( 0, 0..0)))
        .expect(1)
        .mount( &server).await;

    let outcome = client( &server).search( &month()).await;
    assert!( outcome.is_complete());
    assert!( outcome.items.is_empty());
}

#[tokio::test]
async fn test_malformed_response() {
    let server = MockServer::start().await;
    Mock::given( method("GET")).and( path("/search"))
        .respond_with( ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount( &server).await;

    let outcome = client( &server).search( &month()).await;
    assert!( matches!( outcome.error, Some(OdinEumetsatError::DiscoveryError(_))));
    assert!( outcome.items.is_empty());
}

fn item (id: &str, dt: DateTime<Utc>, media_types: &[&str])->DiscoveredItem {
    let links = media_types.iter().map( |mt| Link { media_type: mt.to_string(), href: format!("https://archive/{id}/{mt}") }).collect();
    DiscoveredItem { id: id.to_string(), timestamp: dt, links }
}

#[test]
fn test_link_resolution() {
    let it = item( "a", utc(2020,1,1,12,30), &["application/xml", RAW_MEDIA_TYPE, RAW_MEDIA_TYPE]);
    assert_eq!( it.download_link().unwrap().href, format!("https://archive/a/{RAW_MEDIA_TYPE}"));

    let it = item( "b", utc(2020,1,1,12,30), &["application/xml"]);
    assert!( matches!( it.download_link(), Err(OdinEumetsatError::LinkResolutionError(_))));
}

#[test]
fn test_item_filter() {
    let filter = MinuteFilter::new([30]);
    let at = |mm, ss| Utc.with_ymd_and_hms( 2020,1,1,12,mm,ss).unwrap();

    assert!( accepts_item( &item( "a", at(30,9), &[]), &filter));
    assert!( accepts_item( &item( "b", at(30,59), &[]), &filter));
    assert!( !accepts_item( &item( "c", at(40,9), &[]), &filter)); // in the 12:30 window but acquired at :40
    assert!( !accepts_item( &item( "d", at(0,9), &[]), &filter));
    assert!( !accepts_item( &item( "e", at(45,0), &[]), &filter));

    assert!( accepts_item( &item( "f", at(40,9), &[]), &MinuteFilter::all()));
}
