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

//! paginated product search (OpenSearch endpoint of the archive)

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use odin_common::net::from_json;

use crate::{DiscoveredItem, EumetsatConfig, Link, OdinEumetsatError};
use crate::errors::{Result, discovery_error};
use crate::time_window::{parse_product_date, query_time, MinuteFilter, TimeRange};

/* #region response model ***************************************************************************/

#[derive(Deserialize,Debug)]
struct SearchResponse {
    properties: SearchProperties,
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize,Debug)]
struct SearchProperties {
    #[serde(rename="totalResults")]
    total_results: usize,
}

#[derive(Deserialize,Debug)]
struct Feature {
    #[serde(default)]
    id: Option<String>,
    properties: FeatureProperties,
}

#[derive(Deserialize,Debug)]
struct FeatureProperties {
    date: String,
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default)]
    links: FeatureLinks,
}

#[derive(Deserialize,Debug,Default)]
struct FeatureLinks {
    #[serde(rename="sip-entries", default)]
    sip_entries: Vec<Link>,
}

impl Feature {
    fn into_item (self)->Option<DiscoveredItem> {
        let timestamp = parse_product_date( &self.properties.date)?;
        let id = self.id.or( self.properties.identifier).unwrap_or( self.properties.date);
        Some( DiscoveredItem { id, timestamp, links: self.properties.links.sip_entries } )
    }
}

/* #endregion response model */

/// the result of searching one time range. `error` is set if pagination was aborted, in which case `items`
/// holds what was collected before the failure
#[derive(Debug)]
pub struct SearchOutcome {
    pub items: Vec<DiscoveredItem>,
    pub n_requests: usize,
    pub error: Option<OdinEumetsatError>,
}

impl SearchOutcome {
    pub fn is_complete (&self)->bool { self.error.is_none() }
}

pub struct SearchClient {
    client: Client,
    url: String,
    collection_id: String,
    page_size: usize,
}

impl SearchClient {
    pub fn new (client: Client, url: impl ToString, collection_id: impl ToString, page_size: usize)->Self {
        SearchClient { client, url: url.to_string(), collection_id: collection_id.to_string(), page_size: page_size.max(1) }
    }

    pub fn from_config (client: Client, config: &EumetsatConfig)->Self {
        SearchClient::new( client, &config.search_url, &config.collection_id, config.page_size)
    }

    /// get all items of `range`, page by page until the reported total is reached. A failed page request ends
    /// the search and returns the partial result
    pub async fn search (&self, range: &TimeRange)->SearchOutcome {
        let mut items: Vec<DiscoveredItem> = Vec::new();
        let mut offset: usize = 0;
        let mut total: usize = 1;
        let mut n_requests: usize = 0;

        while offset < total {
            n_requests += 1;
            match self.get_page( range, offset).await {
                Ok(page) => {
                    total = page.properties.total_results;
                    let n_features = page.features.len();
                    for feature in page.features {
                        let date = feature.properties.date.clone();
                        match feature.into_item() {
                            Some(item) => items.push( item),
                            None => warn!("ignoring product with unparsable date {}", date)
                        }
                    }
                    if n_features == 0 { break } // server total is off, don't loop on empty pages
                    offset += self.page_size;
                }
                Err(e) => {
                    warn!("search for {} aborted at offset {}: {}", range, offset, e);
                    return SearchOutcome { items, n_requests, error: Some(e) }
                }
            }
        }

        debug!("search for {} returned {} items in {} requests", range, items.len(), n_requests);
        SearchOutcome { items, n_requests, error: None }
    }

    async fn get_page (&self, range: &TimeRange, offset: usize)->Result<SearchResponse> {
        let query = [
            ("format", "json".to_string()),
            ("pi", self.collection_id.clone()),
            ("c", self.page_size.to_string()),
            ("si", offset.to_string()),
            ("dtstart", query_time( &range.start)),
            ("dtend", query_time( &range.end)),
        ];

        let response = self.client.get( &self.url).query( &query).send().await.map_err( discovery_error)?;
        let status = response.status();
        if !status.is_success() {
            let msg = response.text().await.unwrap_or_default();
            return Err( discovery_error( format!("status {} for offset {}: {}", status, offset, msg)))
        }

        from_json( response).await.map_err( discovery_error)
    }
}

/// client side hour-of-interest filter on the item's own acquisition time. The search endpoint is coarser
/// than our windows
pub fn accepts_item (item: &DiscoveredItem, filter: &MinuteFilter)->bool {
    filter.accepts( &item.timestamp)
}
