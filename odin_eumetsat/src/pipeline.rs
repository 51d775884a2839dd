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

//! the coordinator that wires planner, search, download and extract stages together.
//!
//! A run goes through `Idle -> Planning -> Draining -> ShuttingDown -> Done`:
//! all workers are started when leaving `Idle`. `Planning` feeds the item queue from the gap planner until
//! it is exhausted. `Draining` pushes one stop marker per download worker, waits until the item queue has
//! no pending task and then joins the download workers. `ShuttingDown` pushes one stop marker per extract
//! worker and joins them

use std::{collections::HashSet, fmt, sync::Arc};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{Credentials, DiscoveredItem, EumetsatConfig, RawFile};
use crate::download::{spawn_download_workers, Downloader, WorkerReport};
use crate::errors::{Result, config_error, op_failed};
use crate::extract::{spawn_extract_workers, ExtractContext, GdalExtractor, ProductExtractor};
use crate::gaps::GapPlanner;
use crate::layout::{OutputLayout, StagingLayout};
use crate::queue::WorkQueue;
use crate::search::{accepts_item, SearchClient};
use crate::time_window::{bucket_key, slot_start, TimeRange};
use crate::token::TokenProvider;

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum PipelineState { Idle, Planning, Draining, ShuttingDown, Done }

#[derive(Debug,Clone,Default)]
pub struct PipelineReport {
    pub n_gaps: usize,
    pub n_incomplete_searches: usize,
    pub n_discovered: usize,
    pub n_filtered: usize,
    /// items of a time-bucket that an earlier item of this run already claimed
    pub n_duplicates: usize,
    pub n_already_complete: usize,
    pub n_queued: usize,

    /// tasks of the item queue that were not acknowledged after draining (0 unless something is broken)
    pub items_pending_after_drain: usize,
    /// stop markers consumed from the item queue
    pub item_stops_taken: usize,

    pub download_workers: Vec<WorkerReport>,
    pub extract_workers: Vec<WorkerReport>,
}

impl PipelineReport {
    pub fn n_downloaded (&self)->usize { self.download_workers.iter().map( |r| r.n_done).sum() }
    pub fn n_download_failures (&self)->usize { self.download_workers.iter().map( |r| r.n_failed).sum() }
    pub fn n_extracted (&self)->usize { self.extract_workers.iter().map( |r| r.n_done).sum() }
    pub fn n_extract_failures (&self)->usize { self.extract_workers.iter().map( |r| r.n_failed).sum() }

    /// number of extract workers that terminated on a stop marker
    pub fn n_extract_workers_stopped (&self)->usize { self.extract_workers.iter().filter( |r| r.stopped).count() }
}

impl fmt::Display for PipelineReport {
    fn fmt (&self, f: &mut fmt::Formatter<'_>)->fmt::Result {
        write!( f, "gaps: {}, discovered: {}, queued: {}, downloaded: {} ({} failed), extracted: {} ({} failed)",
            self.n_gaps, self.n_discovered, self.n_queued,
            self.n_downloaded(), self.n_download_failures(),
            self.n_extracted(), self.n_extract_failures())
    }
}

pub struct Pipeline {
    config: EumetsatConfig,
    range: TimeRange,
    search: SearchClient,
    downloader: Arc<Downloader>,
    extractor: Arc<dyn ProductExtractor>,
    state: PipelineState,
}

impl Pipeline {
    pub fn new (config: EumetsatConfig, range: TimeRange, search: SearchClient, downloader: Arc<Downloader>,
                extractor: Arc<dyn ProductExtractor>)->Result<Self>
    {
        config.validate()?;
        if range.is_empty() { return Err( config_error!("empty time range {}", range)) }

        Ok( Pipeline { config, range, search, downloader, extractor, state: PipelineState::Idle } )
    }

    /// create a pipeline with the archive clients and the GDAL based extractor as configured
    pub fn from_config (config: EumetsatConfig, range: TimeRange, credentials: Credentials)->Result<Self> {
        let client = Client::builder().build()?;
        let tokens = Arc::new( TokenProvider::new( client.clone(), &config.token_url, credentials, config.token_max_age));
        let search = SearchClient::from_config( client.clone(), &config);
        let downloader = Arc::new( Downloader::from_config( client, tokens, &config));
        let extractor = Arc::new( GdalExtractor::from_config( &config));

        Pipeline::new( config, range, search, downloader, extractor)
    }

    pub fn state (&self)->PipelineState { self.state }

    pub fn range (&self)->&TimeRange { &self.range }

    pub fn output_layout (&self)->OutputLayout { OutputLayout::from_config( &self.config) }

    /// a fresh gap planner for our range and output layout
    pub fn gaps (&self)->GapPlanner {
        GapPlanner::new( self.range, self.output_layout(), self.config.minute_filter())
    }

    fn transition (&mut self, next: PipelineState) {
        info!("pipeline {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// execute one complete run. Per item failures are only reported, a run can only fail if the pipeline
    /// was already used
    pub async fn run (&mut self)->Result<PipelineReport> {
        if self.state != PipelineState::Idle {
            return Err( op_failed!("pipeline not idle ({:?})", self.state))
        }

        let n_dl = self.config.download_workers;
        let n_ex = self.config.extract_workers;
        let items: WorkQueue<DiscoveredItem> = WorkQueue::new( self.config.item_queue_capacity());
        let files: WorkQueue<RawFile> = WorkQueue::new( self.config.file_queue_capacity());
        let mut report = PipelineReport::default();

        let dl_handles = spawn_download_workers( n_dl, self.downloader.clone(), &items, &files);
        let ex_ctx = Arc::new( ExtractContext {
            extractor: self.extractor.clone(),
            layout: self.output_layout(),
            staging_root: self.downloader.staging().root().to_path_buf(),
        });
        let ex_handles = spawn_extract_workers( n_ex, ex_ctx, &files);
        info!("started {} download and {} extract workers for {}", n_dl, n_ex, self.range);

        self.transition( PipelineState::Planning);
        self.plan( &items, &mut report).await;

        self.transition( PipelineState::Draining);
        for _ in 0..n_dl { items.put_stop().await? }
        items.join().await;
        report.items_pending_after_drain = items.pending();
        report.item_stops_taken = items.stops_taken();
        report.download_workers = join_workers( "download", dl_handles).await;

        self.transition( PipelineState::ShuttingDown);
        for _ in 0..n_ex { files.put_stop().await? }
        report.extract_workers = join_workers( "extract", ex_handles).await;

        self.transition( PipelineState::Done);
        info!("{}", report);
        Ok(report)
    }

    /// resolve all gaps into items and queue the ones we still need
    async fn plan (&self, items: &WorkQueue<DiscoveredItem>, report: &mut PipelineReport) {
        let filter = self.config.minute_filter();
        let window = self.config.window;
        let layout = self.output_layout();
        // one product per time-bucket, the first one wins. Its extraction is the only writer of the bucket
        let mut claimed: HashSet<DateTime<Utc>> = HashSet::new();

        for gap in self.gaps() {
            info!("gap {}", gap);
            report.n_gaps += 1;

            let outcome = self.search.search( &gap.range).await;
            if !outcome.is_complete() { report.n_incomplete_searches += 1 }

            for item in outcome.items {
                report.n_discovered += 1;

                if !self.range.contains( &item.timestamp) || !accepts_item( &item, &filter) {
                    report.n_filtered += 1;
                    continue
                }
                let slot = slot_start( &item.timestamp, window);
                if !claimed.insert( slot) {
                    debug!("skipping {}, bucket {} already claimed", item, bucket_key( &slot));
                    report.n_duplicates += 1;
                    continue
                }
                if layout.is_bucket_complete( &item.timestamp) {
                    debug!("skipping {}, output already complete", item);
                    report.n_already_complete += 1;
                    continue
                }

                info!("adding {} to download queue", bucket_key( &slot));
                if let Err(e) = items.put( item).await {
                    error!("item queue failed: {}", e);
                    return
                }
                report.n_queued += 1;
            }
        }
        info!("planning done: {} gaps, {} items queued", report.n_gaps, report.n_queued);
    }
}

async fn join_workers (kind: &str, handles: Vec<JoinHandle<WorkerReport>>)->Vec<WorkerReport> {
    join_all( handles).await.into_iter().filter_map( |res| {
        match res {
            Ok(report) => Some(report),
            Err(e) => { warn!("{} worker failed: {}", kind, e); None }
        }
    }).collect()
}
