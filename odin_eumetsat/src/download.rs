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

use std::{future::Future, sync::Arc, time::Instant};
use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use odin_common::{fs::remove_file_if_exists, net::{download_to_file, header_filename, url_file_name}};

use crate::{DiscoveredItem, EumetsatConfig, RawFile};
use crate::errors::{Result, download_error};
use crate::layout::StagingLayout;
use crate::queue::{Task, WorkQueue};
use crate::token::TokenProvider;

/// per worker statistics, returned when the worker task terminates
#[derive(Debug,Clone,Default,PartialEq,Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub n_done: usize,
    pub n_failed: usize,
    /// did the worker terminate because it took a stop marker
    pub stopped: bool,
}

impl WorkerReport {
    pub fn new (worker_id: usize)->Self { WorkerReport { worker_id, ..Default::default() } }
}

/// the capability of the download stage: turn one discovered item into a raw file in the staging area
pub trait ProductDownloader: Send + Sync + 'static {
    fn fetch_raw_file (&self, item: &DiscoveredItem)->impl Future<Output=Result<RawFile>> + Send;
}

/// archive downloader that streams authenticated product downloads into the staging area
pub struct Downloader {
    client: Client,
    tokens: Arc<TokenProvider>,
    staging: StagingLayout,
    buf_size: usize,
}

impl Downloader {
    pub fn new (client: Client, tokens: Arc<TokenProvider>, staging: StagingLayout, buf_size: usize)->Self {
        Downloader { client, tokens, staging, buf_size }
    }

    pub fn from_config (client: Client, tokens: Arc<TokenProvider>, config: &EumetsatConfig)->Self {
        Downloader::new( client, tokens, StagingLayout::from_config( config), config.chunk_size * 1024)
    }

    pub fn staging (&self)->&StagingLayout { &self.staging }

    pub async fn download (&self, item: &DiscoveredItem)->Result<RawFile> {
        let link = item.download_link()?;
        let token = self.tokens.token().await?;

        let response = self.client.get( &link.href)
            .query( &[("access_token", token.as_str())])
            .send().await
            .map_err( download_error)?;

        let filename = header_filename( response.headers())
            .or_else( || url_file_name( &link.href).map( |s| s.to_string()))
            .unwrap_or_else( || format!("{}.nat", sanitize( &item.id)));

        let path = self.staging.raw_path( &item.timestamp, &filename);

        debug!("{} -> {:?}", link.href, path);
        let len = download_to_file( response, &path, self.buf_size).await.map_err( download_error)?;
        debug!("received {} bytes for {}", len, item.id);

        Ok( RawFile { path, timestamp: item.timestamp, item_id: item.id.clone() } )
    }
}

impl ProductDownloader for Downloader {
    fn fetch_raw_file (&self, item: &DiscoveredItem)->impl Future<Output=Result<RawFile>> + Send {
        self.download( item)
    }
}

fn sanitize (id: &str)->String {
    id.chars().map( |c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' }).collect()
}

/// start `n` download workers that take items from `items` and push the resulting raw files to `files`
pub fn spawn_download_workers<D> (n: usize, downloader: Arc<D>, items: &WorkQueue<DiscoveredItem>, files: &WorkQueue<RawFile>)
    -> Vec<JoinHandle<WorkerReport>>
    where D: ProductDownloader
{
    (0..n).map( |id| {
        tokio::spawn( run_download_worker( id, downloader.clone(), items.clone(), files.clone()))
    }).collect()
}

async fn run_download_worker<D> (id: usize, downloader: Arc<D>, items: WorkQueue<DiscoveredItem>, files: WorkQueue<RawFile>)->WorkerReport
    where D: ProductDownloader
{
    let mut report = WorkerReport::new( id);
    debug!("download worker {} started", id);

    loop {
        match items.take().await {
            Ok((Task::Work(item), ack)) => {
                let t0 = Instant::now();
                let label = item.to_string();

                // each download runs in its own task so that a panic only costs this item, not the worker
                let dl = downloader.clone();
                let res = tokio::spawn( async move { dl.fetch_raw_file( &item).await }).await;

                match res {
                    Ok(Ok(raw_file)) => {
                        info!("download of {} took {:.1}s", label, t0.elapsed().as_secs_f64());
                        let path = raw_file.path.clone();
                        // hand over before we ack so that a join on `items` implies the file is in `files`
                        if let Err(e) = files.put( raw_file).await {
                            error!("cannot queue raw file {:?}: {}", path, e);
                            let _ = remove_file_if_exists( &path);
                            report.n_failed += 1;
                        } else {
                            report.n_done += 1;
                        }
                    }
                    Ok(Err(e)) => {
                        warn!("dropping item {}: {}", label, e);
                        report.n_failed += 1;
                    }
                    Err(e) => {
                        error!("download of {} aborted: {}", label, e);
                        report.n_failed += 1;
                    }
                }
                ack.ack();
            }
            Ok((Task::Stop, _ack)) => {
                report.stopped = true;
                break
            }
            Err(e) => {
                error!("download worker {} terminated: {}", id, e);
                break
            }
        }
    }

    debug!("download worker {} done ({} downloaded, {} failed)", id, report.n_done, report.n_failed);
    report
}
