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

//! the extract stage: decode a raw product file, resample it onto the target grid and store one image
//! per channel. The raw file is always removed afterwards

use std::{fs, path::{Path,PathBuf}, process::Command, sync::Arc, time::Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use odin_common::fs::{ensure_dir, part_path, remove_empty_parents, remove_file_if_exists};

use crate::{Channel, EumetsatConfig, ExtractorConfig, RawFile, TargetArea};
use crate::download::WorkerReport;
use crate::errors::{Result, decode_error};
use crate::layout::OutputLayout;
use crate::queue::{Task, WorkQueue};

/// where to store the image of one channel
#[derive(Debug,Clone,PartialEq)]
pub struct ArtifactTarget {
    pub channel: Channel,
    pub path: PathBuf,
}

/// the decode-and-resample capability. Implementations write each target path only once the respective
/// image is complete. This is called from blocking threads
pub trait ProductExtractor: Send + Sync {
    fn extract (&self, raw_path: &Path, targets: &[ArtifactTarget])->Result<()>;
}

/* #region GDAL tools extractor *********************************************************************/

/// extractor that uses the GDAL command line tools: one `gdalwarp` run reprojects/resamples all bands
/// of the raw file into a temporary GeoTIFF, then `gdal_translate` extracts each channel band as PNG
pub struct GdalExtractor {
    config: ExtractorConfig,
    area: TargetArea,
}

impl GdalExtractor {
    pub fn new (config: ExtractorConfig, area: TargetArea)->Self {
        GdalExtractor { config, area }
    }

    pub fn from_config (config: &EumetsatConfig)->Self {
        GdalExtractor::new( config.extractor.clone(), config.area.clone())
    }

    fn warp_cmd (&self, raw_path: &Path, warped: &Path)->Command {
        let a = &self.area;
        let mut cmd = Command::new( &self.config.gdalwarp);
        cmd.arg("-overwrite")
           .arg("-t_srs").arg( format!("EPSG:{}", a.epsg))
           .arg("-te").arg( a.min_lon().to_string()).arg( a.min_lat().to_string()).arg( a.max_lon().to_string()).arg( a.max_lat().to_string())
           .arg("-ts").arg( a.width.to_string()).arg( a.height.to_string())
           .arg("-r").arg( &self.config.resampling)
           .arg("-of").arg("GTiff")
           .arg( raw_path)
           .arg( warped);
        cmd
    }

    fn translate_cmd (&self, warped: &Path, band: u32, out: &Path)->Command {
        let mut cmd = Command::new( &self.config.gdal_translate);
        cmd.env("GDAL_PAM_ENABLED", "NO") // no .aux.xml sidecars in the output tree
           .arg("-b").arg( band.to_string())
           .arg("-of").arg("PNG")
           .args( &self.config.translate_args)
           .arg( warped)
           .arg( out);
        cmd
    }
}

impl ProductExtractor for GdalExtractor {
    fn extract (&self, raw_path: &Path, targets: &[ArtifactTarget])->Result<()> {
        let tmp_dir = tempfile::tempdir()?;
        let warped = tmp_dir.path().join("warped.tif");
        execute_cmd( &mut self.warp_cmd( raw_path, &warped))?;

        for target in targets {
            if let Some(dir) = target.path.parent() { ensure_dir( dir)? }
            let part = part_path( &target.path);

            if let Err(e) = execute_cmd( &mut self.translate_cmd( &warped, target.channel.band, &part)) {
                let _ = remove_file_if_exists( &part);
                return Err(e)
            }
            fs::rename( &part, &target.path)?;
        }
        Ok(())
    }
}

fn execute_cmd (cmd: &mut Command)->Result<()> {
    debug!("executing {cmd:?}");

    let output = cmd.output().map_err( |e| decode_error!("cannot run {:?}: {}", cmd.get_program(), e))?;
    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy( &output.stderr);
        Err( decode_error!("{:?} failed with {}: {}", cmd.get_program(), output.status, stderr.trim()))
    }
}

/* #endregion GDAL tools extractor */

/* #region extract workers **************************************************************************/

/// what the extract workers need to share
pub struct ExtractContext {
    pub extractor: Arc<dyn ProductExtractor>,
    pub layout: OutputLayout,
    /// raw files are below this dir. Emptied staging dirs are removed up to (excluding) it
    pub staging_root: PathBuf,
}

impl ExtractContext {
    pub fn targets (&self, raw_file: &RawFile)->Vec<ArtifactTarget> {
        self.layout.channels().iter().map( |channel| {
            ArtifactTarget { channel: channel.clone(), path: self.layout.artifact_path( &raw_file.timestamp, channel) }
        }).collect()
    }
}

/// removes the raw file (and its emptied staging dirs) when dropped, which includes unwinding
struct RawFileRemover<'a> {
    path: &'a Path,
    root: &'a Path,
}

impl<'a> Drop for RawFileRemover<'a> {
    fn drop (&mut self) {
        match remove_file_if_exists( self.path) {
            Ok(_) => debug!("removed raw file {:?}", self.path),
            Err(e) => error!("failed to remove raw file {:?}: {}", self.path, e)
        }
        remove_empty_parents( self.path, self.root);
    }
}

/// process one raw file and remove it, whatever the outcome of the extraction
pub fn process_raw_file (ctx: &ExtractContext, raw_file: &RawFile)->Result<()> {
    let _remover = RawFileRemover { path: &raw_file.path, root: &ctx.staging_root };
    let targets = ctx.targets( raw_file);
    ctx.extractor.extract( &raw_file.path, &targets)
}

/// start `n` extract workers that take raw files from `files`
pub fn spawn_extract_workers (n: usize, ctx: Arc<ExtractContext>, files: &WorkQueue<RawFile>)->Vec<JoinHandle<WorkerReport>> {
    (0..n).map( |id| tokio::spawn( run_extract_worker( id, ctx.clone(), files.clone()))).collect()
}

async fn run_extract_worker (id: usize, ctx: Arc<ExtractContext>, files: WorkQueue<RawFile>)->WorkerReport {
    let mut report = WorkerReport::new( id);
    debug!("extract worker {} started", id);

    loop {
        match files.take().await {
            Ok((Task::Work(raw_file), ack)) => {
                let t0 = Instant::now();
                let name = raw_file.to_string();
                let ctx = ctx.clone();

                match tokio::task::spawn_blocking( move || process_raw_file( &ctx, &raw_file)).await {
                    Ok(Ok(())) => {
                        info!("extraction of {} took {:.1}s", name, t0.elapsed().as_secs_f64());
                        report.n_done += 1;
                    }
                    Ok(Err(e)) => {
                        warn!("dropping raw file {}: {}", name, e);
                        report.n_failed += 1;
                    }
                    Err(e) => { // extractor panicked
                        error!("extraction of {} aborted: {}", name, e);
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
                error!("extract worker {} terminated: {}", id, e);
                break
            }
        }
    }

    debug!("extract worker {} done ({} extracted, {} failed)", id, report.n_done, report.n_failed);
    report
}

/* #endregion extract workers */
