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

use std::path::PathBuf;
use anyhow::{anyhow, bail, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use odin_common::{datetime::parse_utc_date, fs::ensure_writable_dir};
use odin_eumetsat::{load_config, Credentials, EumetsatConfig, GapPlanner, OutputLayout, Pipeline, TimeRange};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "download and extract the EUMETSAT products that are missing in the output dir")]
pub struct Args {
    /// RON config file (built-in defaults if not set)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// number of download workers
    #[arg(long)]
    pub dl: Option<usize>,

    /// number of extract workers
    #[arg(long)]
    pub ep: Option<usize>,

    /// start date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub st: String,

    /// end date (YYYY-MM-DD, exclusive)
    #[arg(long)]
    pub et: String,

    /// staging dir for raw product files
    #[arg(long)]
    pub dl_base_path: Option<PathBuf>,

    /// root dir of extracted images
    #[arg(long)]
    pub ext_base_path: Option<PathBuf>,

    /// minute-of-hour of windows to ingest (repeatable)
    #[arg(long)]
    pub mins: Vec<u32>,

    /// download buffer size in kB
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// JSON file with archive credentials
    #[arg(long, default_value = "./eumetsat.key")]
    pub key: PathBuf,

    /// only list the gaps, don't fetch anything
    #[arg(long)]
    pub gaps_only: bool,
}

#[tokio::main]
async fn main()->Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter( EnvFilter::try_from_default_env().unwrap_or_else( |_| EnvFilter::new("info")))  // use RUST_LOG to set max level
        .try_init();

    let args = Args::parse();

    let mut config: EumetsatConfig = match &args.config {
        Some(path) => load_config( path)?,
        None => EumetsatConfig::default()
    };
    apply_args( &mut config, &args);
    config.validate()?;

    let start = parse_utc_date( &args.st).ok_or_else( || anyhow!("invalid start date: {}", args.st))?;
    let end = parse_utc_date( &args.et).ok_or_else( || anyhow!("invalid end date: {}", args.et))?;
    if start >= end { bail!("start date {} not before end date {}", args.st, args.et) }
    let range = TimeRange::new( start, end)?;

    if args.gaps_only {
        for gap in GapPlanner::new( range, OutputLayout::from_config( &config), config.minute_filter()) {
            println!("{gap}");
        }
        return Ok(())
    }

    ensure_writable_dir( &config.raw_dir)?;
    ensure_writable_dir( &config.output_dir)?;
    let credentials = Credentials::from_file( &args.key)?;

    info!("ingesting {} into {:?}", range, config.output_dir);
    let mut pipeline = Pipeline::from_config( config, range, credentials)?;
    let report = pipeline.run().await?;
    println!("{report}");

    Ok(())
}

fn apply_args (config: &mut EumetsatConfig, args: &Args) {
    if let Some(n) = args.dl { config.download_workers = n }
    if let Some(n) = args.ep { config.extract_workers = n }
    if let Some(path) = &args.dl_base_path { config.raw_dir = path.clone() }
    if let Some(path) = &args.ext_base_path { config.output_dir = path.clone() }
    if !args.mins.is_empty() { config.minutes = args.mins.clone() }
    if let Some(n) = args.chunk_size { config.chunk_size = n }
}
