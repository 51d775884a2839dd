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

///! common utility functions for network operations

use std::{io::ErrorKind, path::Path};
use reqwest::{header::{HeaderMap,CONTENT_DISPOSITION}, Response, StatusCode};
use regex::Regex;
use lazy_static::lazy_static;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::{fs::File as AsyncFile, io::{AsyncWriteExt,BufWriter}};

use crate::fs::{part_path,remove_file_if_exists};

lazy_static! {
    // [scheme,user,host,port,path,query]
    static ref URL_RE: Regex = Regex::new( r"(.+)://(?:(.+)@)?([^:/]+)(?::(\d+))?(?:/([^?]+))?(?:\?(.+))?").unwrap();
    static ref FNAME_RE: Regex = Regex::new( r"(?:.*/)?(.+)").unwrap();
    static ref QUOTED_RE: Regex = Regex::new( r#""(.*?)""#).unwrap();
    static ref UNQUOTED_RE: Regex = Regex::new( r"filename=([^;\s]+)").unwrap();
}

const URL_PATH: usize = 5;

#[derive(Error,Debug)]
pub enum OdinNetError {
    #[error("IO error: {0}")]
    IOError( #[from] std::io::Error),

    #[error("not found: {0}")]
    NotFoundError(String),

    #[error("http error: {0}")]
    HttpError( #[from] reqwest::Error),

    #[error("operation failed: {0}")]
    OpFailed(String),

    #[error("parse error: {0}")]
    ParseError(String),
}

pub type Result<T> = std::result::Result<T, OdinNetError>;

/// get the filename from a `Content-Disposition` header value such as `attachment; filename="MSG4-SEVI.nat"`.
/// Quoted values are preferred, we fall back to unquoted `filename=..` tokens
pub fn content_disposition_filename (value: &str)->Option<&str> {
    QUOTED_RE.captures( value)
        .or_else( || UNQUOTED_RE.captures( value))
        .and_then( |cap| cap.get(1))
        .map( |m| m.as_str())
        .filter( |s| !s.is_empty() && !s.contains('/') && !s.contains(".."))
}

/// the `Content-Disposition` filename from response headers (if any)
pub fn header_filename (headers: &HeaderMap)->Option<String> {
    headers.get( CONTENT_DISPOSITION)
        .and_then( |v| v.to_str().ok())
        .and_then( content_disposition_filename)
        .map( |s| s.to_string())
}

/// get filename part (last path element) of complete URL
/// NOTE - this does not work for partial (relative) URLs
pub fn url_file_name<'a> (url: &'a str) -> Option<&'a str> {
    URL_RE.captures( url)
    .and_then( |cap| cap.get( URL_PATH))
    .map( |m| m.as_str())
    .and_then( |p| FNAME_RE.captures( p))
    .and_then( |cap| cap.get(1))
    .map( |m| m.as_str())
}

/// map non-success response status codes into errors
pub fn check_status (response: &Response)->Result<()> {
    match response.status() {
        s if s.is_success() => Ok(()),
        StatusCode::NOT_FOUND => Err( OdinNetError::NotFoundError( response.url().to_string())),
        other => Err( OdinNetError::OpFailed( format!("response status {other:?}")))
    }
}

/// create a file and its missing parent dirs. Retries if the parent gets removed concurrently
async fn create_with_parents (path: &Path)->std::io::Result<AsyncFile> {
    let mut attempts = 0;
    loop {
        match AsyncFile::create( path).await {
            Err(e) if e.kind() == ErrorKind::NotFound && attempts < 3 => {
                attempts += 1;
                if let Some(parent) = path.parent() { tokio::fs::create_dir_all( parent).await? }
            }
            res => return res
        }
    }
}

/// stream the body of `response` into `path`, creating missing parent dirs. The data is first written into
/// a sibling `.part` file that is renamed to `path` once the download is complete, and removed if the download
/// fails. `buf_size` is the size of the write buffer in bytes. Returns the number of bytes written
pub async fn download_to_file (mut response: Response, path: impl AsRef<Path>, buf_size: usize) -> Result<u64> {
    check_status( &response)?;

    let path = path.as_ref();
    let tmp_path = part_path( path);

    let res: Result<u64> = async {
        let file = create_with_parents( &tmp_path).await?;
        let mut writer = BufWriter::with_capacity( buf_size.max(8192), file);
        let mut len: u64 = 0;

        while let Some(chunk) = response.chunk().await? {
            len += chunk.len() as u64;
            writer.write_all( &chunk).await?;
        }
        writer.flush().await?;
        Ok(len)
    }.await;

    match res {
        Ok(len) => {
            tokio::fs::rename( &tmp_path, path).await?;
            Ok(len)
        }
        Err(e) => {
            let _ = remove_file_if_exists( &tmp_path); // best effort, we report the original error
            Err(e)
        }
    }
}

/// decode JSON response bodies. The reqwest::Response::json() alternative does not preserve enough error information
pub async fn from_json<T> (response: Response)->Result<T> where T: DeserializeOwned {
    let bytes = response.bytes().await?;
    serde_json::from_slice( &bytes).map_err(|e| OdinNetError::ParseError(e.to_string()))
}
