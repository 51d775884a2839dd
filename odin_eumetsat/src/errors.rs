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

use thiserror::Error;
use odin_common::net::OdinNetError;

pub type Result<T> = std::result::Result<T, OdinEumetsatError>;

#[derive(Error,Debug)]
pub enum OdinEumetsatError {
    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("http error {0}")]
    HttpError( #[from] reqwest::Error),

    #[error("net error {0}")]
    NetError( #[from] OdinNetError),

    #[error("serde error {0}")]
    SerdeError( #[from] serde_json::Error),

    #[error("config parse error {0}")]
    ConfigParseError( #[from] ron::error::SpannedError),

    #[error("config error {0}")]
    ConfigError(String),

    /// product search failed (partial results are kept by the caller)
    #[error("discovery error {0}")]
    DiscoveryError(String),

    /// discovered item has no raw binary payload link
    #[error("link resolution error {0}")]
    LinkResolutionError(String),

    #[error("download error {0}")]
    DownloadError(String),

    /// decode-and-resample failure
    #[error("decode error {0}")]
    DecodeError(String),

    #[error("token refresh error {0}")]
    TokenRefreshError(String),

    #[error("queue closed")]
    QueueClosed,

    #[error("operation failed {0}")]
    OpFailed(String),
}

macro_rules! op_failed {
    ($fmt:literal $(, $arg:expr )* ) => {
        $crate::errors::OdinEumetsatError::OpFailed( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use op_failed;

macro_rules! config_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        $crate::errors::OdinEumetsatError::ConfigError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use config_error;

macro_rules! decode_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        $crate::errors::OdinEumetsatError::DecodeError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use decode_error;

pub fn download_error (msg: impl ToString)->OdinEumetsatError {
    OdinEumetsatError::DownloadError(msg.to_string())
}

pub fn discovery_error (msg: impl ToString)->OdinEumetsatError {
    OdinEumetsatError::DiscoveryError(msg.to_string())
}

pub fn token_refresh_error (msg: impl ToString)->OdinEumetsatError {
    OdinEumetsatError::TokenRefreshError(msg.to_string())
}
