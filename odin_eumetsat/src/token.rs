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

use std::{fmt, path::Path, sync::atomic::{AtomicUsize, Ordering}, time::{Duration, Instant}};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use odin_common::{datetime::secs, net::from_json};

use crate::errors::{Result, token_refresh_error};

/// client credentials of the archive account. Read from a JSON key file `{"username": .., "password": ..}`
#[derive(Clone,Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new (username: impl ToString, password: impl ToString)->Self {
        Credentials { username: username.to_string(), password: password.to_string() }
    }

    pub fn from_file (path: impl AsRef<Path>)->Result<Self> {
        let data = std::fs::read_to_string( path.as_ref())?;
        Ok( serde_json::from_str( &data)? )
    }
}

impl fmt::Debug for Credentials {
    fn fmt (&self, f: &mut fmt::Formatter<'_>)->fmt::Result {
        f.debug_struct("Credentials").field("username", &self.username).field("password", &"***").finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

struct CachedToken {
    token: String,
    fetched: Instant,
    max_age: Duration,
}

impl CachedToken {
    fn is_fresh (&self)->bool { self.fetched.elapsed() < self.max_age }
}

/// shared access token source for all download workers. The cached token is returned as long as it is
/// younger than `max_age` (or the server provided `expires_in`, whichever is shorter). The cache lock is held
/// across a refresh request so that there is at most one refresh in flight, and concurrent callers get the
/// token it produced
pub struct TokenProvider {
    client: Client,
    token_url: String,
    credentials: Credentials,
    max_age: Duration,
    cached: Mutex<Option<CachedToken>>,
    n_refresh: AtomicUsize,
}

impl TokenProvider {
    pub fn new (client: Client, token_url: impl ToString, credentials: Credentials, max_age: Duration)->Self {
        TokenProvider {
            client,
            token_url: token_url.to_string(),
            credentials,
            max_age,
            cached: Mutex::new(None),
            n_refresh: AtomicUsize::new(0),
        }
    }

    /// get a valid access token, refreshing it if the cached one is too old
    pub async fn token (&self)->Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(ct) = cached.as_ref() {
            if ct.is_fresh() { return Ok( ct.token.clone()) }
        }

        let ct = self.request_token().await?;
        let token = ct.token.clone();
        *cached = Some(ct);
        Ok(token)
    }

    /// drop the cached token so that the next `token()` call requests a new one
    pub async fn invalidate (&self) {
        *self.cached.lock().await = None;
    }

    /// number of successful token requests so far
    pub fn refresh_count (&self)->usize { self.n_refresh.load( Ordering::Relaxed) }

    async fn request_token (&self)->Result<CachedToken> {
        debug!("requesting access token from {}", self.token_url);

        let response = self.client.post( &self.token_url)
            .basic_auth( &self.credentials.username, Some( &self.credentials.password))
            .form( &[("grant_type", "client_credentials")])
            .send().await
            .map_err( token_refresh_error)?;

        let status = response.status();
        if !status.is_success() {
            warn!("token request rejected: {}", status);
            return Err( token_refresh_error( format!("token request status {}", status)))
        }

        let tr: TokenResponse = from_json( response).await.map_err( token_refresh_error)?;
        let max_age = match tr.expires_in {
            Some(expires_in) => self.max_age.min( secs(expires_in)),
            None => self.max_age
        };

        self.n_refresh.fetch_add( 1, Ordering::Relaxed);
        info!("access token refreshed (valid for {}s)", max_age.as_secs());

        Ok( CachedToken { token: tr.access_token, fetched: Instant::now(), max_age } )
    }
}
