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

use std::{sync::Arc, time::Duration};
use futures::future::join_all;
use reqwest::Client;
use serde_json::json;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers::{basic_auth, body_string_contains, method, path}};
use odin_eumetsat::{Credentials, OdinEumetsatError, TokenProvider};
use odin_common::datetime::{minutes, secs};

// run with "cargo test --test test_token -- --nocapture"

fn credentials ()->Credentials { Credentials::new( "consumer-key", "consumer-secret") }

async fn token_server (token: &str, n_expected: u64)->MockServer {
    let server = MockServer::start().await;
    Mock::given( method("POST")).and( path("/token"))
        .and( basic_auth( "consumer-key", "consumer-secret"))
        .and( body_string_contains( "grant_type=client_credentials"))
        .respond_with( ResponseTemplate::new(200)
            .set_body_json( json!({ "access_token": token, "token_type": "Bearer", "expires_in": 3600 }))
            .set_delay( Duration::from_millis(50)))
        .expect( n_expected)
        .mount( &server).await;
    server
}

#[tokio::test]
async fn test_cached_token() {
    let server = token_server( "abc", 1).await;
    let provider = TokenProvider::new( Client::new(), format!("{}/token", server.uri()), credentials(), minutes(50));

    assert_eq!( provider.token().await.unwrap(), "abc");
    assert_eq!( provider.token().await.unwrap(), "abc");
    assert_eq!( provider.refresh_count(), 1);
}

#[tokio::test]
async fn test_single_concurrent_refresh() {
    let server = token_server( "abc", 1).await;
    let provider = Arc::new( TokenProvider::new( Client::new(), format!("{}/token", server.uri()), credentials(), minutes(50)));

    let tasks = (0..8).map( |_| {
        let provider = provider.clone();
        tokio::spawn( async move { provider.token().await })
    });
    for res in join_all( tasks).await {
        assert_eq!( res.unwrap().unwrap(), "abc");
    }
    assert_eq!( provider.refresh_count(), 1);
}

#[tokio::test]
async fn test_expired_token() {
    let server = token_server( "abc", 2).await;
    let provider = TokenProvider::new( Client::new(), format!("{}/token", server.uri()), credentials(), secs(0));

    provider.token().await.unwrap();
    provider.token().await.unwrap();
    assert_eq!( provider.refresh_count(), 2);
}

#[tokio::test]
async fn test_invalidate() {
    let server = token_server( "abc", 2).await;
    let provider = TokenProvider::new( Client::new(), format!("{}/token", server.uri()), credentials(), minutes(50));

    provider.token().await.unwrap();
    provider.invalidate().await;
    provider.token().await.unwrap();
    assert_eq!( provider.refresh_count(), 2);
}

#[tokio::test]
async fn test_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given( method("POST")).and( path("/token"))
        .respond_with( ResponseTemplate::new(401))
        .mount( &server).await;
    let provider = TokenProvider::new( Client::new(), format!("{}/token", server.uri()), credentials(), minutes(50));

    let res = provider.token().await;
    assert!( matches!( res, Err(OdinEumetsatError::TokenRefreshError(_))));
    assert_eq!( provider.refresh_count(), 0);
}

#[test]
fn test_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eumetsat.key");
    std::fs::write( &path, r#"{"username": "me", "password": "secret"}"#).unwrap();

    let creds = Credentials::from_file( &path).unwrap();
    assert_eq!( creds.username, "me");
    assert_eq!( creds.password, "secret");
    assert!( !format!("{creds:?}").contains("secret"));

    assert!( Credentials::from_file( dir.path().join("missing.key")).is_err());
}
