//! Single-flight scenarios: concurrent demands for one key produce
//! exactly one upstream fetch, within an instance and across instances
//! sharing a store.

mod common;

use common::{CannedResponse, TestServer, Upstream};
use std::sync::Arc;
use tokio::sync::Barrier;

async fn run_clients(urls: Vec<String>, expected_body: &str) {
    let client = reqwest::Client::new();
    let barrier = Arc::new(Barrier::new(urls.len()));

    let mut tasks = Vec::new();
    for url in urls {
        let client = client.clone();
        let barrier = barrier.clone();
        tasks.push(tokio::spawn(async move {
            barrier.wait().await;
            client.get(&url).send().await
        }));
    }

    for task in tasks {
        let response = task.await.unwrap().expect("request failed");
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), expected_body);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn thirty_two_concurrent_requests_one_instance_one_fetch() {
    let upstream = Upstream::start(vec![(
        "/test1",
        CannedResponse::text("testing123").with_delay(100),
    )])
    .await;
    let server = TestServer::new().await;
    let cached = server.cached_url(&upstream.url("/test1"));

    run_clients(vec![cached; 32], "testing123").await;

    assert_eq!(upstream.hits("/test1"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn four_instances_sharing_one_store_one_fetch() {
    let upstream = Upstream::start(vec![(
        "/test1",
        CannedResponse::text("testing123").with_delay(100),
    )])
    .await;

    let root = tempfile::tempdir().unwrap();
    let mut instances = Vec::new();
    for _ in 0..4 {
        instances.push(TestServer::shared(root.path()).await);
    }

    // 16 clients per instance, all racing on the same uncached URL.
    let source = upstream.url("/test1");
    let mut urls = Vec::new();
    for instance in &instances {
        for _ in 0..16 {
            urls.push(instance.cached_url(&source));
        }
    }
    run_clients(urls, "testing123").await;

    assert_eq!(upstream.hits("/test1"), 1);
}

#[tokio::test]
async fn distinct_urls_fetch_independently() {
    let upstream = Upstream::start(vec![
        ("/a", CannedResponse::text("alpha")),
        ("/b", CannedResponse::text("beta")),
    ])
    .await;
    let server = TestServer::new().await;

    let response = reqwest::get(server.cached_url(&upstream.url("/a")))
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "alpha");
    let response = reqwest::get(server.cached_url(&upstream.url("/b")))
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "beta");

    assert_eq!(upstream.hits("/a"), 1);
    assert_eq!(upstream.hits("/b"), 1);
}
