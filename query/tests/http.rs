//! Integration tests for the HTTP neighbor source against a local listener.
//!
//! Each test binds a throwaway TCP listener on localhost that answers every
//! connection with one canned HTTP response.

use peer_census_query::{
    HttpNeighborSource, NeighborSource, PeerQueryClient, QueryError, QueryPolicy,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const LISTING: &str = r#"{
    "sample": [{"network_id": 1, "peer_version": "v2", "ip": "10.0.0.1", "port": 8080,
                "public_key_hash": "abc123", "authenticated": true}],
    "inbound": [{"network_id": 1, "peer_version": "v2", "ip": "10.0.0.2", "port": 8080,
                 "public_key_hash": "0", "authenticated": false}],
    "outbound": []
}"#;

/// Serve `status` and `body` to every connection, counting requests.
///
/// With `respond` false the listener accepts connections and never answers.
async fn serve(
    status: &'static str,
    body: &'static str,
    respond: bool,
) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = listener.local_addr().unwrap().to_string();
    let requests = Arc::new(AtomicUsize::new(0));
    let counter = requests.clone();

    tokio::spawn(async move {
        loop {
            let (mut stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                if !respond {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    return;
                }
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    (endpoint, requests)
}

#[tokio::test]
async fn test_fetch_listing() {
    let (endpoint, requests) = serve("200 OK", LISTING, true).await;
    let source = HttpNeighborSource::new(Duration::from_secs(5));

    let response = source.fetch(&endpoint).await.unwrap();

    assert_eq!(requests.load(Ordering::SeqCst), 1);
    assert_eq!(response.sample.len(), 1);
    assert_eq!(response.inbound.len(), 1);
    assert!(response.outbound.is_empty());
    assert_eq!(response.sample[0].public_key_hash, "abc123");
    assert!(response.sample[0].authenticated);
}

#[tokio::test]
async fn test_fetch_non_success_status() {
    let (endpoint, _) = serve("503 Service Unavailable", "{}", true).await;
    let source = HttpNeighborSource::new(Duration::from_secs(5));

    let result = source.fetch(&endpoint).await;

    assert!(matches!(result, Err(QueryError::Status(503))));
}

#[tokio::test]
async fn test_fetch_malformed_body() {
    let (endpoint, _) = serve("200 OK", "<html>not json</html>", true).await;
    let source = HttpNeighborSource::new(Duration::from_secs(5));

    let result = source.fetch(&endpoint).await;

    assert!(matches!(result, Err(QueryError::Decode(_))));
}

#[tokio::test]
async fn test_fetch_times_out() {
    let (endpoint, _) = serve("200 OK", LISTING, false).await;
    let source = HttpNeighborSource::new(Duration::from_millis(200));

    let result = source.fetch(&endpoint).await;

    assert!(matches!(result, Err(QueryError::Timeout)));
}

#[tokio::test]
async fn test_fetch_connection_refused() {
    // Bind then drop to find a port with nothing listening.
    let endpoint = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().to_string()
    };
    let source = HttpNeighborSource::new(Duration::from_secs(5));

    let result = source.fetch(&endpoint).await;

    assert!(matches!(result, Err(QueryError::Http(_))));
}

#[tokio::test]
async fn test_query_peer_over_http() {
    let (endpoint, requests) = serve("200 OK", LISTING, true).await;
    let client = PeerQueryClient::new(
        HttpNeighborSource::new(Duration::from_secs(5)),
        QueryPolicy {
            retry_budget: 2,
            retry_delay: Duration::from_millis(10),
            default_port: 8080,
        },
    );

    // The endpoint carries its port, so only one form is queried.
    let result = client.query(&endpoint).await;

    assert!(result.responsive);
    assert_eq!(requests.load(Ordering::SeqCst), 1);
    assert!(result.neighbor_addresses.contains("10.0.0.1"));
    assert!(result.neighbor_addresses.contains("10.0.0.2"));
    assert_eq!(result.neighbor_identities.len(), 2);
}
