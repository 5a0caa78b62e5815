//! End-to-end tests: a host gateway and a harvest worker over loopback TCP.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use gateway_worker::bridge::{
    BridgeError, CallbackBuilder, CallbackObject, Gateway, RemoteObject, WorkerBridge,
};
use gateway_worker::config::{GatewayConfig, EMBEDDING_INTERFACE, HARVEST_INTERFACE};
use gateway_worker::harvest::{
    Corpus, CorpusLoader, GetPapers, Harvester, JsonlCorpus, RawRecord, Venue,
};
use gateway_worker::{Error, Result};

struct Fixed(Vec<RawRecord>);

impl CorpusLoader for Fixed {
    fn open(&self) -> Result<Box<dyn Corpus>> {
        Ok(Box::new(JsonlCorpus::from_records(self.0.clone())))
    }
}

struct Unavailable;

impl CorpusLoader for Unavailable {
    fn open(&self) -> Result<Box<dyn Corpus>> {
        Err(Error::Corpus("repository clone failed".to_string()))
    }
}

fn sample_corpus() -> Vec<RawRecord> {
    vec![
        RawRecord::from(json!({
            "id": "2020.findings-emnlp.1",
            "title": "A {Bold} Paper \\cite{x}",
            "year": 2020,
            "venue_ids": ["findings"],
            "type": "paper",
            "authors": [{"first": "Ada", "last": "Lovelace"}],
            "pdf": {"url": "https://example.org/1.pdf"}
        })),
        RawRecord::from(json!({
            "id": "2020.acl-main.0",
            "title": "Proceedings",
            "year": 2020,
            "venue_ids": ["acl"],
            "type": "frontmatter"
        })),
        RawRecord::from(json!({
            "id": "2018.naacl-main.7",
            "title": "Older Paper",
            "year": "2018",
            "venue_ids": "naacl",
            "web_url": "https://example.org/7"
        })),
    ]
}

fn harvest_callback(loader: Arc<dyn CorpusLoader>) -> CallbackObject {
    CallbackBuilder::new(HARVEST_INTERFACE)
        .method(Arc::new(GetPapers::new(Arc::new(Harvester::new(loader)))))
        .build()
        .unwrap()
}

fn worker_config(gateway: &Gateway) -> GatewayConfig {
    GatewayConfig {
        address: "127.0.0.1".to_string(),
        port: gateway.local_addr().unwrap().port(),
        callback_port: 0,
        connect_timeout_secs: 5,
    }
}

async fn bind_gateway(interface: &str) -> Gateway {
    Gateway::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap()
        .expect_interface(interface)
}

/// Register a worker and start serving it in the background.
async fn connect(
    loader: Arc<dyn CorpusLoader>,
) -> (RemoteObject, tokio::task::JoinHandle<Result<()>>) {
    let gateway = bind_gateway(HARVEST_INTERFACE).await;
    let bridge = WorkerBridge::new(worker_config(&gateway), harvest_callback(loader));

    let (remote, serving) = tokio::join!(
        gateway.accept_registration(Duration::from_secs(5)),
        bridge.register()
    );
    let remote = remote.unwrap();
    let serving = serving.unwrap();
    assert_eq!(remote.callback_addr(), serving.callback_addr());

    (remote, tokio::spawn(serving.serve()))
}

#[tokio::test]
async fn test_registration_advertises_methods() {
    let (remote, _worker) = connect(Arc::new(Fixed(sample_corpus()))).await;
    assert_eq!(remote.interface(), HARVEST_INTERFACE);
    assert_eq!(remote.methods(), ["getPapers".to_string()]);
}

#[tokio::test]
async fn test_get_papers_over_the_gateway() {
    let (remote, _worker) = connect(Arc::new(Fixed(sample_corpus()))).await;

    let papers = remote.get_papers(2019, 2021).await.unwrap();
    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].id, "2020.findings-emnlp.1");
    assert_eq!(papers[0].title, "A Bold Paper");
    assert_eq!(papers[0].venue, Venue::Findings);
    assert_eq!(papers[0].authors[0].name, "Ada Lovelace");
    assert_eq!(papers[0].pdf_url, "https://example.org/1.pdf");

    // Same connection, second call.
    let papers = remote.get_papers(2000, 2030).await.unwrap();
    let ids: Vec<_> = papers.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["2020.findings-emnlp.1", "2018.naacl-main.7"]);
}

#[tokio::test]
async fn test_inverted_range_returns_empty_papers() {
    let (remote, _worker) = connect(Arc::new(Fixed(sample_corpus()))).await;
    let raw = remote
        .call("getPapers", vec![json!(2100), json!(2000)])
        .await
        .unwrap();
    assert_eq!(raw, r#"{"papers":[]}"#);
}

#[tokio::test]
async fn test_unknown_method_is_refused_locally() {
    let (remote, _worker) = connect(Arc::new(Fixed(sample_corpus()))).await;
    let err = remote.call("getVector", vec![json!("hello")]).await.unwrap_err();
    assert!(matches!(err, BridgeError::UnknownMethod(_)));
}

#[tokio::test]
async fn test_corpus_failure_surfaces_as_remote_error() {
    let (remote, worker) = connect(Arc::new(Unavailable)).await;

    let err = remote.get_papers(2000, 2020).await.unwrap_err();
    match err {
        BridgeError::Remote { method, message } => {
            assert_eq!(method, "getPapers");
            assert!(message.contains("repository clone failed"));
        }
        other => panic!("expected remote error, got {:?}", other),
    }

    // The worker keeps serving after a failed call.
    assert!(!worker.is_finished());
    assert!(remote.get_papers(2000, 2020).await.is_err());
}

#[tokio::test]
async fn test_bad_arguments_surface_as_remote_error() {
    let (remote, _worker) = connect(Arc::new(Fixed(sample_corpus()))).await;
    let err = remote
        .call("getPapers", vec![json!("twenty"), json!(2020)])
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Remote { .. }));
}

#[tokio::test]
async fn test_interface_mismatch_is_rejected() {
    let gateway = bind_gateway(EMBEDDING_INTERFACE).await;
    let bridge = WorkerBridge::new(
        worker_config(&gateway),
        harvest_callback(Arc::new(Fixed(vec![]))),
    );

    let (remote, serving) = tokio::join!(
        gateway.accept_registration(Duration::from_millis(500)),
        bridge.register()
    );
    assert!(matches!(remote, Err(Error::Gateway(_))));
    match serving {
        Err(Error::Gateway(reason)) => assert!(reason.contains("rejected")),
        Err(other) => panic!("expected gateway error, got {}", other),
        Ok(_) => panic!("registration should have been rejected"),
    }
}

#[tokio::test]
async fn test_worker_stops_when_host_goes_away() {
    let (remote, worker) = connect(Arc::new(Fixed(sample_corpus()))).await;
    drop(remote);

    let result = tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .expect("worker did not notice the closed gateway")
        .unwrap();
    assert!(matches!(result, Err(Error::GatewayClosed)));
}
