//! Async wrapper, compiled only with `--features async`.

#![cfg(feature = "async")]

mod common;

use common::d;
use gsc_etl::{AsyncGscEtl, EtlError, EtlJob, GscEtl};

fn etl(dir: &std::path::Path) -> AsyncGscEtl {
    let etl = GscEtl::builder()
        .credentials(dir.join("missing.json"))
        .token_cache(dir.join("token.json"))
        .warehouse_dir(dir.join("wh"))
        .build()
        .unwrap();
    AsyncGscEtl::new(etl)
}

#[tokio::test]
async fn run_surfaces_credential_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let job = EtlJob::new(
        "https://example.com/",
        d("2024-01-01"),
        d("2024-01-02"),
        "seo",
        "url_data",
        "keyword_data",
    )
    .unwrap();

    let err = etl(tmp.path()).run(job).await.unwrap_err();
    assert!(matches!(err, EtlError::Credential(_)));
}

#[tokio::test]
async fn with_runs_on_the_blocking_pool() {
    let tmp = tempfile::tempdir().unwrap();
    let etl = etl(tmp.path());

    let cached = etl
        .with(|e| e.token_cache().load().map(|t| t.is_some()))
        .await
        .unwrap();
    assert!(!cached);
}
