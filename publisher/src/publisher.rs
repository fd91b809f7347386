use crate::errors::PublishError;
use crate::github::{ContentStore, FileWrite};
use crate::metrics_defs;
use crate::payload::PushPayload;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde::Serialize;
use std::sync::Arc;

/// Target used when the payload does not name one
#[derive(Clone, Debug)]
pub struct PublishDefaults {
    pub path: String,
    pub branch: String,
}

/// Success envelope returned to the caller
#[derive(Debug, Serialize)]
pub struct PublishReceipt {
    pub ok: bool,
    pub file: String,
    pub url: Option<String>,
    pub commit: Option<String>,
}

/// Read-then-write upsert against an injected [`ContentStore`].
///
/// The two remote calls are strictly sequential: the write consumes the
/// revision identifier discovered by the read, so an existing file is
/// updated in place and a missing one is created. No retries; upstream
/// failures surface as-is.
pub struct Publisher {
    store: Arc<dyn ContentStore>,
    defaults: PublishDefaults,
}

impl Publisher {
    pub fn new(store: Arc<dyn ContentStore>, defaults: PublishDefaults) -> Self {
        Publisher { store, defaults }
    }

    pub async fn publish(&self, payload: &PushPayload) -> Result<PublishReceipt, PublishError> {
        let path = payload.path().unwrap_or(&self.defaults.path).to_string();
        let branch = payload.branch().unwrap_or(&self.defaults.branch).to_string();
        let message = payload.commit_message(&path);

        let existing = self.store.get(&path, &branch).await?;
        let sha = existing.map(|file| file.sha);
        tracing::debug!(
            path = %path,
            branch = %branch,
            update = sha.is_some(),
            "resolved publish target"
        );

        let write = FileWrite {
            message,
            content: BASE64_STANDARD.encode(payload.to_pretty_json()),
            branch,
            sha,
        };
        let receipt = self.store.put(&path, &write).await?;

        metrics::counter!(metrics_defs::PUBLISH_SUCCESS.name).increment(1);
        tracing::info!(path = %path, commit = ?receipt.commit_url, "published payload");

        Ok(PublishReceipt {
            ok: true,
            file: path,
            url: receipt.content_url,
            commit: receipt.commit_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{FakeContentStore, StoreCall};

    fn publisher_with(store: Arc<FakeContentStore>) -> Publisher {
        Publisher::new(
            store,
            PublishDefaults {
                path: "data.json".to_string(),
                branch: "main".to_string(),
            },
        )
    }

    fn payload(json: &str) -> PushPayload {
        PushPayload::from_slice(json.as_bytes()).expect("valid payload")
    }

    #[tokio::test]
    async fn absent_file_is_created_without_sha() {
        let store = Arc::new(FakeContentStore::empty());
        let publisher = publisher_with(store.clone());

        let receipt = publisher
            .publish(&payload(r#"{"meta":{"name":"Alice"},"data":[1,2,3]}"#))
            .await
            .unwrap();

        assert!(receipt.ok);
        assert_eq!(receipt.file, "data.json");
        assert!(receipt.url.is_some());
        assert!(receipt.commit.is_some());

        let calls = store.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0],
            StoreCall::Get {
                path: "data.json".to_string(),
                branch: "main".to_string(),
            }
        );
        match &calls[1] {
            StoreCall::Put { path, write } => {
                assert_eq!(path, "data.json");
                assert_eq!(write.sha, None);
                assert!(write.message.contains("Alice"));
            }
            other => panic!("expected put, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn existing_file_is_updated_with_its_sha() {
        let store = Arc::new(FakeContentStore::with_existing("abc123"));
        let publisher = publisher_with(store.clone());

        publisher
            .publish(&payload(r#"{"data":[1,2,3]}"#))
            .await
            .unwrap();

        match store.calls().last() {
            Some(StoreCall::Put { write, .. }) => {
                assert_eq!(write.sha.as_deref(), Some("abc123"));
            }
            other => panic!("expected put, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn payload_routing_fields_override_defaults() {
        let store = Arc::new(FakeContentStore::empty());
        let publisher = publisher_with(store.clone());

        let receipt = publisher
            .publish(&payload(
                r#"{"path":"content/custom.json","branch":"dev","message":"ship it"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(receipt.file, "content/custom.json");
        let calls = store.calls();
        assert_eq!(
            calls[0],
            StoreCall::Get {
                path: "content/custom.json".to_string(),
                branch: "dev".to_string(),
            }
        );
        match &calls[1] {
            StoreCall::Put { write, .. } => {
                assert_eq!(write.branch, "dev");
                assert_eq!(write.message, "ship it");
            }
            other => panic!("expected put, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn content_is_base64_of_pretty_json() {
        let store = Arc::new(FakeContentStore::empty());
        let publisher = publisher_with(store.clone());

        publisher
            .publish(&payload(r#"{"data":[1,2,3]}"#))
            .await
            .unwrap();

        match store.calls().last() {
            Some(StoreCall::Put { write, .. }) => {
                let decoded = BASE64_STANDARD.decode(&write.content).unwrap();
                let value: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
                assert_eq!(value["data"][0], 1);
            }
            other => panic!("expected put, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_failure_aborts_before_the_write() {
        let store = Arc::new(FakeContentStore::failing_get(503));
        let publisher = publisher_with(store.clone());

        let err = publisher
            .publish(&payload(r#"{"data":[]}"#))
            .await
            .expect_err("read failure should abort");

        assert!(matches!(err, PublishError::Upstream { status: 503, .. }));
        assert_eq!(store.calls().len(), 1);
    }

    #[tokio::test]
    async fn write_failure_propagates() {
        let store = Arc::new(FakeContentStore::failing_put(422));
        let publisher = publisher_with(store);

        let err = publisher
            .publish(&payload(r#"{"data":[]}"#))
            .await
            .expect_err("write failure should propagate");

        assert!(matches!(err, PublishError::Upstream { status: 422, .. }));
    }
}
