//! Test doubles for the content store.

use crate::errors::PublishError;
use crate::github::{ContentStore, FileWrite, RemoteFile, WriteReceipt};
use async_trait::async_trait;
use std::sync::Mutex;

/// One recorded call against a [`FakeContentStore`]
#[derive(Clone, Debug, PartialEq)]
pub enum StoreCall {
    Get { path: String, branch: String },
    Put { path: String, write: FileWrite },
}

/// In-memory [`ContentStore`] serving canned responses and recording every
/// call, so tests can assert on the read-then-write sequence without network
/// access.
#[derive(Default)]
pub struct FakeContentStore {
    existing_sha: Option<String>,
    get_failure: Option<u16>,
    put_failure: Option<u16>,
    calls: Mutex<Vec<StoreCall>>,
}

impl FakeContentStore {
    /// Store without the target file; reads report it as absent
    pub fn empty() -> Self {
        FakeContentStore::default()
    }

    /// Store where the target file already exists at the given revision
    pub fn with_existing(sha: &str) -> Self {
        FakeContentStore {
            existing_sha: Some(sha.to_string()),
            ..FakeContentStore::default()
        }
    }

    /// Store whose reads fail with the given upstream status
    pub fn failing_get(status: u16) -> Self {
        FakeContentStore {
            get_failure: Some(status),
            ..FakeContentStore::default()
        }
    }

    /// Store whose writes fail with the given upstream status
    pub fn failing_put(status: u16) -> Self {
        FakeContentStore {
            put_failure: Some(status),
            ..FakeContentStore::default()
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().expect("store call log").clone()
    }
}

#[async_trait]
impl ContentStore for FakeContentStore {
    async fn get(&self, path: &str, branch: &str) -> Result<Option<RemoteFile>, PublishError> {
        self.calls.lock().expect("store call log").push(StoreCall::Get {
            path: path.to_string(),
            branch: branch.to_string(),
        });

        if let Some(status) = self.get_failure {
            return Err(PublishError::Upstream {
                status,
                body: "fake read failure".to_string(),
            });
        }

        Ok(self
            .existing_sha
            .clone()
            .map(|sha| RemoteFile { sha }))
    }

    async fn put(&self, path: &str, write: &FileWrite) -> Result<WriteReceipt, PublishError> {
        self.calls.lock().expect("store call log").push(StoreCall::Put {
            path: path.to_string(),
            write: write.clone(),
        });

        if let Some(status) = self.put_failure {
            return Err(PublishError::Upstream {
                status,
                body: "fake write failure".to_string(),
            });
        }

        Ok(WriteReceipt {
            content_url: Some(format!("https://github.com/octocat/site/blob/main/{path}")),
            commit_url: Some("https://github.com/octocat/site/commit/deadbeef".to_string()),
        })
    }
}
