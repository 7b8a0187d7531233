//! Stub collaborators for the end-to-end job scenarios.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use mailclerk_core::{ClerkError, Outcome};
use mailclerk_mail::{Address, MailClient, MessageHandle, OutgoingEmail};
use mailclerk_store::BlobStore;

/// In-memory mail server: one optional candidate message, records sends.
#[derive(Default)]
pub struct StubMailClient {
    pub candidate: Option<Vec<u8>>,
    pub raw_unavailable: bool,
    pub fail_sends: bool,
    pub sent: Mutex<Vec<String>>,
}

impl StubMailClient {
    pub fn with_candidate(raw: &str) -> Self {
        Self {
            candidate: Some(raw.as_bytes().to_vec()),
            ..Self::default()
        }
    }

    pub fn sent_messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailClient for StubMailClient {
    async fn latest_matching(&self, _query: &str) -> Outcome<Option<MessageHandle>> {
        Ok(self.candidate.as_ref().map(|_| MessageHandle { uid: 1 }))
    }

    async fn raw_content(&self, _handle: &MessageHandle) -> Outcome<Option<Vec<u8>>> {
        if self.raw_unavailable {
            return Ok(None);
        }
        Ok(self.candidate.clone())
    }

    async fn send(&self, email: &OutgoingEmail) -> Outcome<String> {
        if self.fail_sends {
            return Err(ClerkError::mail("smtp refused"));
        }
        let formatted = email.formatted()?;
        self.sent.lock().unwrap().push(formatted.clone());
        Ok(formatted)
    }

    async fn send_raw(
        &self,
        _from: &Address,
        _recipients: &[Address],
        raw: &[u8],
    ) -> Outcome<()> {
        if self.fail_sends {
            return Err(ClerkError::mail("smtp refused"));
        }
        self.sent
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(raw).into_owned());
        Ok(())
    }
}

/// In-memory blob store with optional write refusal.
#[derive(Default)]
pub struct MemoryBlobStore {
    pub blobs: Mutex<HashMap<String, String>>,
    pub fail_writes: bool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, content: &str) {
        self.blobs
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.blobs.lock().unwrap().get(path).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self, path: &str) -> Outcome<String> {
        self.blobs
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| ClerkError::store(format!("missing {path}")))
    }

    async fn write(&self, path: &str, content: &str) -> Outcome<()> {
        if self.fail_writes {
            return Err(ClerkError::store("write refused"));
        }
        self.blobs
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }
}
