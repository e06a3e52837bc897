//! In-memory fakes shared by the unit tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::channel::{CredentialRefresher, DeliveryChannel};
use crate::error::{RsvpError, RsvpResult};
use crate::message::MessageBody;
use crate::state::{Credentials, WebhookDestination};

#[derive(Default)]
pub struct FakeChannel {
    sent: Mutex<Vec<(WebhookDestination, MessageBody)>>,
    deleted: Mutex<Vec<String>>,
    failing_titles: HashSet<String>,
    fail_deletes: bool,
}

impl FakeChannel {
    /// Sends of messages whose embed title is in `titles` fail.
    pub fn failing_titles(titles: &[&str]) -> Self {
        FakeChannel {
            failing_titles: titles.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn failing_deletes() -> Self {
        FakeChannel {
            fail_deletes: true,
            ..Default::default()
        }
    }

    pub fn sent_titles(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, body)| body.embeds.first().and_then(|e| e.title.clone()))
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryChannel for FakeChannel {
    async fn send(&self, destination: &WebhookDestination, body: &MessageBody) -> RsvpResult<String> {
        let title = body
            .embeds
            .first()
            .and_then(|e| e.title.clone())
            .unwrap_or_default();
        if self.failing_titles.contains(&title) {
            return Err(RsvpError::Delivery(format!("refusing to send '{title}'")));
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push((destination.clone(), body.clone()));
        Ok(format!("msg-{}", sent.len()))
    }

    async fn delete(&self, _destination: &WebhookDestination, message_id: &str) -> RsvpResult<()> {
        if self.fail_deletes {
            return Err(RsvpError::Delivery(format!("refusing to delete {message_id}")));
        }
        self.deleted.lock().unwrap().push(message_id.to_string());
        Ok(())
    }
}

pub struct FakeRefresher {
    pub result: Option<Credentials>,
    pub calls: Mutex<usize>,
}

impl FakeRefresher {
    pub fn returning(credentials: Credentials) -> Self {
        FakeRefresher {
            result: Some(credentials),
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        FakeRefresher {
            result: None,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl CredentialRefresher for FakeRefresher {
    async fn refresh(&self, _current: &Credentials) -> RsvpResult<Credentials> {
        *self.calls.lock().unwrap() += 1;
        self.result
            .clone()
            .ok_or_else(|| RsvpError::Refresh("token endpoint unavailable".to_string()))
    }
}
