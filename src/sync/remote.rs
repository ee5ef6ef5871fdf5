use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::identity::UserId;
use crate::models::payload::CloudPayload;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Remote transport failed: {0}")]
    Transport(String),

    #[error("Remote rejected the request with status {0}")]
    Status(u16),

    #[error("Remote payload could not be decoded: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One logical row per user identity, holding one payload. Read fetches the
/// row; write upserts it in place. No history, no server-side merge.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch(&self, user: &UserId) -> Result<Option<CloudPayload>, RemoteError>;
    async fn upsert(&self, user: &UserId, payload: &CloudPayload) -> Result<(), RemoteError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedSubscriberId(pub u64);

pub type ChangeHandler = Arc<dyn Fn() + Send + Sync>;

/// External realtime capability: "this user's row changed", with no payload
/// attached. Subscribers always re-pull rather than trusting a delta.
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, user: &UserId, handler: ChangeHandler) -> FeedSubscriberId;
    fn unsubscribe(&self, id: FeedSubscriberId);
}
