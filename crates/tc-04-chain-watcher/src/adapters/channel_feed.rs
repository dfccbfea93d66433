//! Membership feed driven through a controller handle.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::Address;

use crate::domain::{EventSourceError, MembershipChange};
use crate::ports::{MembershipFeed, MembershipSink};

type SharedSink = Arc<Mutex<Option<MembershipSink>>>;

/// `MembershipFeed` whose join/part batches are injected by a
/// [`MembershipFeedController`].
pub struct ChannelMembershipFeed {
    sink: SharedSink,
}

/// Sending side of a [`ChannelMembershipFeed`].
#[derive(Clone)]
pub struct MembershipFeedController {
    sink: SharedSink,
}

impl ChannelMembershipFeed {
    /// Feed plus its controller.
    pub fn new() -> (Self, MembershipFeedController) {
        let sink: SharedSink = Arc::new(Mutex::new(None));
        (
            Self {
                sink: Arc::clone(&sink),
            },
            MembershipFeedController { sink },
        )
    }
}

impl MembershipFeedController {
    /// Deliver a join batch. Returns `false` if nobody is listening.
    pub async fn join(&self, members: Vec<Address>) -> bool {
        self.send(MembershipChange::Join(members)).await
    }

    /// Deliver a part batch. Returns `false` if nobody is listening.
    pub async fn part(&self, members: Vec<Address>) -> bool {
        self.send(MembershipChange::Part(members)).await
    }

    /// Whether the feed is currently delivering.
    pub fn is_listening(&self) -> bool {
        self.sink.lock().is_some()
    }

    async fn send(&self, change: MembershipChange) -> bool {
        let sink = self.sink.lock().clone();
        match sink {
            Some(sink) => sink.send(change).await.is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl MembershipFeed for ChannelMembershipFeed {
    async fn listen(&self, sink: MembershipSink) -> Result<(), EventSourceError> {
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    async fn close(&self) {
        self.sink.lock().take();
    }
}
