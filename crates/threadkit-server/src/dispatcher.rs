use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use threadkit_types::api::AddCommentResponse;
use threadkit_types::events::ThreadEvent;

/// Fans committed writes out to observers.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<ThreadEvent>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Dispatcher {
    pub fn new(capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    /// Receive every event.
    pub fn subscribe(&self) -> broadcast::Receiver<ThreadEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Receive only events for one thread.
    pub fn subscribe_thread(&self, thread_id: Uuid) -> ThreadSubscription {
        ThreadSubscription {
            thread_id,
            rx: self.subscribe(),
        }
    }

    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: ThreadEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// One `NewMessage` for the comment, then one `Mention` per mention entry.
    pub fn publish_comment(&self, thread_id: Uuid, author_id: &str, body: &str, res: &AddCommentResponse) {
        self.publish(ThreadEvent::NewMessage {
            message_id: res.message_id,
            thread_id,
            author_id: author_id.to_string(),
            body: body.to_string(),
            mentions: res.mentions.clone(),
        });

        for mention in &res.mentions {
            self.publish(ThreadEvent::Mention {
                message_id: res.message_id,
                thread_id,
                mentioned_user_id: mention.user_id.clone(),
                author_id: author_id.to_string(),
                body: body.to_string(),
            });
        }
    }
}

pub struct ThreadSubscription {
    thread_id: Uuid,
    rx: broadcast::Receiver<ThreadEvent>,
}

impl ThreadSubscription {
    pub fn thread_id(&self) -> Uuid {
        self.thread_id
    }

    /// Next event for this thread, or `None` once the dispatcher is gone.
    pub async fn recv(&mut self) -> Option<ThreadEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.thread_id() == self.thread_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Thread {} subscriber lagged by {} events", self.thread_id, n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
