//! User interactions broadcast to running task workers.

use annotext_core::{DecorationId, Range};
use tokio::sync::broadcast;

/// Event emitted by the editing surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// The user labeled `range` with `tag`.
    UserAnnotateText { range: Range, tag: String },
    /// The selection was replaced.
    UserChangeSelection { ids: Vec<DecorationId> },
    /// A decoration was clicked, `ctrl` toggles instead of selecting.
    UserClickDecoration { id: DecorationId, ctrl: bool },
    /// The listed decorations were removed.
    UserClearAnnotation { ids: Vec<DecorationId> },
    /// A hint was accepted.
    UserAcceptHint { hint_id: DecorationId },
}

impl Interaction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UserAnnotateText { .. } => "user-annotate-text",
            Self::UserChangeSelection { .. } => "user-change-selection",
            Self::UserClickDecoration { .. } => "user-click-decoration",
            Self::UserClearAnnotation { .. } => "user-clear-annotation",
            Self::UserAcceptHint { .. } => "user-accept-hint",
        }
    }
}

/// Fan-out of [`Interaction`]s to live subscribers.
///
/// Subscribers only see interactions published after they subscribed. A
/// subscriber that falls more than `capacity` events behind loses the oldest.
#[derive(Debug, Clone)]
pub struct InteractionBus {
    tx: broadcast::Sender<Interaction>,
    capacity: usize,
}

impl InteractionBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Publish to every current subscriber and return how many there were.
    pub fn publish(&self, interaction: Interaction) -> usize {
        tracing::debug!(kind = interaction.kind(), "publish interaction");
        // No subscribers is not an error; interactions are not replayed.
        self.tx.send(interaction).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Interaction> {
        self.tx.subscribe()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_in_publish_order() {
        let bus = InteractionBus::new(8);
        let mut rx = bus.subscribe();
        let id = DecorationId::new(annotext_core::DecorationKind::Hint, 1);

        assert_eq!(bus.publish(Interaction::UserAcceptHint { hint_id: id }), 1);
        bus.publish(Interaction::UserClickDecoration { id, ctrl: true });

        assert_eq!(rx.recv().await.expect("first").kind(), "user-accept-hint");
        assert_eq!(rx.recv().await.expect("second").kind(), "user-click-decoration");
    }

    #[test]
    fn publish_without_subscribers_is_ok() {
        let bus = InteractionBus::new(0);
        assert_eq!(bus.capacity(), 1);
        let sent = bus.publish(Interaction::UserClearAnnotation { ids: Vec::new() });
        assert_eq!(sent, 0);
    }
}
