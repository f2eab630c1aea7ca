use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use super::{AccessToken, Session, User};

/// The single owned session cell of the application.
///
/// Created once at start-up and handed to the session manager (writer) and to
/// every network adapter (reader). Reactive consumers `subscribe()`; the HTTP
/// layer reads `access_token()` synchronously. Both views read the same cell.
///
/// The generation counter orders competing writers: a login or logout starts a
/// new generation, and a refresh begun in an older one can no longer land.
#[derive(Clone)]
pub struct SessionContext {
    tx: Arc<watch::Sender<Arc<Session>>>,
    generation: Arc<AtomicU64>,
}

impl SessionContext {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Session::signed_out()));
        Self {
            tx: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn current(&self) -> Arc<Session> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.tx.borrow().access_token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.tx.borrow().user.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Session>> {
        self.tx.subscribe()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Starts a new generation without touching the session.
    pub fn advance_generation(&self) -> u64 {
        let mut next = 0;
        // under the channel lock so it orders against `update_if_generation`
        self.tx.send_if_modified(|_| {
            next = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
            false
        });
        next
    }

    /// Replaces the whole session and notifies subscribers.
    pub fn replace(&self, session: Session) {
        self.tx.send_replace(Arc::new(session));
    }

    /// Replaces the session only if no new generation started since
    /// `generation` was read. Check and write happen under one lock, so
    /// `update` must not call back into this context.
    pub fn update_if_generation(
        &self,
        generation: u64,
        update: impl FnOnce(&Session) -> Session,
    ) -> bool {
        self.tx.send_if_modified(|current| {
            if self.generation.load(Ordering::Acquire) != generation {
                return false;
            }
            *current = Arc::new(update(current));
            true
        })
    }

    pub fn clear(&self) {
        self.replace(Session::signed_out());
    }

    /// Flips only the bootstrapping flag, still as a wholesale replace.
    pub fn set_bootstrapping(&self, bootstrapping: bool) {
        self.tx.send_modify(|current| {
            *current = Arc::new(Session::clone(current).with_bootstrapping(bootstrapping));
        });
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UserId;

    #[test]
    fn test_plain_and_reactive_views_agree() {
        let ctx = SessionContext::new();
        let rx = ctx.subscribe();
        assert!(ctx.access_token().is_none());

        ctx.replace(Session::authenticated(
            AccessToken::new("t-1"),
            Some(User {
                id: UserId::new("u-1"),
                email: "u@example.com".to_string(),
                name: None,
            }),
        ));

        assert_eq!(ctx.access_token(), Some(AccessToken::new("t-1")));
        assert_eq!(rx.borrow().access_token, ctx.access_token());

        ctx.clear();
        assert!(ctx.access_token().is_none());
        assert!(rx.borrow().user.is_none());
    }

    #[tokio::test]
    async fn test_subscribers_are_notified_on_replace() {
        let ctx = SessionContext::new();
        let mut rx = ctx.subscribe();

        ctx.set_bootstrapping(true);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().bootstrapping);
    }

    #[test]
    fn test_stale_generation_cannot_write() {
        let ctx = SessionContext::new();
        let generation = ctx.generation();

        assert!(ctx.update_if_generation(generation, |s| s.clone().with_bootstrapping(true)));
        assert!(ctx.current().bootstrapping);

        let next = ctx.advance_generation();
        assert_eq!(next, generation + 1);
        assert!(!ctx.update_if_generation(generation, |_| {
            Session::authenticated(AccessToken::new("late"), None)
        }));
        assert!(ctx.access_token().is_none());
        assert!(ctx.update_if_generation(next, |_| Session::signed_out()));
    }

    #[test]
    fn test_replace_swaps_the_snapshot_reference() {
        let ctx = SessionContext::new();
        let before = ctx.current();
        ctx.set_bootstrapping(false);
        assert!(!Arc::ptr_eq(&before, &ctx.current()));
    }
}
