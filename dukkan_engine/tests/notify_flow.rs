use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use dukkan_engine::{
    db_types::{NewNotification, Notification},
    events::EventBus,
    test_utils::{prepare_test_env, random_db_path},
    traits::NotificationQuery,
    ChannelError,
    NotificationChannel,
    Notifier,
    SqliteDatabase,
};
use futures::future::BoxFuture;
use serde_json::json;

/// Records every dispatch instead of delivering anywhere.
#[derive(Clone, Default)]
struct RecordingChannel {
    sent: Arc<Mutex<Vec<(i64, Vec<String>)>>>,
}

impl RecordingChannel {
    fn dispatches(&self) -> Vec<(i64, Vec<String>)> {
        self.sent.lock().unwrap().clone()
    }
}

impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, notification: &Notification, push_tokens: &[String]) -> BoxFuture<'static, Result<(), ChannelError>> {
        let sent = Arc::clone(&self.sent);
        let entry = (notification.id, push_tokens.to_vec());
        Box::pin(async move {
            sent.lock().unwrap().push(entry);
            Ok(())
        })
    }
}

/// Fails every send, to prove one broken channel is invisible to the caller and to its siblings.
struct BrokenChannel;

impl NotificationChannel for BrokenChannel {
    fn name(&self) -> &str {
        "broken"
    }

    fn send(&self, _notification: &Notification, _push_tokens: &[String]) -> BoxFuture<'static, Result<(), ChannelError>> {
        Box::pin(async { Err(ChannelError::Transport("wire cut".to_string())) })
    }
}

async fn wait_for_dispatches(channel: &RecordingChannel, count: usize) -> Vec<(i64, Vec<String>)> {
    for _ in 0..100 {
        let dispatches = channel.dispatches();
        if dispatches.len() >= count {
            return dispatches;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("channel never saw {count} dispatch(es); got {:?}", channel.dispatches());
}

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await
}

#[tokio::test]
async fn notify_persists_publishes_and_dispatches() {
    let db = new_db().await;
    let bus = EventBus::new();
    let mut sub = bus.subscribe();
    let channel = RecordingChannel::default();
    let notifier = Notifier::new(db.clone(), bus, vec![Arc::new(channel.clone()), Arc::new(BrokenChannel)]);

    let stored = notifier
        .notify(NewNotification::new("order_created", "New order", "Order #1 was placed"))
        .await
        .unwrap();
    assert_eq!(stored.kind, "order_created");
    assert!(!stored.is_read);

    let event = sub.recv().await.unwrap();
    assert!(event.contains("\"type\":\"notification\""));
    assert!(event.contains("order_created"));

    let dispatches = wait_for_dispatches(&channel, 1).await;
    assert_eq!(dispatches[0].0, stored.id);

    // The record is queryable straight away.
    let page = notifier.search(NotificationQuery::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, stored.id);
}

#[tokio::test]
async fn push_tokens_are_targeted_by_the_payload_user() {
    let db = new_db().await;
    let channel = RecordingChannel::default();
    let notifier = Notifier::new(db.clone(), EventBus::new(), vec![Arc::new(channel.clone())]);
    notifier.register_token("u-1", "token-a").await.unwrap();
    notifier.register_token("u-1", "token-b").await.unwrap();
    notifier.register_token("u-2", "token-c").await.unwrap();

    // A payload naming a user reaches only that user's tokens.
    notifier
        .notify(
            NewNotification::new("payment_confirmed", "Paid", "Order #5 paid").with_data(json!({"userId": "u-1"})),
        )
        .await
        .unwrap();
    let dispatches = wait_for_dispatches(&channel, 1).await;
    let mut tokens = dispatches[0].1.clone();
    tokens.sort();
    assert_eq!(tokens, vec!["token-a".to_string(), "token-b".to_string()]);

    // No user in the payload means broadcast to every registered token.
    notifier.notify(NewNotification::new("promo", "Sale", "Everything must go")).await.unwrap();
    let dispatches = wait_for_dispatches(&channel, 2).await;
    assert_eq!(dispatches[1].1.len(), 3);
}

#[tokio::test]
async fn unregistering_a_token_removes_it_from_dispatch() {
    let db = new_db().await;
    let channel = RecordingChannel::default();
    let notifier = Notifier::new(db.clone(), EventBus::new(), vec![Arc::new(channel.clone())]);
    notifier.register_token("u-1", "token-a").await.unwrap();
    // Idempotent re-register.
    notifier.register_token("u-1", "token-a").await.unwrap();
    notifier.unregister_token("u-1", "token-a").await.unwrap();

    notifier
        .notify(NewNotification::new("ping", "Ping", "Hello").with_data(json!({"userId": "u-1"})))
        .await
        .unwrap();
    let dispatches = wait_for_dispatches(&channel, 1).await;
    assert!(dispatches[0].1.is_empty());
}

#[tokio::test]
async fn read_markers_behave() {
    let db = new_db().await;
    let notifier = Notifier::new(db.clone(), EventBus::new(), vec![]);
    let a = notifier.notify(NewNotification::new("k", "A", "first")).await.unwrap();
    notifier.notify(NewNotification::new("k", "B", "second")).await.unwrap();

    assert!(notifier.mark_read(a.id).await.unwrap());
    assert!(!notifier.mark_read(9999).await.unwrap());

    let unread = notifier.search(NotificationQuery { unread_only: true, ..Default::default() }).await.unwrap();
    assert_eq!(unread.total, 1);

    assert_eq!(notifier.mark_all_read().await.unwrap(), 1);
    let unread = notifier.search(NotificationQuery { unread_only: true, ..Default::default() }).await.unwrap();
    assert_eq!(unread.total, 0);
}
