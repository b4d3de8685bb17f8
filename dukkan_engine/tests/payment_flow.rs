use dukkan_common::Money;
use dukkan_engine::{
    db_types::{Order, OrderStatus, PaymentMethod, PaymentStatus},
    events::EventBus,
    test_utils::{prepare_test_env, random_db_path, seed_product},
    traits::NotificationQuery,
    LedgerError,
    Notifier,
    NotificationStore,
    OrderLedgerApi,
    PaymentIntakeApi,
    SqliteDatabase,
};

struct Harness {
    db: SqliteDatabase,
    intake: PaymentIntakeApi<SqliteDatabase>,
}

async fn harness() -> Harness {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    seed_product(&db, 7, "Mocha beans 1kg", Money::from(1000)).await.unwrap();
    let notifier = Notifier::new(db.clone(), EventBus::new(), vec![]);
    Harness { db: db.clone(), intake: PaymentIntakeApi::new(db, notifier) }
}

impl Harness {
    /// A checked-out order for `user` containing `quantity` units of product 7.
    async fn checked_out_order(&self, user: &str, quantity: i64) -> Order {
        let ledger = OrderLedgerApi::new(self.db.clone());
        ledger.add_item(user, 7, quantity).await.unwrap();
        ledger.checkout(user).await.unwrap()
    }

    async fn notifications_of_kind(&self, kind: &str) -> i64 {
        let query = NotificationQuery { kind: Some(kind.to_string()), ..Default::default() };
        self.db.search_notifications(query).await.unwrap().total
    }
}

#[tokio::test]
async fn proof_upload_records_a_pending_payment() {
    let h = harness().await;
    let order = h.checked_out_order("alice", 2).await;

    let (payment, order) = h
        .intake
        .submit_proof(order.id, PaymentMethod::BankTransfer, None, Some("/uploads/slip-1.jpg".to_string()), None)
        .await
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, Money::from(2000), "amount defaults to the order total");
    assert_eq!(payment.proof_url.as_deref(), Some("/uploads/slip-1.jpg"));
    assert_eq!(order.status, OrderStatus::PendingPayment);
    assert_eq!(h.notifications_of_kind("payment_proof_uploaded").await, 1);
}

#[tokio::test]
async fn proof_upload_against_a_missing_order_fails() {
    let h = harness().await;
    let err = h.intake.submit_proof(999, PaymentMethod::Cash, None, None, None).await.unwrap_err();
    assert!(matches!(err, LedgerError::OrderNotFound(999)));
}

#[tokio::test]
async fn staff_confirmation_marks_payment_and_order_paid() {
    let h = harness().await;
    let order = h.checked_out_order("bob", 1).await;
    h.intake.submit_proof(order.id, PaymentMethod::Kuraimi, None, None, None).await.unwrap();

    let (payment, order) = h.intake.confirm(order.id, None, Some("KUR-0042")).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert_eq!(payment.provider_reference.as_deref(), Some("KUR-0042"));
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(h.notifications_of_kind("payment_confirmed").await, 1);
}

#[tokio::test]
async fn confirmation_without_any_payment_fails() {
    let h = harness().await;
    let order = h.checked_out_order("carol", 1).await;
    let err = h.intake.confirm(order.id, None, None).await.unwrap_err();
    assert!(matches!(err, LedgerError::PaymentNotFound(id) if id == order.id));
}

#[tokio::test]
async fn confirmation_rejects_a_payment_from_another_order() {
    let h = harness().await;
    let order_a = h.checked_out_order("dave", 1).await;
    let order_b = h.checked_out_order("erin", 1).await;
    let (payment_a, _) = h.intake.submit_proof(order_a.id, PaymentMethod::Cash, None, None, None).await.unwrap();

    let err = h.intake.confirm(order_b.id, Some(payment_a.id), None).await.unwrap_err();
    assert!(matches!(err, LedgerError::PaymentOrderMismatch { .. }));
}

#[tokio::test]
async fn webhook_with_paid_status_settles_the_order() {
    let h = harness().await;
    let order = h.checked_out_order("frank", 3).await;
    let reference = format!("ORDER-{}", order.id);

    let upsert = h.intake.ingest_webhook(&reference, "PAID", Some("TXN-100".to_string()), None).await.unwrap();
    assert!(upsert.inserted);
    assert_eq!(upsert.payment.method, PaymentMethod::Kuraimi);
    assert_eq!(upsert.payment.status, PaymentStatus::Paid);
    assert_eq!(upsert.payment.amount, Money::from(3000));
    assert_eq!(upsert.order.status, OrderStatus::Paid);
    assert_eq!(h.notifications_of_kind("payment_received").await, 1);
}

#[tokio::test]
async fn webhook_replays_are_deduplicated() {
    let h = harness().await;
    let order = h.checked_out_order("grace", 1).await;
    let reference = format!("ORDER-{}", order.id);

    let first = h.intake.ingest_webhook(&reference, "paid", Some("TXN-200".to_string()), None).await.unwrap();
    let replay = h.intake.ingest_webhook(&reference, "paid", Some("TXN-200".to_string()), None).await.unwrap();
    assert!(first.inserted);
    assert!(!replay.inserted);
    assert_eq!(replay.payment.id, first.payment.id);
    // No second notification for the replay.
    assert_eq!(h.notifications_of_kind("payment_received").await, 1);
}

#[tokio::test]
async fn webhook_with_malformed_reference_is_rejected() {
    let h = harness().await;
    let err = h.intake.ingest_webhook("ORDER-abc", "paid", None, None).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidReference(_)));
}

#[tokio::test]
async fn a_paid_order_never_regresses() {
    let h = harness().await;
    let order = h.checked_out_order("heidi", 1).await;
    h.intake.confirm(order.id, None, None).await.unwrap_err(); // no payment yet
    h.intake.submit_proof(order.id, PaymentMethod::Card, None, None, None).await.unwrap();
    let (_, order) = h.intake.confirm(order.id, None, None).await.unwrap();
    assert_eq!(order.status, OrderStatus::Paid);

    // A late pending webhook for the same order must not pull it back to pending_payment.
    let reference = format!("ORDER-{}", order.id);
    let upsert = h.intake.ingest_webhook(&reference, "pending", Some("TXN-300".to_string()), None).await.unwrap();
    assert!(upsert.inserted);
    assert_eq!(upsert.order.status, OrderStatus::Paid);
}

#[tokio::test]
async fn latest_payment_wins_when_none_is_named() {
    let h = harness().await;
    let order = h.checked_out_order("ivan", 1).await;
    h.intake.submit_proof(order.id, PaymentMethod::Cash, Some(Money::from(400)), None, None).await.unwrap();
    let (second, _) =
        h.intake.submit_proof(order.id, PaymentMethod::BankTransfer, Some(Money::from(600)), None, None).await.unwrap();

    let (confirmed, _) = h.intake.confirm(order.id, None, None).await.unwrap();
    assert_eq!(confirmed.id, second.id);
    assert_eq!(confirmed.amount, Money::from(600));
}
