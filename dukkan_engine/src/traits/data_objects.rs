use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Notification, Order, Payment};

/// Result of recording a payment against an order.
///
/// `inserted` is false when the payment was deduplicated against an existing record with the same provider reference,
/// in which case `payment` is the stored record and no state was changed.
#[derive(Debug, Clone)]
pub struct PaymentUpsert {
    pub payment: Payment,
    pub order: Order,
    pub inserted: bool,
}

/// Filter and pagination parameters for the notification log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationQuery {
    pub page: u32,
    pub limit: u32,
    pub unread_only: bool,
    pub kind: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
}

impl NotificationQuery {
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    pub fn limit(&self) -> u32 {
        match self.limit {
            0 => 20,
            n => n.min(100),
        }
    }

    pub fn offset(&self) -> u32 {
        (self.page() - 1) * self.limit()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}
