use serde::{Deserialize, Serialize};

/// A subscriber as stored in the datastore `subscribers` collection.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SubscriberRecord {
    pub id: String,
    /// Subscriber id assigned by the mailing-list service.
    pub uid: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub bonus_status: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSubscriberRecord {
    pub uid: i64,
    pub email: String,
    pub phone: String,
    pub bonus_status: bool,
}

/// Partial update of the contact fields. The bonus flag is never part of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactUpdate {
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BonusAwarded {
    pub bonus_status: bool,
}

impl NewSubscriberRecord {
    pub fn new(uid: i64, email: String, phone: String) -> NewSubscriberRecord {
        NewSubscriberRecord {
            uid,
            email,
            phone,
            bonus_status: false,
        }
    }
}

impl SubscriberRecord {
    pub fn contact_differs(&self, email: &str, phone: &str) -> bool {
        self.email != email || self.phone != phone
    }
}

impl BonusAwarded {
    pub fn new() -> BonusAwarded {
        BonusAwarded { bonus_status: true }
    }
}

impl Default for BonusAwarded {
    fn default() -> Self {
        Self::new()
    }
}
