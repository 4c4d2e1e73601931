/// Status of a subscriber's membership in one mailing list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Unconfirmed,
    Confirmed,
    Unsubscribed,
}

impl SubscriptionStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, SubscriptionStatus::Confirmed)
    }

    pub fn parse(status: &str) -> Result<SubscriptionStatus, String> {
        match status {
            "unconfirmed" => Ok(SubscriptionStatus::Unconfirmed),
            "confirmed" => Ok(SubscriptionStatus::Confirmed),
            "unsubscribed" => Ok(SubscriptionStatus::Unsubscribed),
            _ => Err(format!("{} is not a valid subscription status", status)),
        }
    }
}
