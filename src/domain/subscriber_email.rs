use validator::validate_email;

/// Customer email as accepted by the mailing list. Surrounding whitespace is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(email: String) -> Result<SubscriberEmail, String> {
        let email = email.trim();

        if email.is_empty() {
            return Err(String::from("customer has no email"));
        }

        if !validate_email(email) {
            return Err(format!("customer email '{}' is not valid", email));
        }

        Ok(Self(email.to_string()))
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
