//! Channel preference gate.

use herald_common::types::{Channel, Recipient};

/// Decides whether a recipient currently accepts a channel.
pub struct PreferenceGate;

impl PreferenceGate {
    /// A channel is allowed when the recipient opted in AND has an address
    /// for it — a missing push token, email or phone number disallows the
    /// channel regardless of the stored preference flag.
    ///
    /// Pure function of the recipient's fields; no side effects.
    pub fn allows(recipient: &Recipient, channel: Channel) -> bool {
        recipient.opted_in(channel) && recipient.address_for(channel).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use herald_common::types::RecipientRole;
    use uuid::Uuid;

    fn make_recipient() -> Recipient {
        Recipient {
            id: Uuid::new_v4(),
            school_id: None,
            role: RecipientRole::Guardian,
            push_token: Some("token".to_string()),
            email: Some("g@example.com".to_string()),
            phone: Some("+22790000001".to_string()),
            push_opt_in: true,
            email_opt_in: true,
            sms_opt_in: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_all_channels_allowed_when_opted_in_with_addresses() {
        let r = make_recipient();
        for channel in Channel::ALL {
            assert!(PreferenceGate::allows(&r, channel));
        }
    }

    #[test]
    fn test_opt_out_disallows() {
        let mut r = make_recipient();
        r.email_opt_in = false;
        assert!(!PreferenceGate::allows(&r, Channel::Email));
        assert!(PreferenceGate::allows(&r, Channel::Push));
    }

    #[test]
    fn test_missing_address_disallows_despite_opt_in() {
        let mut r = make_recipient();
        r.push_token = None;
        assert!(r.push_opt_in);
        assert!(!PreferenceGate::allows(&r, Channel::Push));
    }

    #[test]
    fn test_empty_address_disallows() {
        let mut r = make_recipient();
        r.phone = Some(String::new());
        assert!(!PreferenceGate::allows(&r, Channel::Sms));
    }
}
