use homestead_core::models::ListingContact;
use serde_json::Value;

use super::{as_text, first_text, lookup};

/// Where each contact field is looked for, most authoritative first.
///
/// Fields are resolved independently, so a name from the agent block can be
/// paired with a phone number that only the broker block carries.
const NAME_PATHS: &[&str] = &[
    "attributionInfo.agentName",
    "attributionInfo.brokerName",
    "contact_recipients.0.display_name",
    "contactRecipients.0.display_name",
    "listingAgent.name",
    "listing_agent.name",
    "agentName",
];

/// Phones rank agent/broker, then contact recipients, then listing-agent fields.
const AGENT_BROKER_PHONE_PATHS: &[&str] = &[
    "attributionInfo.agentPhoneNumber",
    "attributionInfo.brokerPhoneNumber",
];

const LISTING_AGENT_PHONE_PATHS: &[&str] =
    &["listingAgent.phone", "listing_agent.phone", "agentPhoneNumber"];

const EMAIL_PATHS: &[&str] = &[
    "attributionInfo.agentEmail",
    "attributionInfo.brokerEmail",
    "contact_recipients.0.email",
    "contactRecipients.0.email",
    "listingAgent.email",
    "listing_agent.email",
    "agentEmail",
];

/// Contact recipients carry the phone as `{areacode, prefix, number}`.
const RECIPIENT_PHONE_PATHS: &[&str] = &["contact_recipients.0.phone", "contactRecipients.0.phone"];

pub fn extract_contact(payload: &Value) -> ListingContact {
    ListingContact {
        name: first_text(payload, NAME_PATHS).unwrap_or_default(),
        phone: phone(payload).unwrap_or_default(),
        email: first_text(payload, EMAIL_PATHS).unwrap_or_default(),
    }
}

fn phone(payload: &Value) -> Option<String> {
    first_text(payload, AGENT_BROKER_PHONE_PATHS)
        .or_else(|| {
            RECIPIENT_PHONE_PATHS
                .iter()
                .find_map(|p| lookup(payload, p).and_then(structured_phone))
        })
        .or_else(|| first_text(payload, LISTING_AGENT_PHONE_PATHS))
}

fn structured_phone(value: &Value) -> Option<String> {
    if let Some(text) = as_text(value) {
        return Some(text);
    }
    let part = |key: &str| value.get(key).and_then(as_text).unwrap_or_default();
    let (area, prefix, number) = (part("areacode"), part("prefix"), part("number"));
    if number.is_empty() {
        return None;
    }
    Some(
        [area, prefix, number]
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("-"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn agent_info_wins() {
        let payload = json!({
            "attributionInfo": {
                "agentName": "Dana Reyes",
                "agentPhoneNumber": "918-555-0101",
                "agentEmail": "dana@example.com",
                "brokerName": "Green Country Realty"
            },
            "listingAgent": {"name": "Someone Else"}
        });
        assert_eq!(
            extract_contact(&payload),
            ListingContact {
                name: "Dana Reyes".into(),
                phone: "918-555-0101".into(),
                email: "dana@example.com".into(),
            }
        );
    }

    #[test]
    fn fields_resolve_independently() {
        let payload = json!({
            "attributionInfo": {"brokerName": "Green Country Realty", "brokerPhoneNumber": "918-555-0199"},
            "contact_recipients": [{
                "display_name": "Recipient",
                "email": "leads@example.com",
                "phone": {"areacode": "918", "prefix": "555", "number": "0123"}
            }]
        });
        let contact = extract_contact(&payload);
        assert_eq!(contact.name, "Green Country Realty");
        assert_eq!(contact.phone, "918-555-0199");
        assert_eq!(contact.email, "leads@example.com");
    }

    #[test]
    fn recipient_phone_object_is_joined() {
        let payload = json!({
            "contactRecipients": [{
                "display_name": "Pat Lee",
                "phone": {"areacode": "405", "prefix": "555", "number": "0144"}
            }],
            "agentPhoneNumber": "000"
        });
        let contact = extract_contact(&payload);
        assert_eq!(contact.name, "Pat Lee");
        assert_eq!(contact.phone, "405-555-0144");
    }

    #[test]
    fn flat_agent_fields_are_last_resort() {
        let payload = json!({
            "agentName": "Flat Agent",
            "agentPhoneNumber": "555-0000",
            "agentEmail": "flat@example.com"
        });
        let contact = extract_contact(&payload);
        assert_eq!(contact.name, "Flat Agent");
        assert_eq!(contact.phone, "555-0000");
        assert_eq!(contact.email, "flat@example.com");

        assert!(extract_contact(&json!({})).is_empty());
    }

    #[test]
    fn phone_tiers_rank_in_order() {
        let recipient = json!([{"phone": {"areacode": "405", "prefix": "555", "number": "0144"}}]);
        let mut payload = json!({
            "attributionInfo": {"agentPhoneNumber": "918-555-0101"},
            "contact_recipients": recipient,
            "listingAgent": {"phone": "539-555-0177"}
        });
        assert_eq!(extract_contact(&payload).phone, "918-555-0101");

        payload["attributionInfo"] = json!({});
        assert_eq!(extract_contact(&payload).phone, "405-555-0144");

        payload["contact_recipients"] = json!([]);
        assert_eq!(extract_contact(&payload).phone, "539-555-0177");
    }
}
