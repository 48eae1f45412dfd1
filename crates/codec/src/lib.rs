// Rust guideline compliant 2026-08-24

//! Wire codec for the ingestion pipeline.
//!
//! Serializes a `TransactionEvent` to/from the JSON queue message body.
//! Entry points: [`encode`], [`decode`]. The wire object uses camelCase
//! keys; `amount` accepts a decimal string or a JSON number and is written
//! back as a string to preserve precision.

use domain::{CodecError, TransactionEvent};

/// Serialize `event` into a JSON message body.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] when serialization fails. Should not
/// occur for a well-formed event.
pub fn encode(event: &TransactionEvent) -> Result<String, CodecError> {
    serde_json::to_string(event).map_err(|e| CodecError::Encode { reason: e.to_string() })
}

/// Deserialize a JSON message body into a `TransactionEvent`.
///
/// Beyond JSON-level validity, enforces the wire invariants: a non-empty
/// `transactionId` (the sole identity for dedup and idempotent
/// re-processing) and a non-negative `amount`.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed JSON, missing required
/// fields, an empty `transactionId`, or a negative `amount`.
pub fn decode(body: &str) -> Result<TransactionEvent, CodecError> {
    let event: TransactionEvent =
        serde_json::from_str(body).map_err(|e| CodecError::Decode { reason: e.to_string() })?;
    if event.transaction_id.is_empty() {
        return Err(CodecError::Decode {
            reason: "transactionId must be non-empty".to_owned(),
        });
    }
    if event.amount.is_sign_negative() {
        return Err(CodecError::Decode {
            reason: format!("amount must be non-negative, got {}", event.amount),
        });
    }
    Ok(event)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{decode, encode};
    use chrono::{TimeZone as _, Utc};
    use domain::{CodecError, TransactionEvent};
    use rust_decimal::Decimal;
    use std::str::FromStr as _;

    fn make_event() -> TransactionEvent {
        TransactionEvent {
            transaction_id: "tx-100".to_owned(),
            account_id: "acc-7".to_owned(),
            amount: Decimal::from_str("20000.00").unwrap(),
            currency: "USD".to_owned(),
            source_country: "US".to_owned(),
            destination_country: "GB".to_owned(),
            timestamp: Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap(),
            account_creation_date: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            ip_address: "192.168.0.10".to_owned(),
            device_id: "dev-42".to_owned(),
            request_id: Some("req-1".to_owned()),
        }
    }

    // Send then receive the same event -- the decoded body equals the
    // original event.
    #[test]
    fn encode_decode_roundtrip() {
        let event = make_event();
        let body = encode(&event).unwrap();
        let decoded = decode(&body).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn amount_accepts_decimal_string() {
        let body = r#"{
            "transactionId": "tx-1", "accountId": "a", "amount": "1234.56",
            "currency": "EUR", "sourceCountry": "DE", "destinationCountry": "FR",
            "timestamp": "2026-08-01T12:00:00Z", "accountCreationDate": null,
            "ipAddress": "1.2.3.4", "deviceId": "d"
        }"#;
        let event = decode(body).unwrap();
        assert_eq!(event.amount, Decimal::from_str("1234.56").unwrap());
    }

    #[test]
    fn amount_accepts_json_number() {
        let body = r#"{
            "transactionId": "tx-2", "accountId": "a", "amount": 500.25,
            "currency": "EUR", "sourceCountry": "DE", "destinationCountry": "FR",
            "timestamp": "2026-08-01T12:00:00Z", "accountCreationDate": null,
            "ipAddress": "1.2.3.4", "deviceId": "d"
        }"#;
        let event = decode(body).unwrap();
        assert_eq!(event.amount, Decimal::from_str("500.25").unwrap());
    }

    #[test]
    fn null_account_creation_date_is_none() {
        let body = r#"{
            "transactionId": "tx-3", "accountId": "a", "amount": "1.00",
            "currency": "EUR", "sourceCountry": "DE", "destinationCountry": "FR",
            "timestamp": "2026-08-01T12:00:00Z", "accountCreationDate": null,
            "ipAddress": "1.2.3.4", "deviceId": "d"
        }"#;
        let event = decode(body).unwrap();
        assert!(event.account_creation_date.is_none());
    }

    #[test]
    fn absent_account_creation_date_is_none() {
        let body = r#"{
            "transactionId": "tx-4", "accountId": "a", "amount": "1.00",
            "currency": "EUR", "sourceCountry": "DE", "destinationCountry": "FR",
            "timestamp": "2026-08-01T12:00:00Z",
            "ipAddress": "1.2.3.4", "deviceId": "d"
        }"#;
        let event = decode(body).unwrap();
        assert!(event.account_creation_date.is_none());
    }

    #[test]
    fn absent_request_id_is_none_and_not_serialized() {
        let mut event = make_event();
        event.request_id = None;
        let body = encode(&event).unwrap();
        assert!(!body.contains("requestId"));
        assert!(decode(&body).unwrap().request_id.is_none());
    }

    #[test]
    fn timestamp_is_iso8601() {
        let event = make_event();
        let body = encode(&event).unwrap();
        assert!(body.contains("2026-08-01T12:00:00Z"), "body: {body}");
    }

    #[test]
    fn malformed_json_rejected() {
        let result = decode("{not json");
        assert!(matches!(result, Err(CodecError::Decode { .. })));
    }

    #[test]
    fn missing_required_field_rejected() {
        // No amount.
        let body = r#"{
            "transactionId": "tx-5", "accountId": "a",
            "currency": "EUR", "sourceCountry": "DE", "destinationCountry": "FR",
            "timestamp": "2026-08-01T12:00:00Z",
            "ipAddress": "1.2.3.4", "deviceId": "d"
        }"#;
        assert!(matches!(decode(body), Err(CodecError::Decode { .. })));
    }

    #[test]
    fn empty_transaction_id_rejected() {
        let mut event = make_event();
        event.transaction_id = String::new();
        let body = encode(&event).unwrap();
        let result = decode(&body);
        assert!(
            matches!(result, Err(CodecError::Decode { ref reason }) if reason.contains("transactionId")),
            "expected transactionId rejection, got {result:?}"
        );
    }

    #[test]
    fn negative_amount_rejected() {
        let body = r#"{
            "transactionId": "tx-6", "accountId": "a", "amount": "-5.00",
            "currency": "EUR", "sourceCountry": "DE", "destinationCountry": "FR",
            "timestamp": "2026-08-01T12:00:00Z", "accountCreationDate": null,
            "ipAddress": "1.2.3.4", "deviceId": "d"
        }"#;
        let result = decode(body);
        assert!(
            matches!(result, Err(CodecError::Decode { ref reason }) if reason.contains("non-negative")),
            "expected amount rejection, got {result:?}"
        );
    }
}
