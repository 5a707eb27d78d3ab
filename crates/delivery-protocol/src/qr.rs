use crate::error::ProtocolError;
use serde_json::Value;

/// Decoded QR payload: an order identifier and its matching secret key.
///
/// Any shape other than exactly these two fields is rejected (a QR code is
/// an adversarial input surface, so this parser is intentionally strict
/// rather than permissive).
#[derive(Debug, Clone, PartialEq)]
pub struct QrPayload {
    pub order_id: u32,
    pub secret_key: String,
}

impl QrPayload {
    pub fn new(order_id: u32, secret_key: impl Into<String>) -> Self {
        Self { order_id, secret_key: secret_key.into() }
    }

    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ProtocolError::InvalidQrPayload(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| ProtocolError::InvalidQrPayload("expected a JSON object".into()))?;

        if object.len() != 2 {
            return Err(ProtocolError::InvalidQrPayload(format!(
                "expected exactly 2 fields, got {}",
                object.len()
            )));
        }

        let order_id = object
            .get("order_id")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| ProtocolError::InvalidQrPayload("missing/invalid order_id".into()))?;

        let secret_key = object
            .get("secret_key")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::InvalidQrPayload("missing/invalid secret_key".into()))?;

        if !secret_key.chars().all(|c| !c.is_control()) {
            return Err(ProtocolError::InvalidQrPayload(
                "secret_key must be printable".into(),
            ));
        }

        Ok(QrPayload { order_id, secret_key: secret_key.to_string() })
    }

    pub fn encode(&self) -> String {
        serde_json::json!({
            "order_id": self.order_id,
            "secret_key": self.secret_key,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_valid_payload() {
        let payload = QrPayload::new(42, "abc");
        let encoded = payload.encode();
        let decoded = QrPayload::parse(&encoded).unwrap();
        assert_eq!(payload, decoded);
    }

    #[test]
    fn rejects_missing_field() {
        assert!(QrPayload::parse(r#"{"order_id":1}"#).is_err());
    }

    #[test]
    fn rejects_extra_field() {
        assert!(QrPayload::parse(r#"{"order_id":1,"secret_key":"a","extra":true}"#).is_err());
    }

    #[test]
    fn rejects_non_object() {
        assert!(QrPayload::parse("[1,2,3]").is_err());
        assert!(QrPayload::parse("not json").is_err());
    }

    #[test]
    fn rejects_control_characters_in_secret() {
        assert!(QrPayload::parse(r#"{"order_id":1,"secret_key":"a\nb"}"#).is_err());
    }
}
