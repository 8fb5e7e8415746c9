use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::BackendError;

/// Backend endpoints answer either with the bare payload or with the payload
/// wrapped in an envelope (`{ "success": true, "data": ... }`). Both shapes
/// are accepted here so the domain only ever sees `T`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub enum Payload<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Payload<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

/// Decodes a response body into `T`, accepting either shape.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, BackendError> {
    serde_json::from_slice::<Payload<T>>(body)
        .map(Payload::into_inner)
        .map_err(|e| BackendError::Decode(e.to_string()))
}

/// Like [`decode`] for endpoints that may answer `{ "data": null }`.
/// The envelope is recognised by its `data` key.
pub fn decode_optional<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, BackendError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| BackendError::Decode(e.to_string()))?;

    let decoded = match value {
        serde_json::Value::Object(mut map) if map.contains_key("data") => {
            serde_json::from_value::<Option<T>>(map.remove("data").unwrap_or_default())
        }
        other => serde_json::from_value::<T>(other).map(Some),
    };
    decoded.map_err(|e| BackendError::Decode(e.to_string()))
}

/// Outcome reported by the batch-send endpoint, when it reports one.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BatchStatus {
    pub success: Option<bool>,
    pub error: Option<String>,
}

impl BatchStatus {
    /// An empty or unrecognized body counts as success once the status code is 2xx.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    pub fn into_result(self) -> Result<(), BackendError> {
        match self.success {
            Some(false) => Err(BackendError::Rejected(
                self.error
                    .unwrap_or_else(|| "batch send reported failure".to_string()),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::types::NotificationRecipient;

    const RECIPIENT: &str = r#"{
        "id": "00000000-0000-0000-0000-000000000001",
        "address": "jefe@h.org",
        "is_permanent": true,
        "is_selected": false
    }"#;

    #[test]
    fn bare_array_is_accepted() {
        let body = format!("[{RECIPIENT}]");
        let output: Vec<NotificationRecipient> = decode(body.as_bytes()).unwrap();
        assert_eq!(output.len(), 1);
    }

    #[test]
    fn enveloped_array_is_accepted() {
        let body = format!(r#"{{"success": true, "data": [{RECIPIENT}], "error": null}}"#);
        let output: Vec<NotificationRecipient> = decode(body.as_bytes()).unwrap();
        assert_eq!(output[0].address, "jefe@h.org");
    }

    #[test]
    fn bare_object_is_accepted() {
        let output: NotificationRecipient = decode(RECIPIENT.as_bytes()).unwrap();
        assert!(output.is_permanent);
    }

    #[test]
    fn optional_distinguishes_null_data_from_bare_object() {
        let output: Option<NotificationRecipient> = decode_optional(RECIPIENT.as_bytes()).unwrap();
        assert_eq!(output.unwrap().address, "jefe@h.org");

        let output: Option<NotificationRecipient> =
            decode_optional(br#"{"success": true, "data": null}"#).unwrap();
        assert!(output.is_none());

        let body = format!(r#"{{"success": true, "data": {RECIPIENT}}}"#);
        let output: Option<NotificationRecipient> = decode_optional(body.as_bytes()).unwrap();
        assert!(output.is_some());
    }

    #[test]
    fn wrong_shape_is_decode_error() {
        let output = decode::<Vec<NotificationRecipient>>(br#"{"items": []}"#);
        assert!(matches!(output.unwrap_err(), BackendError::Decode(_)));
    }

    #[test]
    fn batch_status_failure_is_rejected() {
        let status = BatchStatus::from_body(br#"{"success": false, "error": "smtp down"}"#);
        assert!(matches!(
            status.into_result().unwrap_err(),
            BackendError::Rejected(msg) if msg == "smtp down"
        ));
    }

    #[test]
    fn batch_status_empty_body_is_success() {
        assert!(BatchStatus::from_body(b"").into_result().is_ok());
        assert!(BatchStatus::from_body(br#"{"success": true}"#).into_result().is_ok());
    }
}
