//! Response envelope returned for every dispatched command.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome marker of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Nok,
}

/// `{"status": "ok"|"nok", "title": <command>, "data": <result>}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: Status,
    /// Command name the envelope answers, or `"unknown"` for non-string payloads.
    pub title: String,
    /// Human-readable result text, or structured data for informational commands.
    pub data: Value,
}

impl Envelope {
    pub fn ok(title: impl Into<String>, data: impl Into<Value>) -> Self {
        Self {
            status: Status::Ok,
            title: title.into(),
            data: data.into(),
        }
    }

    pub fn nok(title: impl Into<String>, data: impl Into<Value>) -> Self {
        Self {
            status: Status::Nok,
            title: title.into(),
            data: data.into(),
        }
    }

    /// Success envelope with the standard `Command <name> Executed` text.
    pub fn executed(name: &str) -> Self {
        Self::ok(name, format!("Command {} Executed", name))
    }

    pub fn not_supported(name: &str) -> Self {
        Self::nok(name, format!("Command {} Not Supported", name))
    }

    pub fn missing_argument(name: &str) -> Self {
        Self::nok(name, format!("Command {} Need 1 argument", name))
    }

    /// Failure envelope for a payload that is neither a string nor a list.
    pub fn unknown_payload(payload: &Value) -> Self {
        Self::nok("unknown", format!("Command Not Supported: {}", payload))
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// The `data` field as text, if it is a string.
    pub fn data_text(&self) -> Option<&str> {
        self.data.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_string(&Envelope::executed("forward")).unwrap();
        assert_eq!(
            json,
            r#"{"status":"ok","title":"forward","data":"Command forward Executed"}"#
        );
    }

    #[test]
    fn test_failure_texts() {
        let env = Envelope::not_supported("fly");
        assert_eq!(env.status, Status::Nok);
        assert!(env.data_text().unwrap().contains("Not Supported"));

        let env = Envelope::missing_argument("wsB");
        assert_eq!(env.title, "wsB");
        assert!(env.data_text().unwrap().contains("Need 1 argument"));
    }

    #[test]
    fn test_unknown_payload() {
        let env = Envelope::unknown_payload(&json!({"cmd": "forward"}));
        assert_eq!(env.title, "unknown");
        assert!(!env.is_ok());
        assert!(env.data_text().unwrap().starts_with("Command Not Supported: "));
    }

    #[test]
    fn test_structured_data_deserializes() {
        let env: Envelope =
            serde_json::from_str(r#"{"status":"ok","title":"get_info","data":["41.2","3.0","20.5"]}"#)
                .unwrap();
        assert!(env.is_ok());
        assert_eq!(env.data, json!(["41.2", "3.0", "20.5"]));
    }
}
