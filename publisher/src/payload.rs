use crate::errors::PublishError;
use chrono::Utc;
use serde_json::Value;

/// The free-form JSON body of a publish request.
///
/// The payload is pushed wholesale; a few optional top-level fields steer
/// where it lands: `path`, `branch`, and `message`. A display name under
/// `meta.name` (or top-level `name`) feeds the synthesized commit message.
#[derive(Clone, Debug)]
pub struct PushPayload(Value);

impl PushPayload {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PublishError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(PublishError::EmptyBody);
        }

        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| PublishError::InvalidBody(e.to_string()))?;

        Ok(PushPayload(value))
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Target path override, if the payload carries one
    pub fn path(&self) -> Option<&str> {
        self.str_field("path")
    }

    /// Target branch override, if the payload carries one
    pub fn branch(&self) -> Option<&str> {
        self.str_field("branch")
    }

    /// Explicit commit message, if the payload carries one
    pub fn message(&self) -> Option<&str> {
        self.str_field("message")
    }

    /// Display name embedded in the payload
    pub fn name(&self) -> Option<&str> {
        self.0
            .get("meta")
            .and_then(|meta| meta.get("name"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| self.str_field("name"))
    }

    /// The commit message for a write to `path`: the payload's explicit
    /// message when present, otherwise synthesized from the target, the
    /// embedded name, and a UTC timestamp.
    pub fn commit_message(&self, path: &str) -> String {
        if let Some(message) = self.message() {
            return message.to_string();
        }

        let stamp = Utc::now().format("%Y-%m-%d %H:%M UTC");
        match self.name() {
            Some(name) => format!("Update {path} for {name} ({stamp})"),
            None => format!("Update {path} ({stamp})"),
        }
    }

    /// Canonical serialization committed to the repository
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.0.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> PushPayload {
        PushPayload::from_slice(json.as_bytes()).expect("valid payload")
    }

    #[test]
    fn empty_body_is_rejected() {
        assert!(matches!(
            PushPayload::from_slice(b""),
            Err(PublishError::EmptyBody)
        ));
        assert!(matches!(
            PushPayload::from_slice(b"  \n "),
            Err(PublishError::EmptyBody)
        ));
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(matches!(
            PushPayload::from_slice(b"{not json"),
            Err(PublishError::InvalidBody(_))
        ));
    }

    #[test]
    fn routing_fields_are_extracted() {
        let payload = payload(r#"{"path":"custom.json","branch":"dev","message":"hello"}"#);

        assert_eq!(payload.path(), Some("custom.json"));
        assert_eq!(payload.branch(), Some("dev"));
        assert_eq!(payload.message(), Some("hello"));
    }

    #[test]
    fn missing_and_empty_routing_fields_are_none() {
        let payload = payload(r#"{"path":"","data":[1,2,3]}"#);

        assert_eq!(payload.path(), None);
        assert_eq!(payload.branch(), None);
        assert_eq!(payload.message(), None);
    }

    #[test]
    fn name_prefers_meta_over_top_level() {
        let payload = payload(r#"{"meta":{"name":"Alice"},"name":"Bob"}"#);
        assert_eq!(payload.name(), Some("Alice"));

        let payload = self::payload(r#"{"name":"Bob"}"#);
        assert_eq!(payload.name(), Some("Bob"));
    }

    #[test]
    fn explicit_message_wins() {
        let payload = payload(r#"{"message":"custom message","meta":{"name":"Alice"}}"#);
        assert_eq!(payload.commit_message("data.json"), "custom message");
    }

    #[test]
    fn synthesized_message_includes_path_and_name() {
        let payload = payload(r#"{"meta":{"name":"Alice"},"data":[1,2,3]}"#);
        let message = payload.commit_message("data.json");

        assert!(message.contains("data.json"));
        assert!(message.contains("Alice"));
        assert!(message.contains("UTC"));
    }

    #[test]
    fn pretty_serialization_round_trips() {
        let payload = payload(r#"{"data":[1,2,3]}"#);
        let pretty = payload.to_pretty_json();

        let parsed: Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(parsed["data"][2], 3);
    }
}
