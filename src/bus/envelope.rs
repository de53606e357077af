use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::service::ServiceError;

/// Methods of the page store reachable over the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Method {
    ListPageNames,
    FetchPage,
    FetchPageById,
    CreatePage,
    SavePage,
    DeletePage,
    ListAllPageData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: u64,
    pub method: Method,
    #[serde(default)]
    pub args: Vec<Value>,
    /// How long the caller is prepared to wait; the worker abandons the call after this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok(Value),
    Err(ServiceError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub id: u64,
    pub outcome: Outcome,
}

impl RequestEnvelope {
    pub fn encode(&self) -> Result<String, ServiceError> {
        serde_json::to_string(self).map_err(|e| ServiceError::Codec(e.to_string()))
    }

    pub fn decode(body: &str) -> Result<Self, ServiceError> {
        serde_json::from_str(body).map_err(|e| ServiceError::Codec(e.to_string()))
    }

    /// Best-effort correlation id of a body that failed to decode
    pub fn peek_id(body: &str) -> Option<u64> {
        serde_json::from_str::<Value>(body).ok()?.get("id")?.as_u64()
    }

    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, ServiceError> {
        let value = self.args.get(index).cloned().ok_or_else(|| {
            ServiceError::Codec(format!("{:?} expects argument {}", self.method, index))
        })?;
        serde_json::from_value(value)
            .map_err(|e| ServiceError::Codec(format!("{:?} argument {}: {}", self.method, index, e)))
    }
}

impl ReplyEnvelope {
    pub fn ok<T: Serialize>(id: u64, value: &T) -> Self {
        let outcome = match serde_json::to_value(value) {
            Ok(v) => Outcome::Ok(v),
            Err(e) => Outcome::Err(ServiceError::Codec(e.to_string())),
        };
        Self { id, outcome }
    }

    pub fn err(id: u64, error: ServiceError) -> Self {
        Self { id, outcome: Outcome::Err(error) }
    }

    pub fn encode(&self) -> Result<String, ServiceError> {
        serde_json::to_string(self).map_err(|e| ServiceError::Codec(e.to_string()))
    }

    pub fn decode(body: &str) -> Result<Self, ServiceError> {
        serde_json::from_str(body).map_err(|e| ServiceError::Codec(e.to_string()))
    }
}

impl Outcome {
    /// Demarshal a successful value into the caller's type
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, ServiceError> {
        match self {
            Outcome::Ok(value) => {
                serde_json::from_value(value).map_err(|e| ServiceError::Codec(e.to_string()))
            }
            Outcome::Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_format() {
        let request = RequestEnvelope {
            id: 9,
            method: Method::SavePage,
            args: vec![json!(3), json!("Yo!")],
            timeout_ms: None,
        };
        let body = request.encode().unwrap();
        assert_eq!(body, r#"{"id":9,"method":"savePage","args":[3,"Yo!"]}"#);
        assert_eq!(RequestEnvelope::decode(&body).unwrap(), request);
    }

    #[test]
    fn typed_argument_access() {
        let request = RequestEnvelope::decode(r#"{"id":1,"method":"fetchPage","args":["Home"]}"#).unwrap();
        assert_eq!(request.arg::<String>(0).unwrap(), "Home");
        assert!(matches!(request.arg::<String>(1), Err(ServiceError::Codec(_))));
        assert!(matches!(request.arg::<i64>(0), Err(ServiceError::Codec(_))));
    }

    #[test]
    fn peek_id_survives_unknown_method() {
        let body = r#"{"id":77,"method":"dropTables","args":[]}"#;
        assert!(RequestEnvelope::decode(body).is_err());
        assert_eq!(RequestEnvelope::peek_id(body), Some(77));
        assert_eq!(RequestEnvelope::peek_id("not json"), None);
    }

    #[test]
    fn reply_outcomes_demarshal() {
        let ok = ReplyEnvelope::decode(&ReplyEnvelope::ok(1, &vec!["a", "b"]).encode().unwrap()).unwrap();
        assert_eq!(ok.outcome.into_result::<Vec<String>>().unwrap(), vec!["a", "b"]);

        let err = ReplyEnvelope::err(2, ServiceError::Storage("disk".into()));
        let body = err.encode().unwrap();
        assert!(body.contains(r#""err":{"kind":"storage","message":"disk"}"#));
        let back = ReplyEnvelope::decode(&body).unwrap();
        assert_eq!(back.outcome.into_result::<()>(), Err(ServiceError::Storage("disk".into())));
    }
}
