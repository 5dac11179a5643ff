//! Gremlin Server wire messages (GraphSON v2)
//!
//! Requests go out as binary frames prefixed with the serializer mime type.
//! Responses come back as JSON, possibly spread over several `206` frames
//! before the final `200`/`204`.

use crate::graphson;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use gex_core::{StatusAttributes, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Serializer negotiated with the server
pub const MIME_TYPE: &str = "application/vnd.gremlin-v2.0+json";

/// Response status codes
pub mod status {
    pub const SUCCESS: u16 = 200;
    pub const NO_CONTENT: u16 = 204;
    pub const PARTIAL_CONTENT: u16 = 206;
    pub const AUTHENTICATE: u16 = 407;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestMessage<'a> {
    request_id: TypedUuid,
    op: &'static str,
    processor: &'static str,
    args: RequestArgs<'a>,
}

#[derive(Debug, Serialize)]
struct TypedUuid {
    #[serde(rename = "@type")]
    kind: &'static str,
    #[serde(rename = "@value")]
    value: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestArgs<'a> {
    Eval {
        gremlin: &'a str,
        bindings: serde_json::Map<String, Value>,
        language: &'static str,
    },
    Authentication {
        sasl: String,
    },
}

/// Encode an `eval` request for one query
pub fn eval_request(request_id: Uuid, gremlin: &str) -> Result<Vec<u8>, serde_json::Error> {
    encode(&RequestMessage {
        request_id: typed(request_id),
        op: "eval",
        processor: "",
        args: RequestArgs::Eval {
            gremlin,
            bindings: serde_json::Map::new(),
            language: "gremlin-groovy",
        },
    })
}

/// Encode the answer to a `407` challenge for `request_id`
pub fn authentication_request(
    request_id: Uuid,
    identity: &str,
    secret: &str,
) -> Result<Vec<u8>, serde_json::Error> {
    encode(&RequestMessage {
        request_id: typed(request_id),
        op: "authentication",
        processor: "",
        args: RequestArgs::Authentication {
            sasl: sasl_plain(identity, secret),
        },
    })
}

/// SASL PLAIN token: `\0identity\0secret`, base64 encoded
pub fn sasl_plain(identity: &str, secret: &str) -> String {
    let mut token = Vec::with_capacity(identity.len() + secret.len() + 2);
    token.push(0);
    token.extend_from_slice(identity.as_bytes());
    token.push(0);
    token.extend_from_slice(secret.as_bytes());
    STANDARD.encode(token)
}

fn typed(value: Uuid) -> TypedUuid {
    TypedUuid {
        kind: "g:UUID",
        value,
    }
}

fn encode(message: &RequestMessage<'_>) -> Result<Vec<u8>, serde_json::Error> {
    let body = serde_json::to_vec(message)?;
    let mut frame = Vec::with_capacity(1 + MIME_TYPE.len() + body.len());
    frame.push(MIME_TYPE.len() as u8);
    frame.extend_from_slice(MIME_TYPE.as_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// One response frame
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    #[serde(default)]
    request_id: Value,
    pub status: ResponseStatus,
    #[serde(default)]
    result: ResponseResult,
}

#[derive(Debug, Deserialize)]
pub struct ResponseStatus {
    pub code: u16,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    attributes: Value,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseResult {
    #[serde(default)]
    data: Value,
}

impl ResponseMessage {
    /// Request id this frame answers, accepting plain or typed UUIDs
    pub fn request_id(&self) -> Option<Uuid> {
        match graphson::untype(self.request_id.clone()) {
            Value::String(id) => Uuid::parse_str(&id).ok(),
            _ => None,
        }
    }

    /// Status message, or a generic one built from the code
    pub fn message(&self) -> String {
        match self.status.message.as_deref() {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => format!("Gremlin server returned status {}", self.status.code),
        }
    }

    /// Status attributes with GraphSON types removed
    pub fn attributes(&self) -> StatusAttributes {
        match graphson::untype(self.status.attributes.clone()) {
            Value::Object(map) => map,
            _ => StatusAttributes::new(),
        }
    }

    /// Consume the frame, yielding its result rows in order
    pub fn into_rows(self) -> Vec<Value> {
        match graphson::untype(self.result.data) {
            Value::Null => Vec::new(),
            Value::Array(rows) => rows,
            row => vec![row],
        }
    }
}

/// Decode a response frame
pub fn decode_response(bytes: &[u8]) -> Result<ResponseMessage, TransportError> {
    serde_json::from_slice(bytes)
        .map_err(|e| TransportError::Protocol(format!("Malformed response frame: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(frame: &[u8]) -> Value {
        let mime_len = frame[0] as usize;
        assert_eq!(&frame[1..1 + mime_len], MIME_TYPE.as_bytes());
        serde_json::from_slice(&frame[1 + mime_len..]).unwrap()
    }

    #[test]
    fn test_eval_request_frame() {
        let id = Uuid::new_v4();
        let frame = eval_request(id, "g.V().count()").unwrap();
        let message = body(&frame);

        assert_eq!(message["op"], "eval");
        assert_eq!(message["processor"], "");
        assert_eq!(message["requestId"]["@type"], "g:UUID");
        assert_eq!(message["requestId"]["@value"], id.to_string());
        assert_eq!(message["args"]["gremlin"], "g.V().count()");
        assert_eq!(message["args"]["language"], "gremlin-groovy");
        assert_eq!(message["args"]["bindings"], json!({}));
    }

    #[test]
    fn test_authentication_request_frame() {
        let id = Uuid::new_v4();
        let frame = authentication_request(id, "/dbs/graphdb/colls/people", "key").unwrap();
        let message = body(&frame);

        assert_eq!(message["op"], "authentication");
        assert_eq!(message["requestId"]["@value"], id.to_string());
        let sasl = STANDARD
            .decode(message["args"]["sasl"].as_str().unwrap())
            .unwrap();
        assert_eq!(sasl, b"\0/dbs/graphdb/colls/people\0key");
    }

    #[test]
    fn test_decode_success_frame() {
        let id = Uuid::new_v4();
        let raw = json!({
            "requestId": id.to_string(),
            "status": {
                "code": 200,
                "message": "",
                "attributes": {"x-ms-status-code": 200, "x-ms-total-request-charge": 5.7}
            },
            "result": {"data": [{"id": "1", "label": "person"}], "meta": {}}
        });
        let response = decode_response(raw.to_string().as_bytes()).unwrap();

        assert_eq!(response.request_id(), Some(id));
        assert_eq!(response.status.code, status::SUCCESS);
        assert_eq!(response.attributes()["x-ms-total-request-charge"], json!(5.7));
        assert_eq!(response.message(), "Gremlin server returned status 200");
        assert_eq!(response.into_rows(), vec![json!({"id": "1", "label": "person"})]);
    }

    #[test]
    fn test_decode_typed_frame() {
        let id = Uuid::new_v4();
        let raw = json!({
            "requestId": {"@type": "g:UUID", "@value": id.to_string()},
            "status": {"code": 204, "message": null, "attributes": {}},
            "result": {"data": null, "meta": {}}
        });
        let response = decode_response(raw.to_string().as_bytes()).unwrap();

        assert_eq!(response.request_id(), Some(id));
        assert!(response.into_rows().is_empty());
    }

    #[test]
    fn test_decode_error_frame_keeps_message() {
        let raw = json!({
            "requestId": Uuid::new_v4().to_string(),
            "status": {"code": 597, "message": "Unable to resolve symbol", "attributes": {}}
        });
        let response = decode_response(raw.to_string().as_bytes()).unwrap();
        assert_eq!(response.message(), "Unable to resolve symbol");
        assert!(response.into_rows().is_empty());
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_response(b"not json"),
            Err(TransportError::Protocol(_))
        ));
    }
}
