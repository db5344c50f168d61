use serde::{Deserialize, Serialize};

/// One request per connection, newline-terminated JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcRequest {
    pub id: String,
    #[serde(flatten)]
    pub payload: IpcRequestPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum IpcRequestPayload {
    Ping,
    GetState,
    Navigate { url: String },
    StartElementSelect,
    CancelElementSelect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    pub id: String,
    #[serde(flatten)]
    pub payload: IpcResponsePayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum IpcResponsePayload {
    Ok,
    State { state: EditorState },
    Error { message: String },
}

impl IpcResponse {
    pub fn ok(id: impl Into<String>) -> Self {
        Self { id: id.into(), payload: IpcResponsePayload::Ok }
    }

    pub fn state(id: impl Into<String>, state: EditorState) -> Self {
        Self { id: id.into(), payload: IpcResponsePayload::State { state } }
    }

    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self { id: id.into(), payload: IpcResponsePayload::Error { message: message.into() } }
    }
}

/// What the editor host knows about the embedded browser, as reported
/// through `get_state`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdp_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_through_json() {
        let req = IpcRequest { id: "1".into(), payload: IpcRequestPayload::Navigate { url: "https://example.com".into() } };
        let line = serde_json::to_string(&req).unwrap();
        let back: IpcRequest = serde_json::from_str(&line).unwrap();
        assert_eq!(req.id, back.id);
        assert!(matches!(back.payload, IpcRequestPayload::Navigate { url } if url == "https://example.com"));
    }

    #[test]
    fn response_variants_serialize_with_tag() {
        let resp = IpcResponse::error("7", "boom");
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["payload"]["message"], "boom");
    }
}
