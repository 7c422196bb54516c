//! Request and response bodies of the HTTP surface.
//!
//! Required string fields default to empty so that a missing field reaches
//! validation and is reported by name instead of failing JSON decoding.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterTeamRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVmRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_id: String,
    #[serde(default)]
    pub flavor_id: String,
    #[serde(default)]
    pub network_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_groups: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeVmRequest {
    #[serde(default)]
    pub flavor_id: String,
}

/// `replicas` is nullable: absent and `null` both mean "unspecified",
/// which is distinct from zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScaleRequest {
    #[serde(default)]
    pub replicas: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachDiskRequest {
    #[serde(default)]
    pub volume_id: String,
    #[serde(default)]
    pub instance_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBlockVolumeRequest {
    #[serde(default)]
    pub name: String,
    /// Size in GiB. Zero counts as missing.
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Success payload. Block volume creation also carries the raw apply output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubectl_output: Option<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kubectl_output: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_vm_request_camel_case() {
        let req: CreateVmRequest = serde_json::from_str(
            r#"{"name":"vm1","imageId":"img1","flavorId":"f1","networkId":"net1"}"#,
        )
        .unwrap();
        assert_eq!(req.image_id, "img1");
        assert_eq!(req.network_id, "net1");
        assert!(req.security_groups.is_none());
    }

    #[test]
    fn test_scale_request_distinguishes_zero_from_null() {
        let zero: ScaleRequest = serde_json::from_str(r#"{"replicas":0}"#).unwrap();
        let null: ScaleRequest = serde_json::from_str(r#"{"replicas":null}"#).unwrap();
        let absent: ScaleRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(zero.replicas, Some(0));
        assert_eq!(null.replicas, None);
        assert_eq!(absent.replicas, None);
    }

    #[test]
    fn test_message_response_omits_output() {
        let body = serde_json::to_string(&MessageResponse::new("ok")).unwrap();
        assert_eq!(body, r#"{"message":"ok"}"#);
    }
}
