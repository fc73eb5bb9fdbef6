use serde::{Deserialize, Serialize};

use qm_core::catalog::ResourceRef;
use qm_core::cloudinit::AppProfile;
use qm_core::provider::ServerDetails;
use qm_core::provision::MachineOutcome;
use qm_core::resolver::ResourceKind;

// ── Requests ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateServersRequest {
    pub name: String,
    pub location: String,
    pub image: String,
    #[serde(default)]
    pub app: AppProfile,
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}

// ── Responses ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub kind: ResourceKind,
    pub resolved: ResourceRef,
}

#[derive(Debug, Serialize)]
pub struct CreateServersResponse {
    pub requested: u32,
    pub machines: Vec<MachineResult>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum MachineResult {
    Ready {
        #[serde(flatten)]
        details: ServerDetails,
        #[serde(skip_serializing_if = "Option::is_none")]
        persist_error: Option<String>,
    },
    Failed {
        name: String,
        error: String,
    },
}

impl From<MachineOutcome> for MachineResult {
    fn from(outcome: MachineOutcome) -> Self {
        match outcome {
            MachineOutcome::Ready(report) => MachineResult::Ready {
                details: report.details,
                persist_error: report.persist_error,
            },
            MachineOutcome::Failed { name, reason } => MachineResult::Failed {
                name,
                error: reason.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use qm_core::provider::ServerStatus;

    use super::*;

    fn details() -> ServerDetails {
        ServerDetails {
            id: 42,
            name: "WEB".into(),
            status: ServerStatus::Running,
            server_type: "cx23".into(),
            datacenter: "fsn1-dc14".into(),
            location: "fsn1".into(),
            ipv4: Some("203.0.113.7".into()),
            ipv6: None,
            image: Some("debian-12".into()),
        }
    }

    #[test]
    fn ready_machines_flatten_their_details() {
        let result = MachineResult::Ready {
            details: details(),
            persist_error: None,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["result"], "ready");
        assert_eq!(json["id"], 42);
        assert_eq!(json["status"], "running");
        assert!(json.get("persist_error").is_none());
    }

    #[test]
    fn persist_caveat_is_carried_when_present() {
        let result = MachineResult::Ready {
            details: details(),
            persist_error: Some("a server named WEB is already registered to this user".into()),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["persist_error"].as_str().unwrap().contains("WEB"));
    }

    #[test]
    fn failed_machines_carry_name_and_error() {
        let result = MachineResult::Failed {
            name: "WEB1".into(),
            error: "create failed: provider api error: boom".into(),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["result"], "failed");
        assert_eq!(json["name"], "WEB1");
        assert!(json["error"].as_str().unwrap().contains("boom"));
    }

    #[test]
    fn create_request_defaults_app_and_count() {
        let req: CreateServersRequest = serde_json::from_str(
            r#"{"name": "web", "location": "fsn1", "image": "debian-12"}"#,
        )
        .unwrap();

        assert_eq!(req.app, AppProfile::None);
        assert_eq!(req.count, 1);
    }
}
