//! Application profiles and the cloud-init payloads that install them.

use std::fmt;

use serde::{Deserialize, Serialize};

const COOLIFY_CLOUD_INIT: &str = "#cloud-config
package_update: true
packages:
  - curl
runcmd:
  - curl -fsSL https://get.docker.com | sh
  - curl -fsSL https://cdn.coollabs.io/coolify/install.sh | bash
";

const WIREGUARD_CLOUD_INIT: &str = "#cloud-config
package_update: true
packages:
  - wireguard
  - qrencode
runcmd:
  - sysctl -w net.ipv4.ip_forward=1
  - sysctl -w net.ipv6.conf.all.forwarding=1
";

/// Optional software profile applied to a new server on first boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppProfile {
    #[default]
    None,
    Coolify,
    Wireguard,
}

impl AppProfile {
    /// Cloud-init user data for this profile, `None` for a bare server.
    pub fn user_data(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Coolify => Some(COOLIFY_CLOUD_INIT),
            Self::Wireguard => Some(WIREGUARD_CLOUD_INIT),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Coolify => "coolify",
            Self::Wireguard => "wireguard",
        }
    }
}

impl fmt::Display for AppProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
