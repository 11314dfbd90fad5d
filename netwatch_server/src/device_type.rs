use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Device categories shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceType {
    Router,
    Switch,
    AccessPoint,
    Firewall,
    Camera,
    Pc,
    Printer,
    Media,
    Server,
    Phone,
    #[default]
    Other,
}

/// Keyword groups checked top to bottom; the first group with a hit decides.
/// Reordering changes how ambiguous names ("router switch") are classified.
/// A leading space anchors a short keyword to the start of a word, so "nas"
/// matches "nas-01" but not "dynasty".
const TYPE_RULES: &[(&[&str], DeviceType)] = &[
    (
        &["mikrotik", "routerboard", "router", "gateway", " ccr", " gw-", " gw_"],
        DeviceType::Router,
    ),
    (&["switch", " crs", " css", " sw-", " sw_"], DeviceType::Switch),
    (
        &[
            "access point",
            "access-point",
            "accesspoint",
            "wifi",
            "wi-fi",
            "wlan",
            "wireless",
            "unifi",
            " ap-",
            " ap_",
            " ap ",
        ],
        DeviceType::AccessPoint,
    ),
    (
        &["firewall", "fortigate", "pfsense", "opnsense", " fw-"],
        DeviceType::Firewall,
    ),
    (
        &["camera", " cam-", "cctv", " nvr", " dvr", "ipcam", "hikvision", "dahua"],
        DeviceType::Camera,
    ),
    (
        &[" pc-", " pc ", "desktop", "laptop", "notebook", "workstation", "computer"],
        DeviceType::Pc,
    ),
    (
        &["printer", " print", "laserjet", "officejet", " mfp", "plotter", "scanner"],
        DeviceType::Printer,
    ),
    (
        &["smart tv", "television", " tv-", "-tv ", "chromecast", "projector", " roku", " media"],
        DeviceType::Media,
    ),
    (
        &["server", " srv", " nas", "synology", "qnap", "esxi", "proxmox", " vm-"],
        DeviceType::Server,
    ),
    (
        &["phone", "voip", " sip", " pbx", "android"],
        DeviceType::Phone,
    ),
];

impl DeviceType {
    pub const ALL: [DeviceType; 11] = [
        DeviceType::Router,
        DeviceType::Switch,
        DeviceType::AccessPoint,
        DeviceType::Firewall,
        DeviceType::Camera,
        DeviceType::Pc,
        DeviceType::Printer,
        DeviceType::Media,
        DeviceType::Server,
        DeviceType::Phone,
        DeviceType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Router => "ROUTER",
            DeviceType::Switch => "SWITCH",
            DeviceType::AccessPoint => "ACCESS_POINT",
            DeviceType::Firewall => "FIREWALL",
            DeviceType::Camera => "CAMERA",
            DeviceType::Pc => "PC",
            DeviceType::Printer => "PRINTER",
            DeviceType::Media => "MEDIA",
            DeviceType::Server => "SERVER",
            DeviceType::Phone => "PHONE",
            DeviceType::Other => "OTHER",
        }
    }

    /// Guess a category from a device name or netwatch comment
    pub fn classify(text: &str) -> DeviceType {
        let padded = format!(" {} ", text.to_lowercase());
        TYPE_RULES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| padded.contains(k)))
            .map(|(_, category)| *category)
            .unwrap_or_default()
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown device type '{s}'"))
    }
}
