//! # Cache Records
//!
//! The per-device record stored in a DevAddr bucket, and the resolved view
//! handed back to the uplink pipeline.
//!
//! Records are persisted as JSON hash fields under `devAddrTable:<DevAddr>`.
//! The wire names (`DevEUI`, `LastUpdatedTwins`, ...) are part of the
//! persisted contract and shared with every other node reading the store,
//! so they are fixed here and nowhere else.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_lorawan::{DevAddr, DevEui};

use crate::ports::DeviceTwin;

/// The contents of one DevAddr bucket, keyed by the hash field (the DevEui
/// text form, or the empty string for the negative entry).
pub type Bucket = HashMap<String, DevAddrCacheInfo>;

/// One cached device entry under a DevAddr.
///
/// An entry with no `DevEUI` is the bucket's negative entry: the registry
/// was asked about this DevAddr and returned nothing, so repeated lookups
/// are suppressed until the bucket expires or a sync rewrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevAddrCacheInfo {
    #[serde(rename = "DevEUI", default, with = "eui_text")]
    pub dev_eui: Option<DevEui>,

    #[serde(rename = "DevAddr")]
    pub dev_addr: DevAddr,

    /// Empty when the device is not pinned to a gateway.
    #[serde(rename = "GatewayId", default)]
    pub gateway_id: String,

    /// Empty for OTAA devices that have not joined yet.
    #[serde(rename = "NwkSKey", default)]
    pub nwk_s_key: String,

    /// Credential; fetched lazily and dropped whenever the registry
    /// timestamp moves. Serialises as the empty string when unknown;
    /// readers also accept null.
    #[serde(rename = "PrimaryKey", default, with = "key_text")]
    pub primary_key: Option<String>,

    /// Registry-side last-modification timestamp (ISO-8601 UTC).
    #[serde(rename = "LastUpdatedTwins")]
    pub last_updated: DateTime<Utc>,
}

impl DevAddrCacheInfo {
    /// Build an entry from a registry twin. Credentials are never part of a
    /// twin; they stay empty until the device getter fetches them.
    pub fn from_twin(twin: &DeviceTwin, dev_addr: DevAddr) -> Self {
        Self {
            dev_eui: Some(twin.dev_eui),
            dev_addr,
            gateway_id: twin.gateway_id.clone(),
            nwk_s_key: twin.nwk_s_key.clone(),
            primary_key: None,
            last_updated: twin.last_updated,
        }
    }

    /// Build the negative entry for a DevAddr the registry does not know.
    pub fn negative(dev_addr: DevAddr) -> Self {
        Self {
            dev_eui: None,
            dev_addr,
            gateway_id: String::new(),
            nwk_s_key: String::new(),
            primary_key: None,
            last_updated: Utc::now(),
        }
    }

    /// Whether this is the bucket's negative entry.
    pub fn is_negative(&self) -> bool {
        self.dev_eui.is_none()
    }

    /// The hash field this entry is stored under.
    pub fn hash_field(&self) -> String {
        self.dev_eui.map(|eui| eui.to_string()).unwrap_or_default()
    }

    /// Whether this entry is a candidate for an uplink arriving through the
    /// given gateway. Entries not pinned to a gateway match everything.
    pub fn matches_gateway(&self, gateway_id: &str) -> bool {
        self.gateway_id.is_empty() || self.gateway_id.eq_ignore_ascii_case(gateway_id)
    }

    /// Resolve into the view handed to the uplink pipeline. `None` for the
    /// negative entry.
    pub fn to_device_info(&self) -> Option<IoTHubDeviceInfo> {
        self.dev_eui.map(|dev_eui| IoTHubDeviceInfo {
            dev_eui,
            primary_key: self.primary_key.clone().unwrap_or_default(),
            gateway_id: self.gateway_id.clone(),
            nwk_s_key: self.nwk_s_key.clone(),
        })
    }
}

/// A resolved device: identity plus the credential material the connection
/// layer needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoTHubDeviceInfo {
    pub dev_eui: DevEui,
    pub primary_key: String,
    pub gateway_id: String,
    pub nwk_s_key: String,
}

mod eui_text {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use shared_lorawan::DevEui;

    pub fn serialize<S: Serializer>(
        value: &Option<DevEui>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(eui) => serializer.serialize_str(&eui.to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DevEui>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref() {
            None | Some("") => Ok(None),
            Some(text) => text.parse().map(Some).map_err(de::Error::custom),
        }
    }
}

mod key_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.filter(|text| !text.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry() -> DevAddrCacheInfo {
        DevAddrCacheInfo {
            dev_eui: Some(DevEui(0x0011_2233_4455_6677)),
            dev_addr: DevAddr(0x0123_ABCD),
            gateway_id: "gw-1".to_string(),
            nwk_s_key: String::new(),
            primary_key: Some("c2VjcmV0".to_string()),
            last_updated: Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 9).unwrap(),
        }
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(entry()).unwrap();
        let object = json.as_object().unwrap();
        let mut names: Vec<&str> = object.keys().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(
            names,
            ["DevAddr", "DevEUI", "GatewayId", "LastUpdatedTwins", "NwkSKey", "PrimaryKey"]
        );
        assert_eq!(object["DevEUI"], "00:11:22:33:44:55:66:77");
        assert_eq!(object["DevAddr"], "0123ABCD");
    }

    #[test]
    fn test_roundtrip() {
        let original = entry();
        let json = serde_json::to_string(&original).unwrap();
        let parsed: DevAddrCacheInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_missing_primary_key_serialises_as_empty_string() {
        let mut info = entry();
        info.primary_key = None;
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["PrimaryKey"], "");
    }

    #[test]
    fn test_reader_accepts_null_and_empty_credentials() {
        for raw_key in ["null", "\"\""] {
            let json = format!(
                r#"{{"DevEUI":"00:11:22:33:44:55:66:77","DevAddr":"0123ABCD",
                    "GatewayId":"","NwkSKey":"","PrimaryKey":{raw_key},
                    "LastUpdatedTwins":"2024-05-17T12:00:09Z"}}"#
            );
            let parsed: DevAddrCacheInfo = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed.primary_key, None);
        }
    }

    #[test]
    fn test_negative_entry() {
        let negative = DevAddrCacheInfo::negative(DevAddr(7));
        assert!(negative.is_negative());
        assert_eq!(negative.hash_field(), "");
        assert_eq!(negative.to_device_info(), None);

        let json = serde_json::to_string(&negative).unwrap();
        let parsed: DevAddrCacheInfo = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_negative());
    }

    #[test]
    fn test_gateway_matching() {
        let mut info = entry();
        assert!(info.matches_gateway("GW-1"));
        assert!(!info.matches_gateway("gw-2"));

        info.gateway_id.clear();
        assert!(info.matches_gateway("gw-2"));
    }
}
