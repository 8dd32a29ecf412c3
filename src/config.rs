// config.rs

use std::net;

use anyhow::bail;
use crc::{Crc, CRC_32_ISCSI};
use esp_idf_svc::nvs;
use log::*;
use serde::{Deserialize, Serialize};

pub const NVS_BUF_SIZE: usize = 256;

const DEFAULT_MQTT_RETRIES: u32 = 5;
const DEFAULT_RETRY_DELAY_MS: u64 = 2000;
const DEFAULT_POLL_DELAY_MS: u64 = 2000;

const CONFIG_NAME: &str = "cfg";

/// Topic suffixes under the device id prefix.
pub const TOPIC_TEMPERATURE: &str = "temperatura2505";
pub const TOPIC_HUMIDITY: &str = "humidade2505";
pub const TOPIC_WATER_LEVEL: &str = "nivelAgua2505";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MyConfig {
    pub mqtt_retries: u32,
    pub retry_delay_ms: u64,
    pub poll_delay_ms: u64,

    pub wifi_ssid: String,
    pub wifi_pass: String,

    pub v4dhcp: bool,
    pub v4addr: net::Ipv4Addr,
    pub v4mask: u8,
    pub v4gw: net::Ipv4Addr,
    pub dns1: net::Ipv4Addr,
    pub dns2: net::Ipv4Addr,

    pub mqtt_url: String,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub device_id: String,
}

impl Default for MyConfig {
    fn default() -> Self {
        Self {
            mqtt_retries: DEFAULT_MQTT_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            poll_delay_ms: DEFAULT_POLL_DELAY_MS,

            wifi_ssid: option_env!("WIFI_SSID").unwrap_or("internet").into(),
            wifi_pass: option_env!("WIFI_PASS").unwrap_or("password").into(),

            v4dhcp: true,
            v4addr: net::Ipv4Addr::new(0, 0, 0, 0),
            v4mask: 0,
            v4gw: net::Ipv4Addr::new(0, 0, 0, 0),
            dns1: net::Ipv4Addr::new(0, 0, 0, 0),
            dns2: net::Ipv4Addr::new(0, 0, 0, 0),

            mqtt_url: option_env!("MQTT_URL")
                .unwrap_or("mqtt://b37.mqtt.one:1883")
                .into(),
            mqtt_user: option_env!("MQTT_USER").unwrap_or("2bqsvw6678").into(),
            mqtt_pass: option_env!("MQTT_PASS").unwrap_or("0efiqruwxy").into(),
            device_id: option_env!("DEVICE_ID").unwrap_or("2bqsvw6678").into(),
        }
    }
}

impl MyConfig {
    /// Topic subscribed for relay commands, also the ack publish target.
    pub fn control_topic(&self) -> String {
        format!("{}/", self.device_id)
    }

    pub fn telemetry_topic(&self, suffix: &str) -> String {
        format!("{}/{}", self.device_id, suffix)
    }

    pub fn from_nvs(nvs: &mut nvs::EspNvs<nvs::NvsDefault>) -> Option<Self> {
        let mut nvsbuf = [0u8; NVS_BUF_SIZE];
        info!("Reading up to {sz} bytes from nvs...", sz = NVS_BUF_SIZE);
        let b = match nvs.get_raw(CONFIG_NAME, &mut nvsbuf) {
            Err(e) => {
                error!("Nvs read error {e:?}");
                return None;
            }
            Ok(Some(b)) => b,
            _ => {
                error!("Nvs key not found");
                return None;
            }
        };
        info!("Got {sz} bytes from nvs. Parsing config...", sz = b.len());

        let crc = Crc::<u32>::new(&CRC_32_ISCSI);
        let digest = crc.digest();
        match postcard::from_bytes_crc32::<MyConfig>(b, digest) {
            Ok(c) => {
                info!("Successfully parsed config from nvs.");
                Some(c)
            }
            Err(e) => {
                error!("Cannot parse config from nvs: {e:?}");
                None
            }
        }
    }

    pub fn to_nvs(&self, nvs: &mut nvs::EspNvs<nvs::NvsDefault>) -> anyhow::Result<()> {
        let mut nvsbuf = [0u8; NVS_BUF_SIZE];
        let crc = Crc::<u32>::new(&CRC_32_ISCSI);
        let digest = crc.digest();
        let nvsdata = match postcard::to_slice_crc32(self, &mut nvsbuf, digest) {
            Ok(d) => d,
            Err(e) => {
                let estr = format!("Cannot encode config to buffer {e:?}");
                bail!("{estr}");
            }
        };
        info!(
            "Encoded config to {sz} bytes. Saving to nvs...",
            sz = nvsdata.len()
        );

        match nvs.set_raw(CONFIG_NAME, nvsdata) {
            Ok(_) => {
                info!("Config saved.");
                Ok(())
            }
            Err(e) => {
                let estr = format!("Cannot save to nvs: {e:?}");
                bail!("{estr}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_carry_the_device_prefix() {
        let c = MyConfig {
            device_id: "tank01".into(),
            ..Default::default()
        };
        assert_eq!(c.control_topic(), "tank01/");
        assert_eq!(
            c.telemetry_topic(TOPIC_WATER_LEVEL),
            "tank01/nivelAgua2505"
        );
        assert_eq!(
            c.telemetry_topic(TOPIC_TEMPERATURE),
            "tank01/temperatura2505"
        );
        assert_eq!(c.telemetry_topic(TOPIC_HUMIDITY), "tank01/humidade2505");
    }
}

// EOF
