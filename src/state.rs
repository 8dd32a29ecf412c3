// state.rs

use crate::*;

use std::net::{self, Ipv4Addr};

use tokio::sync::RwLock;

/// All mutable device state, owned in one place and shared behind locks.
/// Everything runs on the single-threaded runtime; the locks are for
/// shape, not contention.
pub struct MyState {
    pub config: RwLock<MyConfig>,
    pub wifi_up: RwLock<bool>,
    pub ip_addr: RwLock<Ipv4Addr>,
    pub myid: RwLock<String>,
    /// Relay drive level: written by the command handler, read back for
    /// the actuator write and its acknowledgement.
    pub relay_on: RwLock<bool>,
    pub data: RwLock<Telemetry>,
    pub data_updated: RwLock<bool>,
}

impl MyState {
    pub fn new(config: MyConfig) -> Self {
        MyState {
            config: RwLock::new(config),
            wifi_up: RwLock::new(false),
            ip_addr: RwLock::new(net::Ipv4Addr::new(0, 0, 0, 0)),
            myid: RwLock::new("esp32tank".into()),
            relay_on: RwLock::new(false),
            data: RwLock::new(Telemetry::new()),
            data_updated: RwLock::new(false),
        }
    }
}

// EOF
