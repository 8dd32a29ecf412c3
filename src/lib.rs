// lib.rs
#![warn(clippy::large_futures)]

pub use std::{net, pin::Pin, sync::Arc};

pub use anyhow::bail;
#[allow(ambiguous_glob_reexports)]
pub use esp_idf_hal::{
    delay::{Ets, FreeRtos},
    gpio::{self, *},
    prelude::*,
};
pub use log::*;
pub use serde::{Deserialize, Serialize};
pub use tokio::{
    sync::{Mutex, RwLock},
    time::{Duration, sleep},
};

mod command;
pub use command::*;

mod config;
pub use config::*;

mod filter;
pub use filter::*;

mod mqtt;
pub use mqtt::*;

mod sensor;
pub use sensor::*;

mod state;
pub use state::*;

mod wifi;
pub use wifi::*;

pub const FW_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Latest sensor snapshot, published as-is. Failed reads leave NaN here
/// and NaN goes out on the wire like any other value.
#[derive(Clone, Copy, Debug)]
pub struct Telemetry {
    pub temperature: f32,
    pub humidity: f32,
    pub water_percent: f32,
}

impl Telemetry {
    pub fn new() -> Self {
        Telemetry {
            temperature: f32::NAN,
            humidity: f32::NAN,
            water_percent: 0.0,
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

// EOF
