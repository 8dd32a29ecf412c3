// bin/esp32tank.rs

#![warn(clippy::large_futures)]

use std::sync::Arc;

use esp32tank::*;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{IOPin, OutputPin};
use esp_idf_hal::prelude::Peripherals;
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs, timer::EspTaskTimerService, wifi::WifiDriver};
use esp_idf_sys::{esp, esp_app_desc};
use log::*;

esp_app_desc!();

fn main() -> anyhow::Result<()> {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    // eventfd is needed by the tokio runtime.  Note you should set max_fds
    // higher if you have other code that may need eventfd.

    #[allow(clippy::needless_update)]
    let config = esp_idf_sys::esp_vfs_eventfd_config_t {
        max_fds: 1,
        ..Default::default()
    };
    esp! { unsafe { esp_idf_sys::esp_vfs_eventfd_register(&config) } }?;

    info!("Hello.");
    info!("Starting up.");

    let sysloop = EspSystemEventLoop::take()?;
    let timer = EspTaskTimerService::new()?;
    let nvs_default_partition = nvs::EspDefaultNvsPartition::take()?;

    let ns = env!("CARGO_BIN_NAME");
    let mut nvs = match nvs::EspNvs::new(nvs_default_partition.clone(), ns, true) {
        Ok(nvs) => {
            info!("Got namespace {ns:?} from default partition");
            nvs
        }
        Err(e) => panic!("Could not get namespace {ns}: {e:?}"),
    };

    #[cfg(feature = "reset_settings")]
    let config = {
        let c = MyConfig::default();
        c.to_nvs(&mut nvs)?;
        c
    };

    #[cfg(not(feature = "reset_settings"))]
    let config = match MyConfig::from_nvs(&mut nvs) {
        None => {
            error!("Could not read nvs config, using defaults");
            let c = MyConfig::default();
            c.to_nvs(&mut nvs)?;
            info!("Successfully saved default config to nvs.");
            c
        }

        // using settings saved on nvs if we could find them
        Some(c) => c,
    };
    info!("My config:\n{config:#?}");

    let peripherals = Peripherals::take().unwrap();
    let pins = peripherals.pins;

    #[cfg(feature = "esp32c3")]
    let (relay_pin, led_pin, dht_pin, water_pin) = (
        pins.gpio2.downgrade_output(),
        pins.gpio7.downgrade_output(),
        pins.gpio0.downgrade(),
        pins.gpio1,
    );

    #[cfg(feature = "esp32s")]
    let (relay_pin, led_pin, dht_pin, water_pin) = (
        pins.gpio26.downgrade_output(),
        pins.gpio27.downgrade_output(),
        pins.gpio4.downgrade(),
        pins.gpio32,
    );

    let adc1 = peripherals.adc1;

    let wifidriver = WifiDriver::new(
        peripherals.modem,
        sysloop.clone(),
        Some(nvs_default_partition),
    )?;

    let state = Box::pin(MyState::new(config));
    let shared_state = Arc::new(state);

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(Box::pin(async move {
            let wifi_loop = WifiLoop {
                state: shared_state.clone(),
                wifi: None,
            };

            info!("Entering main loop...");
            tokio::select! {
                _ = Box::pin(poll_sensors(shared_state.clone(), adc1, water_pin, dht_pin, led_pin)) => {
                    error!("poll_sensors() ended.");
                }
                _ = Box::pin(run_mqtt(shared_state.clone(), relay_pin)) => {
                    error!("run_mqtt() ended.");
                }
                _ = Box::pin(wifi_loop.run(wifidriver, sysloop, timer)) => {
                    error!("wifi_loop.run() ended.");
                }
            };
        }));

    // not actually returning from main() but we reboot instead
    info!("main() finished, reboot.");
    FreeRtos::delay_ms(3000);
    esp_idf_hal::reset::restart();
}

// EOF
