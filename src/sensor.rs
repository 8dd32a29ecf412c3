// sensor.rs

use std::sync::Arc;

use dht_sensor::dht11;
use esp_idf_hal::adc::attenuation;
use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::adc::ADC1;
use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{ADCPin, AnyIOPin, AnyOutputPin, InputOutput, PinDriver, Pull};
use log::*;
use tokio::time::{sleep, Duration};

use crate::*;

/// Above this the indicator LED is driven low (lit, active-low wiring).
pub const TEMP_ALERT_LIMIT: f32 = 30.0;

/// Samples the DHT11 and the water-level ADC once per poll period and
/// writes the snapshot into shared state for the telemetry sender.
pub async fn poll_sensors<P>(
    state: Arc<Pin<Box<MyState>>>,
    adc: ADC1,
    water_pin: P,
    dht_pin: AnyIOPin,
    led_pin: AnyOutputPin,
) -> anyhow::Result<()>
where
    P: ADCPin<Adc = ADC1>,
{
    let adc = AdcDriver::new(adc)?;
    let chan_config = AdcChannelConfig {
        attenuation: attenuation::DB_11,
        ..Default::default()
    };
    let mut water = AdcChannelDriver::new(&adc, water_pin, &chan_config)?;

    let mut dht = PinDriver::input_output_od(dht_pin)?;
    dht.set_pull(Pull::Up)?;
    dht.set_high()?;

    let mut led = PinDriver::output(led_pin)?;
    led.set_high()?;

    let mut water_filter = WaterFilter::new();
    let poll_delay = state.config.read().await.poll_delay_ms;

    loop {
        sleep(Duration::from_millis(poll_delay)).await;

        let (temperature, humidity) = read_climate(&mut dht);
        info!("Temperature: {temperature:.2}");
        info!("Humidity: {humidity:.2}");

        if temperature > TEMP_ALERT_LIMIT {
            led.set_low()?;
        } else {
            led.set_high()?;
        }

        {
            let mut data = state.data.write().await;
            data.temperature = temperature;
            data.humidity = humidity;

            match adc.read_raw(&mut water) {
                Ok(raw) => {
                    let average = water_filter.push(raw);
                    data.water_percent = water_percent(average);
                    info!("Water level: {:.2}%", data.water_percent);
                }
                Err(e) => {
                    // keep the previous average for this cycle
                    error!("Water sensor read failed: {e:?}");
                }
            }
        }
        *state.data_updated.write().await = true;
    }
}

/// One unfiltered DHT11 read. A failed read is not an error here, the
/// sentinel goes out as data.
fn read_climate(dht: &mut PinDriver<'_, AnyIOPin, InputOutput>) -> (f32, f32) {
    if let Err(e) = dht.set_high() {
        warn!("Cannot raise DHT line: {e:?}");
        return (f32::NAN, f32::NAN);
    }

    match dht11::blocking::read(&mut Ets, dht) {
        Ok(reading) => (
            reading.temperature as f32,
            reading.relative_humidity as f32,
        ),
        Err(e) => {
            warn!("DHT11 read failed: {e:?}");
            (f32::NAN, f32::NAN)
        }
    }
}

// EOF
