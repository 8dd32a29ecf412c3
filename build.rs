// build.rs

use std::env;

fn main() -> anyhow::Result<()> {
    // Necessary because of this issue: https://github.com/rust-lang/cargo/issues/9641
    // see also https://github.com/rust-lang/cargo/issues/9554

    embuild::build::CfgArgs::output_propagated("ESP_IDF")?;
    embuild::build::LinkArgs::output_propagated("ESP_IDF")?;

    let wifi_ssid = env::var("WIFI_SSID").unwrap_or_else(|_| "internet".into());
    let wifi_pass = env::var("WIFI_PASS").unwrap_or_else(|_| "password".into());
    let mqtt_url = env::var("MQTT_URL").unwrap_or_else(|_| "mqtt://b37.mqtt.one:1883".into());
    let mqtt_user = env::var("MQTT_USER").unwrap_or_else(|_| "2bqsvw6678".into());
    let mqtt_pass = env::var("MQTT_PASS").unwrap_or_else(|_| "0efiqruwxy".into());
    let device_id = env::var("DEVICE_ID").unwrap_or_else(|_| "2bqsvw6678".into());

    println!("cargo:rustc-env=WIFI_SSID={wifi_ssid}");
    println!("cargo:rustc-env=WIFI_PASS={wifi_pass}");
    println!("cargo:rustc-env=MQTT_URL={mqtt_url}");
    println!("cargo:rustc-env=MQTT_USER={mqtt_user}");
    println!("cargo:rustc-env=MQTT_PASS={mqtt_pass}");
    println!("cargo:rustc-env=DEVICE_ID={device_id}");

    Ok(())
}

// EOF
