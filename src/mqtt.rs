// mqtt.rs

use std::future::Future;
use std::sync::Arc;

use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_svc::mqtt::client::{
    EspAsyncMqttClient, EspAsyncMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};
use esp_idf_svc::sys::EspError;
use log::*;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

use crate::*;

type SharedClient = Arc<Mutex<EspAsyncMqttClient>>;
type RelayPin = Arc<Mutex<PinDriver<'static, AnyOutputPin, Output>>>;

/// Keeps the broker connection alive and runs the command/telemetry
/// loops over it. Owns the relay output for the lifetime of the task.
///
/// Each fresh connection re-subscribes to the control topic before any
/// traffic; subscriptions do not survive a reconnect. A connection that
/// cannot be established within the retry budget is retried from scratch
/// one poll period later, forever.
pub async fn run_mqtt(
    state: Arc<Pin<Box<MyState>>>,
    relay_pin: AnyOutputPin,
) -> anyhow::Result<()> {
    let mut relay = PinDriver::output(relay_pin)?;
    relay.set_low()?;
    let relay: RelayPin = Arc::new(Mutex::new(relay));

    loop {
        if *state.wifi_up.read().await {
            break;
        }
        sleep(Duration::from_secs(1)).await;
    }

    let poll_delay = state.config.read().await.poll_delay_ms;
    loop {
        let (client, conn) = match Box::pin(connect_broker(&state)).await {
            Some(pair) => pair,
            None => {
                sleep(Duration::from_millis(poll_delay)).await;
                continue;
            }
        };
        let client: SharedClient = Arc::new(Mutex::new(client));

        tokio::select! {
            _ = Box::pin(command_loop(state.clone(), conn, client.clone(), relay.clone())) => {
                error!("MQTT connection closed.");
            }
            _ = Box::pin(telemetry_sender(state.clone(), client.clone())) => {}
        }
    }
}

/// Runs `attempt` up to `retries` times with a fixed delay after each
/// failure. Returns the first success, or None with the budget spent.
/// Every call is a fresh round counting from attempt 0; a success
/// consumes no further attempts.
pub async fn retry_bounded<T, E, F, Fut>(retries: u32, delay: Duration, mut attempt: F) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Debug,
{
    for n in 0..retries {
        match attempt(n).await {
            Ok(v) => return Some(v),
            Err(e) => {
                error!("Attempt {n} failed: {e:?}");
                sleep(delay).await;
            }
        }
    }
    None
}

/// Bounded connection attempt: up to `mqtt_retries` tries with a fixed
/// delay in between, subscribing to the control topic on success.
/// Returns None with the budget spent; the caller decides when to start
/// a new round.
async fn connect_broker(
    state: &Arc<Pin<Box<MyState>>>,
) -> Option<(EspAsyncMqttClient, EspAsyncMqttConnection)> {
    let config = state.config.read().await.clone();
    let myid = state.myid.read().await.clone();
    let control_topic = config.control_topic();

    let pair = retry_bounded(
        config.mqtt_retries,
        Duration::from_millis(config.retry_delay_ms),
        |attempt| {
            let config = &config;
            let myid = &myid;
            let control_topic = &control_topic;
            async move {
                info!("MQTT connecting... (attempt {attempt})");
                let (mut client, conn) = EspAsyncMqttClient::new(
                    &config.mqtt_url,
                    &MqttClientConfiguration {
                        client_id: Some(myid),
                        username: Some(&config.mqtt_user),
                        password: Some(&config.mqtt_pass),
                        keep_alive_interval: Some(Duration::from_secs(25)),
                        ..Default::default()
                    },
                )?;
                client.subscribe(control_topic, QoS::AtMostOnce).await?;
                info!("MQTT connected, subscribed to {control_topic}");
                Ok::<_, EspError>((client, conn))
            }
        },
    )
    .await;

    if pair.is_none() {
        error!("MQTT broker unreachable, giving up for now");
    }
    pair
}

/// Drains broker events and applies relay commands as they arrive.
/// Returns when the connection drops.
async fn command_loop(
    state: Arc<Pin<Box<MyState>>>,
    mut conn: EspAsyncMqttConnection,
    client: SharedClient,
    relay: RelayPin,
) {
    while let Ok(event) = Box::pin(conn.next()).await {
        match event.payload() {
            EventPayload::Received { topic, data, .. } => {
                info!(
                    "MQTT received on {t}: {m}",
                    t = topic.unwrap_or("-"),
                    m = String::from_utf8_lossy(data)
                );
                if let Some(level) = parse_relay_command(data) {
                    if let Err(e) =
                        Box::pin(apply_relay(&state, &client, &relay, level)).await
                    {
                        error!("Relay command failed: {e:?}");
                    }
                }
            }
            other => {
                info!("MQTT event: {other:?}");
            }
        }
    }
}

/// Writes the relay output, records the new state and echoes the
/// acknowledgement to the control topic.
async fn apply_relay(
    state: &Arc<Pin<Box<MyState>>>,
    client: &SharedClient,
    relay: &RelayPin,
    level: bool,
) -> anyhow::Result<()> {
    *state.relay_on.write().await = level;

    let on = *state.relay_on.read().await;
    {
        let mut pin = relay.lock().await;
        if on {
            pin.set_high()?;
        } else {
            pin.set_low()?;
        }
    }

    let control_topic = state.config.read().await.control_topic();
    let ack = relay_ack(on);
    info!("Relay {ack}");
    client
        .lock()
        .await
        .publish(&control_topic, QoS::AtMostOnce, false, ack.as_bytes())
        .await?;
    Ok(())
}

/// Publishes the latest snapshot once per poll period, one topic per
/// value, formatted to two decimals. A failed publish is logged and
/// dropped; the next cycle sends fresh data anyway.
async fn telemetry_sender(state: Arc<Pin<Box<MyState>>>, client: SharedClient) -> ! {
    let (poll_delay, topics) = {
        let config = state.config.read().await;
        (
            config.poll_delay_ms,
            [
                config.telemetry_topic(TOPIC_TEMPERATURE),
                config.telemetry_topic(TOPIC_HUMIDITY),
                config.telemetry_topic(TOPIC_WATER_LEVEL),
            ],
        )
    };

    loop {
        sleep(Duration::from_millis(poll_delay)).await;

        if !*state.data_updated.read().await {
            continue;
        }
        *state.data_updated.write().await = false;

        let data = *state.data.read().await;
        let values = [data.temperature, data.humidity, data.water_percent];

        for (topic, value) in topics.iter().zip(values) {
            let payload = format!("{value:.2}");
            if let Err(e) = client
                .lock()
                .await
                .publish(topic, QoS::AtMostOnce, false, payload.as_bytes())
                .await
            {
                error!("MQTT send error: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn run<F: Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn success_ends_the_round_with_no_further_attempts() {
        let calls = RefCell::new(0u32);
        let got = run(retry_bounded(5, Duration::from_millis(0), |_| {
            *calls.borrow_mut() += 1;
            async { Ok::<_, &str>(42) }
        }));
        assert_eq!(got, Some(42));
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn exhausted_round_spends_every_attempt_and_returns_none() {
        let seen = RefCell::new(Vec::new());
        let got: Option<()> = run(retry_bounded(5, Duration::from_millis(0), |n| {
            seen.borrow_mut().push(n);
            async { Err("unreachable broker") }
        }));
        assert_eq!(got, None);
        assert_eq!(*seen.borrow(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn next_round_counts_from_attempt_zero_again() {
        let seen = RefCell::new(Vec::new());
        for _ in 0..2 {
            let got: Option<()> = run(retry_bounded(3, Duration::from_millis(0), |n| {
                seen.borrow_mut().push(n);
                async { Err("unreachable broker") }
            }));
            assert_eq!(got, None);
        }
        let got = run(retry_bounded(3, Duration::from_millis(0), |n| {
            seen.borrow_mut().push(n);
            async move {
                if n == 1 {
                    Ok(n)
                } else {
                    Err("unreachable broker")
                }
            }
        }));
        assert_eq!(got, Some(1));
        assert_eq!(*seen.borrow(), vec![0, 1, 2, 0, 1, 2, 0, 1]);
    }
}

// EOF
