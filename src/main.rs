//! Heatcycle Firmware: Main Entry Point
//!
//! Two threads: the tick loop owns the process state machine and the
//! hardware; the I/O thread owns the Bot API client.  They only meet at the
//! inbox/outbox channels.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter          LogEventSink      NvsAdapter          │
//! │  (Sensor+Relay+Clock)     (EventSink)       (Config+Storage)    │
//! │  WifiAdapter              Notifier ─▶ OUTBOX ─▶ TelegramClient  │
//! │  (Connectivity)           ChannelSource ◀─ INBOX ◀─┘            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  FSM · Safety · Relay hysteresis                       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::time::Duration;
use std::thread;

use anyhow::{Context, Result, bail};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::gpio::{AnyOutputPin, PinDriver};
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::sntp::{EspSntp, SyncStatus};
use log::{error, info, warn};

use heatcycle::adapters::hardware::HardwareAdapter;
use heatcycle::adapters::log_sink::LogEventSink;
use heatcycle::adapters::nvs::NvsAdapter;
use heatcycle::adapters::telegram::{EspBotHttp, TelegramClient};
use heatcycle::adapters::time::MonotonicClock;
use heatcycle::adapters::wifi::{ConnectivityPort, WifiAdapter};
use heatcycle::app::commands::ChatId;
use heatcycle::app::inbox::{ChannelSource, INBOX, OUTBOX, OutboxSink};
use heatcycle::app::notifier::Notifier;
use heatcycle::app::ports::{ConfigPort, NotificationSink};
use heatcycle::app::service::AppService;
use heatcycle::config::{BotConfig, SystemConfig, WifiCredentials};
use heatcycle::drivers::hw_init;
use heatcycle::drivers::relay::RelayDriver;
use heatcycle::error::Error;
use heatcycle::pins;
use heatcycle::sensors::{NtcProbe, TemperatureSampler};

/// First-boot secrets, compiled in from `cfg.toml` (see `cfg.toml.example`).
/// Values stored in NVS take precedence once they exist.
#[toml_cfg::toml_config]
pub struct Secrets {
    #[default("")]
    wifi_ssid: &'static str,
    #[default("")]
    wifi_password: &'static str,
    #[default("")]
    bot_token: &'static str,
    #[default("0")]
    operator_chat_id: &'static str,
}

const SNTP_WAIT: Duration = Duration::from_secs(30);
const IO_STACK_SIZE: usize = 16 * 1024;
/// Outbox is flushed this often between Bot API polls.
const IO_SLICE: Duration = Duration::from_millis(100);

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Heatcycle v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    hw_init::init_peripherals().map_err(Error::from)?;

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = NvsAdapter::new()
        .map_err(Error::from)
        .context("NVS init failed")?;
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("{}, using defaults", Error::from(e));
            SystemConfig::default()
        }
    };
    info!(
        "Limits: hot={:.1} cool={:.1} max={:.1} delta={:.1} lube={}h timeout={}h",
        config.hot_temp_c,
        config.cool_temp_c,
        config.max_temp_c,
        config.control_delta_c,
        config.lubrication_hours,
        config.process_timeout_hours
    );

    let bot = bot_config(&nvs)?;
    let creds = wifi_credentials(&nvs)?;

    // ── 3. Network: WiFi, then wall-clock time for TLS ────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    let mut wifi = WifiAdapter::new(peripherals.modem, sysloop)?;
    wifi.set_credentials(&creds).map_err(Error::from)?;
    if let Err(e) = wifi.connect() {
        error!("WiFi unavailable ({}), restarting", e);
        restart();
    }

    let sntp = EspSntp::new_default().context("failed to start SNTP")?;
    wait_for_time(&sntp);

    // ── 4. Hardware ───────────────────────────────────────────
    // SAFETY: RELAY_GPIO is a valid output pin on both boards and is not
    // claimed by any other driver.
    let relay_pin = PinDriver::output(unsafe { AnyOutputPin::new(pins::RELAY_GPIO) })?;
    let mut hw = HardwareAdapter::new(
        TemperatureSampler::new(NtcProbe::new(pins::PROBE_ADC_CHANNEL), config.sensor_resolution_bits),
        RelayDriver::new(relay_pin, pins::RELAY_ACTIVE_HIGH),
        MonotonicClock::new(),
    );

    // ── 5. Bot API I/O thread ─────────────────────────────────
    let operator = ChatId(bot.operator_chat_id);
    let poll_every = Duration::from_millis(u64::from(config.message_poll_interval_ms));
    let mut client = TelegramClient::new(EspBotHttp::new(&bot.token));
    if let Err(e) = client.identify() {
        warn!("Bot: getMe failed ({}), accepting any @suffix", e);
    }
    thread::Builder::new()
        .name("bot-io".into())
        .stack_size(IO_STACK_SIZE)
        .spawn(move || io_loop(client, operator, poll_every))
        .context("failed to spawn I/O thread")?;

    // ── 6. App service and tick loop ──────────────────────────
    let tick = Duration::from_millis(u64::from(config.tick_interval_ms));
    let mut app = AppService::new(config, operator);
    let mut source = ChannelSource::new(&INBOX);
    let mut sink = (LogEventSink::new(), Notifier::new(OutboxSink::new(&OUTBOX)));

    app.start(&mut hw, &mut sink);
    info!("System ready. Entering tick loop ({} ms).", tick.as_millis());

    loop {
        let report = app.tick(&mut hw, &mut source, &mut sink);

        if report.reconfigure {
            warn!("Reconfigure: clearing WiFi credentials and restarting");
            hw.all_off();
            if let Err(e) = nvs.clear_wifi_credentials() {
                error!("Reconfigure: could not clear credentials ({})", e);
            }
            sink.1
                .sink_mut()
                .deliver(None, "WiFi credentials cleared, restarting.");
            // Let the I/O thread flush the outbox.
            thread::sleep(poll_every + Duration::from_secs(1));
            restart();
        }

        thread::sleep(tick);
    }
}

// ── Boot helpers ──────────────────────────────────────────────

/// Bot identity from NVS, seeded from `cfg.toml` on first boot.
fn bot_config(nvs: &NvsAdapter) -> Result<BotConfig> {
    if let Some(bot) = nvs.load_bot_config().ok().flatten() {
        if bot.is_provisioned() {
            return Ok(bot);
        }
    }

    let mut bot = BotConfig {
        operator_chat_id: SECRETS.operator_chat_id.trim().parse().unwrap_or(0),
        ..Default::default()
    };
    if bot.token.push_str(SECRETS.bot_token).is_err() {
        bail!("bot token longer than {} bytes", bot.token.capacity());
    }
    if !bot.is_provisioned() {
        bail!("no bot token / operator chat configured (see cfg.toml.example)");
    }
    if let Err(e) = nvs.save_bot_config(&bot) {
        warn!("Could not persist bot config ({})", e);
    }
    Ok(bot)
}

/// WiFi credentials from NVS, else the compiled-in ones.  After
/// `/reconfigure` this falls back to `cfg.toml`.
fn wifi_credentials(nvs: &NvsAdapter) -> Result<WifiCredentials> {
    match nvs.load_wifi_credentials() {
        Ok(Some(creds)) => return Ok(creds),
        Ok(None) => info!("No stored WiFi credentials, using compiled-in network"),
        Err(e) => warn!("Stored WiFi credentials unreadable ({}), using compiled-in network", e),
    }

    let mut creds = WifiCredentials::default();
    if creds.ssid.push_str(SECRETS.wifi_ssid).is_err()
        || creds.password.push_str(SECRETS.wifi_password).is_err()
    {
        bail!("compiled-in WiFi credentials too long");
    }
    if let Err(e) = nvs.save_wifi_credentials(&creds) {
        warn!("Could not persist WiFi credentials ({})", e);
    }
    Ok(creds)
}

/// TLS certificate checks need wall-clock time.  Give SNTP a bounded wait
/// and carry on regardless; the I/O thread just fails until it syncs.
fn wait_for_time(sntp: &EspSntp<'_>) {
    let mut waited = Duration::ZERO;
    while sntp.get_sync_status() != SyncStatus::Completed {
        if waited >= SNTP_WAIT {
            warn!("SNTP: no sync after {}s, continuing", waited.as_secs());
            return;
        }
        thread::sleep(Duration::from_millis(500));
        waited += Duration::from_millis(500);
    }
    info!("SNTP: time synchronised");
}

fn restart() -> ! {
    esp_idf_svc::hal::reset::restart()
}

// ── I/O thread ────────────────────────────────────────────────

fn io_loop(mut client: TelegramClient<EspBotHttp>, operator: ChatId, poll_every: Duration) {
    info!("Bot I/O thread started (poll every {} ms)", poll_every.as_millis());
    let mut since_poll = poll_every;
    loop {
        if since_poll >= poll_every {
            since_poll = Duration::ZERO;
            match client.poll_into(operator, &INBOX) {
                Ok(0) => {}
                Ok(n) => info!("Bot: queued {} message(s)", n),
                Err(e) => warn!("Bot: poll failed ({})", e),
            }
        }
        client.flush(operator, &OUTBOX);
        thread::sleep(IO_SLICE);
        since_poll += IO_SLICE;
    }
}
