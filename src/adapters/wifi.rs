//! WiFi station-mode adapter.
//!
//! Implements [`ConnectivityPort`], the boundary the boot sequence uses to
//! bring the network up before the Bot API thread starts.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via
//!   `esp_idf_svc::wifi::BlockingWifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Retry policy
//!
//! `connect()` tries up to [`CONNECT_ATTEMPTS`] times, waiting an
//! exponential backoff (2 s → 4 s → 8 s … capped at 60 s) in between.
//! After that the caller decides; the firmware restarts.

use core::fmt;
use log::{error, info, warn};

use crate::config::WifiCredentials;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl From<ConnectivityError> for crate::error::Error {
    fn from(e: ConnectivityError) -> Self {
        match e {
            ConnectivityError::NoCredentials => Self::Config("wifi credentials missing"),
            ConnectivityError::InvalidSsid | ConnectivityError::InvalidPassword => {
                Self::Config("wifi credentials invalid")
            }
            ConnectivityError::ConnectionFailed => {
                Self::Comms(crate::error::CommsError::WifiConnectFailed)
            }
        }
    }
}

pub trait ConnectivityPort {
    fn set_credentials(&mut self, creds: &WifiCredentials) -> Result<(), ConnectivityError>;
    fn connect(&mut self) -> Result<(), ConnectivityError>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting { attempt: u32 },
    Connected,
    Failed,
}

pub const CONNECT_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 60;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

pub fn validate_credentials(creds: &WifiCredentials) -> Result<(), ConnectivityError> {
    validate_ssid(&creds.ssid)?;
    validate_password(&creds.password)
}

fn next_backoff(secs: u32) -> u32 {
    secs.saturating_mul(2).min(MAX_BACKOFF_SECS)
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    creds: Option<WifiCredentials>,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    /// Simulation: failures to inject before the next success.
    #[cfg(not(target_os = "espidf"))]
    sim_failures: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_attempts: u32,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(modem: Modem, sysloop: EspSystemEventLoop) -> anyhow::Result<Self> {
        let wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), None)?, sysloop)?;
        Ok(Self {
            state: WifiState::Disconnected,
            creds: None,
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            creds: None,
            sim_failures: 0,
            sim_attempts: 0,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    /// Make the next `n` simulated connection attempts fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim_failures = n;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_attempts(&self) -> u32 {
        self.sim_attempts
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self, creds: &WifiCredentials) -> Result<(), ConnectivityError> {
        let auth_method = if creds.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: creds
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: creds
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        self.associate(&config).map_err(|e| {
            warn!("WiFi(espidf): {}", e);
            ConnectivityError::ConnectionFailed
        })
    }

    #[cfg(target_os = "espidf")]
    fn associate(&mut self, config: &Configuration) -> Result<(), esp_idf_svc::sys::EspError> {
        self.wifi.set_configuration(config)?;
        if !self.wifi.is_started()? {
            self.wifi.start()?;
        }
        self.wifi.connect()?;
        self.wifi.wait_netif_up()
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self, creds: &WifiCredentials) -> Result<(), ConnectivityError> {
        self.sim_attempts = self.sim_attempts.wrapping_add(1);
        if self.sim_failures > 0 {
            self.sim_failures -= 1;
            warn!("WiFi(sim): simulated association failure (attempt {})", self.sim_attempts);
            return Err(ConnectivityError::ConnectionFailed);
        }
        info!("WiFi(sim): connected to '{}'", creds.ssid);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi(espidf): disconnect: {}", e);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        info!("WiFi(sim): disconnected");
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    #[cfg(target_os = "espidf")]
    fn backoff(secs: u32) {
        std::thread::sleep(std::time::Duration::from_secs(u64::from(secs)));
    }

    #[cfg(not(target_os = "espidf"))]
    fn backoff(_secs: u32) {}
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// ConnectivityPort
// ───────────────────────────────────────────────────────────────

impl ConnectivityPort for WifiAdapter {
    fn set_credentials(&mut self, creds: &WifiCredentials) -> Result<(), ConnectivityError> {
        validate_credentials(creds)?;
        self.creds = Some(creds.clone());
        info!("WiFi: credentials set (SSID='{}')", creds.ssid);
        Ok(())
    }

    fn connect(&mut self) -> Result<(), ConnectivityError> {
        let creds = self.creds.clone().ok_or(ConnectivityError::NoCredentials)?;
        if self.state == WifiState::Connected && self.platform_is_connected() {
            return Ok(());
        }

        let mut backoff = INITIAL_BACKOFF_SECS;
        for attempt in 1..=CONNECT_ATTEMPTS {
            info!("WiFi: connecting to '{}' (attempt {}/{})", creds.ssid, attempt, CONNECT_ATTEMPTS);
            self.state = WifiState::Connecting { attempt };
            match self.platform_connect(&creds) {
                Ok(()) => {
                    self.state = WifiState::Connected;
                    info!("WiFi: connected");
                    return Ok(());
                }
                Err(e) if attempt < CONNECT_ATTEMPTS => {
                    warn!("WiFi: {}, retrying in {}s", e, backoff);
                    Self::backoff(backoff);
                    backoff = next_backoff(backoff);
                }
                Err(e) => {
                    error!("WiFi: giving up after {} attempts ({})", attempt, e);
                }
            }
        }
        self.state = WifiState::Failed;
        Err(ConnectivityError::ConnectionFailed)
    }

    fn disconnect(&mut self) {
        self.platform_disconnect();
        self.state = WifiState::Disconnected;
        info!("WiFi: disconnected");
    }

    fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
