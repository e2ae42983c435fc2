//! Process temperature sampling.
//!
//! [`TemperatureSampler`] paces conversions on a probe according to the
//! configured resolution and keeps the last good reading.  The control loop
//! only ever sees that cached value, so a flaky probe cannot stall a tick.
//!
//! ```text
//!   poll(t0) ── request ──▶ probe converts ── poll(t0 + delay) ── read ─▶ cache
//!                                                             └─ request next
//! ```
//!
//! The shipped probe is an NTC thermistor (10 kOhm @ 25 C, B = 3950) in a
//! voltage divider with a fixed 10 kOhm resistor, read via the ADC.  The
//! simplified Beta (Steinhart-Hart) equation converts resistance to
//! temperature.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the probe ADC channel via the oneshot API (initialised
//! by hw_init).  On host/test: reads from a static AtomicU16 for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};
use core::time::Duration;

use log::{error, info, warn};

use crate::app::ports::SensorPort;
#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::error::SensorError;

/// Reported before the first successful conversion.
pub const NO_READING: f32 = -1e10;

/// Plausible probe range (Celsius).  Anything outside is a wiring fault.
pub const MIN_PLAUSIBLE_C: f32 = -55.0;
pub const MAX_PLAUSIBLE_C: f32 = 125.0;

/// Full 12-bit conversion time; each bit less halves it.
const FULL_CONVERSION_MS: u64 = 750;

/// Conversion time for a `bits`-wide reading (clamped to 9–12).
pub fn conversion_delay_ms(bits: u8) -> u64 {
    FULL_CONVERSION_MS >> (12 - bits.clamp(9, 12))
}

// ───────────────────────────────────────────────────────────────
// Probe abstraction
// ───────────────────────────────────────────────────────────────

/// A temperature probe with a separate start/read conversion cycle.
pub trait TemperatureProbe {
    /// Kick off a conversion.
    fn request_conversion(&mut self) -> Result<(), SensorError>;

    /// Fetch the result of the last conversion.
    fn read_celsius(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Sampler
// ───────────────────────────────────────────────────────────────

pub struct TemperatureSampler<P> {
    probe: P,
    delay_ms: u64,
    /// Time the pending conversion was requested; `None` before the first.
    requested_at: Option<u64>,
    last_good: f32,
    consecutive_failures: u32,
    samples: u32,
}

impl<P: TemperatureProbe> TemperatureSampler<P> {
    pub fn new(probe: P, resolution_bits: u8) -> Self {
        let resolution_bits = resolution_bits.clamp(9, 12);
        let delay_ms = conversion_delay_ms(resolution_bits);
        info!(
            "Temperature sampler: {} bit resolution, {} ms per sample",
            resolution_bits, delay_ms
        );
        Self {
            probe,
            delay_ms,
            requested_at: None,
            last_good: NO_READING,
            consecutive_failures: 0,
            samples: 0,
        }
    }

    /// Take a first reading before the control loop starts: request a
    /// conversion, block for one conversion delay, and collect it.  On
    /// return the next conversion is pending and due one delay later.
    ///
    /// If the read fails the sentinel stays in place and [`poll`](Self::poll)
    /// keeps retrying on the normal cadence.
    pub fn prime(&mut self, now_ms: u64) {
        if let Err(e) = self.probe.request_conversion() {
            self.fail(e);
        }
        std::thread::sleep(Duration::from_millis(self.delay_ms));
        self.collect();
        self.request(now_ms.saturating_add(self.delay_ms));
        if !self.has_reading() {
            warn!("Temperature sampler: no reading after priming");
        }
    }

    /// Advance the conversion cycle.  Cheap when nothing is due.
    pub fn poll(&mut self, now_ms: u64) {
        match self.requested_at {
            None => self.request(now_ms),
            Some(at) if now_ms.saturating_sub(at) >= self.delay_ms => {
                self.collect();
                self.request(now_ms);
            }
            Some(_) => {}
        }
    }

    /// Last good reading, or [`NO_READING`].
    pub fn current(&self) -> f32 {
        self.last_good
    }

    pub fn has_reading(&self) -> bool {
        self.samples > 0
    }

    /// Failed reads since the last good one.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Successful reads since construction.
    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }

    fn request(&mut self, now_ms: u64) {
        if let Err(e) = self.probe.request_conversion() {
            self.fail(e);
        }
        // Retry after a full delay either way.
        self.requested_at = Some(now_ms);
    }

    fn collect(&mut self) {
        match self.probe.read_celsius() {
            Ok(c) if (MIN_PLAUSIBLE_C..=MAX_PLAUSIBLE_C).contains(&c) => {
                self.last_good = c;
                self.samples = self.samples.wrapping_add(1);
                if self.consecutive_failures > 0 {
                    info!(
                        "Temperature probe recovered after {} failures",
                        self.consecutive_failures
                    );
                }
                self.consecutive_failures = 0;
            }
            Ok(c) => {
                warn!("Temperature probe: implausible {:.2} C", c);
                self.fail(SensorError::OutOfRange);
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, e: SensorError) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        error!(
            "Temperature probe: {} ({} in a row), keeping {:.2} C",
            e, self.consecutive_failures, self.last_good
        );
    }
}

impl<P: TemperatureProbe> SensorPort for TemperatureSampler<P> {
    fn prime(&mut self, now_ms: u64) {
        TemperatureSampler::prime(self, now_ms);
    }

    fn poll(&mut self, now_ms: u64) {
        TemperatureSampler::poll(self, now_ms);
    }

    fn current_reading(&self) -> f32 {
        self.current()
    }
}

// ───────────────────────────────────────────────────────────────
// NTC thermistor probe
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_TEMP_ADC: AtomicU16 = AtomicU16::new(2048);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_temp_adc(raw: u16) {
    SIM_TEMP_ADC.store(raw, Ordering::Relaxed);
}

const R25: f32 = 10_000.0;
const BETA: f32 = 3950.0;
const T25_K: f32 = 298.15;
const R_DIVIDER: f32 = 10_000.0;
const ADC_MAX: f32 = 4095.0;
const V_REF: f32 = 3.3;

/// NTC thermistor on an ADC channel.  Conversions are instantaneous, so
/// `request_conversion` is a no-op and the sampler cadence only paces reads.
pub struct NtcProbe {
    _adc_channel: u32,
}

impl NtcProbe {
    pub fn new(adc_channel: u32) -> Self {
        Self {
            _adc_channel: adc_channel,
        }
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> u16 {
        hw_init::adc1_read(self._adc_channel)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> u16 {
        SIM_TEMP_ADC.load(Ordering::Relaxed)
    }
}

/// Convert a raw 12-bit ADC value into Celsius.  Railed inputs mean the
/// divider is open or shorted.
pub fn adc_to_celsius(raw: u16) -> Result<f32, SensorError> {
    let voltage = (raw as f32 / ADC_MAX) * V_REF;
    if voltage <= 0.01 || voltage >= (V_REF - 0.01) {
        return Err(SensorError::Disconnected);
    }
    let r_ntc = R_DIVIDER * voltage / (V_REF - voltage);
    let inv_t = (1.0 / T25_K) + (1.0 / BETA) * (r_ntc / R25).ln();
    if inv_t <= 0.0 {
        return Err(SensorError::OutOfRange);
    }
    Ok((1.0 / inv_t) - 273.15)
}

impl TemperatureProbe for NtcProbe {
    fn request_conversion(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        adc_to_celsius(self.read_adc())
    }
}
