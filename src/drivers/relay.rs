//! Heater relay driver.
//!
//! A dumb actuator over any `embedded-hal` output pin.  Edge detection and
//! safety live upstream in the relay controller and the safety supervisor;
//! this driver just maps on/off to the coil's active level.
//!
//! On ESP-IDF the pin is an `esp_idf_hal::gpio::PinDriver<_, Output>`; on
//! host/test any `OutputPin` mock works.

use embedded_hal::digital::OutputPin;
use log::error;

use crate::app::ports::RelayPort;

pub struct RelayDriver<P> {
    pin: P,
    active_high: bool,
    on: bool,
    write_errors: u32,
}

impl<P: OutputPin> RelayDriver<P> {
    /// Take ownership of `pin` and drive it to the de-energised level.
    pub fn new(pin: P, active_high: bool) -> Self {
        let mut driver = Self {
            pin,
            active_high,
            on: false,
            write_errors: 0,
        };
        driver.drive(false);
        driver
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn write_errors(&self) -> u32 {
        self.write_errors
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }

    fn drive(&mut self, on: bool) {
        let high = on == self.active_high;
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match res {
            Ok(()) => self.on = on,
            Err(_) => {
                self.write_errors = self.write_errors.saturating_add(1);
                error!("Relay: GPIO write failed (on={})", on);
            }
        }
    }
}

impl<P: OutputPin> RelayPort for RelayDriver<P> {
    fn set(&mut self, on: bool) {
        self.drive(on);
    }
}
