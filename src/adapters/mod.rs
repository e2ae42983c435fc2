//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                   |
//! |-------------|--------------------|-------------------------------|
//! | `hardware`  | SensorPort         | NTC probe on ADC1             |
//! |             | RelayPort          | Heater relay GPIO             |
//! |             | ClockPort          | ESP32 system timer            |
//! | `log_sink`  | EventSink          | Serial log output             |
//! | `nvs`       | ConfigPort         | NVS / in-memory store         |
//! |             | StoragePort        |                               |
//! | `telegram`  | (I/O thread)       | Bot API over HTTPS            |
//! | `time`      | ClockPort          | ESP32 system timer            |
//! | `wifi`      | ConnectivityPort   | ESP-IDF WiFi STA              |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod telegram;
pub mod time;
pub mod wifi;
