//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`], plus typed accessors
//! for the bot and WiFi records.
//!
//! | Namespace   | Key      | Record                 |
//! |-------------|----------|------------------------|
//! | `heatcycle` | `syscfg` | [`SystemConfig`]       |
//! | `heatcycle` | `bot`    | [`BotConfig`]          |
//! | `net`       | `wifi`   | [`WifiCredentials`]    |
//!
//! Every record is a `postcard` blob.  Process limits are validated before
//! every save and after every load, so a corrupted or hand-edited record
//! can never reach the state machine.  `/reconfigure` erases only the `net`
//! namespace; limits and bot identity survive it.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::{BotConfig, SystemConfig, WifiCredentials};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "heatcycle";
const CONFIG_KEY: &str = "syscfg";
const BOT_KEY: &str = "bot";
const NET_NAMESPACE: &str = "net";
const WIFI_KEY: &str = "wifi";

/// Largest blob any record serialises to.
const MAX_BLOB_SIZE: usize = 256;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// Returns `Err(ConfigError::IoError)` if flash initialisation fails
    /// unrecoverably.  On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t
                || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t
            {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK as esp_err_t {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK as esp_err_t {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK as esp_err_t {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    // ── Typed records ─────────────────────────────────────────

    /// Bot token and operator chat.  `None` before provisioning.
    pub fn load_bot_config(&self) -> Result<Option<BotConfig>, ConfigError> {
        self.load_record(CONFIG_NAMESPACE, BOT_KEY)
    }

    pub fn save_bot_config(&self, bot: &BotConfig) -> Result<(), ConfigError> {
        if !bot.is_provisioned() {
            return Err(ConfigError::ValidationFailed("bot token and operator chat required"));
        }
        self.save_record(CONFIG_NAMESPACE, BOT_KEY, bot)
    }

    /// Stored station credentials.  `None` after `/reconfigure`.
    pub fn load_wifi_credentials(&self) -> Result<Option<WifiCredentials>, ConfigError> {
        self.load_record(NET_NAMESPACE, WIFI_KEY)
    }

    pub fn save_wifi_credentials(&self, creds: &WifiCredentials) -> Result<(), ConfigError> {
        super::wifi::validate_credentials(creds)
            .map_err(|_| ConfigError::ValidationFailed("invalid WiFi credentials"))?;
        self.save_record(NET_NAMESPACE, WIFI_KEY, creds)
    }

    /// Forget the WiFi network.  Nothing else is touched.
    pub fn clear_wifi_credentials(&self) -> Result<(), StorageError> {
        self.erase_blob(NET_NAMESPACE, WIFI_KEY)?;
        info!("NvsAdapter: WiFi credentials cleared");
        Ok(())
    }

    fn load_record<T: DeserializeOwned>(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<T>, ConfigError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        match self.get_blob(namespace, key, &mut buf) {
            Ok(len) => postcard::from_bytes(&buf[..len])
                .map(Some)
                .map_err(|_| ConfigError::Corrupted),
            Err(StorageError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_record<T: Serialize>(&self, namespace: &str, key: &str, value: &T) -> Result<(), ConfigError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        let bytes = postcard::to_slice(value, &mut buf).map_err(|_| ConfigError::StorageFull)?;
        self.put_blob(namespace, key, bytes)?;
        info!("NvsAdapter: saved {}::{} ({} bytes)", namespace, key, bytes.len());
        Ok(())
    }

    // ── Raw blob access (shared by both ports) ────────────────

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    #[cfg(not(target_os = "espidf"))]
    fn get_blob(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.store.borrow().get(&Self::composite_key(namespace, key)) {
            Some(data) if data.len() > buf.len() => Err(StorageError::BufferTooSmall),
            Some(data) => {
                buf[..data.len()].copy_from_slice(data);
                Ok(data.len())
            }
            None => Err(StorageError::NotFound),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn put_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.store
            .borrow_mut()
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn erase_blob(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store.borrow_mut().remove(&Self::composite_key(namespace, key));
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn has_blob(&self, namespace: &str, key: &str) -> bool {
        self.store.borrow().contains_key(&Self::composite_key(namespace, key))
    }

    /// NVS names are at most 15 bytes plus a terminator.
    #[cfg(target_os = "espidf")]
    fn c_name(name: &str) -> [u8; 16] {
        let mut out = [0u8; 16];
        let len = name.len().min(15);
        out[..len].copy_from_slice(&name.as_bytes()[..len]);
        out
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, esp_err_t>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, esp_err_t>,
    {
        let ns = Self::c_name(namespace);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: `ns` is NUL-terminated and outlives the call.
        let ret = unsafe { nvs_open(ns.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK as esp_err_t {
            return Err(ret);
        }

        let result = f(handle);
        // SAFETY: handle was opened above and is not used after this.
        unsafe { nvs_close(handle) };
        result
    }

    #[cfg(target_os = "espidf")]
    fn map_err(ret: esp_err_t) -> StorageError {
        if ret == ESP_ERR_NVS_NOT_FOUND as esp_err_t {
            StorageError::NotFound
        } else if ret == ESP_ERR_NVS_INVALID_LENGTH as esp_err_t {
            StorageError::BufferTooSmall
        } else if ret == ESP_ERR_NVS_NOT_ENOUGH_SPACE as esp_err_t {
            StorageError::Full
        } else {
            StorageError::IoError
        }
    }

    #[cfg(target_os = "espidf")]
    fn get_blob(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let key = Self::c_name(key);
        Self::with_nvs_handle(namespace, false, |handle| {
            let mut size = buf.len();
            // SAFETY: `buf` is valid for `size` bytes.
            let ret = unsafe { nvs_get_blob(handle, key.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut size) };
            if ret != ESP_OK as esp_err_t {
                return Err(ret);
            }
            Ok(size)
        })
        .map_err(Self::map_err)
    }

    #[cfg(target_os = "espidf")]
    fn put_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let key = Self::c_name(key);
        Self::with_nvs_handle(namespace, true, |handle| {
            // SAFETY: `data` is valid for `data.len()` bytes.
            let ret = unsafe { nvs_set_blob(handle, key.as_ptr().cast(), data.as_ptr().cast(), data.len()) };
            if ret != ESP_OK as esp_err_t {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK as esp_err_t {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(Self::map_err)
    }

    #[cfg(target_os = "espidf")]
    fn erase_blob(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let key = Self::c_name(key);
        let result = Self::with_nvs_handle(namespace, true, |handle| {
            let ret = unsafe { nvs_erase_key(handle, key.as_ptr().cast()) };
            if ret != ESP_OK as esp_err_t && ret != ESP_ERR_NVS_NOT_FOUND as esp_err_t {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK as esp_err_t {
                return Err(ret);
            }
            Ok(())
        });
        match result {
            // Namespace never created: nothing to erase.
            Err(ret) if ret == ESP_ERR_NVS_NOT_FOUND as esp_err_t => Ok(()),
            other => other.map_err(Self::map_err),
        }
    }

    #[cfg(target_os = "espidf")]
    fn has_blob(&self, namespace: &str, key: &str) -> bool {
        let key = Self::c_name(key);
        Self::with_nvs_handle(namespace, false, |handle| {
            let ret = unsafe { nvs_find_key(handle, key.as_ptr().cast(), core::ptr::null_mut()) };
            Ok(ret == ESP_OK as esp_err_t)
        })
        .unwrap_or(false)
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        match self.load_record::<SystemConfig>(CONFIG_NAMESPACE, CONFIG_KEY)? {
            Some(cfg) => {
                cfg.validate()?;
                info!("NvsAdapter: loaded process limits from store");
                Ok(cfg)
            }
            None => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.save_record(CONFIG_NAMESPACE, CONFIG_KEY, config)
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.get_blob(namespace, key, buf)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.put_blob(namespace, key, data)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.erase_blob(namespace, key)
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.has_blob(namespace, key)
    }
}
