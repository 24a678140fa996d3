//! Simulated transport.
//!
//! In-memory device model for testing and for exercising the CLI without
//! hardware. The parameter table is seeded with plausible DLC pro values and
//! every write is recorded, so tests can assert that a failed validation
//! performed no device mutation.

use crate::transport::{paths, Transport};
use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Simulated controller holding a flat parameter table.
pub struct SimTransport {
    params: Mutex<HashMap<String, Value>>,
    set_log: Mutex<Vec<(String, Value)>>,
    open: AtomicBool,
    fail_set_on: Mutex<Option<String>>,
}

impl SimTransport {
    /// Simulated device with typical bench defaults: scan on the piezo
    /// channel, emission button enabled, current driver off.
    pub fn new() -> Self {
        let mut params = HashMap::new();
        let mut seed = |path: &str, value: Value| {
            params.insert(path.to_string(), value);
        };

        seed(paths::EMISSION, Value::from(false));
        seed(paths::EMISSION_BUTTON, Value::from(true));
        seed(paths::USER_LEVEL, Value::from(3));
        seed(paths::VOLTAGE_MIN, Value::from(0.0));
        seed(paths::VOLTAGE_MAX, Value::from(140.0));
        seed(paths::CURRENT_CLIP, Value::from(300.0));
        seed(paths::CURRENT_ENABLED, Value::from(false));
        seed(paths::WAVELENGTH_MIN, Value::from(1510.0));
        seed(paths::WAVELENGTH_MAX, Value::from(1630.0));
        seed(paths::WAVELENGTH_SET, Value::from(1550.0));
        seed(paths::WAVELENGTH_ACT, Value::from(1550.02));
        seed(paths::TEMP_SET_MIN, Value::from(15.0));
        seed(paths::TEMP_SET_MAX, Value::from(35.0));
        seed(paths::TEMP_SET, Value::from(24.7));
        seed(paths::TEMP_ACT, Value::from(24.68));
        seed(paths::SCAN_ENABLED, Value::from(true));
        seed(paths::SCAN_OUTPUT_CHANNEL, Value::from(50));
        seed(paths::SCAN_FREQUENCY, Value::from(20.0));
        seed(paths::SCAN_AMPLITUDE, Value::from(10.0));
        seed(paths::SCAN_OFFSET, Value::from(70.0));
        seed(paths::SCAN_START, Value::from(65.0));
        seed(paths::SCAN_END, Value::from(75.0));
        for addressee in [crate::channel::Addressee::Cc, crate::channel::Addressee::Pc] {
            params.insert(
                paths::external_input(addressee, "enabled"),
                Value::from(false),
            );
            params.insert(paths::external_input(addressee, "factor"), Value::from(1.0));
            params.insert(paths::external_input(addressee, "signal"), Value::from(-3));
        }

        Self {
            params: Mutex::new(params),
            set_log: Mutex::new(Vec::new()),
            open: AtomicBool::new(false),
            fail_set_on: Mutex::new(None),
        }
    }

    /// Override one seeded parameter (builder style, for tests).
    pub fn with_value(self, path: &str, value: Value) -> Self {
        self.params.lock().insert(path.to_string(), value);
        self
    }

    /// Current value of a parameter, if present.
    pub fn value(&self, path: &str) -> Option<Value> {
        self.params.lock().get(path).cloned()
    }

    /// Every `set` call seen so far, in order.
    pub fn set_calls(&self) -> Vec<(String, Value)> {
        self.set_log.lock().clone()
    }

    /// Number of `set` calls recorded against one path.
    pub fn set_count_for(&self, path: &str) -> usize {
        self.set_log.lock().iter().filter(|(p, _)| p == path).count()
    }

    /// Make the next `set` on `path` fail, simulating a device reject.
    pub fn fail_next_set_on(&self, path: &str) {
        *self.fail_set_on.lock() = Some(path.to_string());
    }

    /// Whether the connection is currently open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for SimTransport {
    async fn open(&self) -> Result<()> {
        if self.open.swap(true, Ordering::SeqCst) {
            bail!("connection already open");
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Value> {
        if !self.is_open() {
            bail!("connection not open");
        }
        match self.params.lock().get(path) {
            Some(value) => Ok(value.clone()),
            None => bail!("unknown parameter '{path}'"),
        }
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        if !self.is_open() {
            bail!("connection not open");
        }
        if self.fail_set_on.lock().take().as_deref() == Some(path) {
            bail!("device rejected write to '{path}'");
        }
        let mut params = self.params.lock();
        if !params.contains_key(path) {
            bail!("unknown parameter '{path}'");
        }
        params.insert(path.to_string(), value.clone());
        drop(params);
        self.set_log.lock().push((path.to_string(), value));
        Ok(())
    }

    async fn change_user_level(&self, level: i64, _password: &str) -> Result<i64> {
        if !self.is_open() {
            bail!("connection not open");
        }
        self.params
            .lock()
            .insert(paths::USER_LEVEL.to_string(), Value::from(level));
        Ok(level)
    }
}
