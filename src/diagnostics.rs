//! Heap and stack diagnostics.

use std::sync::atomic::{AtomicU32, Ordering};

/// Runtime memory statistics.
pub trait Diagnostics: Send + Sync {
    /// Currently free heap, in bytes.
    fn free_heap_bytes(&self) -> u32;

    /// Minimum stack space ever left for the calling task.
    fn stack_high_water_mark(&self) -> u32;
}

/// ESP-IDF heap and FreeRTOS stack statistics.
#[cfg(feature = "esp32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct EspDiagnostics;

#[cfg(feature = "esp32")]
impl Diagnostics for EspDiagnostics {
    fn free_heap_bytes(&self) -> u32 {
        unsafe { esp_idf_sys::esp_get_free_heap_size() }
    }

    fn stack_high_water_mark(&self) -> u32 {
        // Null handle queries the calling task.
        unsafe { esp_idf_sys::uxTaskGetStackHighWaterMark(core::ptr::null_mut()) }
    }
}

/// Fixed-value diagnostics for host runs.
///
/// The host has no meaningful equivalent of the device heap, so the values
/// are whatever the simulation sets.
#[derive(Debug)]
pub struct SimulatedDiagnostics {
    free_heap: AtomicU32,
    high_water_mark: AtomicU32,
}

impl SimulatedDiagnostics {
    /// Free heap reported by default (typical ESP32 figure after Wi-Fi start).
    pub const DEFAULT_FREE_HEAP: u32 = 180 * 1024;

    /// Stack high-water mark reported by default.
    pub const DEFAULT_HIGH_WATER_MARK: u32 = 1024;

    /// Create diagnostics reporting the given values.
    pub fn new(free_heap: u32, high_water_mark: u32) -> Self {
        Self {
            free_heap: AtomicU32::new(free_heap),
            high_water_mark: AtomicU32::new(high_water_mark),
        }
    }

    /// Change the reported free heap.
    #[cfg(test)]
    pub fn set_free_heap(&self, bytes: u32) {
        self.free_heap.store(bytes, Ordering::Relaxed);
    }
}

impl Default for SimulatedDiagnostics {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FREE_HEAP, Self::DEFAULT_HIGH_WATER_MARK)
    }
}

impl Diagnostics for SimulatedDiagnostics {
    fn free_heap_bytes(&self) -> u32 {
        self.free_heap.load(Ordering::Relaxed)
    }

    fn stack_high_water_mark(&self) -> u32 {
        self.high_water_mark.load(Ordering::Relaxed)
    }
}
