//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the device if the trigger loop stalls for longer than the
//! configured timeout.  The webhook runs on its own thread, so a hung
//! HTTP request never starves the loop; anything that does is a bug
//! worth a reboot.
//!
//! The loop must call `feed()` on every frame.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

pub struct Watchdog {
    timeout_ms: u32,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
    feeds: u64,
}

impl Watchdog {
    /// Configure the TWDT and subscribe the calling task.
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: plain ESP-IDF C calls with a valid config; a null task
            // handle means "the calling task".
            let subscribed = unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    log::warn!(
                        "TWDT reconfigure returned {} (may already be configured)",
                        ret
                    );
                }
                esp_task_wdt_add(core::ptr::null_mut()) == ESP_OK
            };
            if subscribed {
                info!("Watchdog: subscribed ({}ms timeout, panic on trigger)", timeout_ms);
            } else {
                log::warn!("Watchdog: failed to subscribe");
            }
            Self {
                timeout_ms,
                subscribed,
                feeds: 0,
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): {}ms timeout, no-op", timeout_ms);
            Self {
                timeout_ms,
                feeds: 0,
            }
        }
    }

    /// Feed the watchdog.
    pub fn feed(&mut self) {
        self.feeds = self.feeds.wrapping_add(1);
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                // SAFETY: resets the TWDT for the subscribed calling task.
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn feeds(&self) -> u64 {
        self.feeds
    }
}
