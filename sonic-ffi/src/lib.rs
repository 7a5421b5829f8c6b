//! C ABI command surface for native plugin hosts.
//!
//! Exposes the tone generator's method set so a host bridge can forward its
//! calls: create a handle, generate a tone or sweep, stop, destroy.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle type: `SonicPlugin` (heap-allocated; you own/delete it).
//! - Commands return `true` whenever the handle is valid; playback failures are
//!   logged and end in silence.
//!
//! Threading
//! - The handle is thread-safe; commands may come from any thread. Do not call
//!   `sonic_destroy` concurrently with other calls on the same handle.

use std::ffi::{c_char, CString};
use std::sync::OnceLock;

use sonic_engine::{Controller, PlayerConfig, SweepRequest, ToneRequest};

/// Opaque handle we hand to C.
pub struct SonicPlugin {
    controller: Controller,
}

impl SonicPlugin {
    fn new(sample_rate: u32) -> Self {
        let config = PlayerConfig::default().with_sample_rate(sample_rate);
        Self { controller: Controller::with_default_output(config) }
    }
}

fn handle<'a>(plugin: *const SonicPlugin) -> Option<&'a SonicPlugin> {
    // SAFETY: non-null pointers come from `sonic_create` and stay valid until `sonic_destroy`.
    unsafe { plugin.as_ref() }
}

// --- Creation / destruction -------------------------------------------------------

/// Create a plugin instance on the default output device. `sample_rate` of 0
/// selects 44100 Hz. Returns null on failure.
#[no_mangle]
pub extern "C" fn sonic_create(sample_rate: u32) -> *mut SonicPlugin {
    let sr = if sample_rate == 0 { sonic_engine::config::DEFAULT_SAMPLE_RATE } else { sample_rate };
    match std::panic::catch_unwind(|| SonicPlugin::new(sr)) {
        Ok(p) => Box::into_raw(Box::new(p)),
        Err(_) => {
            log::error!("sonic_create: plugin construction panicked");
            std::ptr::null_mut()
        }
    }
}

/// Host teardown: stop any playback and free the instance.
#[no_mangle]
pub extern "C" fn sonic_destroy(plugin: *mut SonicPlugin) {
    if !plugin.is_null() {
        // SAFETY: pointer came from `sonic_create` and is not used afterwards.
        let p = unsafe { Box::from_raw(plugin) };
        p.controller.detach();
    }
}

// --- Commands --------------------------------------------------------------------

/// `generateTone`. A negative `duration_ms` plays until `sonic_stop_tone`.
#[no_mangle]
pub extern "C" fn sonic_generate_tone(
    plugin: *const SonicPlugin,
    frequency: f64,
    volume: f64,
    duration_ms: i64,
) -> bool {
    let Some(p) = handle(plugin) else { return false };
    p.controller.generate_tone(ToneRequest {
        frequency,
        volume,
        duration_ms: u64::try_from(duration_ms).ok(),
    })
}

/// `generateSweep`. Durations under 100 ms (negative included) become 100 ms.
#[no_mangle]
pub extern "C" fn sonic_generate_sweep(
    plugin: *const SonicPlugin,
    start_frequency: f64,
    end_frequency: f64,
    duration_ms: i64,
    volume: f64,
) -> bool {
    let Some(p) = handle(plugin) else { return false };
    p.controller.generate_sweep(SweepRequest {
        start_frequency,
        end_frequency,
        duration_ms: u64::try_from(duration_ms).unwrap_or(0),
        volume,
    })
}

/// `stopTone`. Safe to call when nothing is playing.
#[no_mangle]
pub extern "C" fn sonic_stop_tone(plugin: *const SonicPlugin) -> bool {
    let Some(p) = handle(plugin) else { return false };
    p.controller.stop_tone()
}

/// `true` while a tone or sweep is playing. Lock-free, so a UI thread may
/// poll it even while another thread is starting or stopping playback.
#[no_mangle]
pub extern "C" fn sonic_is_playing(plugin: *const SonicPlugin) -> bool {
    handle(plugin).is_some_and(|p| p.controller.player().is_playing())
}

/// `getPlatformVersion`. Static, NUL-terminated; do not free.
#[no_mangle]
pub extern "C" fn sonic_platform_version() -> *const c_char {
    static VERSION: OnceLock<CString> = OnceLock::new();
    VERSION
        .get_or_init(|| {
            CString::new(Controller::platform_version()).unwrap_or_else(|_| CString::from(c"unknown"))
        })
        .as_ptr()
}
