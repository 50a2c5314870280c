//! Process-wide tunables.
//!
//! The original hardcodes `static const int TID_MAX = 33000;`. This
//! port keeps the same default but exposes it as a small config struct
//! — the pattern the retrieval pack favors for turning a
//! baked-in-the-original constant into something a library consumer
//! can override (e.g. `ocl`'s `*Builder` types), applied minimally
//! here since there is nothing else to build incrementally.

/// Tunables for the lazily-initialized runtime.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Ceiling on observable Linux thread ids; the registry allocates
    /// `tid_max + 1` slots up front. The original's hardcoded value.
    pub tid_max: u32,
}

impl Default for Config {
    fn default() -> Config {
        Config { tid_max: 33_000 }
    }
}
