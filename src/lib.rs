//! Matayoshi core crate.
//!
//! A one-button browser widget: every press is a 1/73 draw. Counters survive
//! reloads through local storage, a hit rains falling glyphs across the screen,
//! and the first hit ends the session on a result screen until it is reset.
//!
//! The draw state machine, storage codec and burst generator are plain Rust and
//! testable on the host; `app` wires them to the DOM.

use wasm_bindgen::prelude::*;

mod app;
pub mod burst;
pub mod log;
pub mod random;
pub mod session;
pub mod storage;

pub use burst::{Burst, Particle};
pub use random::{CryptoRandom, RandomSource};
pub use session::{Outcome, Screen, Session, SessionState};
pub use storage::{KeyValueStore, LocalStorage, MemoryStore, StoreError};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Sides of the draw; a hit is one bucket out of `CHANCE`.
pub const CHANCE: u32 = 73;

/// Local storage key of the persisted session record.
pub const STORAGE_KEY: &str = "matayoshi-state-v1";

/// Delay between the session-ending hit and the result screen.
pub const REVEAL_DELAY_MS: f64 = 2_000.0;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Mounts the widget into `#matayoshi-root` (or `<body>`) and starts the frame loop.
#[wasm_bindgen]
pub fn start_game() -> Result<(), JsValue> {
    app::start_app()
}
