//! Candlestick and chart pattern detectors
//!
//! Every detector inspects the tail of an enriched candle sequence (`c0` = last,
//! `c1` = second-last, `c2` = third-last) or, for chart structure, a trailing window,
//! and reports at most one [`Pattern`](crate::Pattern).
//!
//! # Pattern Categories
//!
//! - **Single-bar (5)**: Doji, Hammer / Hanging Man, Shooting Star / Inverted Hammer,
//!   Marubozu, Spinning Top
//! - **Two-bar (5)**: Engulfing, Tweezer, Harami, Piercing Line, Dark Cloud Cover
//! - **Three-bar (4)**: Morning / Evening Star, Three White Soldiers, Three Black Crows
//! - **Structure (4)**: HH/HL trend structure, Tight Consolidation, Volume Climax,
//!   Bollinger Squeeze

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
    ($($detector:ty),* $(,)?) => {
        $(impl $detector {
            pub fn with_defaults() -> Self {
                Self::default()
            }
        })*
    };
}

pub mod single_bar;
pub mod structure;
pub mod three_bar;
pub mod two_bar;

// Re-export all detectors for convenience
pub use single_bar::*;
pub use structure::*;
pub use three_bar::*;
pub use two_bar::*;
