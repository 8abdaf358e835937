//! Request handlers.

pub mod export;
pub mod generation;
pub mod health;
pub mod playback;
pub mod seed;

pub use export::*;
pub use generation::*;
pub use health::*;
pub use playback::*;
pub use seed::*;
