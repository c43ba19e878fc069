//! Native shell around the core: controller loop, effect execution,
//! session cache and terminal rendering.
pub mod app;
pub mod effects;
pub mod files;
pub mod persistence;
pub mod render;

pub use app::Controller;
pub use effects::EffectRunner;
pub use persistence::{SessionCache, SESSION_KEY};
