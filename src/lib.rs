// ledctl - LED strip control layer
// Effect engine, configuration cache and the upstream operation surface

pub mod cli;
pub mod config_cache;
pub mod controller;
pub mod effect;
pub mod error;
pub mod settings;

pub use config_cache::ConfigCache;
pub use controller::{LedController, OpResult};
pub use effect::{Effect, EffectEngine, EffectKind, EngineState, EngineStats};
pub use error::ControlError;
pub use settings::Settings;
