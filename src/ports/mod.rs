//! Port traits: the seams between domain logic and the outside world.

pub mod config_port;
pub mod language_model_port;
pub mod market_data_port;
