//! MQTT-to-HTTP camera bridge: a background subscriber keeps the latest
//! JPEG frame in a guarded single slot, and an axum server hands it to
//! polling browser clients.

pub mod config;
pub mod frame;
pub mod server;
pub mod store;
pub mod subscriber;
