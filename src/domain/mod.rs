pub mod errors;
pub mod events;
pub mod market;
pub mod ports;
pub mod signals;
