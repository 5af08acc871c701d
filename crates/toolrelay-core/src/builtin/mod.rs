//! Built-in demo tool providers

mod clock;
mod weather;

pub use clock::ClockProvider;
pub use weather::{Forecast, WeatherProvider};
