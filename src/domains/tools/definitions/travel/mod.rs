pub mod destinations;
pub mod weather;

pub use destinations::SearchDestinationsTool;
pub use weather::GetWeatherTool;
