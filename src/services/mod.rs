pub mod feature_assembler;
pub mod inference;
pub mod prediction_service;
pub mod solar_algorithm;
pub mod weather_service;
