pub mod arg_parser;
pub mod config;
pub mod controller;
pub mod errors;
pub mod fan_curve;
pub mod logger;
pub mod pwm;
pub mod sensor;
