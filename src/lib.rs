pub mod config;
pub mod dispatch;
pub mod error;
pub mod evaluate;
pub mod form;
pub mod params;
