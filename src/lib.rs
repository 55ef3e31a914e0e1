pub mod assets;
pub mod avatar;
pub mod cache;
pub mod caption;
pub mod config;
pub mod draw;
pub mod error;
pub mod gate;
pub mod level;
pub mod records;
pub mod render;
pub mod sign;
pub mod types;
