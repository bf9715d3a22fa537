pub mod config;
pub mod db;
pub mod decode;
pub mod logging;
