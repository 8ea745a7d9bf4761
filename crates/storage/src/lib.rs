pub mod db;
pub mod errors;
pub mod record;
pub mod repository;
pub mod tables;
