pub mod calendar;
pub mod db;
pub mod models;
pub mod unsplash;
pub mod usda;
