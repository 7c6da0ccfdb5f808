pub mod analytics;
pub mod health;
pub mod records;
pub mod speed;
