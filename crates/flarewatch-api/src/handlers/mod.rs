pub mod health;
pub mod result;
pub mod upload;
