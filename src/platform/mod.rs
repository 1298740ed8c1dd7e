pub mod daemon;
pub mod health;
