pub mod callable;
pub mod health;
