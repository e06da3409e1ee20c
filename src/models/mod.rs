pub mod donation;
pub mod incident;
pub mod lifecycle;
pub mod progress;
pub mod resource;
pub mod shelter;
pub mod task;
pub mod user;
pub mod volunteer;
