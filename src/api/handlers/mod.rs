pub mod health;
pub mod booking;
pub mod cleaning;
pub mod email;
pub mod scheduler;
