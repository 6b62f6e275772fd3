pub mod factory;
pub mod mail;
pub mod repositories;
