pub mod overlap;
pub mod property_locks;
pub mod booking_service;
pub mod cleaning_service;
pub mod email_scheduler;
pub mod email_renderer;
pub mod email_processor;
