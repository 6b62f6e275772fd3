pub mod sqlite_property_repo;
pub mod sqlite_booking_repo;
pub mod sqlite_cleaning_repo;
pub mod sqlite_scheduled_email_repo;

pub mod postgres_property_repo;
pub mod postgres_booking_repo;
pub mod postgres_cleaning_repo;
pub mod postgres_scheduled_email_repo;
