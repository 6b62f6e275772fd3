use std::sync::Arc;
use crate::domain::ports::{
    BookingRepository, CleaningTaskRepository, Clock, MailTransport, PropertyRepository,
    ScheduledEmailRepository,
};
use crate::domain::services::booking_service::BookingService;
use crate::domain::services::email_processor::EmailProcessor;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub property_repo: Arc<dyn PropertyRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub cleaning_repo: Arc<dyn CleaningTaskRepository>,
    pub email_repo: Arc<dyn ScheduledEmailRepository>,
    pub mail_transport: Arc<dyn MailTransport>,
    pub booking_service: Arc<BookingService>,
    pub email_processor: Arc<EmailProcessor>,
    pub clock: Arc<dyn Clock>,
}
