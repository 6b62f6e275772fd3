use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tera::{Context, Tera};
use crate::domain::models::booking::Booking;
use crate::domain::models::property::Property;
use crate::domain::models::scheduled_email::EmailType;
use crate::error::AppError;

pub const CHECK_IN_SUBJECT: &str = "Check-in details for your stay at {{ property_name }}";
pub const CHECKOUT_REMINDER_SUBJECT: &str = "Checkout tomorrow at {{ property_name }}";
pub const THANK_YOU_SUBJECT: &str = "Thank you for staying at {{ property_name }}";

#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

pub struct EmailRenderer {
    tera: Tera,
}

fn template_names(email_type: EmailType) -> (String, String, String) {
    let base = email_type.as_str();
    (format!("{}_subject", base), format!("{}.html", base), format!("{}.txt", base))
}

impl EmailRenderer {
    pub fn with_defaults() -> Result<Self, AppError> {
        let mut tera = Tera::default();
        let sources = [
            (EmailType::CheckInInstructions, CHECK_IN_SUBJECT,
                include_str!("../../templates/check_in_instructions.html"),
                include_str!("../../templates/check_in_instructions.txt")),
            (EmailType::CheckoutReminder, CHECKOUT_REMINDER_SUBJECT,
                include_str!("../../templates/checkout_reminder.html"),
                include_str!("../../templates/checkout_reminder.txt")),
            (EmailType::ThankYouReview, THANK_YOU_SUBJECT,
                include_str!("../../templates/thank_you_review.html"),
                include_str!("../../templates/thank_you_review.txt")),
        ];

        for (email_type, subject, html, text) in sources {
            let (subject_name, html_name, text_name) = template_names(email_type);
            tera.add_raw_templates(vec![(subject_name, subject), (html_name, html), (text_name, text)])
                .map_err(|e| AppError::InternalWithMsg(format!("Tera parse error: {:?}", e)))?;
        }

        Ok(Self { tera })
    }

    pub fn render(&self, email_type: EmailType, booking: &Booking, property: &Property) -> Result<RenderedEmail, AppError> {
        let context = build_context(booking, property);
        let (subject_name, html_name, text_name) = template_names(email_type);

        let render = |name: &str| {
            self.tera.render(name, &context)
                .map_err(|e| AppError::InternalWithMsg(format!("Tera render error for {}: {:?}", name, e)))
        };

        Ok(RenderedEmail {
            subject: render(&subject_name)?.trim().to_string(),
            html_body: render(&html_name)?,
            text_body: render(&text_name)?,
        })
    }
}

fn local_time(at: DateTime<Utc>, tz: &Tz) -> String {
    at.with_timezone(tz).format("%A, %B %-d %Y at %H:%M").to_string()
}

fn build_context(booking: &Booking, property: &Property) -> Context {
    let tz = property.tz();
    let mut context = Context::new();
    context.insert("guest_name", &booking.guest_name);
    context.insert("property_name", &property.name);
    context.insert("address", &property.address);
    context.insert("check_in_instructions", &property.check_in_instructions);
    context.insert("review_url", &property.review_url);
    context.insert("check_in", &local_time(booking.check_in, &tz));
    context.insert("check_out", &local_time(booking.check_out, &tz));
    context.insert("timezone", &property.timezone);
    context
}
