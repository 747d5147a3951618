pub mod models;
pub mod services;

pub use models::{Action, Actor, AppointmentError, PaymentOutcome, ReconcileReport};
pub use services::booking::AppointmentBookingService;
pub use services::dashboard::DashboardService;
pub use services::slots::SlotService;
