pub mod gateway;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use gateway::{PaymentGateway, SslCommerzClient};
pub use models::{PaymentError, Reconciliation};
pub use router::{payment_routes, payment_routes_with_gateway, PaymentState};
