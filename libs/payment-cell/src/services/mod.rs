pub mod checkout;
pub mod reconciliation;

pub use checkout::CheckoutService;
pub use reconciliation::ReconciliationService;
