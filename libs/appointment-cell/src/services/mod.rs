pub mod booking;
pub mod conditional;
pub mod dashboard;
pub mod lifecycle;
pub mod slots;
