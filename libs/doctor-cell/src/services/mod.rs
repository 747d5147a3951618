pub mod directory;
pub mod profile;

pub use directory::DoctorDirectoryService;
pub use profile::DoctorProfileService;
