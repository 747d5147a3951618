pub mod memory;
pub mod postgrest;
pub mod store;
pub mod supabase;

pub use memory::MemoryStore;
pub use postgrest::SupabaseStore;
pub use store::{
    AppointmentFilter, AppointmentOrder, AppointmentPatch, ClinicStore, DoctorPatch, ListOptions,
    StoreError, UserPatch,
};
pub use supabase::SupabaseClient;
