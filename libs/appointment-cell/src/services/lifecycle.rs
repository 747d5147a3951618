// libs/appointment-cell/src/services/lifecycle.rs
use chrono::Utc;
use tracing::{debug, warn};

use shared_database::AppointmentPatch;
use shared_models::appointment::{
    AppointmentStatus, DisplayStatus, PaymentInfo, PaymentMethod,
};

use crate::models::{Action, AppointmentError};

const ACTIVE: &[DisplayStatus] = &[DisplayStatus::Pending, DisplayStatus::Confirmed];
const FINISHED: &[DisplayStatus] = &[
    DisplayStatus::Completed,
    DisplayStatus::Missed,
    DisplayStatus::Cancelled,
];
const PAYABLE: &[DisplayStatus] = &[
    DisplayStatus::Pending,
    DisplayStatus::Confirmed,
    DisplayStatus::Completed,
];

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Statuses from which `action` may be applied.
    pub fn allowed_from(&self, action: Action) -> &'static [DisplayStatus] {
        match action {
            Action::Confirm => &[DisplayStatus::Pending],
            Action::Complete { .. } => &[DisplayStatus::Confirmed],
            Action::Cancel => ACTIVE,
            Action::Hide => FINISHED,
            Action::PayCash | Action::PayOnline => PAYABLE,
        }
    }

    /// Status an appointment moves to, `None` when the action leaves it alone.
    pub fn target(&self, action: Action) -> Option<AppointmentStatus> {
        match action {
            Action::Confirm => Some(AppointmentStatus::Confirmed),
            Action::Complete { patient_visited } => {
                Some(AppointmentStatus::Completed { patient_visited })
            }
            Action::Cancel => Some(AppointmentStatus::Cancelled),
            Action::Hide | Action::PayCash | Action::PayOnline => None,
        }
    }

    pub fn validate_transition(
        &self,
        current: AppointmentStatus,
        action: Action,
    ) -> Result<(), AppointmentError> {
        debug!("Validating {:?} on {} appointment", action, current);

        if !self.allowed_from(action).contains(&current.display()) {
            warn!("Invalid transition attempted: {:?} from {}", action, current);
            return Err(AppointmentError::InvalidStatusTransition {
                action,
                current: current.display(),
            });
        }

        Ok(())
    }

    /// Status change written by `action`. Hiding and payments go through
    /// [`Self::hide_patch`] and [`Self::payment_patch`].
    pub fn transition_patch(&self, action: Action) -> AppointmentPatch {
        let mut patch = AppointmentPatch::new();
        patch.status = self.target(action);
        patch
    }

    pub fn hide_patch(&self, from_user: bool, from_doctor: bool) -> AppointmentPatch {
        let mut patch = AppointmentPatch::new();
        if from_user {
            patch.show_to_user = Some(false);
        }
        if from_doctor {
            patch.show_to_doctor = Some(false);
        }
        patch
    }

    /// Marks an appointment paid. `info` carries what is already known about
    /// the transaction; the payment timestamp is set here.
    pub fn payment_patch(&self, method: PaymentMethod, info: PaymentInfo) -> AppointmentPatch {
        let mut patch = AppointmentPatch::new();
        patch.payment = Some(true);
        patch.payment_method = Some(method);
        patch.payment_info = Some(PaymentInfo {
            paid_at: Some(Utc::now()),
            ..info
        });
        patch
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
