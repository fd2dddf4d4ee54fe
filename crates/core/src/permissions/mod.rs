//! Permission system for booking operations

use crate::models::{Role, ScheduleStatus};

/// Actions a signed-in user may attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // Rooms
    ViewRooms,
    ViewAvailability,
    ManageRooms,

    // Bookings
    CreateSchedule,
    ViewOwnSchedules,
    ViewAllSchedules,
    CancelOwnSchedule,
    SetScheduleStatus,

    // Accounts
    RegisterAdmin,
    UpdateOwnAccount,
    ManageUsers,

    // Audit
    ViewOwnLogs,
    ViewAllLogs,
}

/// Permission matrix for account roles
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role has permission to perform an action
    pub fn can_perform(role: Role, action: Action) -> bool {
        match action {
            // Anyone signed in
            Action::ViewRooms
            | Action::ViewAvailability
            | Action::CreateSchedule
            | Action::ViewOwnSchedules
            | Action::CancelOwnSchedule
            | Action::UpdateOwnAccount
            | Action::ViewOwnLogs => true,

            // Admin only
            Action::ManageRooms
            | Action::ViewAllSchedules
            | Action::SetScheduleStatus
            | Action::RegisterAdmin
            | Action::ManageUsers
            | Action::ViewAllLogs => role == Role::Admin,
        }
    }

    /// Check if a role may move a booking to `status`
    ///
    /// Owners may only cancel. Confirming, completing or touching someone
    /// else's booking needs an admin.
    pub fn can_set_status(role: Role, is_owner: bool, status: ScheduleStatus) -> bool {
        if Self::can_perform(role, Action::SetScheduleStatus) {
            return true;
        }
        is_owner
            && status == ScheduleStatus::Cancelled
            && Self::can_perform(role, Action::CancelOwnSchedule)
    }
}
