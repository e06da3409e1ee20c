pub mod tables {
    pub const USER_TABLE: &str = "users";
    pub const VOLUNTEER_TABLE: &str = "volunteers";
    pub const INCIDENT_TABLE: &str = "incidents";
    pub const SHELTER_TABLE: &str = "shelters";
    pub const RESOURCE_TABLE: &str = "resources";
    pub const CONTRIBUTION_TABLE: &str = "contributions";
    pub const ALLOCATION_TABLE: &str = "allocations";
    pub const TASK_TABLE: &str = "tasks";
    pub const PROGRESS_TABLE: &str = "task_progress";
    pub const CAMPAIGN_TABLE: &str = "campaigns";
    pub const DONATION_TABLE: &str = "donations";

    pub const ALL: [&str; 11] = [
        USER_TABLE,
        VOLUNTEER_TABLE,
        INCIDENT_TABLE,
        SHELTER_TABLE,
        RESOURCE_TABLE,
        CONTRIBUTION_TABLE,
        ALLOCATION_TABLE,
        TASK_TABLE,
        PROGRESS_TABLE,
        CAMPAIGN_TABLE,
        DONATION_TABLE,
    ];
}

/// Index 0 is severity 1.
pub const SEVERITY_LABELS: [&str; 5] = ["Very Low", "Low", "Medium", "High", "Very High"];

pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-webhook-signature";
pub const PAYMENT_CAPTURED_EVENT: &str = "payment.captured";
