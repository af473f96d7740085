pub mod database;
pub mod domain;
pub mod test_utils;

// Table names shared between the service queries and the migration DDL.

pub const SUBMISSIONS_TABLE: &str = "submissions";
pub const STATUS_HISTORY_TABLE: &str = "status_history";
pub const USERS_TABLE: &str = "users";
pub const CITIZEN_NOTIFICATIONS_TABLE: &str = "citizen_notifications";

pub use database::{Database, DatabaseSettings};
pub use domain::reference::ReferenceNumber;
pub use domain::status::SubmissionStatus;
