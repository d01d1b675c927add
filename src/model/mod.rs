//! Types that represent the core data model, such as `SubscriptionRecord` and `MonthBucket`.
mod amount;
mod dates;
mod mapping;
mod month;
mod raw;
mod record;
mod records;

pub use amount::{Amount, AmountError};
pub use mapping::{normalize_key, Header, Key};
pub use month::MonthBucket;
pub use raw::{CellValue, RawRow};
pub use record::{
    FieldError, SubscriptionField, SubscriptionRecord, STATUS_ACTIVE, STATUS_CANCELLED,
    STATUS_TRIAL_CANCELLED, STATUS_UPGRADE,
};
pub use records::{Records, RowIssue};
