mod retry;
mod schedule;

pub use retry::conflict_backoff;
pub use schedule::{DailySchedule, ScheduleParseError};
