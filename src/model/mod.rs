pub mod attendance;
pub mod client;
pub mod clock_event;
pub mod employee;
pub mod report;
pub mod request;
pub mod role;
pub mod schedule_type;

pub use attendance::{AttendanceIndex, AttendanceStatus, StatusView};
pub use client::Client;
pub use clock_event::{ActivityEntry, ClockEvent, EventKind, NewClockEvent};
pub use employee::Employee;
pub use request::{Request, RequestKind, RequestStatus};
pub use role::{Actor, Role};
pub use schedule_type::{ScheduleKind, ScheduleType};
