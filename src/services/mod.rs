pub mod attendance;
pub mod clients;
pub mod directory;
pub mod identity;
pub mod reporting;
pub mod requests;
pub mod schedules;

pub use attendance::AttendanceService;
pub use clients::ClientService;
pub use directory::DirectoryService;
pub use identity::IdentityService;
pub use reporting::ReportingService;
pub use requests::RequestService;
pub use schedules::ScheduleService;
