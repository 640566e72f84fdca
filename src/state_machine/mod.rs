mod report;
mod state;

pub use report::{Report, ReportId};
pub use state::{Resolution, State};
