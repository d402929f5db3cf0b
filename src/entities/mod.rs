mod draft;
mod history;
mod vehicle_class;
mod workflow;

pub use draft::{Booking, RideRequestDraft};
pub use history::{Rating, RideHistoryRecord};
pub use vehicle_class::VehicleClass;
pub use workflow::{Rejection, Submission, Transition, Workflow, WorkflowStep};
