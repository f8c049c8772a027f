pub mod model;
pub mod sets_and_parameters;

pub use model::{FacilityLocationModel, FacilityLocationResult, SolutionReport, Variables};
pub use sets_and_parameters::{Parameters, Sets};
