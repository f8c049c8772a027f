pub mod facility_location;
pub mod lp_problem;
pub mod utils;
