pub mod models;
pub mod problem;
#[cfg(feature = "python")]
pub mod python;
pub mod solver;

pub use models::facility_location::{FacilityLocationModel, FacilityLocationResult};
pub use problem::Problem;

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// A Python module implemented in Rust. The name of this function must match
/// the `lib.name` setting in the `Cargo.toml`, else Python will not be able to
/// import the module.
#[cfg(feature = "python")]
#[pymodule]
fn facility_location(_py: Python, m: &PyModule) -> PyResult<()> {
    pyo3_log::init();
    m.add_class::<python::PyProblem>()?;
    Ok(())
}
