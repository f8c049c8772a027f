use crate::models::facility_location::FacilityLocationModel;
use crate::problem::Problem;
use crate::solver::{self, BackendKind, SolverConfig};
use log::debug;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::fmt::Display;

pub fn pyerr<D: Display>(err: D) -> PyErr {
    PyErr::new::<PyValueError, _>(err.to_string())
}

/// A validated facility location problem
#[pyclass(name = "Problem")]
pub struct PyProblem {
    inner: Problem,
}

#[pymethods]
impl PyProblem {
    #[staticmethod]
    pub fn from_json(string: &str) -> PyResult<PyProblem> {
        Ok(PyProblem {
            inner: Problem::from_json(string).map_err(pyerr)?,
        })
    }

    #[staticmethod]
    pub fn from_path(path: &str) -> PyResult<PyProblem> {
        Ok(PyProblem {
            inner: Problem::from_path(path).map_err(pyerr)?,
        })
    }

    pub fn json(&self) -> PyResult<String> {
        serde_json::to_string_pretty(&self.inner).map_err(pyerr)
    }

    /// The constraints of the model, one per line
    pub fn describe(&self) -> PyResult<String> {
        let (model, _, _) = FacilityLocationModel::from_problem(&self.inner).map_err(pyerr)?;
        let rows = model
            .rows()
            .iter()
            .map(|row| model.display_row(row))
            .collect::<Vec<_>>();
        Ok(format!("{}\n{}", model, rows.join("\n")))
    }

    /// Solves the model and returns the solution report as JSON
    #[args(backend = "\"microlp\"", config = "None")]
    pub fn solve(&self, backend: &str, config: Option<&str>) -> PyResult<String> {
        let config = match config {
            Some(json) => serde_json::from_str::<SolverConfig>(json).map_err(pyerr)?,
            None => SolverConfig::default(),
        };
        let kind = backend.parse::<BackendKind>().map_err(pyerr)?;
        debug!("Solving from Python with {} and {:?}", kind, config);

        let mut backend = solver::backend(kind, config).map_err(pyerr)?;
        let result = FacilityLocationModel::solve(&self.inner, backend.as_mut()).map_err(pyerr)?;
        serde_json::to_string(&result.report()).map_err(pyerr)
    }

    pub fn total_demand(&self) -> f64 {
        self.inner.total_demand()
    }

    pub fn total_capacity(&self) -> f64 {
        self.inner.total_capacity()
    }

    pub fn __str__(&self) -> String {
        format!("{:#?}", self.inner)
    }

    pub fn __repr__(&self) -> String {
        self.__str__()
    }
}
