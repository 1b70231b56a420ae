//! Simplifies the implementation from "highs" crate, only supporting
//! the "RowProblem" variant, and exposes the pieces the decomposition
//! relies on: primal values, the objective and row duals expressed in the
//! caller's optimisation sense.

use std::ffi::{c_void, CString};
use std::ops::{Bound, RangeBounds};
use std::os::raw::{c_char, c_int};

use highs_sys::*;

use crate::error::{HydroError, Result};

/// HiGHS code of a feasible primal or dual solution
const SOLUTION_STATUS_FEASIBLE: HighsInt = 2;

/// The kinds of results of an optimization
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Ord, Eq)]
pub enum HighsModelStatus {
    /// not initialized
    NotSet,
    /// Unable to load model
    LoadError,
    /// invalid model
    ModelError,
    /// Unable to run the pre-solve phase
    PresolveError,
    /// Unable to solve
    SolveError,
    /// Unable to clean after solve
    PostsolveError,
    /// No variables in the model: nothing to optimize
    ModelEmpty,
    /// There is no solution to the problem
    Infeasible,
    /// The problem in unbounded or infeasible
    UnboundedOrInfeasible,
    /// The problem is unbounded: there is no single optimal value
    Unbounded,
    /// An optimal solution was found
    Optimal,
    ObjectiveBound,
    ObjectiveTarget,
    ReachedTimeLimit,
    ReachedIterationLimit,
    Unknown,
}

impl From<c_int> for HighsModelStatus {
    fn from(value: c_int) -> Self {
        match value {
            MODEL_STATUS_NOTSET => Self::NotSet,
            MODEL_STATUS_LOAD_ERROR => Self::LoadError,
            MODEL_STATUS_MODEL_ERROR => Self::ModelError,
            MODEL_STATUS_PRESOLVE_ERROR => Self::PresolveError,
            MODEL_STATUS_SOLVE_ERROR => Self::SolveError,
            MODEL_STATUS_POSTSOLVE_ERROR => Self::PostsolveError,
            MODEL_STATUS_MODEL_EMPTY => Self::ModelEmpty,
            MODEL_STATUS_INFEASIBLE => Self::Infeasible,
            MODEL_STATUS_UNBOUNDED => Self::Unbounded,
            MODEL_STATUS_UNBOUNDED_OR_INFEASIBLE => Self::UnboundedOrInfeasible,
            MODEL_STATUS_OPTIMAL => Self::Optimal,
            MODEL_STATUS_OBJECTIVE_BOUND => Self::ObjectiveBound,
            MODEL_STATUS_OBJECTIVE_TARGET => Self::ObjectiveTarget,
            MODEL_STATUS_REACHED_TIME_LIMIT => Self::ReachedTimeLimit,
            MODEL_STATUS_REACHED_ITERATION_LIMIT => {
                Self::ReachedIterationLimit
            }
            _ => Self::Unknown,
        }
    }
}

/// The status of a highs operation
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Ord, Eq)]
pub enum HighsStatus {
    /// Success
    OK,
    /// Done, with warning
    Warning,
    /// An error occurred
    Error,
}

impl From<c_int> for HighsStatus {
    fn from(value: c_int) -> Self {
        match value {
            STATUS_OK => Self::OK,
            STATUS_WARNING => Self::Warning,
            _ => Self::Error,
        }
    }
}

pub trait HighsOptionValue {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> c_int;
}

impl HighsOptionValue for bool {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> c_int {
        Highs_setBoolOptionValue(highs, option, if self { 1 } else { 0 })
    }
}

impl HighsOptionValue for i32 {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> c_int {
        Highs_setIntOptionValue(highs, option, self)
    }
}

impl HighsOptionValue for f64 {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> c_int {
        Highs_setDoubleOptionValue(highs, option, self)
    }
}

impl<'a> HighsOptionValue for &'a str {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> c_int {
        match CString::new(self) {
            Ok(value) => {
                Highs_setStringOptionValue(highs, option, value.as_ptr())
            }
            Err(_) => STATUS_ERROR,
        }
    }
}

fn bound_value(b: Bound<&f64>) -> Option<f64> {
    match b {
        Bound::Included(v) | Bound::Excluded(v) => Some(*v),
        Bound::Unbounded => None,
    }
}

fn c(n: usize) -> Result<HighsInt> {
    n.try_into().map_err(|_| {
        HydroError::InvalidInput(format!("size {n} too large for HiGHS"))
    })
}

fn try_handle_status(status: c_int, call: &str) -> Result<HighsStatus> {
    match HighsStatus::from(status) {
        HighsStatus::OK => Ok(HighsStatus::OK),
        HighsStatus::Warning => {
            log::warn!("HiGHS emitted a warning: {call}");
            Ok(HighsStatus::Warning)
        }
        HighsStatus::Error => Err(HydroError::SolverCall {
            call: call.to_string(),
        }),
    }
}

macro_rules! highs_call {
    ($function_name:ident ($($param:expr),+)) => {
        try_handle_status(
            $function_name($($param),+),
            stringify!($function_name)
        )
    }
}

/// An optimization problem, built row by row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Problem {
    pub num_col: usize,
    pub num_row: usize,
    pub num_nz: usize,
    pub col_cost: Vec<f64>,
    pub col_lower: Vec<f64>,
    pub col_upper: Vec<f64>,
    pub row_lower: Vec<f64>,
    pub row_upper: Vec<f64>,
    columns: Vec<(Vec<usize>, Vec<f64>)>,
}

impl Problem {
    /// Create a new problem instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint `lower <= sum(factor * col) <= upper` and returns
    /// its row index. Column indices must come from [`Problem::add_column`].
    pub fn add_row(
        &mut self,
        bounds: impl RangeBounds<f64>,
        row_factors: &[(usize, f64)],
    ) -> usize {
        for &(col, factor) in row_factors {
            let c = &mut self.columns[col];
            c.0.push(self.num_row);
            c.1.push(factor);
            self.num_nz += 1;
        }
        let low =
            bound_value(bounds.start_bound()).unwrap_or(f64::NEG_INFINITY);
        let high = bound_value(bounds.end_bound()).unwrap_or(f64::INFINITY);
        self.row_lower.push(low);
        self.row_upper.push(high);
        let old_row_count = self.num_row;
        self.num_row += 1;
        old_row_count
    }

    /// Adds a variable with an objective coefficient and bounds, returning
    /// its column index.
    pub fn add_column(
        &mut self,
        col_factor: f64,
        bounds: impl RangeBounds<f64>,
    ) -> usize {
        self.col_cost.push(col_factor);
        let low =
            bound_value(bounds.start_bound()).unwrap_or(f64::NEG_INFINITY);
        let high = bound_value(bounds.end_bound()).unwrap_or(f64::INFINITY);
        self.col_lower.push(low);
        self.col_upper.push(high);
        self.columns.push((vec![], vec![]));
        let old_col_count = self.num_col;
        self.num_col += 1;
        old_col_count
    }

    fn to_compressed_matrix_form(
        &self,
    ) -> Result<(Vec<HighsInt>, Vec<HighsInt>, Vec<f64>)> {
        let mut astart = Vec::with_capacity(self.num_col + 1);
        astart.push(0);
        let mut aindex = Vec::with_capacity(self.num_nz);
        let mut avalue = Vec::with_capacity(self.num_nz);
        for (row_indices, factors) in self.columns.iter() {
            for row in row_indices {
                aindex.push(c(*row)?);
            }
            avalue.extend_from_slice(factors);
            astart.push(c(aindex.len())?);
        }
        Ok((astart, aindex, avalue))
    }

    /// Create a model based on this problem, with the default options
    /// applied. Don't solve it yet.
    pub fn try_optimise(self, sense: Sense, name: &str) -> Result<Model> {
        let mut model = Model::try_new(self, sense, name)?;
        set_default_solver_options(&mut model)?;
        Ok(model)
    }
}

/// Helper function for setting the same default solver options on
/// every solved problem.
fn set_default_solver_options(model: &mut Model) -> Result<()> {
    model.set_option("presolve", "off")?;
    model.set_option("solver", "simplex")?;
    model.set_option("parallel", "off")?;
    model.set_option("threads", 1)?;
    model.set_option("primal_feasibility_tolerance", 1e-7)?;
    model.set_option("dual_feasibility_tolerance", 1e-7)?;
    model.set_option("time_limit", 300.0)?;
    Ok(())
}

#[derive(Debug)]
struct HighsPtr(*mut c_void);

impl Drop for HighsPtr {
    fn drop(&mut self) {
        unsafe { Highs_destroy(self.0) }
    }
}

impl HighsPtr {
    fn try_create() -> Result<Self> {
        let ptr = unsafe { Highs_create() };
        if ptr.is_null() {
            return Err(HydroError::SolverUnavailable(
                "Highs_create returned a null instance".to_string(),
            ));
        }
        Ok(Self(ptr))
    }

    fn mut_ptr(&mut self) -> *mut c_void {
        self.0
    }

    /// Prevents writing anything to the standard output when solving the model
    fn make_quiet(&mut self) -> Result<()> {
        // setting log_file seems to cause a double free in Highs.
        // See https://github.com/rust-or/highs/issues/3
        self.set_option("output_flag", false)?;
        self.set_option("log_to_console", false)
    }

    fn set_option<V: HighsOptionValue>(
        &mut self,
        option: &str,
        value: V,
    ) -> Result<()> {
        let c_str = CString::new(option).map_err(|_| {
            HydroError::InvalidInput(format!("invalid option name {option}"))
        })?;
        let status =
            unsafe { value.apply_to_highs(self.mut_ptr(), c_str.as_ptr()) };
        try_handle_status(status, "Highs_setOptionValue").map(|_| ())
    }

    fn num_cols(&self) -> usize {
        let n = unsafe { Highs_getNumCols(self.0) };
        n.try_into().unwrap_or(0)
    }

    fn num_rows(&self) -> usize {
        let n = unsafe { Highs_getNumRows(self.0) };
        n.try_into().unwrap_or(0)
    }
}

/// Whether to maximize or minimize the objective function
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Sense {
    Maximise,
    Minimise,
}

impl Sense {
    fn sign(self) -> f64 {
        match self {
            Sense::Maximise => -1.0,
            Sense::Minimise => 1.0,
        }
    }
}

/// A model to solve. HiGHS always receives a minimisation: maximisation
/// costs are negated on the way in, objective and duals on the way out.
#[derive(Debug)]
pub struct Model {
    highs: HighsPtr,
    sense: Sense,
    name: String,
}

impl Model {
    /// Create a Highs model to be optimized (but don't solve it yet).
    /// Returns an error if the problem is incoherent.
    pub fn try_new(problem: Problem, sense: Sense, name: &str) -> Result<Self> {
        let mut highs = HighsPtr::try_create()?;
        highs.make_quiet()?;
        let sign = sense.sign();
        let costs: Vec<f64> =
            problem.col_cost.iter().map(|cost| sign * cost).collect();
        let (astart, aindex, avalue) = problem.to_compressed_matrix_form()?;
        unsafe {
            highs_call!(Highs_passLp(
                highs.mut_ptr(),
                c(problem.num_col)?,
                c(problem.num_row)?,
                c(problem.num_nz)?,
                MATRIX_FORMAT_COLUMN_WISE,
                OBJECTIVE_SENSE_MINIMIZE,
                0.0,
                costs.as_ptr(),
                problem.col_lower.as_ptr(),
                problem.col_upper.as_ptr(),
                problem.row_lower.as_ptr(),
                problem.row_upper.as_ptr(),
                astart.as_ptr(),
                aindex.as_ptr(),
                avalue.as_ptr()
            ))
        }?;
        Ok(Self {
            highs,
            sense,
            name: name.to_string(),
        })
    }

    pub fn set_option<V: HighsOptionValue>(
        &mut self,
        option: &str,
        value: V,
    ) -> Result<()> {
        self.highs.set_option(option, value)
    }

    /// The status of the solution. Should be Optimal if everything went well.
    pub fn status(&self) -> HighsModelStatus {
        HighsModelStatus::from(unsafe { Highs_getModelStatus(self.highs.0) })
    }

    /// Solves the model and returns its optimal solution. Any outcome other
    /// than an optimum is an error naming this model.
    pub fn solve(&mut self) -> Result<Solution> {
        let run_status = unsafe { Highs_run(self.highs.mut_ptr()) };
        match self.status() {
            HighsModelStatus::Optimal => {}
            HighsModelStatus::Infeasible => {
                return Err(HydroError::InfeasibleModel {
                    model: self.name.clone(),
                })
            }
            HighsModelStatus::Unbounded
            | HighsModelStatus::UnboundedOrInfeasible => {
                return Err(HydroError::UnboundedModel {
                    model: self.name.clone(),
                })
            }
            status => {
                return Err(HydroError::SolverFailure {
                    model: self.name.clone(),
                    status,
                })
            }
        }
        try_handle_status(run_status, "Highs_run")?;
        Ok(self.get_solution())
    }

    fn get_solution(&self) -> Solution {
        let cols = self.num_cols();
        let rows = self.num_rows();
        let mut colvalue: Vec<f64> = vec![0.; cols];
        let mut coldual: Vec<f64> = vec![0.; cols];
        let mut rowvalue: Vec<f64> = vec![0.; rows];
        let mut rowdual: Vec<f64> = vec![0.; rows];
        let mut dual_status: HighsInt = 0;

        let (objective, info_status) = unsafe {
            Highs_getSolution(
                self.highs.0,
                colvalue.as_mut_ptr(),
                coldual.as_mut_ptr(),
                rowvalue.as_mut_ptr(),
                rowdual.as_mut_ptr(),
            );
            let info_status = Highs_getIntInfoValue(
                self.highs.0,
                c"dual_solution_status".as_ptr(),
                &mut dual_status,
            );
            (Highs_getObjectiveValue(self.highs.0), info_status)
        };

        // back to the caller's sense
        let sign = self.sense.sign();
        coldual.iter_mut().for_each(|d| *d *= sign);
        rowdual.iter_mut().for_each(|d| *d *= sign);

        Solution {
            model: self.name.clone(),
            objective: sign * objective,
            colvalue,
            coldual,
            rowvalue,
            rowdual,
            dual_feasible: info_status == STATUS_OK
                && dual_status == SOLUTION_STATUS_FEASIBLE,
        }
    }

    /// Number of variables
    pub fn num_cols(&self) -> usize {
        self.highs.num_cols()
    }

    /// Number of constraints
    pub fn num_rows(&self) -> usize {
        self.highs.num_rows()
    }
}

// SAFETY: a HiGHS instance is owned by exactly one Model and never shared.
unsafe impl Send for HighsPtr {}

/// Concrete values of the solution
#[derive(Clone, Debug)]
pub struct Solution {
    pub model: String,
    pub objective: f64,
    pub colvalue: Vec<f64>,
    pub coldual: Vec<f64>,
    pub rowvalue: Vec<f64>,
    pub rowdual: Vec<f64>,
    dual_feasible: bool,
}

impl Solution {
    /// Optimal values of the given columns, in the given order
    pub fn columns(&self, indices: &[usize]) -> Vec<f64> {
        indices.iter().map(|&col| self.colvalue[col]).collect()
    }

    /// Dual value of a row: the change of the objective, in the model's
    /// own sense, per unit increase of the row's right-hand side.
    pub fn row_dual(&self, row: usize) -> Result<f64> {
        let missing = || HydroError::MissingDual {
            model: self.model.clone(),
            row,
        };
        if !self.dual_feasible {
            return Err(missing());
        }
        match self.rowdual.get(row) {
            Some(dual) if dual.is_finite() => Ok(*dual),
            _ => Err(missing()),
        }
    }
}
