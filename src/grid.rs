use crate::console;
use crate::cut::{make_cut, CutPool};
use crate::error::{HydroError, Result};
use crate::master::{solve_master, MasterSolution};
use crate::scenario::ScenarioSet;
use crate::subproblem::{self, ScenarioStrategy, SubproblemSolution};
use crate::system::ReservoirParameters;

/// Evenly spaced first stage terminal volumes, from empty to full
pub fn grid_volumes(max_volume: f64, grid_points: usize) -> Vec<f64> {
    let last = grid_points.saturating_sub(1).max(1) as f64;
    (0..grid_points)
        .map(|k| max_volume * k as f64 / last)
        .collect()
}

#[derive(Debug, Clone)]
pub struct GridOutcome {
    pub master: MasterSolution,
    pub cut_pool: CutPool,
    /// Subproblem solutions, one per grid volume
    pub evaluations: Vec<SubproblemSolution>,
}

impl GridOutcome {
    pub fn objective(&self) -> f64 {
        self.master.objective
    }

    pub fn linking_value(&self) -> f64 {
        self.master.linking_value
    }
}

/// Approximates the expected second stage profit by evaluating it on a
/// fixed grid of terminal volumes, then solves the master once against
/// the cuts of every grid point.
pub fn solve_by_grid(
    params: &ReservoirParameters,
    scenarios: &ScenarioSet,
    grid_points: usize,
    strategy: ScenarioStrategy,
) -> Result<GridOutcome> {
    if grid_points < 2 {
        return Err(HydroError::InvalidInput(format!(
            "the grid needs at least 2 points, got {grid_points}"
        )));
    }

    console::grid_greeting(grid_points, scenarios.len());
    let mut cut_pool = CutPool::new();
    let mut evaluations = Vec::with_capacity(grid_points);
    for (k, x) in grid_volumes(params.max_volume, grid_points)
        .into_iter()
        .enumerate()
    {
        let solution = subproblem::evaluate(params, x, scenarios, strategy)?;
        console::grid_row(x, solution.objective, solution.dual);
        cut_pool.add_cut(make_cut(k + 1, solution.objective, solution.dual, x));
        evaluations.push(solution);
    }

    let master = solve_master(params, &cut_pool)?;
    log::info!(
        "grid master solved with {} cuts at volume {:.6}",
        cut_pool.len(),
        master.linking_value
    );
    Ok(GridOutcome {
        master,
        cut_pool,
        evaluations,
    })
}
