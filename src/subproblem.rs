use crate::error::Result;
use crate::scenario::ScenarioSet;
use crate::solver;
use crate::system::ReservoirParameters;
use rayon::prelude::*;
use serde::Deserialize;

/// How the scenarios of the second stage are put into linear programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStrategy {
    /// One probability-weighted program holding every scenario
    #[default]
    Aggregated,
    /// One program per scenario, solved concurrently and recombined by
    /// their weights
    Decomposed,
}

/// Helper accessor for indexing the second stage variables and
/// constraints, indexed by scenario then hour
#[derive(Debug)]
pub struct Accessors {
    pub hours: Vec<usize>,
    pub discharge: Vec<Vec<usize>>,
    pub production: Vec<Vec<usize>>,
    pub volume: Vec<Vec<usize>>,
    pub linking: usize,
    pub linking_row: usize,
    pub production_link: Vec<Vec<usize>>,
    pub volume_balance: Vec<Vec<usize>>,
}

/// Columns and rows added for one scenario
pub(crate) struct ScenarioColumns {
    pub discharge: Vec<usize>,
    pub production: Vec<usize>,
    pub volume: Vec<usize>,
    pub production_link: Vec<usize>,
    pub volume_balance: Vec<usize>,
}

/// Adds the decisions of one second stage scenario, starting from the
/// column holding the first stage terminal volume. `weight` scales the
/// scenario's contribution to the objective.
pub(crate) fn add_scenario(
    pb: &mut solver::Problem,
    params: &ReservoirParameters,
    hours: &[usize],
    start_volume: usize,
    inflow: f64,
    weight: f64,
) -> ScenarioColumns {
    let last = params.last_hour();

    // VARIABLES
    let discharge: Vec<usize> = hours
        .iter()
        .map(|_| pb.add_column(0.0, 0.0..=params.max_discharge))
        .collect();
    let production: Vec<usize> = hours
        .iter()
        .map(|hour| {
            pb.add_column(
                weight * params.price(*hour),
                0.0..=params.max_production,
            )
        })
        .collect();
    let volume: Vec<usize> = hours
        .iter()
        .map(|hour| {
            let water_value = match *hour == last {
                true => weight * params.terminal_water_value,
                false => 0.0,
            };
            pb.add_column(water_value, 0.0..=params.max_volume)
        })
        .collect();

    let production_link: Vec<usize> = (0..hours.len())
        .map(|i| {
            pb.add_row(
                0.0..=0.0,
                &[(production[i], 1.0), (discharge[i], -params.conversion)],
            )
        })
        .collect();

    // volume(t) - volume(t-1) + discharge(t) = inflow
    let volume_balance: Vec<usize> = (0..hours.len())
        .map(|i| {
            let previous = match i {
                0 => start_volume,
                _ => volume[i - 1],
            };
            pb.add_row(
                inflow..=inflow,
                &[(volume[i], 1.0), (previous, -1.0), (discharge[i], 1.0)],
            )
        })
        .collect();

    ScenarioColumns {
        discharge,
        production,
        volume,
        production_link,
        volume_balance,
    }
}

/// The second stage problem for a fixed first stage terminal volume
#[derive(Debug)]
pub struct Subproblem {
    pub model: solver::Model,
    pub accessors: Accessors,
    linking_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubproblemSolution {
    pub linking_value: f64,
    /// Expected second stage profit
    pub objective: f64,
    /// Dual price of the linking constraint: marginal expected profit of
    /// one more unit of water at the start of the second stage
    pub dual: f64,
    /// Volume left at the end of the horizon, by scenario
    pub terminal_volumes: Vec<f64>,
}

impl Subproblem {
    pub fn new(
        params: &ReservoirParameters,
        linking_value: f64,
        scenarios: &ScenarioSet,
    ) -> Result<Self> {
        let mut pb = solver::Problem::new();
        let hours: Vec<usize> = params.second_stage().collect();

        // the linking value enters through a free column fixed by an
        // equality row, whose dual is the slope of the cut
        let linking = pb.add_column(0.0, ..);
        let linking_row =
            pb.add_row(linking_value..=linking_value, &[(linking, 1.0)]);

        let mut accessors = Accessors {
            hours: hours.clone(),
            discharge: vec![],
            production: vec![],
            volume: vec![],
            linking,
            linking_row,
            production_link: vec![],
            volume_balance: vec![],
        };
        for scenario in scenarios.scenarios() {
            let columns = add_scenario(
                &mut pb,
                params,
                &hours,
                linking,
                scenario.inflow,
                scenarios.weight(scenario),
            );
            accessors.discharge.push(columns.discharge);
            accessors.production.push(columns.production);
            accessors.volume.push(columns.volume);
            accessors.production_link.push(columns.production_link);
            accessors.volume_balance.push(columns.volume_balance);
        }

        let model = pb.try_optimise(solver::Sense::Maximise, "subproblem")?;

        Ok(Subproblem {
            model,
            accessors,
            linking_value,
        })
    }

    pub fn solve(&mut self) -> Result<SubproblemSolution> {
        let solution = self.model.solve()?;
        let dual = solution.row_dual(self.accessors.linking_row)?;
        let terminal_volumes = self
            .accessors
            .volume
            .iter()
            .map(|v| v.last().map(|col| solution.colvalue[*col]).unwrap_or(0.0))
            .collect();
        log::debug!(
            "subproblem solved at {:.6}: objective {:.4}, dual {:.4}",
            self.linking_value,
            solution.objective,
            dual
        );
        Ok(SubproblemSolution {
            linking_value: self.linking_value,
            objective: solution.objective,
            dual,
            terminal_volumes,
        })
    }
}

/// Builds and solves the aggregated second stage problem
pub fn solve_subproblem(
    params: &ReservoirParameters,
    linking_value: f64,
    scenarios: &ScenarioSet,
) -> Result<SubproblemSolution> {
    Subproblem::new(params, linking_value, scenarios)?.solve()
}

/// Solves every scenario on its own, in parallel, and recombines the
/// objectives and duals with the scenario weights
fn solve_decomposed(
    params: &ReservoirParameters,
    linking_value: f64,
    scenarios: &ScenarioSet,
) -> Result<SubproblemSolution> {
    let parts = scenarios.split();
    let solutions: Vec<(f64, SubproblemSolution)> = parts
        .par_iter()
        .map(|(weight, single)| {
            solve_subproblem(params, linking_value, single)
                .map(|solution| (*weight, solution))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut objective = 0.0;
    let mut dual = 0.0;
    let mut terminal_volumes = Vec::with_capacity(solutions.len());
    for (weight, solution) in solutions.iter() {
        objective += weight * solution.objective;
        dual += weight * solution.dual;
        terminal_volumes.extend_from_slice(&solution.terminal_volumes);
    }
    Ok(SubproblemSolution {
        linking_value,
        objective,
        dual,
        terminal_volumes,
    })
}

/// Expected second stage profit and its marginal water value at a first
/// stage terminal volume
pub fn evaluate(
    params: &ReservoirParameters,
    linking_value: f64,
    scenarios: &ScenarioSet,
    strategy: ScenarioStrategy,
) -> Result<SubproblemSolution> {
    match strategy {
        ScenarioStrategy::Aggregated => {
            solve_subproblem(params, linking_value, scenarios)
        }
        ScenarioStrategy::Decomposed => {
            solve_decomposed(params, linking_value, scenarios)
        }
    }
}
