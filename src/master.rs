use crate::cut::CutPool;
use crate::error::Result;
use crate::solver;
use crate::system::ReservoirParameters;

/// Columns and rows of the first stage decisions, shared by the master
/// problem and the deterministic equivalent.
#[derive(Debug)]
pub struct FirstStageAccessors {
    pub hours: Vec<usize>,
    pub discharge: Vec<usize>,
    pub production: Vec<usize>,
    pub volume: Vec<usize>,
    pub production_link: Vec<usize>,
    pub volume_balance: Vec<usize>,
}

impl FirstStageAccessors {
    /// Column of the volume at the end of the first stage
    pub fn terminal_volume(&self) -> usize {
        self.volume[self.volume.len() - 1]
    }
}

/// Adds the first stage variables and constraints: production is sold at
/// the hourly price, production follows discharge through the conversion
/// factor and the volume evolves from the initial volume.
pub(crate) fn add_first_stage(
    pb: &mut solver::Problem,
    params: &ReservoirParameters,
) -> FirstStageAccessors {
    let hours: Vec<usize> = params.first_stage().collect();

    // VARIABLES
    let discharge: Vec<usize> = hours
        .iter()
        .map(|_| pb.add_column(0.0, 0.0..=params.max_discharge))
        .collect();
    let production: Vec<usize> = hours
        .iter()
        .map(|hour| {
            pb.add_column(params.price(*hour), 0.0..=params.max_production)
        })
        .collect();
    let volume: Vec<usize> = hours
        .iter()
        .map(|_| pb.add_column(0.0, 0.0..=params.max_volume))
        .collect();

    // production - conversion * discharge = 0
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
        .map(|i| match i {
            0 => {
                let rhs = params.initial_volume + params.first_stage_inflow;
                pb.add_row(rhs..=rhs, &[(volume[i], 1.0), (discharge[i], 1.0)])
            }
            _ => {
                let rhs = params.first_stage_inflow;
                pb.add_row(
                    rhs..=rhs,
                    &[
                        (volume[i], 1.0),
                        (volume[i - 1], -1.0),
                        (discharge[i], 1.0),
                    ],
                )
            }
        })
        .collect();

    FirstStageAccessors {
        hours,
        discharge,
        production,
        volume,
        production_link,
        volume_balance,
    }
}

/// The hourly first stage decisions of a solved model
#[derive(Debug, Clone, PartialEq)]
pub struct StageSchedule {
    pub hours: Vec<usize>,
    pub discharge: Vec<f64>,
    pub production: Vec<f64>,
    pub volume: Vec<f64>,
    pub price: Vec<f64>,
}

impl StageSchedule {
    pub(crate) fn from_solution(
        accessors: &FirstStageAccessors,
        params: &ReservoirParameters,
        solution: &solver::Solution,
    ) -> Self {
        Self {
            hours: accessors.hours.clone(),
            discharge: solution.columns(&accessors.discharge),
            production: solution.columns(&accessors.production),
            volume: solution.columns(&accessors.volume),
            price: accessors.hours.iter().map(|h| params.price(*h)).collect(),
        }
    }

    pub fn terminal_volume(&self) -> f64 {
        self.volume.last().copied().unwrap_or(0.0)
    }

    /// Revenue of the scheduled production
    pub fn profit(&self) -> f64 {
        self.production
            .iter()
            .zip(self.price.iter())
            .map(|(p, price)| p * price)
            .sum()
    }
}

#[derive(Debug)]
pub struct MasterAccessors {
    pub first_stage: FirstStageAccessors,
    pub alpha: usize,
    pub cuts: Vec<usize>,
}

/// The first stage problem, where the second stage is represented by the
/// surrogate `alpha` bounded from above by every cut in the pool
#[derive(Debug)]
pub struct MasterProblem {
    pub model: solver::Model,
    pub accessors: MasterAccessors,
    params: ReservoirParameters,
}

#[derive(Debug, Clone)]
pub struct MasterSolution {
    /// Reservoir volume at the end of the first stage
    pub linking_value: f64,
    /// First stage profit plus `alpha`
    pub objective: f64,
    pub alpha: f64,
    pub stage_profit: f64,
    pub schedule: StageSchedule,
}

impl MasterProblem {
    pub fn new(params: &ReservoirParameters, cut_pool: &CutPool) -> Result<Self> {
        let mut pb = solver::Problem::new();
        let first_stage = add_first_stage(&mut pb, params);

        let alpha =
            pb.add_column(1.0, -params.alpha_bound..=params.alpha_bound);

        // alpha - slope * volume(end) <= intercept
        let terminal_volume = first_stage.terminal_volume();
        let cuts: Vec<usize> = cut_pool
            .cuts()
            .iter()
            .map(|cut| {
                pb.add_row(
                    ..=cut.intercept,
                    &[(alpha, 1.0), (terminal_volume, -cut.slope)],
                )
            })
            .collect();

        let model = pb.try_optimise(solver::Sense::Maximise, "master")?;

        Ok(Self {
            model,
            accessors: MasterAccessors {
                first_stage,
                alpha,
                cuts,
            },
            params: params.clone(),
        })
    }

    pub fn solve(&mut self) -> Result<MasterSolution> {
        let solution = self.model.solve()?;
        let schedule = StageSchedule::from_solution(
            &self.accessors.first_stage,
            &self.params,
            &solution,
        );
        let alpha = solution.colvalue[self.accessors.alpha];
        log::debug!(
            "master solved with {} cuts: objective {:.4}, alpha {:.4}",
            self.accessors.cuts.len(),
            solution.objective,
            alpha
        );
        Ok(MasterSolution {
            linking_value: schedule.terminal_volume(),
            objective: solution.objective,
            alpha,
            stage_profit: solution.objective - alpha,
            schedule,
        })
    }
}

/// Builds the master problem for the current cut pool and solves it
pub fn solve_master(
    params: &ReservoirParameters,
    cut_pool: &CutPool,
) -> Result<MasterSolution> {
    MasterProblem::new(params, cut_pool)?.solve()
}
