use crate::console;
use crate::cut::{make_cut, BendersCut, CutPool};
use crate::error::Result;
use crate::master::{solve_master, MasterSolution};
use crate::scenario::ScenarioSet;
use crate::subproblem::{self, ScenarioStrategy};
use crate::system::ReservoirParameters;
use std::time::{Duration, Instant};

/// Knobs of the decomposition loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BendersOptions {
    /// Upper limit on master / subproblem rounds
    pub num_iterations: usize,
    /// Cuts closer than this on both coefficients count as the same cut
    pub tolerance: f64,
    pub strategy: ScenarioStrategy,
}

impl Default for BendersOptions {
    fn default() -> Self {
        Self {
            num_iterations: 9,
            tolerance: 1e-6,
            strategy: ScenarioStrategy::Aggregated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The last cut repeated one already in the pool
    Converged,
    /// The iteration budget ran out first
    IterationLimit,
}

/// What happened in one round of the loop
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Master objective: first stage profit plus the cut approximation
    pub upper_bound: f64,
    /// First stage profit plus the true expected second stage profit
    pub lower_bound: f64,
    pub linking_value: f64,
    pub cut: BendersCut,
    pub time: Duration,
}

#[derive(Debug, Clone)]
pub struct BendersOutcome {
    /// Master solution the loop ended on; its schedule is the answer
    pub master: MasterSolution,
    /// The outer approximation of the expected second stage profit
    pub cut_pool: CutPool,
    pub iterations: Vec<IterationRecord>,
    pub stop_reason: StopReason,
}

impl BendersOutcome {
    pub fn objective(&self) -> f64 {
        self.master.objective
    }

    pub fn linking_value(&self) -> f64 {
        self.master.linking_value
    }
}

/// Runs the Benders loop: master, subproblem at the master's terminal
/// volume, cut, repeat. Stops when a cut repeats or the budget runs out.
pub fn train(
    params: &ReservoirParameters,
    scenarios: &ScenarioSet,
    options: &BendersOptions,
) -> Result<BendersOutcome> {
    let begin = Instant::now();
    let mut cut_pool = CutPool::new();
    let mut iterations = Vec::<IterationRecord>::new();

    console::training_greeting(options.num_iterations, scenarios.len());
    console::training_table_header();
    console::training_table_divider();

    for iteration in 1..=options.num_iterations {
        let iteration_begin = Instant::now();
        let master = solve_master(params, &cut_pool)?;
        let recourse = subproblem::evaluate(
            params,
            master.linking_value,
            scenarios,
            options.strategy,
        )?;
        let cut = make_cut(
            iteration,
            recourse.objective,
            recourse.dual,
            master.linking_value,
        );
        let repeated = cut_pool.contains_equivalent(&cut, options.tolerance);
        cut_pool.add_cut(cut);

        let record = IterationRecord {
            iteration,
            upper_bound: master.objective,
            lower_bound: master.stage_profit + recourse.objective,
            linking_value: master.linking_value,
            cut,
            time: iteration_begin.elapsed(),
        };
        console::training_table_row(
            record.iteration,
            record.upper_bound,
            record.lower_bound,
            record.linking_value,
            record.time,
        );
        iterations.push(record);

        if repeated {
            console::training_table_divider();
            console::training_duration(begin.elapsed());
            log::info!("cut {iteration} repeats an existing cut, stopping");
            return Ok(BendersOutcome {
                master,
                cut_pool,
                iterations,
                stop_reason: StopReason::Converged,
            });
        }
    }

    console::training_table_divider();
    log::warn!(
        "iteration budget of {} exhausted before the cuts repeated",
        options.num_iterations
    );
    let master = solve_master(params, &cut_pool)?;
    console::training_duration(begin.elapsed());
    Ok(BendersOutcome {
        master,
        cut_pool,
        iterations,
        stop_reason: StopReason::IterationLimit,
    })
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::deterministic::solve_deterministic;
    use crate::subproblem::solve_subproblem;

    fn small_params() -> ReservoirParameters {
        ReservoirParameters {
            first_stage_hours: 4,
            second_stage_hours: 4,
            max_discharge: 1.0,
            max_production: 10.0,
            max_volume: 10.0,
            conversion: 1.0,
            initial_volume: 5.0,
            first_stage_inflow: 0.5,
            base_price: 10.0,
            price_slope: 1.0,
            terminal_water_value: 15.5,
            alpha_bound: 1e6,
        }
    }

    fn small_options() -> BendersOptions {
        BendersOptions {
            num_iterations: 50,
            ..BendersOptions::default()
        }
    }

    #[test]
    fn test_converges_on_small_case() {
        let params = small_params();
        let scenarios = ScenarioSet::equiprobable(&[0.0, 1.0]).unwrap();
        let outcome = train(&params, &scenarios, &small_options()).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::Converged);
        assert!(outcome.iterations.len() < 50);

        // the last cut is a repeat of an earlier one
        let last = outcome.cut_pool.last().unwrap();
        let earlier = &outcome.cut_pool.cuts()[..outcome.cut_pool.len() - 1];
        assert!(earlier.iter().any(|c| c.is_equivalent(last, 1e-6)));
    }

    #[test]
    fn test_upper_bound_never_increases() {
        let params = small_params();
        let scenarios = ScenarioSet::equiprobable(&[0.0, 1.0]).unwrap();
        let outcome = train(&params, &scenarios, &small_options()).unwrap();
        for pair in outcome.iterations.windows(2) {
            assert!(pair[1].upper_bound <= pair[0].upper_bound + 1e-6);
        }
        for record in outcome.iterations.iter() {
            assert!(record.lower_bound <= record.upper_bound + 1e-6);
        }
        let last = outcome.iterations.last().unwrap();
        let scale = last.upper_bound.abs().max(1.0);
        assert!((last.upper_bound - last.lower_bound).abs() < 1e-6 * scale);
    }

    #[test]
    fn test_matches_deterministic_equivalent() {
        let params = small_params();
        let scenarios = ScenarioSet::equiprobable(&[0.0, 1.0]).unwrap();
        let outcome = train(&params, &scenarios, &small_options()).unwrap();
        let reference = solve_deterministic(&params, &scenarios).unwrap();
        let scale = reference.objective.abs().max(1.0);
        assert!((outcome.objective() - reference.objective).abs() < 1e-6 * scale);
    }

    #[test]
    fn test_cuts_stay_valid_at_every_visited_volume() {
        let params = small_params();
        let scenarios = ScenarioSet::equiprobable(&[0.0, 1.0]).unwrap();
        let outcome = train(&params, &scenarios, &small_options()).unwrap();
        for record in outcome.iterations.iter() {
            let actual =
                solve_subproblem(&params, record.linking_value, &scenarios)
                    .unwrap();
            for cut in outcome.cut_pool.cuts() {
                assert!(
                    cut.eval_at(record.linking_value)
                        >= actual.objective - 1e-6
                );
            }
        }
    }

    #[test]
    fn test_cut_indices_follow_iterations() {
        let params = small_params();
        let scenarios = ScenarioSet::equiprobable(&[0.0, 1.0]).unwrap();
        let outcome = train(&params, &scenarios, &small_options()).unwrap();
        for (record, cut) in
            outcome.iterations.iter().zip(outcome.cut_pool.cuts())
        {
            assert_eq!(record.iteration, cut.index);
            assert_eq!(record.cut, *cut);
        }
    }

    #[test]
    fn test_budget_exhaustion_still_returns_master_solution() {
        let params = small_params();
        let scenarios = ScenarioSet::equiprobable(&[0.0, 1.0]).unwrap();
        let options = BendersOptions {
            num_iterations: 1,
            ..BendersOptions::default()
        };
        let outcome = train(&params, &scenarios, &options).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::IterationLimit);
        assert_eq!(outcome.cut_pool.len(), 1);
        // the final master already sees the first cut
        assert!(outcome.master.alpha < params.alpha_bound);
    }

    #[test]
    fn test_decomposed_strategy_reaches_same_objective() {
        let params = small_params();
        let scenarios = ScenarioSet::equiprobable(&[0.0, 1.0]).unwrap();
        let aggregated = train(&params, &scenarios, &small_options()).unwrap();
        let options = BendersOptions {
            strategy: ScenarioStrategy::Decomposed,
            ..small_options()
        };
        let decomposed = train(&params, &scenarios, &options).unwrap();
        assert!((aggregated.objective() - decomposed.objective()).abs() < 1e-6);
    }

    #[test]
    fn test_reference_case_first_iteration() {
        let params = ReservoirParameters::default();
        let scenarios = ScenarioSet::index_scaled(
            25.0 * crate::system::M3S_TO_MM3,
            5,
        )
        .unwrap();
        let options = BendersOptions {
            num_iterations: 1,
            ..BendersOptions::default()
        };
        let outcome = train(&params, &scenarios, &options).unwrap();
        let first = &outcome.iterations[0];
        assert!(first.linking_value > 0.0);
        assert!(first.linking_value < params.max_volume);
        assert!(first.cut.slope.is_finite());
        assert!(first.cut.intercept.is_finite());
    }
}
