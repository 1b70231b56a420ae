use crate::error::Result;
use crate::master::{add_first_stage, StageSchedule};
use crate::scenario::ScenarioSet;
use crate::solver;
use crate::subproblem::add_scenario;
use crate::system::ReservoirParameters;

/// Optimum of the extensive form, where both stages and every scenario
/// live in the same program
#[derive(Debug, Clone)]
pub struct DeterministicSolution {
    pub objective: f64,
    pub linking_value: f64,
    pub stage_profit: f64,
    pub schedule: StageSchedule,
    /// Volume left at the end of the horizon, by scenario
    pub terminal_volumes: Vec<f64>,
}

impl DeterministicSolution {
    /// Expected profit of the second stage
    pub fn expected_value(&self) -> f64 {
        self.objective - self.stage_profit
    }
}

/// Solves the deterministic equivalent of the two-stage problem. Its
/// optimum is the reference the decomposition must reach.
pub fn solve_deterministic(
    params: &ReservoirParameters,
    scenarios: &ScenarioSet,
) -> Result<DeterministicSolution> {
    let mut pb = solver::Problem::new();
    let first_stage = add_first_stage(&mut pb, params);
    let start_volume = first_stage.terminal_volume();

    let hours: Vec<usize> = params.second_stage().collect();
    let terminal: Vec<usize> = scenarios
        .scenarios()
        .iter()
        .map(|scenario| {
            let columns = add_scenario(
                &mut pb,
                params,
                &hours,
                start_volume,
                scenario.inflow,
                scenarios.weight(scenario),
            );
            columns.volume.last().copied().unwrap_or(start_volume)
        })
        .collect();

    let mut model =
        pb.try_optimise(solver::Sense::Maximise, "deterministic equivalent")?;
    let solution = model.solve()?;
    let schedule = StageSchedule::from_solution(&first_stage, params, &solution);
    let stage_profit = schedule.profit();
    log::debug!(
        "deterministic equivalent solved: objective {:.4}, volume {:.6}",
        solution.objective,
        schedule.terminal_volume()
    );

    Ok(DeterministicSolution {
        objective: solution.objective,
        linking_value: schedule.terminal_volume(),
        stage_profit,
        terminal_volumes: solution.columns(&terminal),
        schedule,
    })
}

#[cfg(test)]
mod tests {

    use super::*;
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

    #[test]
    fn test_second_stage_is_optimal_for_first_stage_volume() {
        let params = small_params();
        let scenarios = ScenarioSet::equiprobable(&[0.0, 1.0]).unwrap();
        let solution = solve_deterministic(&params, &scenarios).unwrap();
        let recourse =
            solve_subproblem(&params, solution.linking_value, &scenarios)
                .unwrap();
        assert!((solution.expected_value() - recourse.objective).abs() < 1e-5);
    }

    #[test]
    fn test_linking_value_within_reservoir_bounds() {
        let params = small_params();
        let scenarios = ScenarioSet::equiprobable(&[0.0, 1.0]).unwrap();
        let solution = solve_deterministic(&params, &scenarios).unwrap();
        assert!(solution.linking_value >= -1e-9);
        assert!(solution.linking_value <= params.max_volume + 1e-9);
        assert_eq!(solution.terminal_volumes.len(), 2);
        assert_eq!(solution.schedule.hours, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_no_first_stage_volume_beats_the_extensive_form() {
        let params = small_params();
        let scenarios = ScenarioSet::equiprobable(&[0.0, 1.0]).unwrap();
        let solution = solve_deterministic(&params, &scenarios).unwrap();
        // with four hours of at most one unit of discharge, the first stage
        // can end anywhere in [3.0, 7.0]; the value of each end point is the
        // best first stage profit for it, which is discharging in the
        // latest hours, plus the expected second stage profit
        for end in [3.0, 4.5, 5.5, 7.0] {
            let released = params.initial_volume + 4.0 * params.first_stage_inflow - end;
            let mut remaining = released;
            let mut profit = 0.0;
            for hour in (1..=4).rev() {
                let q = remaining.min(params.max_discharge);
                profit += q * params.discharge_value(hour);
                remaining -= q;
            }
            let recourse = solve_subproblem(&params, end, &scenarios).unwrap();
            assert!(profit + recourse.objective <= solution.objective + 1e-5);
        }
    }

    #[test]
    fn test_reference_case_is_solvable() {
        let params = ReservoirParameters::default();
        let scenarios = ScenarioSet::index_scaled(
            25.0 * crate::system::M3S_TO_MM3,
            5,
        )
        .unwrap();
        let solution = solve_deterministic(&params, &scenarios).unwrap();
        assert!(solution.objective.is_finite());
        assert_eq!(solution.schedule.hours.len(), 24);
        assert_eq!(solution.terminal_volumes.len(), 5);
    }
}
