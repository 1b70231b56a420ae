pub mod benders;
mod console;
pub mod cut;
pub mod deterministic;
pub mod error;
pub mod grid;
pub mod input;
pub mod master;
pub mod output;
pub mod scenario;
pub mod solver;
pub mod subproblem;
pub mod system;
use error::Result;
use input::{Input, Method};
use std::time::Instant;

pub fn run(input_args: &InputArgs) -> Result<()> {
    console::show_greeting();

    let begin = Instant::now();
    let input = Input::build(&input_args.path)?;
    let config = &input.config;
    let params = input.build_parameters()?;
    let scenarios = input.build_scenario_set()?;

    console::input_reading_line(&input_args.path);
    log::info!(
        "solving with {:?} over {} scenarios",
        config.method,
        scenarios.len()
    );

    match config.method {
        Method::Benders => {
            let outcome =
                benders::train(&params, &scenarios, &config.benders_options())?;
            console::solution_summary(outcome.objective(), outcome.linking_value());
            console::output_generation_line(&input_args.path);
            output::generate_benders_outputs(&outcome, &input_args.path)?;
        }
        Method::Grid => {
            let outcome = grid::solve_by_grid(
                &params,
                &scenarios,
                config.grid_points,
                config.scenario_strategy,
            )?;
            console::solution_summary(outcome.objective(), outcome.linking_value());
            console::output_generation_line(&input_args.path);
            output::generate_grid_outputs(&outcome, &input_args.path)?;
        }
        Method::Deterministic => {
            let solution = deterministic::solve_deterministic(&params, &scenarios)?;
            console::solution_summary(solution.objective, solution.linking_value);
            console::output_generation_line(&input_args.path);
            output::generate_deterministic_outputs(&solution, &input_args.path)?;
        }
    }

    console::show_farewell(begin.elapsed());

    Ok(())
}

pub struct InputArgs {
    pub path: String,
}

impl InputArgs {
    pub fn build(args: &[String]) -> std::result::Result<Self, &'static str> {
        if args.len() < 2 {
            return Err("Not enough arguments [CASE_DIR]");
        }

        let path = args[1].clone();

        Ok(Self { path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_input_args_need_a_path() {
        let args = vec!["hydro-benders".to_string()];
        assert!(InputArgs::build(&args).is_err());
        let args = vec!["hydro-benders".to_string(), "example".to_string()];
        assert_eq!(InputArgs::build(&args).unwrap().path, "example");
    }

    fn copy_example_case(config: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in ["system.json", "scenarios.json"] {
            fs::copy(format!("example/{file}"), dir.path().join(file)).unwrap();
        }
        fs::write(dir.path().join("config.json"), config).unwrap();
        dir
    }

    #[test]
    fn test_run_benders_writes_outputs() {
        let dir = copy_example_case(r#"{"method": "benders", "num_iterations": 3}"#);
        let path = dir.path().to_string_lossy().into_owned();
        run(&InputArgs { path }).unwrap();
        for file in ["cuts.csv", "iterations.csv", "schedule.csv"] {
            assert!(dir.path().join(file).exists());
        }
    }

    #[test]
    fn test_run_deterministic_writes_schedule() {
        let dir =
            copy_example_case(r#"{"method": "deterministic", "num_iterations": 1}"#);
        let path = dir.path().to_string_lossy().into_owned();
        run(&InputArgs { path }).unwrap();
        assert!(dir.path().join("schedule.csv").exists());
        assert!(!dir.path().join("cuts.csv").exists());
    }

    #[test]
    fn test_run_fails_on_missing_case() {
        let args = InputArgs {
            path: "does/not/exist".to_string(),
        };
        assert!(run(&args).is_err());
    }
}
