use crate::benders::{BendersOutcome, IterationRecord};
use crate::cut::CutPool;
use crate::deterministic::DeterministicSolution;
use crate::error::Result;
use crate::grid::GridOutcome;
use crate::master::StageSchedule;
use crate::subproblem::SubproblemSolution;

use csv::Writer;

#[derive(serde::Serialize)]
struct CutOutput {
    index: usize,
    slope: f64,
    intercept: f64,
}

fn write_cuts(cut_pool: &CutPool, path: &str) -> Result<()> {
    let mut wtr = Writer::from_path(&(path.to_owned() + "/cuts.csv"))?;
    for cut in cut_pool.cuts() {
        wtr.serialize(CutOutput {
            index: cut.index,
            slope: cut.slope,
            intercept: cut.intercept,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(serde::Serialize)]
struct IterationOutput {
    iteration: usize,
    upper_bound: f64,
    lower_bound: f64,
    linking_value: f64,
    slope: f64,
    intercept: f64,
    time_s: f64,
}

fn write_iterations(records: &[IterationRecord], path: &str) -> Result<()> {
    let mut wtr = Writer::from_path(&(path.to_owned() + "/iterations.csv"))?;
    for record in records.iter() {
        wtr.serialize(IterationOutput {
            iteration: record.iteration,
            upper_bound: record.upper_bound,
            lower_bound: record.lower_bound,
            linking_value: record.linking_value,
            slope: record.cut.slope,
            intercept: record.cut.intercept,
            time_s: record.time.as_secs_f64(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(serde::Serialize)]
struct ScheduleOutput {
    hour: usize,
    discharge: f64,
    production: f64,
    volume: f64,
    price: f64,
}

fn write_schedule(schedule: &StageSchedule, path: &str) -> Result<()> {
    let mut wtr = Writer::from_path(&(path.to_owned() + "/schedule.csv"))?;
    for (i, hour) in schedule.hours.iter().enumerate() {
        wtr.serialize(ScheduleOutput {
            hour: *hour,
            discharge: schedule.discharge[i],
            production: schedule.production[i],
            volume: schedule.volume[i],
            price: schedule.price[i],
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(serde::Serialize)]
struct GridOutput {
    linking_value: f64,
    objective: f64,
    dual: f64,
}

fn write_grid(evaluations: &[SubproblemSolution], path: &str) -> Result<()> {
    let mut wtr = Writer::from_path(&(path.to_owned() + "/grid.csv"))?;
    for evaluation in evaluations.iter() {
        wtr.serialize(GridOutput {
            linking_value: evaluation.linking_value,
            objective: evaluation.objective,
            dual: evaluation.dual,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn generate_benders_outputs(outcome: &BendersOutcome, path: &str) -> Result<()> {
    write_cuts(&outcome.cut_pool, path)?;
    write_iterations(&outcome.iterations, path)?;
    write_schedule(&outcome.master.schedule, path)?;
    Ok(())
}

pub fn generate_grid_outputs(outcome: &GridOutcome, path: &str) -> Result<()> {
    write_cuts(&outcome.cut_pool, path)?;
    write_grid(&outcome.evaluations, path)?;
    write_schedule(&outcome.master.schedule, path)?;
    Ok(())
}

pub fn generate_deterministic_outputs(
    solution: &DeterministicSolution,
    path: &str,
) -> Result<()> {
    write_schedule(&solution.schedule, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cut::BendersCut;
    use std::fs;
    use std::time::Duration;

    fn dir_path(dir: &tempfile::TempDir) -> String {
        dir.path().to_string_lossy().into_owned()
    }

    #[test]
    fn test_write_cuts() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = CutPool::new();
        pool.add_cut(BendersCut::new(1, 2.5, 100.0));
        pool.add_cut(BendersCut::new(2, -1.0, 7.5));
        write_cuts(&pool, &dir_path(&dir)).unwrap();

        let contents = fs::read_to_string(dir.path().join("cuts.csv")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["index,slope,intercept", "1,2.5,100.0", "2,-1.0,7.5"]);
    }

    #[test]
    fn test_write_iterations() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![IterationRecord {
            iteration: 1,
            upper_bound: 10.0,
            lower_bound: 8.0,
            linking_value: 0.5,
            cut: BendersCut::new(1, 3.0, 4.0),
            time: Duration::from_millis(1500),
        }];
        write_iterations(&records, &dir_path(&dir)).unwrap();

        let contents =
            fs::read_to_string(dir.path().join("iterations.csv")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines[0],
            "iteration,upper_bound,lower_bound,linking_value,slope,intercept,time_s"
        );
        assert_eq!(lines[1], "1,10.0,8.0,0.5,3.0,4.0,1.5");
    }

    #[test]
    fn test_write_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let schedule = StageSchedule {
            hours: vec![1, 2],
            discharge: vec![0.25, 0.5],
            production: vec![0.25, 0.5],
            volume: vec![4.75, 4.25],
            price: vec![11.0, 12.0],
        };
        write_schedule(&schedule, &dir_path(&dir)).unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("schedule.csv")).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["hour", "discharge", "production", "volume", "price"]
        );
        assert_eq!(rdr.records().count(), 2);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let result = write_cuts(&CutPool::new(), &missing.to_string_lossy());
        assert!(result.is_err());
    }
}
