use chrono::Local;
use std::time::Duration;

fn seconds(time: Duration) -> f64 {
    time.as_millis() as f64 / 1000.0
}

pub fn show_greeting() {
    println!("\n# hydro-benders v{}", env!("CARGO_PKG_VERSION"));
    println!("Started at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
}

pub fn input_reading_line(path: &str) {
    println!("\nReading case from {path}");
}

/// Helper function for displaying the greeting data for the training
pub fn training_greeting(num_iterations: usize, num_scenarios: usize) {
    println!("\n# Training");
    println!("- Iterations: {num_iterations}");
    println!("- Scenarios: {num_scenarios}\n");
}

/// Helper function for displaying the training table header
pub fn training_table_header() {
    println!(
        "{0: ^10} | {1: ^15} | {2: ^15} | {3: ^12} | {4: ^10}",
        "iteration", "upper bound", "lower bound", "volume", "time (s)"
    )
}

/// Helper function for displaying a divider for the training table
pub fn training_table_divider() {
    println!("-------------------------------------------------------------------------")
}

/// Helper function for displaying a row of iteration results for
/// the training table
pub fn training_table_row(
    iteration: usize,
    upper_bound: f64,
    lower_bound: f64,
    linking_value: f64,
    time: Duration,
) {
    println!(
        "{0: >10} | {1: >15.4} | {2: >15.4} | {3: >12.6} | {4: >10.2}",
        iteration,
        upper_bound,
        lower_bound,
        linking_value,
        seconds(time)
    )
}

pub fn training_duration(time: Duration) {
    println!("\nTraining time: {:.2} s", seconds(time))
}

pub fn grid_greeting(grid_points: usize, num_scenarios: usize) {
    println!("\n# Evaluating the expected value on a grid");
    println!("- Points: {grid_points}");
    println!("- Scenarios: {num_scenarios}\n");
}

pub fn grid_row(linking_value: f64, objective: f64, dual: f64) {
    println!("{linking_value: >12.6} | {objective: >15.4} | {dual: >12.4}")
}

pub fn solution_summary(objective: f64, linking_value: f64) {
    println!("\nExpected profit: {objective:.2}");
    println!("End of first stage volume: {linking_value:.6}");
}

pub fn output_generation_line(path: &str) {
    println!("\nWriting outputs to {path}");
}

pub fn show_farewell(time: Duration) {
    println!("\nTotal running time: {:.2} s", seconds(time))
}
