use crate::benders::BendersOptions;
use crate::error::{HydroError, Result};
use crate::scenario::{Scenario, ScenarioSet};
use crate::subproblem::ScenarioStrategy;
use crate::system::ReservoirParameters;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;

fn read_json<T: DeserializeOwned>(filepath: &str) -> Result<T> {
    let contents = fs::read_to_string(filepath)?;
    let parsed: T = serde_json::from_str(&contents)?;
    Ok(parsed)
}

fn invalid(message: String) -> HydroError {
    HydroError::InvalidInput(message)
}

/// The way the two-stage problem is solved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    #[default]
    Benders,
    Grid,
    Deterministic,
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_alpha_bound() -> f64 {
    1e6
}

fn default_grid_points() -> usize {
    11
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub method: Method,
    pub num_iterations: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_alpha_bound")]
    pub alpha_bound: f64,
    #[serde(default)]
    pub scenario_strategy: ScenarioStrategy,
    #[serde(default = "default_grid_points")]
    pub grid_points: usize,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.num_iterations < 1 {
            return Err(invalid("num_iterations must be at least 1".into()));
        }
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(invalid(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        if self.alpha_bound.is_nan() || self.alpha_bound <= 0.0 {
            return Err(invalid(format!(
                "alpha_bound must be positive, got {}",
                self.alpha_bound
            )));
        }
        if self.method == Method::Grid && self.grid_points < 2 {
            return Err(invalid(format!(
                "grid_points must be at least 2, got {}",
                self.grid_points
            )));
        }
        Ok(())
    }

    pub fn benders_options(&self) -> BendersOptions {
        BendersOptions {
            num_iterations: self.num_iterations,
            tolerance: self.tolerance,
            strategy: self.scenario_strategy,
        }
    }
}

pub fn read_config_input(filepath: &str) -> Result<Config> {
    read_json(filepath)
}

fn default_price_slope() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
pub struct SystemInput {
    pub first_stage_hours: usize,
    pub second_stage_hours: usize,
    pub max_discharge: f64,
    pub max_production: f64,
    pub max_volume: f64,
    pub conversion: f64,
    pub initial_volume: f64,
    pub first_stage_inflow: f64,
    pub base_price: f64,
    #[serde(default = "default_price_slope")]
    pub price_slope: f64,
    pub terminal_water_value: f64,
}

pub fn read_system_input(filepath: &str) -> Result<SystemInput> {
    read_json(filepath)
}

impl SystemInput {
    pub fn build_parameters(&self, alpha_bound: f64) -> Result<ReservoirParameters> {
        if self.first_stage_hours == 0 || self.second_stage_hours == 0 {
            return Err(invalid("both stages need at least one hour".into()));
        }
        let bounds = [
            ("max_discharge", self.max_discharge),
            ("max_production", self.max_production),
            ("max_volume", self.max_volume),
            ("conversion", self.conversion),
            ("first_stage_inflow", self.first_stage_inflow),
        ];
        for (name, value) in bounds {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if !(0.0..=self.max_volume).contains(&self.initial_volume) {
            return Err(invalid(format!(
                "initial_volume {} outside [0, {}]",
                self.initial_volume, self.max_volume
            )));
        }
        Ok(ReservoirParameters {
            first_stage_hours: self.first_stage_hours,
            second_stage_hours: self.second_stage_hours,
            max_discharge: self.max_discharge,
            max_production: self.max_production,
            max_volume: self.max_volume,
            conversion: self.conversion,
            initial_volume: self.initial_volume,
            first_stage_inflow: self.first_stage_inflow,
            base_price: self.base_price,
            price_slope: self.price_slope,
            terminal_water_value: self.terminal_water_value,
            alpha_bound,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeInput {
    #[default]
    Weighted,
    Single,
}

#[derive(Debug, Deserialize)]
pub struct ScenarioInput {
    pub id: usize,
    pub inflow: f64,
    pub probability: f64,
}

#[derive(Debug, Deserialize)]
pub struct LognormalInput {
    pub mu: f64,
    pub sigma: f64,
    pub count: usize,
    pub seed: u64,
}

#[derive(Debug, Deserialize)]
pub struct ScenariosInput {
    #[serde(default)]
    pub mode: ModeInput,
    #[serde(default)]
    pub scenarios: Vec<ScenarioInput>,
    pub lognormal: Option<LognormalInput>,
}

pub fn read_scenarios_input(filepath: &str) -> Result<ScenariosInput> {
    read_json(filepath)
}

impl ScenariosInput {
    pub fn build_scenario_set(&self) -> Result<ScenarioSet> {
        let scenarios: Vec<Scenario> = match &self.lognormal {
            Some(_) if !self.scenarios.is_empty() => {
                return Err(invalid(
                    "give either a scenarios list or a lognormal sampler".into(),
                ))
            }
            Some(l) => {
                ScenarioSet::sample_lognormal(l.mu, l.sigma, l.count, l.seed)?
                    .scenarios()
                    .to_vec()
            }
            None => self
                .scenarios
                .iter()
                .map(|s| Scenario::new(s.id, s.inflow, s.probability))
                .collect(),
        };
        match self.mode {
            ModeInput::Weighted => ScenarioSet::weighted(scenarios),
            ModeInput::Single => match <[Scenario; 1]>::try_from(scenarios) {
                Ok([scenario]) => Ok(ScenarioSet::single(scenario)),
                Err(all) => Err(invalid(format!(
                    "single mode takes exactly one scenario, got {}",
                    all.len()
                ))),
            },
        }
    }
}

/// Everything read from a case directory
pub struct Input {
    pub config: Config,
    pub system: SystemInput,
    pub scenarios: ScenariosInput,
}

impl Input {
    pub fn build(path: &str) -> Result<Self> {
        let config = read_config_input(&(path.to_owned() + "/config.json"))?;
        let system = read_system_input(&(path.to_owned() + "/system.json"))?;
        let scenarios =
            read_scenarios_input(&(path.to_owned() + "/scenarios.json"))?;
        config.validate()?;
        Ok(Self {
            config,
            system,
            scenarios,
        })
    }

    pub fn build_parameters(&self) -> Result<ReservoirParameters> {
        self.system.build_parameters(self.config.alpha_bound)
    }

    pub fn build_scenario_set(&self) -> Result<ScenarioSet> {
        self.scenarios.build_scenario_set()
    }
}
