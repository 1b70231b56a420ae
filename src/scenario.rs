use crate::error::{HydroError, Result};
use rand::prelude::*;
use rand_distr::LogNormal;
use rand_xoshiro::Xoshiro256Plus;

const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// One realization of the second stage inflow (Mm³ per hour)
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub id: usize,
    pub inflow: f64,
    pub probability: f64,
}

impl Scenario {
    pub fn new(id: usize, inflow: f64, probability: f64) -> Self {
        Self {
            id,
            inflow,
            probability,
        }
    }
}

/// How scenario profits enter the second stage objective
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioMode {
    /// Every scenario is weighted by its probability
    Weighted,
    /// A single scenario, taken without any probability weight
    Single,
}

/// The scenarios of the second stage, validated at construction
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSet {
    scenarios: Vec<Scenario>,
    mode: ScenarioMode,
}

fn validate_scenarios(scenarios: &[Scenario]) -> Result<()> {
    if scenarios.is_empty() {
        return Err(HydroError::InvalidInput(
            "at least one scenario is required".to_string(),
        ));
    }
    for (index, scenario) in scenarios.iter().enumerate() {
        if scenarios[..index].iter().any(|s| s.id == scenario.id) {
            return Err(HydroError::InvalidInput(format!(
                "scenario id {} is repeated",
                scenario.id
            )));
        }
        if !scenario.inflow.is_finite() {
            return Err(HydroError::InvalidInput(format!(
                "scenario {} has a non-finite inflow",
                scenario.id
            )));
        }
    }
    Ok(())
}

impl ScenarioSet {
    /// Probability weighted scenarios. Probabilities must be non-negative
    /// and add up to one.
    pub fn weighted(scenarios: Vec<Scenario>) -> Result<Self> {
        validate_scenarios(&scenarios)?;
        if let Some(s) = scenarios
            .iter()
            .find(|s| !(s.probability >= 0.0 && s.probability <= 1.0))
        {
            return Err(HydroError::InvalidInput(format!(
                "scenario {} has probability {} outside [0, 1]",
                s.id, s.probability
            )));
        }
        let total: f64 = scenarios.iter().map(|s| s.probability).sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(HydroError::InvalidInput(format!(
                "scenario probabilities add up to {total}, not 1"
            )));
        }
        Ok(Self {
            scenarios,
            mode: ScenarioMode::Weighted,
        })
    }

    /// A lone scenario evaluated without probability weighting, for
    /// running the second stage in isolation.
    pub fn single(scenario: Scenario) -> Self {
        Self {
            scenarios: vec![scenario],
            mode: ScenarioMode::Single,
        }
    }

    /// Equiprobable scenarios from an inflow table, ids following the
    /// table order.
    pub fn equiprobable(inflows: &[f64]) -> Result<Self> {
        let p = 1.0 / inflows.len().max(1) as f64;
        Self::weighted(
            inflows
                .iter()
                .enumerate()
                .map(|(id, inflow)| Scenario::new(id, *inflow, p))
                .collect(),
        )
    }

    /// Equiprobable scenarios whose inflow is the base inflow scaled by
    /// the scenario index, starting at zero. Reproduces the historical
    /// reference case.
    pub fn index_scaled(base_inflow: f64, count: usize) -> Result<Self> {
        let inflows: Vec<f64> =
            (0..count).map(|id| base_inflow * id as f64).collect();
        Self::equiprobable(&inflows)
    }

    /// Equiprobable scenarios sampled from a log-normal inflow
    /// distribution with a seeded generator.
    pub fn sample_lognormal(
        mu: f64,
        sigma: f64,
        count: usize,
        seed: u64,
    ) -> Result<Self> {
        let distribution = LogNormal::new(mu, sigma).map_err(|e| {
            HydroError::InvalidInput(format!("invalid log-normal inflows: {e}"))
        })?;
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        let inflows: Vec<f64> =
            distribution.sample_iter(&mut rng).take(count).collect();
        Self::equiprobable(&inflows)
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn mode(&self) -> ScenarioMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Objective weight of a scenario under this set's mode
    pub fn weight(&self, scenario: &Scenario) -> f64 {
        match self.mode {
            ScenarioMode::Weighted => scenario.probability,
            ScenarioMode::Single => 1.0,
        }
    }

    /// Splits the set into unweighted single-scenario sets, each paired
    /// with the weight its result carries in the recombined expectation.
    pub fn split(&self) -> Vec<(f64, ScenarioSet)> {
        self.scenarios
            .iter()
            .map(|s| (self.weight(s), ScenarioSet::single(s.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_set_accepts_valid_probabilities() {
        let set = ScenarioSet::weighted(vec![
            Scenario::new(0, 0.1, 0.25),
            Scenario::new(1, 0.2, 0.75),
        ])
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.mode(), ScenarioMode::Weighted);
        assert_eq!(set.weight(&set.scenarios()[1]), 0.75);
    }

    #[test]
    fn test_weighted_set_rejects_bad_probabilities() {
        let result = ScenarioSet::weighted(vec![
            Scenario::new(0, 0.1, 0.5),
            Scenario::new(1, 0.2, 0.6),
        ]);
        assert!(matches!(result, Err(HydroError::InvalidInput(_))));

        let result = ScenarioSet::weighted(vec![
            Scenario::new(0, 0.1, -0.5),
            Scenario::new(1, 0.2, 1.5),
        ]);
        assert!(matches!(result, Err(HydroError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_empty_and_repeated_ids() {
        assert!(ScenarioSet::weighted(vec![]).is_err());
        let result = ScenarioSet::weighted(vec![
            Scenario::new(3, 0.1, 0.5),
            Scenario::new(3, 0.2, 0.5),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_single_mode_ignores_probability() {
        let set = ScenarioSet::single(Scenario::new(2, 0.18, 0.2));
        assert_eq!(set.mode(), ScenarioMode::Single);
        assert_eq!(set.weight(&set.scenarios()[0]), 1.0);
    }

    #[test]
    fn test_index_scaled_reproduces_reference_inflows() {
        let set = ScenarioSet::index_scaled(0.09, 5).unwrap();
        let inflows: Vec<f64> =
            set.scenarios().iter().map(|s| s.inflow).collect();
        assert_eq!(inflows[0], 0.0);
        assert!((inflows[4] - 0.36).abs() < 1e-12);
        assert!(set.scenarios().iter().all(|s| s.probability == 0.2));
    }

    #[test]
    fn test_lognormal_sampling_is_seeded() {
        let a = ScenarioSet::sample_lognormal(-2.0, 0.5, 8, 42).unwrap();
        let b = ScenarioSet::sample_lognormal(-2.0, 0.5, 8, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert!(a.scenarios().iter().all(|s| s.inflow > 0.0));
        assert!(ScenarioSet::sample_lognormal(0.0, -1.0, 4, 0).is_err());
    }

    #[test]
    fn test_split_keeps_weights() {
        let set = ScenarioSet::equiprobable(&[0.0, 0.5]).unwrap();
        let parts = set.split();
        assert_eq!(parts.len(), 2);
        for (weight, part) in parts.iter() {
            assert_eq!(*weight, 0.5);
            assert_eq!(part.mode(), ScenarioMode::Single);
        }
    }
}
