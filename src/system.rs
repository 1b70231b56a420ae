/// Conversion factor from m³/s sustained over one hour to Mm³
pub const M3S_TO_MM3: f64 = 3.6 / 1000.0;

/// The static description of the reservoir and the market it sells into,
/// shared by every model builder.
///
/// Volumes are in Mm³, flows in Mm³ per hour, production in MWh per hour.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservoirParameters {
    pub first_stage_hours: usize,
    pub second_stage_hours: usize,
    pub max_discharge: f64,
    pub max_production: f64,
    pub max_volume: f64,
    /// MWh produced per Mm³ discharged
    pub conversion: f64,
    pub initial_volume: f64,
    pub first_stage_inflow: f64,
    pub base_price: f64,
    pub price_slope: f64,
    /// Value of the water left in the reservoir at the end of the horizon
    pub terminal_water_value: f64,
    /// Symmetric bound on the expected-value surrogate of the master problem
    pub alpha_bound: f64,
}

impl ReservoirParameters {
    /// Hours of the first stage, starting at 1
    pub fn first_stage(&self) -> impl Iterator<Item = usize> {
        1..=self.first_stage_hours
    }

    /// Hours of the second stage, following the first one
    pub fn second_stage(&self) -> impl Iterator<Item = usize> {
        let start = self.first_stage_hours + 1;
        start..(start + self.second_stage_hours)
    }

    /// Last hour of the horizon, where the terminal water value applies
    pub fn last_hour(&self) -> usize {
        self.first_stage_hours + self.second_stage_hours
    }

    /// Market price at a given hour
    pub fn price(&self, hour: usize) -> f64 {
        self.base_price + self.price_slope * hour as f64
    }

    /// Revenue per Mm³ discharged at a given hour
    pub fn discharge_value(&self, hour: usize) -> f64 {
        self.conversion * self.price(hour)
    }
}

impl Default for ReservoirParameters {
    fn default() -> Self {
        Self {
            first_stage_hours: 24,
            second_stage_hours: 24,
            max_discharge: 100.0 * M3S_TO_MM3,
            max_production: 100.0,
            max_volume: 10.0,
            conversion: 0.981 / M3S_TO_MM3,
            initial_volume: 5.0,
            first_stage_inflow: 50.0 * M3S_TO_MM3,
            base_price: 50.0,
            price_slope: 1.0,
            terminal_water_value: 13000.0,
            alpha_bound: 1e6,
        }
    }
}
