use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{ByConnector, ChargeDuration, ConnectorType, SimConfig};

/// A sampled value together with the uniform number it was derived from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Draw<T> {
    pub rnd: Option<f64>,
    pub value: T,
}

impl<T> Draw<T> {
    pub fn from_rnd(rnd: f64, value: T) -> Self {
        Self {
            rnd: Some(rnd),
            value,
        }
    }

    pub fn fixed(value: T) -> Self {
        Self { rnd: None, value }
    }
}

pub trait VariateSource {
    fn next_interarrival(&mut self) -> Draw<f64>;
    fn next_connector_type(&mut self) -> Draw<ConnectorType>;
    fn next_charge_minutes(&mut self, connector: ConnectorType) -> Draw<f64>;
}

/// Charge duration sampler resolved once per run from a connector profile.
#[derive(Clone, Debug)]
enum ChargeSampler {
    Fixed(f64),
    Table(Vec<(f64, f64)>),
}

impl From<&ChargeDuration> for ChargeSampler {
    fn from(charge: &ChargeDuration) -> Self {
        match charge {
            ChargeDuration::Fixed { fixed_minutes } => ChargeSampler::Fixed(*fixed_minutes),
            ChargeDuration::Table(steps) => ChargeSampler::Table(
                steps
                    .iter()
                    .map(|step| (step.minutes, step.probability))
                    .collect(),
            ),
        }
    }
}

pub struct StdVariates {
    rng: StdRng,
    mean_interarrival: f64,
    mix: [(ConnectorType, f64); 3],
    charge: ByConnector<ChargeSampler>,
}

impl StdVariates {
    pub fn new(config: &SimConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &SimConfig, rng: StdRng) -> Self {
        let mix = ConnectorType::ALL.map(|connector| (connector, config.probability(connector)));
        Self {
            rng,
            mean_interarrival: config.mean_interarrival,
            mix,
            charge: ByConnector {
                usb_c: ChargeSampler::from(&config.connectors.usb_c.charge),
                lightning: ChargeSampler::from(&config.connectors.lightning.charge),
                microusb: ChargeSampler::from(&config.connectors.microusb.charge),
            },
        }
    }

    fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

impl VariateSource for StdVariates {
    fn next_interarrival(&mut self) -> Draw<f64> {
        let u = self.uniform();
        Draw::from_rnd(u, exponential(u, self.mean_interarrival))
    }

    fn next_connector_type(&mut self) -> Draw<ConnectorType> {
        let u = self.uniform();
        Draw::from_rnd(u, categorical(u, &self.mix))
    }

    fn next_charge_minutes(&mut self, connector: ConnectorType) -> Draw<f64> {
        match self.charge.get(connector) {
            ChargeSampler::Fixed(minutes) => Draw::fixed(*minutes),
            ChargeSampler::Table(table) => {
                let u = self.rng.gen::<f64>();
                Draw::from_rnd(u, categorical(u, table))
            }
        }
    }
}

/// Inverse transform for an exponential with the given mean. `u` is in [0, 1).
pub fn exponential(u: f64, mean: f64) -> f64 {
    -mean * (1.0 - u).ln()
}

/// Inverse transform over cumulative probabilities in listed order.
///
/// Rounding can leave the cumulative sum a hair below 1, so a `u` past the
/// last bucket falls into the last entry with non-zero probability.
pub fn categorical<T: Copy>(u: f64, entries: &[(T, f64)]) -> T {
    let mut cumulative = 0.0;
    let mut fallback = entries[0].0;
    for &(value, probability) in entries {
        if probability <= 0.0 {
            continue;
        }
        cumulative += probability;
        fallback = value;
        if u < cumulative {
            return value;
        }
    }
    fallback
}
