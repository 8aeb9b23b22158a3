use serde::Serialize;

use crate::events::EventKind;
use crate::models::{ByConnector, ConnectorType, StopReason};
use crate::pool::PostSnapshot;

/// Snapshot of the system taken right after one event was processed.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct StateVectorRow {
    pub iteration: u64,
    pub clock: f64,
    pub event: EventKind,
    pub post: Option<usize>,
    pub connector_rnd: Option<f64>,
    pub connector: Option<ConnectorType>,
    pub interarrival_rnd: Option<f64>,
    pub interarrival: Option<f64>,
    pub next_arrival: Option<f64>,
    pub charge_rnd: Option<f64>,
    pub charge_minutes: Option<f64>,
    pub validation_end: Option<f64>,
    pub charge_end: Option<f64>,
    pub occupied_posts: usize,
    pub occupancy_pct: f64,
    pub posts: Vec<PostSnapshot>,
    pub accepted: u64,
    pub rejected: u64,
    pub charge_minutes_by_type: ByConnector<f64>,
    pub revenue_by_type: ByConnector<f64>,
    pub revenue: f64,
    pub utilization_pct: f64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Summary {
    #[serde(rename = "n_aceptadas")]
    pub accepted: u64,
    #[serde(rename = "n_rechazadas")]
    pub rejected: u64,
    #[serde(rename = "recaudacion_total")]
    pub total_revenue: f64,
    #[serde(rename = "utilizacion_promedio")]
    pub mean_utilization_pct: f64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct RunMetadata {
    pub seed: u64,
    pub n_servers: usize,
    pub events: u64,
    pub arrivals: u64,
    pub clients_in_system: usize,
    pub final_clock: f64,
    pub stop_reason: StopReason,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SimulationReport {
    pub metadata: RunMetadata,
    pub summary: Summary,
    pub rows: Vec<StateVectorRow>,
}

impl SimulationReport {
    pub fn last_row(&self) -> Option<&StateVectorRow> {
        self.rows.last()
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ReplicationReport {
    pub runs: Vec<(u64, Summary)>,
    pub mean: Summary,
}

impl ReplicationReport {
    pub fn from_runs(runs: Vec<(u64, Summary)>) -> Self {
        let count = runs.len().max(1) as f64;
        let mean_of = |pick: fn(&Summary) -> f64| {
            runs.iter().map(|(_, summary)| pick(summary)).sum::<f64>() / count
        };
        let mean = Summary {
            accepted: mean_of(|summary| summary.accepted as f64).round() as u64,
            rejected: mean_of(|summary| summary.rejected as f64).round() as u64,
            total_revenue: round_to(mean_of(|summary| summary.total_revenue), 2),
            mean_utilization_pct: round_to(mean_of(|summary| summary.mean_utilization_pct), 2),
        };
        Self { runs, mean }
    }
}

pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    if decimals == 0 {
        return value.round();
    }
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}
