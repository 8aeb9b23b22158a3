use crate::models::{ByConnector, ConnectorType};
use crate::pool::ServerPool;
use crate::state::{round_to, Summary};

#[derive(Clone, Debug, Default)]
pub struct StatisticsAccumulator {
    pub accepted: u64,
    pub rejected: u64,
    pub revenue: f64,
    pub revenue_by_type: ByConnector<f64>,
    pub charge_minutes_by_type: ByConnector<f64>,
}

impl StatisticsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_acceptance(&mut self) {
        self.accepted += 1;
    }

    pub fn record_rejection(&mut self) {
        self.rejected += 1;
    }

    pub fn record_revenue(&mut self, connector: ConnectorType, amount: f64) {
        self.revenue += amount;
        *self.revenue_by_type.get_mut(connector) += amount;
    }

    pub fn record_charge_time(&mut self, connector: ConnectorType, minutes: f64) {
        *self.charge_minutes_by_type.get_mut(connector) += minutes;
    }

    pub fn arrivals(&self) -> u64 {
        self.accepted + self.rejected
    }

    pub fn finalize(&self, elapsed_clock: f64, pool: &ServerPool) -> Summary {
        Summary {
            accepted: self.accepted,
            rejected: self.rejected,
            total_revenue: round_to(self.revenue.max(0.0), 2),
            mean_utilization_pct: round_to(pool.utilization_pct(elapsed_clock), 2),
        }
    }
}
