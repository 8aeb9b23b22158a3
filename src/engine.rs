use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use crate::clients::{Client, ClientId, ClientTracker};
use crate::error::{Error, Result};
use crate::events::{Event, EventKind, EventQueue, ScheduledEvent};
use crate::models::{
    ChargeDuration, ConnectorType, SimConfig, StopReason, SUPPORTED_SERVER_COUNTS,
};
use crate::pool::{PostSnapshot, ServerPool};
use crate::random::{StdVariates, VariateSource};
use crate::state::{ReplicationReport, RunMetadata, SimulationReport, StateVectorRow, Summary};
use crate::stats::StatisticsAccumulator;

const PROBABILITY_TOLERANCE: f64 = 1e-6;
pub const MAX_REPLICATIONS: u64 = 10_000;

/// Stops a run between iterations when its wall-clock budget runs out or
/// when the shared cancellation flag is raised.
#[derive(Clone, Debug, Default)]
pub struct RunGuard {
    budget: Option<Duration>,
    cancel: Option<Arc<AtomicBool>>,
    started: Option<Instant>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wall_clock_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    fn check(&self, events: u64, clock: f64) -> Result<()> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(Error::Cancelled { events, clock });
            }
        }
        if let (Some(budget), Some(started)) = (self.budget, self.started) {
            if started.elapsed() >= budget {
                return Err(Error::WallClockExceeded {
                    events,
                    clock,
                    budget_ms: budget.as_millis() as u64,
                });
            }
        }
        Ok(())
    }
}

/// Per-event columns filled in by the handlers before the row snapshot.
#[derive(Default)]
struct RowDraft {
    post: Option<usize>,
    connector_rnd: Option<f64>,
    connector: Option<ConnectorType>,
    interarrival_rnd: Option<f64>,
    interarrival: Option<f64>,
    charge_rnd: Option<f64>,
    charge_minutes: Option<f64>,
    validation_end: Option<f64>,
    charge_end: Option<f64>,
}

pub struct SimulationEngine {
    config: SimConfig,
    seed: u64,
    variates: Box<dyn VariateSource>,
    guard: RunGuard,
    clock: f64,
    queue: EventQueue,
    pool: ServerPool,
    clients: ClientTracker,
    stats: StatisticsAccumulator,
    next_arrival: Option<f64>,
    rows: Vec<StateVectorRow>,
}

impl SimulationEngine {
    /// Builds a run with the standard random source. Without a configured
    /// seed, one is drawn from entropy and reported in the run metadata.
    pub fn new(config: SimConfig) -> Result<Self> {
        validate_config(&config)?;
        let seed = config
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen::<u64>());
        let variates = Box::new(StdVariates::new(&config, seed));
        Ok(Self::build(config, seed, variates))
    }

    pub fn with_variates(config: SimConfig, variates: Box<dyn VariateSource>) -> Result<Self> {
        validate_config(&config)?;
        let seed = config.seed.unwrap_or(0);
        Ok(Self::build(config, seed, variates))
    }

    fn build(config: SimConfig, seed: u64, variates: Box<dyn VariateSource>) -> Self {
        let mut guard = RunGuard::new();
        if let Some(budget_ms) = config.max_wall_ms {
            guard = guard.with_wall_clock_budget(Duration::from_millis(budget_ms));
        }
        let pool = ServerPool::new(config.n_servers);
        let rows = Vec::with_capacity(config.n_max.min(4_096) as usize);
        Self {
            config,
            seed,
            variates,
            guard,
            clock: 0.0,
            queue: EventQueue::with_capacity(64),
            pool,
            clients: ClientTracker::new(),
            stats: StatisticsAccumulator::new(),
            next_arrival: None,
            rows,
        }
    }

    pub fn with_guard(mut self, guard: RunGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn run(mut self) -> Result<SimulationReport> {
        self.guard.start();
        debug!(
            seed = self.seed,
            n_servers = self.config.n_servers,
            t_max = self.config.t_max,
            n_max = self.config.n_max,
            "starting charging post simulation"
        );

        let first = self.variates.next_interarrival();
        self.schedule_arrival(first.value);

        let stop_reason = loop {
            let processed = self.rows.len() as u64;
            if processed >= self.config.n_max {
                break StopReason::EventLimit;
            }
            if let Err(err) = self.guard.check(processed, self.clock) {
                warn!(error = %err, "simulation aborted");
                return Err(err);
            }
            let next_time = match self.queue.peek() {
                Some(scheduled) => scheduled.time,
                None => break StopReason::TimeLimit,
            };
            if next_time > self.config.t_max {
                break StopReason::TimeLimit;
            }
            let scheduled = self
                .queue
                .pop()
                .ok_or_else(|| Error::InvariantViolation("event queue drained".to_string()))?;
            self.step(scheduled)?;
        };

        let summary = self.stats.finalize(self.clock, &self.pool);
        debug!(
            events = self.rows.len(),
            clock = self.clock,
            accepted = summary.accepted,
            rejected = summary.rejected,
            %stop_reason,
            "simulation finished"
        );

        Ok(SimulationReport {
            metadata: RunMetadata {
                seed: self.seed,
                n_servers: self.config.n_servers,
                events: self.rows.len() as u64,
                arrivals: self.stats.arrivals(),
                clients_in_system: self.clients.len(),
                final_clock: self.clock,
                stop_reason,
            },
            summary,
            rows: self.rows,
        })
    }

    fn step(&mut self, scheduled: ScheduledEvent) -> Result<()> {
        if scheduled.time < self.clock {
            return Err(Error::InvariantViolation(format!(
                "event at {} dispatched after clock reached {}",
                scheduled.time, self.clock
            )));
        }
        self.clock = scheduled.time;

        let mut draft = RowDraft::default();
        match scheduled.event {
            Event::Arrival => self.handle_arrival(&mut draft)?,
            Event::ValidationComplete { client } => {
                self.handle_validation_complete(client, &mut draft)?
            }
            Event::ChargeComplete { client } => self.handle_charge_complete(client, &mut draft)?,
        }

        let kind = scheduled.event.kind();
        trace!(clock = self.clock, event = %kind, post = ?draft.post, "event processed");
        let row = self.snapshot(kind, draft)?;
        self.rows.push(row);
        Ok(())
    }

    fn handle_arrival(&mut self, draft: &mut RowDraft) -> Result<()> {
        let connector = self.variates.next_connector_type();
        let interarrival = self.variates.next_interarrival();
        draft.connector_rnd = connector.rnd;
        draft.connector = Some(connector.value);
        draft.interarrival_rnd = interarrival.rnd;
        draft.interarrival = Some(interarrival.value);
        self.schedule_arrival(self.clock + interarrival.value);

        let id = self.clients.peek_id();
        let Some(post) = self.pool.acquire(id, self.clock) else {
            self.stats.record_rejection();
            return Ok(());
        };

        let charge = self.variates.next_charge_minutes(connector.value);
        let validation_end = self.clock + self.config.validation_time;
        let price = self
            .config
            .connectors
            .get(connector.value)
            .price_for(charge.value);
        self.clients.admit(Client {
            id,
            connector: connector.value,
            arrival: self.clock,
            post,
            validation_end,
            charge_minutes: charge.value,
            price,
            charge_end: None,
        })?;
        self.queue
            .schedule(validation_end, Event::ValidationComplete { client: id });
        self.stats.record_acceptance();

        draft.post = Some(post);
        draft.charge_rnd = charge.rnd;
        draft.charge_minutes = Some(charge.value);
        draft.validation_end = Some(validation_end);
        Ok(())
    }

    fn handle_validation_complete(&mut self, id: ClientId, draft: &mut RowDraft) -> Result<()> {
        let client = self.clients.get_mut(id)?;
        let charge_end = client.validation_end + client.charge_minutes;
        client.charge_end = Some(charge_end);
        draft.post = Some(client.post);
        draft.connector = Some(client.connector);
        draft.charge_minutes = Some(client.charge_minutes);
        draft.charge_end = Some(charge_end);
        self.queue
            .schedule(charge_end, Event::ChargeComplete { client: id });
        Ok(())
    }

    fn handle_charge_complete(&mut self, id: ClientId, draft: &mut RowDraft) -> Result<()> {
        let client = self.clients.remove(id)?;
        let released = self.pool.release(client.post, self.clock)?;
        if released != id {
            return Err(Error::InvariantViolation(format!(
                "post {} held client {} but client {} finished charging there",
                client.post + 1,
                released,
                id
            )));
        }
        self.stats.record_revenue(client.connector, client.price);
        self.stats
            .record_charge_time(client.connector, client.charge_minutes);
        draft.post = Some(client.post);
        draft.connector = Some(client.connector);
        draft.charge_minutes = Some(client.charge_minutes);
        draft.charge_end = client.charge_end;
        Ok(())
    }

    fn schedule_arrival(&mut self, at: f64) {
        self.queue.schedule(at, Event::Arrival);
        self.next_arrival = Some(at);
    }

    fn snapshot(&self, event: EventKind, draft: RowDraft) -> Result<StateVectorRow> {
        let posts = self
            .pool
            .posts()
            .iter()
            .map(|post| -> Result<PostSnapshot> {
                let charge_end = match post.client() {
                    Some(id) => self.clients.get(id)?.charge_end,
                    None => None,
                };
                Ok(PostSnapshot {
                    occupied: post.is_occupied(),
                    client: post.client(),
                    charge_end,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let occupied_posts = self.pool.occupied_count();

        Ok(StateVectorRow {
            iteration: self.rows.len() as u64 + 1,
            clock: self.clock,
            event,
            post: draft.post,
            connector_rnd: draft.connector_rnd,
            connector: draft.connector,
            interarrival_rnd: draft.interarrival_rnd,
            interarrival: draft.interarrival,
            next_arrival: self.next_arrival,
            charge_rnd: draft.charge_rnd,
            charge_minutes: draft.charge_minutes,
            validation_end: draft.validation_end,
            charge_end: draft.charge_end,
            occupied_posts,
            occupancy_pct: occupied_posts as f64 / self.pool.len() as f64 * 100.0,
            posts,
            accepted: self.stats.accepted,
            rejected: self.stats.rejected,
            charge_minutes_by_type: self.stats.charge_minutes_by_type.clone(),
            revenue_by_type: self.stats.revenue_by_type.clone(),
            revenue: self.stats.revenue,
            utilization_pct: self.pool.utilization_pct(self.clock),
        })
    }
}

pub fn run_simulation(config: &SimConfig) -> Result<SimulationReport> {
    SimulationEngine::new(config.clone())?.run()
}

/// Consecutive seeds starting at `base`, wrapping at `u64::MAX`.
pub fn replication_seeds(base: u64, count: u64) -> Result<Vec<u64>> {
    check_replication_count(count)?;
    Ok((0..count).map(|offset| base.wrapping_add(offset)).collect())
}

fn check_replication_count(count: u64) -> Result<()> {
    if count == 0 {
        return Err(Error::ReplicationsZero);
    }
    if count > MAX_REPLICATIONS {
        return Err(Error::ReplicationsTooMany {
            requested: count,
            max: MAX_REPLICATIONS,
        });
    }
    Ok(())
}

/// Runs one independent simulation per seed on scoped worker threads.
pub fn run_replications(config: &SimConfig, seeds: &[u64]) -> Result<ReplicationReport> {
    check_replication_count(seeds.len() as u64)?;
    validate_config(config)?;

    let workers = thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1);
    let mut runs = Vec::with_capacity(seeds.len());
    for chunk in seeds.chunks(workers) {
        let results = thread::scope(|scope| {
            let handles = chunk
                .iter()
                .map(|&seed| {
                    let mut run_config = config.clone();
                    run_config.seed = Some(seed);
                    scope.spawn(move || run_simulation(&run_config).map(|report| report.summary))
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(Error::InvariantViolation(
                            "replication worker panicked".to_string(),
                        ))
                    })
                })
                .collect::<Vec<Result<Summary>>>()
        });
        for (&seed, result) in chunk.iter().zip(results) {
            runs.push((seed, result?));
        }
    }

    Ok(ReplicationReport::from_runs(runs))
}

pub fn validate_config(config: &SimConfig) -> Result<()> {
    if !(config.t_max.is_finite() && config.t_max > 0.0) {
        return Err(Error::InvalidTimeLimit(config.t_max));
    }
    if config.n_max == 0 {
        return Err(Error::EventLimitZero);
    }
    if !(config.mean_interarrival.is_finite() && config.mean_interarrival > 0.0) {
        return Err(Error::InvalidMeanInterarrival(config.mean_interarrival));
    }
    if !(config.validation_time.is_finite() && config.validation_time >= 0.0) {
        return Err(Error::InvalidValidationTime(config.validation_time));
    }

    for connector in ConnectorType::ALL {
        let probability = config.probability(connector);
        if !(0.0..=1.0).contains(&probability) {
            return Err(Error::InvalidProbability(connector, probability));
        }
    }
    let sum = ConnectorType::ALL
        .iter()
        .map(|&connector| config.probability(connector))
        .sum::<f64>();
    if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(Error::ProbabilitySum(sum));
    }

    if !SUPPORTED_SERVER_COUNTS.contains(&config.n_servers) {
        return Err(Error::UnsupportedServerCount(config.n_servers));
    }

    for connector in ConnectorType::ALL {
        validate_profile(config, connector)?;
    }

    Ok(())
}

fn validate_profile(config: &SimConfig, connector: ConnectorType) -> Result<()> {
    let profile = config.connectors.get(connector);
    let invalid = |reason: String| Error::InvalidChargeProfile(connector, reason);

    if !(profile.price_per_hour.is_finite() && profile.price_per_hour >= 0.0) {
        return Err(invalid(format!(
            "price per hour must be >= 0 (got {})",
            profile.price_per_hour
        )));
    }

    match &profile.charge {
        ChargeDuration::Fixed { fixed_minutes } => {
            if !(fixed_minutes.is_finite() && *fixed_minutes > 0.0) {
                return Err(invalid(format!(
                    "charge minutes must be > 0 (got {})",
                    fixed_minutes
                )));
            }
        }
        ChargeDuration::Table(steps) => {
            if steps.is_empty() {
                return Err(invalid("charge table must not be empty".to_string()));
            }
            for step in steps {
                if !(step.minutes.is_finite() && step.minutes > 0.0) {
                    return Err(invalid(format!(
                        "charge minutes must be > 0 (got {})",
                        step.minutes
                    )));
                }
                if !(0.0..=1.0).contains(&step.probability) {
                    return Err(invalid(format!(
                        "step probability must be between 0 and 1 (got {})",
                        step.probability
                    )));
                }
            }
            let sum = steps.iter().map(|step| step.probability).sum::<f64>();
            if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
                return Err(invalid(format!(
                    "step probabilities must sum to 1 (got {})",
                    sum
                )));
            }
        }
    }

    Ok(())
}
