//! Tick-stepping simulation engine.
//!
//! A [`Simulation`] owns everything a run mutates: the clock, the random
//! stream, the servers, the dispatch policy and the statistics. Each
//! [`Simulation::step`] advances the clock by one tick, generates and routes
//! arrivals, ticks every server in index order and records completions.

use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::error::SimError;
use crate::random::{clock_seed, RandomProcess};
use crate::request::Request;
use crate::server::Server;
use crate::stats::{
    coefficient_of_variation, jains_fairness_index, ReportCadence, RunSummary, StatsCollector,
    StatsSnapshot,
};
use farmsim_dispatch::{DispatchPolicy, ServerLoad};
use tracing::{debug, info, trace};

/// The simulation context.
pub struct Simulation {
    /// Virtual clock.
    pub clock: SimClock,
    random: RandomProcess,
    /// Simulated servers, in dispatch index order.
    pub servers: Vec<Server>,
    /// Statistics collector.
    pub stats: StatsCollector,
    policy: DispatchPolicy,
    /// Load views handed to the policy, refreshed as the tick's arrivals
    /// are enqueued.
    loads: Vec<ServerLoad>,
    /// Items injected by hand, dispatched on the next step.
    injected: Vec<u64>,
    cadence: ReportCadence,
    warmup_reset_done: bool,
    config: SimConfig,
}

impl Simulation {
    /// Build a simulation with the policy named in the configuration.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let policy = config.policy_kind()?.build(&config.policy_settings());
        Self::with_policy(config, policy)
    }

    /// Build a simulation around an already configured policy.
    pub fn with_policy(config: SimConfig, policy: DispatchPolicy) -> Result<Self, SimError> {
        config.validate()?;
        let seed = config.simulation.seed.unwrap_or_else(clock_seed);
        let service = config.service_model();
        let cluster = &config.cluster;

        let servers: Vec<Server> = (0..cluster.num_servers)
            .map(|id| {
                Server::new(
                    id,
                    cluster.slots_per_server,
                    cluster.max_queue_depth,
                    cluster.cache_capacity,
                    service,
                )
            })
            .collect();
        let loads = servers.iter().map(Server::load).collect();

        Ok(Self {
            clock: SimClock::new(),
            random: RandomProcess::new(seed, config.simulation.item_parameter),
            servers,
            stats: StatsCollector::new(),
            policy,
            loads,
            injected: Vec::new(),
            cadence: ReportCadence::new(config.simulation.report_threshold),
            warmup_reset_done: false,
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.random.seed()
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Last tick at which requests are generated.
    pub fn horizon(&self) -> u64 {
        self.config.simulation.horizon_ticks
    }

    /// Queued plus in-flight requests over all servers.
    pub fn outstanding(&self) -> usize {
        self.servers.iter().map(Server::outstanding).sum()
    }

    /// Whether the run is over: the horizon is reached and nothing is left
    /// in any queue or slot.
    pub fn is_finished(&self) -> bool {
        self.clock.now() >= self.horizon() && self.injected.is_empty() && self.outstanding() == 0
    }

    /// Queue a hand-made request for `item`; it is generated and dispatched
    /// at the start of the next step, before that step's random arrivals.
    pub fn inject(&mut self, item: u64) {
        self.injected.push(item);
    }

    /// Advance the simulation by one tick and return the requests that
    /// completed during it.
    pub fn step(&mut self) -> Result<Vec<Request>, SimError> {
        let now = self.clock.advance();

        let mut arrivals = std::mem::take(&mut self.injected);
        if now <= self.horizon() {
            let count = self
                .random
                .next_arrival_count(self.config.simulation.arrival_rate);
            arrivals.extend((0..count).map(|_| self.random.next_item_key()));
        }
        if !arrivals.is_empty() {
            self.refresh_loads();
            for item in arrivals {
                self.dispatch(Request::new(item, now))?;
            }
        }

        let mut completed = Vec::new();
        for server in &mut self.servers {
            completed.extend(server.tick(now)?);
            if cfg!(debug_assertions) {
                server.check_invariants()?;
            }
        }
        for request in &completed {
            self.stats.record(request);
        }
        self.stats.tick();

        if !self.warmup_reset_done && now >= self.horizon() / 2 {
            self.stats.reset();
            self.warmup_reset_done = true;
            info!(tick = now, "warm-up window closed, statistics reset");
        }

        Ok(completed)
    }

    /// Route one request and offer it to the chosen server.
    fn dispatch(&mut self, request: Request) -> Result<(), SimError> {
        self.stats.record_generated();
        let target = self
            .policy
            .route(&request.info(), &self.loads, &mut self.random)
            .filter(|&i| i < self.servers.len())
            .ok_or_else(|| SimError::InvariantViolation {
                server: self.servers.len(),
                detail: format!("policy {} returned no valid server", self.policy.name()),
            })?;

        let server = &mut self.servers[target];
        if server.enqueue(request) {
            self.loads[target] = server.load();
        } else {
            trace!(server = target, item = request.item, "queue full, request dropped");
            self.stats.record_dropped();
        }
        Ok(())
    }

    fn refresh_loads(&mut self) {
        self.loads.clear();
        self.loads.extend(self.servers.iter().map(Server::load));
    }

    /// Run until termination, handing every progress snapshot to `observer`.
    pub fn run_with<F>(&mut self, mut observer: F) -> Result<RunSummary, SimError>
    where
        F: FnMut(&StatsSnapshot),
    {
        info!(
            name = %self.config.simulation.name,
            policy = self.policy_name(),
            seed = self.seed(),
            servers = self.servers.len(),
            horizon = self.horizon(),
            rate = self.config.simulation.arrival_rate,
            "starting simulation"
        );

        let mut reports = Vec::new();
        loop {
            self.step()?;
            let now = self.clock.now();
            let finished = self.is_finished();
            let decile = self.clock.decile_of(self.horizon());

            if self
                .cadence
                .should_report(self.stats.window().accepted, decile, finished)
            {
                let snapshot = self.stats.snapshot(now);
                debug!(tick = now, accepted = snapshot.accepted, "progress");
                observer(&snapshot);
                reports.push(snapshot);
            }
            if finished {
                break;
            }
        }

        let summary = self.summary(reports);
        info!(
            ticks = summary.ticks,
            generated = summary.lifetime.generated,
            accepted = summary.lifetime.accepted,
            dropped = summary.lifetime.dropped,
            "simulation finished"
        );
        Ok(summary)
    }

    /// Run until termination, collecting progress snapshots.
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        self.run_with(|_| {})
    }

    /// Summary of the run so far.
    pub fn summary(&self, reports: Vec<StatsSnapshot>) -> RunSummary {
        let per_server: Vec<_> = self.servers.iter().map(Server::summary).collect();
        let served: Vec<u64> = per_server.iter().map(|s| s.served).collect();

        RunSummary {
            name: self.config.simulation.name.clone(),
            policy: self.policy_name().to_string(),
            seed: self.seed(),
            arrival_rate: self.config.simulation.arrival_rate,
            ticks: self.clock.now(),
            reports,
            final_stats: self.stats.snapshot(self.clock.now()),
            lifetime: *self.stats.lifetime(),
            load_cv: coefficient_of_variation(&served),
            jains_fairness_index: jains_fairness_index(&served),
            per_server,
        }
    }
}
