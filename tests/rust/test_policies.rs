/// Integration tests for dispatch policies in a simulation context.
use farmsim_core::config::SimConfig;
use farmsim_core::Simulation;
use farmsim_dispatch::*;

fn small_config(policy: &str) -> SimConfig {
    let mut config = SimConfig::from_str(
        r#"
[simulation]
name = "policy-test"
seed = 42
horizon_ticks = 1500
arrival_rate = 0.8
item_parameter = 100.0

[cluster]
num_servers = 4
slots_per_server = 8
cache_capacity = 25
max_queue_depth = 16
cached_service_ticks = 2
uncached_service_ticks = 20
"#,
    )
    .unwrap();
    config.simulation.policy = policy.to_string();
    config
}

fn served_per_server(sim: &Simulation) -> Vec<u64> {
    sim.servers.iter().map(|s| s.total_served).collect()
}

/// Counts upward, wrapping at the requested bound.
struct CountingUniform(usize);

impl UniformSource for CountingUniform {
    fn choose_uniform(&mut self, n: usize) -> usize {
        let value = self.0 % n;
        self.0 += 1;
        value
    }
}

#[test]
fn test_round_robin_cycles_across_three_servers() {
    let mut policy = PolicyKind::RoundRobin.build(&PolicySettings::default());
    let loads: Vec<ServerLoad> = (0..3).map(ServerLoad::idle).collect();
    let mut uniform = CountingUniform(0);

    let picks: Vec<usize> = (0..6)
        .map(|item| {
            let request = RequestInfo { item, sent: 0 };
            policy.route(&request, &loads, &mut uniform).unwrap()
        })
        .collect();
    assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
}

#[test]
fn test_choose2_margin_equal_to_bias_keeps_home_server() {
    let policy = ModChooseTwo::new(16);
    let (first, second) = ModChooseTwo::candidates(13, 10);
    assert_eq!((first, second), (3, 0));

    let mut loads: Vec<ServerLoad> = (0..10).map(ServerLoad::idle).collect();
    loads[first].queue_depth = 10;
    loads[first].slots_in_use = 8;
    loads[second].queue_depth = 2;

    let request = RequestInfo { item: 13, sent: 0 };
    assert_eq!(policy.route(&request, &loads), Some(first));

    loads[first].queue_depth = 11;
    assert_eq!(policy.route(&request, &loads), Some(second));
}

#[test]
fn test_random_draws_from_uniform_source() {
    let mut policy = "random"
        .parse::<PolicyKind>()
        .unwrap()
        .build(&PolicySettings::default());
    let loads: Vec<ServerLoad> = (0..4).map(ServerLoad::idle).collect();
    let mut uniform = CountingUniform(1);

    let request = RequestInfo { item: 0, sent: 0 };
    let picks: Vec<usize> = (0..5)
        .map(|_| policy.route(&request, &loads, &mut uniform).unwrap())
        .collect();
    assert_eq!(picks, vec![1, 2, 3, 0, 1]);
}

#[test]
fn test_every_policy_rejects_empty_farm() {
    let mut uniform = CountingUniform(0);
    let request = RequestInfo { item: 7, sent: 0 };
    for kind in PolicyKind::ALL {
        let mut policy = kind.build(&PolicySettings::default());
        assert_eq!(policy.route(&request, &[], &mut uniform), None, "{}", kind);
    }
}

#[test]
fn test_modulo_hash_keeps_key_on_home_server() {
    let mut config = small_config("modulo_hash");
    config.simulation.arrival_rate = 0.0;
    let mut sim = Simulation::new(config).unwrap();

    for _ in 0..20 {
        sim.inject(6);
        for _ in 0..30 {
            sim.step().unwrap();
        }
    }
    assert_eq!(served_per_server(&sim), vec![0, 0, 20, 0]);
    // The first request misses, every later one finds the key cached.
    assert_eq!(sim.servers[2].cache.misses, 1);
    assert_eq!(sim.servers[2].cache.hits, 19);
}

#[test]
fn test_choose2_spills_single_hot_key_to_alternate() {
    let mut config = small_config("mod_choose2");
    config.simulation.item_parameter = 0.0;
    config.simulation.arrival_rate = 3.0;
    config.dispatch.choose2_bias = 0;
    let summary = Simulation::new(config).unwrap().run().unwrap();

    // Key 0: home server 0, alternate (0 * 0 + 1) mod 4 = 1.
    let served: Vec<u64> = summary.per_server.iter().map(|s| s.served).collect();
    assert!(served[0] > 0);
    assert!(served[1] > 0);
    assert_eq!(served[2], 0);
    assert_eq!(served[3], 0);
}

#[test]
fn test_modulo_hash_single_hot_key_uses_one_server() {
    let mut config = small_config("modulo_hash");
    config.simulation.item_parameter = 0.0;
    let summary = Simulation::new(config).unwrap().run().unwrap();

    let busy: Vec<usize> = summary
        .per_server
        .iter()
        .filter(|s| s.served > 0)
        .map(|s| s.id)
        .collect();
    assert_eq!(busy, vec![0]);
}

#[test]
fn test_round_robin_spreads_load_evenly() {
    let summary = Simulation::new(small_config("round_robin"))
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(summary.lifetime.dropped, 0);
    assert!(
        summary.jains_fairness_index > 0.99,
        "Round robin should be near-perfectly fair, got {}",
        summary.jains_fairness_index
    );
}

#[test]
fn test_least_outstanding_runs_balanced() {
    let summary = Simulation::new(small_config("least_outstanding"))
        .unwrap()
        .run()
        .unwrap();
    assert!(summary.per_server.iter().all(|s| s.served > 0));
    assert_eq!(
        summary.lifetime.generated,
        summary.lifetime.accepted + summary.lifetime.dropped
    );
}

#[test]
fn test_random_policy_is_seed_deterministic() {
    let a = Simulation::new(small_config("random"))
        .unwrap()
        .run()
        .unwrap();
    let b = Simulation::new(small_config("random"))
        .unwrap()
        .run()
        .unwrap();
    let served_a: Vec<u64> = a.per_server.iter().map(|s| s.served).collect();
    let served_b: Vec<u64> = b.per_server.iter().map(|s| s.served).collect();
    assert_eq!(served_a, served_b);
    assert_eq!(a.lifetime, b.lifetime);
}

#[test]
fn test_legacy_names_resolve_in_config() {
    for (legacy, canonical) in [
        ("roundrobin", "round_robin"),
        ("modulohash", "modulo_hash"),
        ("modchoose2", "mod_choose2"),
    ] {
        let sim = Simulation::new(small_config(legacy)).unwrap();
        assert_eq!(sim.policy_name(), canonical);
    }
}

#[test]
fn test_with_policy_overrides_config() {
    let policy = PolicyKind::LeastOutstanding.build(&PolicySettings::default());
    let sim = Simulation::with_policy(small_config("round_robin"), policy).unwrap();
    assert_eq!(sim.policy_name(), "least_outstanding");
}
