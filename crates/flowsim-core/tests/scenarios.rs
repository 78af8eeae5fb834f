use flowsim_core::{
    network::CONGESTION_MAX, units::Millisecs, Algorithm, Preset, SimOpts, Simulation, TrafficLoad,
};
use rand::prelude::*;

fn run(
    preset: Preset,
    load: TrafficLoad,
    algorithm: Algorithm,
    seed: u64,
    duration: Millisecs,
) -> anyhow::Result<Simulation> {
    let opts = SimOpts::builder()
        .traffic_load(load)
        .algorithm(algorithm)
        .build();
    let mut sim = Simulation::new(opts, StdRng::seed_from_u64(seed));
    sim.load_preset(preset)?;
    sim.start();
    sim.run_for(duration);
    Ok(sim)
}

#[test]
fn long_runs_stay_within_bounds() -> anyhow::Result<()> {
    let loads = [TrafficLoad::Light, TrafficLoad::Medium, TrafficLoad::Heavy];
    for preset in Preset::ALL {
        for load in loads {
            for algorithm in [Algorithm::Tahoe, Algorithm::Reno] {
                let sim = run(preset, load, algorithm, 7, Millisecs::new(120_000))?;
                for node in sim.list_nodes() {
                    let c = node.congestion();
                    assert!((0.0..=CONGESTION_MAX).contains(&c), "{}: {c}", node.name);
                    assert!(node.control.window_size() >= 1);
                    assert!(node.control.packets_acked() <= node.control.packets_sent());
                }
                let stats = sim.routing_stats();
                assert!(stats.total_packets > 0, "{preset}/{load}/{algorithm}");
                assert!(stats.history().count() <= sim.opts().routing_history_cap);
                assert!(sim.performance().len() <= sim.opts().performance_history_cap);
                let min = stats.min_hops.unwrap_or_default() as f64;
                assert!(min <= stats.avg_hop_count);
                assert!(stats.avg_hop_count <= stats.max_hops as f64);
            }
        }
    }
    Ok(())
}

#[test]
fn same_seed_same_run() -> anyhow::Result<()> {
    let snapshot = |sim: &Simulation| {
        let congestion = sim.list_nodes().map(|n| n.congestion()).collect::<Vec<_>>();
        (sim.routing_stats().clone(), congestion, sim.latency_history())
    };
    let a = run(Preset::Mesh, TrafficLoad::Heavy, Algorithm::Reno, 99, Millisecs::new(30_000))?;
    let b = run(Preset::Mesh, TrafficLoad::Heavy, Algorithm::Reno, 99, Millisecs::new(30_000))?;
    assert_eq!(snapshot(&a), snapshot(&b));
    Ok(())
}

#[test]
fn running_in_slices_matches_one_run() -> anyhow::Result<()> {
    let whole = run(Preset::Ring, TrafficLoad::Medium, Algorithm::Tahoe, 5, Millisecs::new(20_000))?;
    let mut sliced = run(Preset::Ring, TrafficLoad::Medium, Algorithm::Tahoe, 5, Millisecs::ZERO)?;
    for _ in 0..40 {
        sliced.run_for(Millisecs::new(500));
    }
    assert_eq!(whole.now(), sliced.now());
    assert_eq!(whole.routing_stats(), sliced.routing_stats());
    Ok(())
}

#[test]
fn star_routes_through_the_hub() -> anyhow::Result<()> {
    let sim = run(Preset::Star, TrafficLoad::Light, Algorithm::Reno, 1, Millisecs::ZERO)?;
    let id = |name: &str| sim.find_by_name(name).map(|n| n.id).unwrap();
    let route = sim.shortest_path(id("PC1"), id("PC6"))?;
    assert_eq!(route.path, vec![id("PC1"), id("ROUTER1"), id("PC6")]);
    let expected = sim.node(id("PC1")).unwrap().latency + sim.node(id("ROUTER1")).unwrap().latency;
    assert_eq!(route.latency, expected);
    assert_eq!(sim.find_path(id("PC1"), id("PC6"))?.len(), 3);
    Ok(())
}

#[test]
fn linear_hops_never_exceed_the_chain() -> anyhow::Result<()> {
    let sim = run(Preset::Linear, TrafficLoad::Heavy, Algorithm::Reno, 3, Millisecs::new(60_000))?;
    let stats = sim.routing_stats();
    assert!(stats.max_hops <= 6);
    assert!(stats.min_hops >= Some(1));
    Ok(())
}

#[test]
fn metrics_serialize() -> anyhow::Result<()> {
    let sim = run(Preset::Tree, TrafficLoad::Medium, Algorithm::Reno, 8, Millisecs::new(10_000))?;
    let metrics = sim.metrics()?;
    assert_eq!(metrics.nr_nodes, 15);
    assert_eq!(metrics.nr_links, 14);
    assert_eq!(metrics.tcp.len(), 15);
    let json = serde_json::to_value(&metrics)?;
    assert_eq!(json["traffic_load"], "medium");
    assert_eq!(json["algorithm"], "Reno");
    Ok(())
}
