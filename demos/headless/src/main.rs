use std::time::Duration;

use clap::Parser;
use flowsim::core::{
    clock::WallClock, units::Millisecs, Algorithm, Preset, SimOpts, Simulation, TrafficLoad,
};
use rand::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Topology to simulate
    #[arg(short, long, default_value = "star")]
    topology: Preset,

    /// Traffic load level
    #[arg(short, long, default_value = "medium")]
    load: TrafficLoad,

    /// Congestion control algorithm
    #[arg(short, long, default_value = "reno")]
    algorithm: Algorithm,

    /// Virtual time to simulate, in milliseconds
    #[arg(short, long, default_value = "60000")]
    duration: Millisecs,

    /// Random seed
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Follow the wall clock instead of running as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Analyze the shortest route between two named nodes once the run ends
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
    route: Option<Vec<String>>,

    /// Print the final metrics as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let opts = SimOpts::builder()
        .traffic_load(args.load)
        .algorithm(args.algorithm)
        .build();
    let mut sim = Simulation::new(opts, StdRng::seed_from_u64(args.seed));
    sim.load_preset(args.topology)?;
    sim.start();
    if args.realtime {
        let clock = WallClock::new();
        while sim.now() < args.duration {
            std::thread::sleep(Duration::from_millis(50));
            sim.catch_up(&clock);
        }
    } else {
        sim.run_for(args.duration);
    }
    sim.stop();
    log::info!("finished at {}", sim.now());

    let metrics = sim.metrics()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        let stats = &metrics.routing;
        println!(
            "{} topology, {} nodes, {} links",
            args.topology, metrics.nr_nodes, metrics.nr_links
        );
        println!(
            "{} load, TCP {}, {} packets in flight",
            metrics.traffic_load, metrics.algorithm, metrics.active_packets
        );
        println!(
            "{} packets routed, {:.2} hops on average (min {}, max {})",
            stats.total_packets,
            stats.avg_hop_count,
            stats.min_hops.unwrap_or_default(),
            stats.max_hops
        );
        for (name, level) in &metrics.congested {
            println!("congested: {name} at {level:.1}");
        }
        for tcp in &metrics.tcp {
            println!(
                "{:>10} {:?} cwnd={} ssthresh={:.1} sent={} acked={}",
                tcp.name, tcp.state, tcp.window, tcp.ssthresh, tcp.packets_sent, tcp.packets_acked
            );
        }
    }

    if let Some(names) = args.route {
        let id = |name: &str| {
            sim.find_by_name(name)
                .map(|n| n.id)
                .ok_or_else(|| anyhow::anyhow!("no node named {name}"))
        };
        let analysis = sim.analyze_route(id(&names[0])?, id(&names[1])?)?;
        let hops = analysis
            .hops
            .iter()
            .map(|h| h.name.as_str())
            .collect::<Vec<_>>();
        println!(
            "route {} ({}, {:.1} per hop, {:?} than average)",
            hops.join(" -> "),
            analysis.route.latency,
            analysis.avg_latency_per_hop,
            analysis.comparison
        );
    }
    Ok(())
}
