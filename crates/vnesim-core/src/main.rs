//! vnesim CLI — Simulate virtual network embedding admission.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use vnesim_core::config::SimConfig;
use vnesim_core::metrics;
use vnesim_core::netfile;
use vnesim_core::request::{VirtualLink, VirtualNode, VirtualRequest};

#[derive(Parser)]
#[command(
    name = "vnesim",
    about = "Simulate virtual network embedding admission and resource allocation",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation with a single strategy.
    Run {
        /// Path to TOML configuration file.
        #[arg(short, long)]
        config: PathBuf,
        /// Embedding strategy name.
        #[arg(short, long, default_value = "greedy")]
        strategy: String,
        /// Output full results to JSON file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare multiple strategies on the same substrate and requests.
    Compare {
        /// Path to TOML configuration file.
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated list of strategy names.
        #[arg(short = 'S', long, value_delimiter = ',')]
        strategies: Vec<String>,
        /// Output results to JSON file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate synthetic virtual network request files.
    GenRequests {
        /// Number of requests to generate.
        #[arg(long, default_value = "1000")]
        count: u64,
        /// Minimum virtual nodes per request.
        #[arg(long, default_value = "2")]
        nodes_min: u32,
        /// Maximum virtual nodes per request.
        #[arg(long, default_value = "10")]
        nodes_max: u32,
        /// Maximum compute demand per virtual node.
        #[arg(long, default_value = "50")]
        cpu_max: f64,
        /// Maximum bandwidth demand per virtual link.
        #[arg(long, default_value = "50")]
        bw_max: f64,
        /// Mean ticks between consecutive arrivals.
        #[arg(long, default_value = "25")]
        mean_interarrival: f64,
        /// Mean lifetime in ticks.
        #[arg(long, default_value = "1000")]
        mean_duration: f64,
        /// Random seed.
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Directory to write req<k>.txt files into.
        #[arg(short, long)]
        output_dir: PathBuf,
    },
    /// List available strategies.
    ListStrategies,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            strategy,
            output,
        } => {
            let sim_config = load_config(&config);
            let (substrate, requests) = load_networks(&sim_config);

            let strat = vnesim_strategies::strategy_by_name(&strategy, sim_config.simulation.seed)
                .unwrap_or_else(|| {
                    eprintln!(
                        "Unknown strategy: {}. Available: {:?}",
                        strategy,
                        vnesim_strategies::available_strategies()
                    );
                    std::process::exit(1);
                });

            let summary =
                vnesim_core::run_simulation(substrate, requests, strat, sim_config.report_interval())
                    .unwrap_or_else(|e| {
                        eprintln!("Simulation aborted: {}", e);
                        std::process::exit(1);
                    });
            println!("{}", metrics::format_table(&summary));

            let snapshot_path =
                Path::new(&sim_config.report.output).join(format!("{}-VNE.txt", summary.strategy));
            metrics::write_snapshots(&summary.snapshots, &snapshot_path).unwrap_or_else(|e| {
                eprintln!("Error writing snapshots: {}", e);
                std::process::exit(1);
            });
            println!("Snapshots written to {}", snapshot_path.display());

            if let Some(output_path) = output {
                metrics::write_summary_json(&summary, &output_path).unwrap_or_else(|e| {
                    eprintln!("Error writing output: {}", e);
                    std::process::exit(1);
                });
                println!("Results written to {}", output_path.display());
            }
        }
        Commands::Compare {
            config,
            strategies,
            output,
        } => {
            let sim_config = load_config(&config);
            let (substrate, requests) = load_networks(&sim_config);

            let names: Vec<&str> = if strategies.is_empty() {
                vnesim_strategies::available_strategies()
            } else {
                strategies.iter().map(|s| s.as_str()).collect()
            };

            let results = vnesim_core::compare_strategies(
                &substrate,
                &requests,
                &names,
                sim_config.simulation.seed,
                sim_config.report_interval(),
            )
            .unwrap_or_else(|e| {
                eprintln!("Simulation aborted: {}", e);
                std::process::exit(1);
            });
            println!("{}", metrics::format_comparison_table(&results));

            for summary in &results {
                println!("{}", metrics::format_table(summary));
            }

            if let Some(output_path) = output {
                let json = serde_json::to_string_pretty(&results).unwrap();
                std::fs::write(&output_path, json).unwrap_or_else(|e| {
                    eprintln!("Error writing output: {}", e);
                    std::process::exit(1);
                });
                println!("Results written to {}", output_path.display());
            }
        }
        Commands::GenRequests {
            count,
            nodes_min,
            nodes_max,
            cpu_max,
            bw_max,
            mean_interarrival,
            mean_duration,
            seed,
            output_dir,
        } => {
            use rand::Rng;
            use rand::SeedableRng;
            use rand_chacha::ChaCha8Rng;

            std::fs::create_dir_all(&output_dir).unwrap_or_else(|e| {
                eprintln!("Error creating output directory: {}", e);
                std::process::exit(1);
            });

            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut arrival = 0u64;
            for i in 0..count {
                arrival += (rng.gen::<f64>() * 2.0 * mean_interarrival).max(1.0) as u64;
                let duration =
                    (mean_duration / 2.0 + rng.gen::<f64>() * mean_duration).max(1.0) as u64;

                let n = rng.gen_range(nodes_min..=nodes_max);
                let nodes: Vec<VirtualNode> = (0..n)
                    .map(|id| VirtualNode {
                        id,
                        cpu: (rng.gen::<f64>() * cpu_max).max(1.0).round(),
                    })
                    .collect();

                // Path backbone keeps the request graph connected; extra
                // links are sprinkled between non-adjacent pairs.
                let mut links: Vec<VirtualLink> = (0..n.saturating_sub(1))
                    .map(|j| VirtualLink {
                        endpoints: (j, j + 1),
                        bw: (rng.gen::<f64>() * bw_max).max(1.0).round(),
                    })
                    .collect();
                for a in 0..n {
                    for b in (a + 2)..n {
                        if rng.gen::<f64>() < 0.2 {
                            links.push(VirtualLink {
                                endpoints: (a, b),
                                bw: (rng.gen::<f64>() * bw_max).max(1.0).round(),
                            });
                        }
                    }
                }

                let request = VirtualRequest {
                    id: i,
                    arrival,
                    duration,
                    nodes,
                    links,
                };
                let path = output_dir.join(format!("req{}.txt", i));
                netfile::write_request(&request, &path).unwrap_or_else(|e| {
                    eprintln!("Error writing {}: {}", path.display(), e);
                    std::process::exit(1);
                });
            }
            println!("Generated {} requests in {}", count, output_dir.display());
        }
        Commands::ListStrategies => {
            println!("Available embedding strategies:");
            for name in vnesim_strategies::available_strategies() {
                println!("  - {}", name);
            }
        }
    }
}

fn load_config(path: &Path) -> SimConfig {
    SimConfig::from_file(path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    })
}

fn load_networks(
    config: &SimConfig,
) -> (vnesim_core::SubstrateGraph, Vec<VirtualRequest>) {
    let substrate = netfile::load_substrate(Path::new(&config.substrate.path)).unwrap_or_else(|e| {
        eprintln!("Error loading substrate: {}", e);
        std::process::exit(1);
    });
    let requests = netfile::load_requests(Path::new(&config.requests.dir), config.requests.count)
        .unwrap_or_else(|e| {
            eprintln!("Error loading requests: {}", e);
            std::process::exit(1);
        });
    (substrate, requests)
}
