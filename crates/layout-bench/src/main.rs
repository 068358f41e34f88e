use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use area_layout::editor::{InsertSide, StructuralEditor};
use area_layout::layout::{Area, Axis, LayoutTree, ViewportCompiler};
use area_layout::registry::PermissiveRegistry;
use area_layout::LayoutConfig;
use clap::Parser;
use ratatui::layout::Rect;

#[derive(Parser, Debug)]
#[command(
    name = "layout-bench",
    version = env!("CARGO_PKG_VERSION"),
    about = "Headless benchmark for layout split, compile and repair throughput"
)]
struct BenchCli {
    /// How many times to rebuild the layout from a single area.
    #[arg(short = 'r', long = "rounds", default_value_t = 50)]
    rounds: u32,

    /// Splits attempted per round.
    #[arg(short = 's', long = "splits", default_value_t = 64)]
    splits: u32,

    /// Surface width in cells.
    #[arg(long, default_value_t = 400)]
    width: u16,

    /// Surface height in cells.
    #[arg(long, default_value_t = 200)]
    height: u16,
}

struct BenchConfig {
    rounds: u32,
    splits: u32,
    area: Rect,
}

impl TryFrom<&BenchCli> for BenchConfig {
    type Error = String;

    fn try_from(cli: &BenchCli) -> Result<Self, Self::Error> {
        if !(1..=10_000).contains(&cli.rounds) {
            return Err("rounds must be between 1 and 10000".to_string());
        }
        if !(1..=4_096).contains(&cli.splits) {
            return Err("splits must be between 1 and 4096".to_string());
        }
        if cli.width < 8 || cli.height < 8 {
            return Err("surface must be at least 8x8".to_string());
        }
        Ok(Self {
            rounds: cli.rounds,
            splits: cli.splits,
            area: Rect::new(0, 0, cli.width, cli.height),
        })
    }
}

fn main() -> io::Result<()> {
    let args = BenchCli::parse();
    let config = BenchConfig::try_from(&args)
        .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))?;

    let stats = run_benchmark(&config);
    println!("{}", stats.final_report(&config));
    Ok(())
}

fn run_benchmark(config: &BenchConfig) -> BenchStats {
    let layout_config = LayoutConfig::default();
    let min_fraction = layout_config.min_fraction;
    let editor = StructuralEditor::new(layout_config, Arc::new(PermissiveRegistry));
    let mut stats = BenchStats::new();

    for _ in 0..config.rounds {
        let mut tree = LayoutTree::new(Area::new("bench"));
        let mut compiler = ViewportCompiler::new();
        let mut viewports = compiler.compute(&tree, config.area);

        for step in 0..config.splits {
            let leaves = tree.leaves();
            let leaf = leaves[step as usize % leaves.len()];
            let axis = if step % 2 == 0 {
                Axis::Horizontal
            } else {
                Axis::Vertical
            };

            let started = Instant::now();
            let split = editor.split_area(&mut tree, &viewports, leaf, axis, InsertSide::After);
            stats.splits.record(started.elapsed());
            if split.is_err() {
                stats.refused_splits += 1;
            }

            let started = Instant::now();
            viewports = compiler.compute(&tree, config.area);
            stats.compiles.record(started.elapsed());
        }

        let mut working = tree.clone();
        let started = Instant::now();
        working.repair(min_fraction);
        stats.repairs.record(started.elapsed());
        stats.final_leaves += tree.leaves().len() as u64;
    }

    stats.mark_completed();
    stats
}

#[derive(Default)]
struct Timing {
    count: u64,
    total: Duration,
    fastest: Option<Duration>,
    slowest: Duration,
}

impl Timing {
    fn record(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
        self.slowest = self.slowest.max(elapsed);
        self.fastest = Some(self.fastest.map_or(elapsed, |best| best.min(elapsed)));
    }

    fn average_us(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total.as_secs_f64() * 1_000_000.0 / self.count as f64
        }
    }

    fn fastest_us(&self) -> f64 {
        self.fastest.unwrap_or_default().as_secs_f64() * 1_000_000.0
    }

    fn slowest_us(&self) -> f64 {
        self.slowest.as_secs_f64() * 1_000_000.0
    }

    fn per_second(&self) -> f64 {
        let secs = self.total.as_secs_f64();
        if secs > 0.0 {
            self.count as f64 / secs
        } else {
            0.0
        }
    }
}

struct BenchStats {
    start: Instant,
    completed_at: Option<Instant>,
    splits: Timing,
    compiles: Timing,
    repairs: Timing,
    refused_splits: u64,
    final_leaves: u64,
}

impl BenchStats {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            completed_at: None,
            splits: Timing::default(),
            compiles: Timing::default(),
            repairs: Timing::default(),
            refused_splits: 0,
            final_leaves: 0,
        }
    }

    fn elapsed(&self) -> Duration {
        self.completed_at
            .unwrap_or_else(Instant::now)
            .duration_since(self.start)
    }

    fn mark_completed(&mut self) {
        self.completed_at = Some(Instant::now());
    }

    fn final_report(&self, config: &BenchConfig) -> String {
        let avg_leaves = self.final_leaves as f64 / f64::from(config.rounds);
        indoc::formatdoc!(
            r#"
            Layout bench completed in {elapsed:.2}s.
            Rounds: {rounds} | Splits per round: {splits} | Surface: {width}x{height}
            Split:   avg {split_avg:.2} us | best {split_best:.2} us | worst {split_worst:.2} us | {split_rate:.0}/s
            Compile: avg {compile_avg:.2} us | best {compile_best:.2} us | worst {compile_worst:.2} us | {compile_rate:.0}/s
            Repair:  avg {repair_avg:.2} us | best {repair_best:.2} us | worst {repair_worst:.2} us
            Refused splits: {refused} | Avg leaves per round: {avg_leaves:.1}
            "#,
            elapsed = self.elapsed().as_secs_f64(),
            rounds = config.rounds,
            splits = config.splits,
            width = config.area.width,
            height = config.area.height,
            split_avg = self.splits.average_us(),
            split_best = self.splits.fastest_us(),
            split_worst = self.splits.slowest_us(),
            split_rate = self.splits.per_second(),
            compile_avg = self.compiles.average_us(),
            compile_best = self.compiles.fastest_us(),
            compile_worst = self.compiles.slowest_us(),
            compile_rate = self.compiles.per_second(),
            repair_avg = self.repairs.average_us(),
            repair_best = self.repairs.fastest_us(),
            repair_worst = self.repairs.slowest_us(),
            refused = self.refused_splits,
            avg_leaves = avg_leaves,
        )
    }
}
