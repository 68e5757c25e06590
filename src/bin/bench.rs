//! Timing harness for [`adaptive_run_sort`]: generates data under a chosen
//! distribution, sorts it under a chosen merge policy, and reports rolling
//! timing statistics. Modeled on the library's own benchmark binary,
//! same `clap`/`indicatif`/`rolling-stats` stack, same "skip the first
//! sample" warm-up rule.

use clap::Parser as _;
use rand::SeedableRng as _;

/// Command line arguments
#[derive(clap::Parser)]
#[command(author, version, about)]
struct Args {
    /// Which merge policy to sort under
    #[arg(value_enum)]
    policy: Policy,
    /// Which data distribution to sort
    #[arg(value_enum)]
    distribution: Distribution,
    /// The number of runs to measure (one extra warm-up run is done first)
    #[arg(short, long, default_value_t = 100)]
    runs: usize,
    /// The size of the slices to sort
    #[arg(short, long, default_value_t = 1_000_000)]
    size: usize,
    /// Seed for the data rng
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Policy {
    /// The library's default policy
    Default,
    /// Merges as soon as two runs are on the stack, ignoring the third
    TwoRun,
    /// Never gallops
    NoGallop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Distribution {
    /// Independent uniform random values
    Uniform,
    /// A random permutation of `0..size`
    Permutation,
    /// Uniform random values drawn from a tiny range, so runs are short and
    /// ties are common
    FewUnique,
    /// Already sorted ascending, the best case for galloping
    SortedAscending,
    /// Sorted descending, the single-run-reversal edge case
    SortedDescending,
    /// `sqrt(size)` concatenated ascending runs of random values
    RandomRuns,
}

impl Distribution {
    fn generate(self, size: usize, rng: &mut impl rand::Rng) -> Vec<u32> {
        use rand_distr::Distribution as _;

        match self {
            Distribution::Uniform => rand_distr::Uniform::new(u32::MIN, u32::MAX)
                .unwrap()
                .sample_iter(rng)
                .take(size)
                .collect(),
            Distribution::Permutation => {
                let mut v: Vec<u32> = (0..size as u32).collect();
                // Fisher-Yates
                for i in (1..v.len()).rev() {
                    let j = rng.random_range(0..=i);
                    v.swap(i, j);
                }
                v
            }
            Distribution::FewUnique => rand_distr::Uniform::new(0u32, 8)
                .unwrap()
                .sample_iter(rng)
                .take(size)
                .collect(),
            Distribution::SortedAscending => {
                let mut v = Distribution::Uniform.generate(size, rng);
                v.sort_unstable();
                v
            }
            Distribution::SortedDescending => {
                let mut v = Distribution::Uniform.generate(size, rng);
                v.sort_unstable_by(|a, b| b.cmp(a));
                v
            }
            Distribution::RandomRuns => {
                let run_len = (size as f64).sqrt().ceil() as usize;
                let mut v = Vec::with_capacity(size);
                while v.len() < size {
                    let remaining = size - v.len();
                    let mut chunk = Distribution::Uniform.generate(run_len.min(remaining), rng);
                    chunk.sort_unstable();
                    v.extend(chunk);
                }
                v
            }
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(clap::ValueEnum::to_possible_value(self).unwrap().get_name())
    }
}

impl std::fmt::Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(clap::ValueEnum::to_possible_value(self).unwrap().get_name())
    }
}

fn sorter_for(policy: Policy) -> fn(&mut [u32]) {
    match policy {
        Policy::Default => adaptive_run_sort::sort::<u32>,
        Policy::TwoRun => |slice| {
            adaptive_run_sort::sort_by_policy::<u32, adaptive_run_sort::TwoRunPolicy>(
                slice,
                &mut |a, b| a < b,
            )
        },
        Policy::NoGallop => |slice| {
            adaptive_run_sort::sort_by_policy::<u32, adaptive_run_sort::NoGallopPolicy>(
                slice,
                &mut |a, b| a < b,
            )
        },
    }
}

fn main() {
    let Args {
        policy,
        distribution,
        runs,
        size,
        seed,
    } = Args::parse();

    println!("Sorting under policy: {policy} (distribution: {distribution})");
    println!("Runs: {runs}, slice size: {size}");

    let mut rng = match seed {
        Some(partial_seed) => rand::rngs::StdRng::seed_from_u64(partial_seed),
        None => {
            println!("No seed provided, generating one using system rng");
            rand::rngs::StdRng::from_os_rng()
        }
    };

    let sorter = sorter_for(policy);
    let mut stats: rolling_stats::Stats<f64> = rolling_stats::Stats::new();
    let bar = indicatif::ProgressBar::new(runs as u64);

    for run in 0..=runs {
        let mut data = distribution.generate(size, &mut rng);

        let now = std::time::Instant::now();
        sorter(std::hint::black_box(&mut data));
        let elapsed = now.elapsed();

        debug_assert!(data.is_sorted(), "result is not sorted after bench run");

        // Skip the first sample: it includes whatever one-time setup cost
        // the allocator or branch predictor pays on a cold run.
        if run != 0 {
            stats.update(elapsed.as_millis() as f64);
            bar.inc(1);
        }
    }

    bar.finish();
    println!("Stats: {stats:?}");
}
