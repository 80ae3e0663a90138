use lazy_static::lazy_static;
pub use prometheus::{Histogram, HistogramOpts, HistogramTimer, IntCounter, Opts, Result};

/// Attempts to create an `IntCounter`, returning `Err` if the registry does not accept the
/// counter (potentially due to naming conflict).
pub fn try_create_int_counter(name: &str, help: &str) -> Result<IntCounter> {
    let opts = Opts::new(name, help);
    let counter = IntCounter::with_opts(opts)?;
    prometheus::register(Box::new(counter.clone()))?;
    Ok(counter)
}

/// Attempts to create a `Histogram`, returning `Err` if the registry does not accept the
/// histogram (potentially due to naming conflict).
pub fn try_create_histogram(name: &str, help: &str) -> Result<Histogram> {
    let opts = HistogramOpts::new(name, help);
    let histogram = Histogram::with_opts(opts)?;
    prometheus::register(Box::new(histogram.clone()))?;
    Ok(histogram)
}

pub fn inc_counter(counter: &Result<IntCounter>) {
    if let Ok(counter) = counter {
        counter.inc();
    }
}

pub fn inc_counter_by(counter: &Result<IntCounter>, value: u64) {
    if let Ok(counter) = counter {
        counter.inc_by(value);
    }
}

/// Starts a timer for the given `Histogram`, stopping when it gets dropped.
pub fn start_timer(histogram: &Result<Histogram>) -> Option<HistogramTimer> {
    histogram.as_ref().ok().map(Histogram::start_timer)
}

lazy_static! {
    pub static ref SLASHER_ATTESTATION_CHECK_TIME: Result<Histogram> = try_create_histogram(
        "slasher_attestation_check_seconds",
        "Time taken to check and record an indexed attestation"
    );
    pub static ref SLASHER_BLOCK_CHECK_TIME: Result<Histogram> = try_create_histogram(
        "slasher_block_check_seconds",
        "Time taken to check and record a block header"
    );
    pub static ref SLASHER_PRUNE_TIME: Result<Histogram> = try_create_histogram(
        "slasher_prune_seconds",
        "Time taken to prune the slasher database"
    );
    pub static ref SLASHER_NUM_ATTESTATIONS_PROCESSED: Result<IntCounter> = try_create_int_counter(
        "slasher_attestations_processed_total",
        "Number of indexed attestations checked"
    );
    pub static ref SLASHER_NUM_BLOCKS_PROCESSED: Result<IntCounter> = try_create_int_counter(
        "slasher_blocks_processed_total",
        "Number of block headers checked"
    );
    pub static ref SLASHER_NUM_ATTESTER_SLASHINGS: Result<IntCounter> = try_create_int_counter(
        "slasher_attester_slashings_total",
        "Number of attester slashings found"
    );
    pub static ref SLASHER_NUM_PROPOSER_SLASHINGS: Result<IntCounter> = try_create_int_counter(
        "slasher_proposer_slashings_total",
        "Number of proposer slashings found"
    );
    pub static ref SLASHER_NUM_STALE_INPUTS: Result<IntCounter> = try_create_int_counter(
        "slasher_stale_inputs_total",
        "Number of attestations and blocks rejected for falling outside the history window"
    );
    pub static ref SLASHER_SPAN_CACHE_HITS: Result<IntCounter> = try_create_int_counter(
        "slasher_span_cache_hits_total",
        "Number of epoch span maps served from the cache"
    );
    pub static ref SLASHER_SPAN_CACHE_MISSES: Result<IntCounter> = try_create_int_counter(
        "slasher_span_cache_misses_total",
        "Number of epoch span maps loaded from the database"
    );
}
