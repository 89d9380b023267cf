use apimon_core::engine::optimize_for_load;

pub fn run_suggest(count: usize) {
    println!(
        "suggested concurrency for {} interface(s): {}",
        count,
        optimize_for_load(count)
    );
}
