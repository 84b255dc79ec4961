use rstest::*;

#[fixture]
pub fn setup_log() {
    // Tests share one process, only the first init wins.
    let _ = stderrlog::new().module("gochan").verbosity(3).init();
}
