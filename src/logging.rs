use tracing::Level;

pub fn init_logger(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    // `try_init` so repeated calls (tests, embedding) do not panic
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .try_init();
}
