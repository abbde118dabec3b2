use env_logger::{Env, Target};

/// Diagnostics go to stderr so stdout carries nothing but records.
pub fn setup_logger() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stderr)
        .init();
}
