//! `marchsim` binary entry point.

mod cli;

fn main() -> anyhow::Result<()> {
    cli::run()
}
