use job_shell::{Config, Interpreter};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config: Config = argh::from_env();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let code = Interpreter::new(config)?.repl()?;
    std::process::exit(code)
}
