mod config;
mod error;
mod logging;

use config::{Cli, Effective};

mod cmd;

#[tokio::main]
async fn main() {
    if std::env::args_os().len() > 1 {
        eprintln!("Error: fleet-ingestor takes no arguments, configure it through the environment");
        std::process::exit(1);
    }

    // .env дополняет окружение процесса и не перекрывает уже заданное.
    let dotenv = dotenvy::dotenv();

    let cli = match Cli::from_env() {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };
    logging::init(cli.args.log_format);

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => tracing::warn!("no .env found, using process environment"),
        Err(e) => tracing::warn!(error = %e, ".env not loaded, using process environment"),
    }

    let eff = match Effective::new(&cli.args) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = cmd::serve::run(eff).await {
        tracing::error!(error = %e, "ingestor failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
