use gitlog_insights::cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.common.log_level())
        .parse_env("RUST_LOG")
        .format_timestamp(None)
        .init();

    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::debug!("{err:?}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
