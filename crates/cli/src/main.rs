use std::process::ExitCode;

fn main() -> ExitCode {
    fleetgate_cli::run()
}
