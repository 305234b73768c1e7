use std::process::ExitCode;

fn main() -> ExitCode {
    leadly_cli::run()
}
