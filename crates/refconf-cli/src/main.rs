use std::process::ExitCode;

fn main() -> ExitCode {
    refconf_cli::run()
}
