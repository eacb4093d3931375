use std::process::ExitCode;

fn main() -> ExitCode {
    qfetch::cli::run()
}
