use std::process::ExitCode;

fn main() -> ExitCode {
    reserva_cli::run()
}
