#![forbid(unsafe_code)]

use xrandr_cycle::CycleError;
use xrandr_cycle::util::OutputIntegration;

fn report_fatal(error: &CycleError, integration: &OutputIntegration) {
    if !integration.should_emit_json() {
        eprintln!("{error}");
        return;
    }
    let payload = serde_json::json!({
        "command": "cycle",
        "status": "error",
        "error": error.to_string(),
        "exit_code": error.exit_code(),
        "integration": integration,
    });
    eprintln!("{payload}");
}

fn main() {
    xrandr_cycle::init_tracing();
    let integration = OutputIntegration::detect();
    if let Err(error) = xrandr_cycle::run_from_env() {
        tracing::debug!(exit_code = error.exit_code(), "run finished with error");
        report_fatal(&error, &integration);
        std::process::exit(error.exit_code());
    }
}
