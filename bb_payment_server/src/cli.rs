use std::env::{self, VarError};

const HELP: &str = include_str!("./cli-help.txt");

/// Non-secret settings that are safe to echo to a terminal.
const DISPLAY_ENVS: [&str; 14] = [
    "RUST_LOG",
    "BB_HOST",
    "BB_PORT",
    "BB_DATABASE_URL",
    "BB_RAZORPAY_KEY_ID",
    "BB_RAZORPAY_API_URL",
    "BB_RAZORPAY_TIMEOUT_MS",
    "BB_ADMIN_AUTH",
    "BB_STORE_TIMEOUT_MS",
    "BB_NOTIFY_QUEUE_SIZE",
    "BB_NOTIFY_MAX_ATTEMPTS",
    "BB_NOTIFY_BACKOFF_MS",
    "BB_USE_X_FORWARDED_FOR",
    "BB_USE_FORWARDED",
];

/// The server has no command line options. Any argument at all prints the help text and the current (non-secret)
/// configuration. Returns true if it did so, in which case the server should not start.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        println!("\n{} v{}\n\n{HELP}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        print_envs();
    }
    has_cli_args
}

fn print_envs() {
    println!("Current environment values (EXCLUDING variables that contain secrets):");
    for name in DISPLAY_ENVS {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<28} {val}");
    }
}
