use std::{env, env::VarError};

/// The server takes no arguments. Any argument prints the help text and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // SOLUPI_PRIVATE_KEY, SOLUPI_EXCHANGE_RATE_API_KEY and SOLUPI_WEBHOOK_SECRET are deliberately absent
    const DISPLAY_ENVS: [&str; 18] = [
        "RUST_LOG",
        "SOLUPI_HOST",
        "SOLUPI_PORT",
        "SOLUPI_DATABASE_URL",
        "SOLUPI_USD_TO_INR_RATE",
        "SOLUPI_PAYMENT_TOLERANCE",
        "SOLUPI_MARKUP_PERCENT",
        "SOLUPI_RECONCILE_AFTER_MINS",
        "SOLUPI_WEBHOOK_HMAC_CHECKS",
        "SOLUPI_MAILDIR",
        "SOLUPI_MAIL_SENDER_FILTER",
        "SOLUPI_MAIL_LOOKBACK_HOURS",
        "SOLUPI_MAIL_POLL_SECS",
        "SOLUPI_SKIP_BACKFILL",
        "SOLUPI_NETWORK",
        "SOLUPI_RPC_URL",
        "SOLUPI_RPC_TIMEOUT_SECS",
        "SOLUPI_USDC_MINT",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
