use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
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
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 20] = [
        "RUST_LOG",
        "TOPUP_HOST",
        "TOPUP_PORT",
        "TOPUP_DATABASE_URL",
        "TOPUP_RETURN_URL",
        "TOPUP_CASHFREE_CLIENT_ID",
        "TOPUP_CASHFREE_ENVIRONMENT",
        "TOPUP_CASHFREE_API_VERSION",
        "TOPUP_CASHFREE_BASE_URL",
        "TOPUP_DEDUCTION_AMOUNT",
        "TOPUP_DEDUCTION_TIME",
        "TOPUP_DEDUCTION_UTC_OFFSET",
        "TOPUP_POLL_INTERVAL",
        "TOPUP_MIN_ORDER_AGE",
        "TOPUP_MAX_PENDING_AGE",
        "TOPUP_GATEWAY_TIMEOUT",
        "TOPUP_POLL_CONCURRENCY",
        "TOPUP_PLAN_BONUSES",
        "TOPUP_RECONCILE_RETRIES",
        "TOPUP_DISABLE_WORKERS",
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
