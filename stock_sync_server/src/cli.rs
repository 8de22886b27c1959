use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // Any argument at all gets the help text
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
    // Secrets (HMAC secret, admin access token) are deliberately absent from this list
    const DISPLAY_ENVS: [&str; 14] = [
        "RUST_LOG",
        "SSG_HOST",
        "SSG_PORT",
        "SSG_DATABASE_URL",
        "SSG_SHOPIFY_SHOP",
        "SSG_SHOPIFY_API_VERSION",
        "SSG_SHOPIFY_HMAC_CHECKS",
        "SSG_SHOPIFY_IP_WHITELIST",
        "SSG_SHOPIFY_REQUEST_TIMEOUT_SECS",
        "SSG_USE_X_FORWARDED_FOR",
        "SSG_USE_FORWARDED",
        "SSG_RECONCILE_INTERVAL_SECS",
        "SSG_ADJUSTMENT_TIMEOUT_SECS",
        "SSG_ADJUSTMENT_CONCURRENCY",
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
