//! Signing secret generation.

use anyhow::Result;
use trainportal_auth::TokenIssuer;

use crate::ui;

/// Print a fresh 256-bit signing secret.
///
/// With `quiet`, only the secret itself is printed so it can be captured by
/// a shell.
pub fn run_secret(quiet: bool) -> Result<()> {
    let secret = TokenIssuer::generate_hex_secret();

    if quiet {
        println!("{secret}");
        return Ok(());
    }

    ui::success("Generated signing secret:");
    println!("{secret}");
    ui::info("Set it as auth.jwtSecret or export TRAINPORTAL_JWT_SECRET");
    Ok(())
}
