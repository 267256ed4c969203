//! Rule discovery (`posrec rules`).

use anyhow::Result;
use posrec::FormatRule;

/// List every format rule with its code.
pub fn handle() -> Result<()> {
    println!("Available format rules (use the code or the name in 'formatacao', separated by ';'):");
    for rule in FormatRule::ALL {
        println!("  {} {:<20} {}", rule.code(), rule.name(), rule.description());
    }
    Ok(())
}
