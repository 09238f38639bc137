//! The `testdesk init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    let path = std::path::Path::new("testdesk.toml");
    if path.exists() {
        println!("testdesk.toml already exists, skipping.");
    } else {
        std::fs::write(path, SAMPLE_CONFIG)?;
        println!("Created testdesk.toml");
    }

    println!("\nNext steps:");
    println!("  1. Point base_url in testdesk.toml at your LMS API");
    println!("  2. Run: testdesk login --email you@example.com");
    println!("  3. Run: testdesk tests");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# testdesk configuration

# Base URL of the LMS REST API. ${VAR} references are expanded.
base_url = "http://127.0.0.1:8000/api"

# Per-request timeout in seconds.
timeout_secs = 10

# Where the access/refresh tokens are kept.
# token_file = "${HOME}/.config/testdesk/tokens.json"
"#;
