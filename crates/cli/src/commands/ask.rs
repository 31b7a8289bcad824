//! `neo <MESSAGE>`: one exchange, no session.

use neo_agent::AgentRunner;
use neo_config::AppConfig;
use std::io::Write;

pub async fn run(config: &AppConfig, message: &str, debug: bool) -> Result<(), Box<dyn std::error::Error>> {
    let provider = neo_providers::build_from_config(config)?;
    let runner = AgentRunner::from_config(provider, config).with_debug(debug);

    let reply = runner
        .run_once(message)
        .await
        .map_err(|e| format!("LLM request failed: {e}"))?;

    let mut stdout = std::io::stdout().lock();
    write_reply(&mut stdout, &reply)?;
    stdout.flush()?;
    Ok(())
}

/// Write a reply followed by a newline; an empty reply writes nothing.
fn write_reply(out: &mut impl Write, reply: &str) -> std::io::Result<()> {
    if reply.is_empty() {
        return Ok(());
    }
    out.write_all(reply.as_bytes())?;
    if !reply.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    Ok(())
}
