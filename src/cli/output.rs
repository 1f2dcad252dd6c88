use crate::envelope::Envelope;
use anyhow::Result;
use std::io::Write;

/// Successful envelopes go to stdout, failed ones to stderr.
pub fn emit_envelope(envelope: &Envelope, compact: bool, quiet: bool) -> Result<()> {
    if envelope.is_success() {
        if quiet {
            return Ok(());
        }
        let stdout = std::io::stdout();
        write_json(&mut stdout.lock(), envelope, compact)
    } else {
        let stderr = std::io::stderr();
        write_json(&mut stderr.lock(), envelope, compact)
    }
}

fn write_json<W: Write>(handle: &mut W, envelope: &Envelope, compact: bool) -> Result<()> {
    if compact {
        serde_json::to_writer(&mut *handle, envelope)?;
    } else {
        serde_json::to_writer_pretty(&mut *handle, envelope)?;
    }
    handle.write_all(b"\n")?;
    Ok(())
}
