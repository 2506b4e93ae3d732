use crate::messages::Intent;
use anyhow::{Context, Result};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Turns typed commands into intents
///
/// Slots are numbered from 1 on the command line and default to the first
/// slot when omitted:
/// - `record [n]` / `r`: start or stop recording
/// - `discard [n]` / `d`: throw away the recording in progress
/// - `play [n]` / `p`: play the recorded sound
/// - `preloaded` / `k`: play the preloaded sound
/// - `stop` / `s`, `list` / `l`, `quit` / `q`
pub struct IntentParser {
    pattern: Regex,
}

impl Default for IntentParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentParser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?i)^\s*([a-z]+)(?:\s+(\d+))?\s*$").unwrap(),
        }
    }

    pub fn parse(&self, line: &str) -> Result<Intent> {
        let caps = self
            .pattern
            .captures(line)
            .with_context(|| format!("Unrecognized command: {:?}", line.trim()))?;

        let command = caps[1].to_lowercase();
        let slot = match caps.get(2) {
            Some(n) => {
                let n: usize = n.as_str().parse().context("Slot number out of range")?;
                n.checked_sub(1).context("Slots are numbered from 1")?
            }
            None => 0,
        };

        let intent = match command.as_str() {
            "record" | "r" => Intent::ToggleCapture(slot),
            "discard" | "d" => Intent::DiscardCapture(slot),
            "play" | "p" => Intent::PlaySlot(slot),
            "preloaded" | "k" => Intent::PlayPreloaded,
            "stop" | "s" => Intent::Stop,
            "list" | "l" => Intent::ListRecordings,
            "quit" | "q" => Intent::Quit,
            other => anyhow::bail!("Unknown command: {}", other),
        };
        Ok(intent)
    }
}

/// Forward stdin commands until EOF, which is treated as a quit
pub async fn read_intents(tx: mpsc::Sender<Intent>) -> Result<()> {
    let parser = IntentParser::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        match parser.parse(&line) {
            Ok(intent) => {
                tracing::debug!("Intent: {:?}", intent);
                if tx.send(intent).await.is_err() {
                    return Ok(());
                }
            }
            Err(e) => tracing::warn!("{}", e),
        }
    }

    let _ = tx.send(Intent::Quit).await;
    Ok(())
}
