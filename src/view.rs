use crate::index::IndexRecord;
use crate::messages::{CaptureState, PlayState, Snapshot};
use std::fmt::Write;
use tokio::sync::watch;

/// Render the board as the buttons it would show
pub fn render(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    for slot in &snapshot.slots {
        let label = match slot.capture_state {
            CaptureState::Idle => "Start Recording",
            CaptureState::Capturing => "Stop Recording",
        };
        let _ = writeln!(out, "[{}] {}", slot.id + 1, label);
        if slot.locator.is_some() {
            let _ = writeln!(out, "[{}] Play Recorded Sound", slot.id + 1);
        }
    }
    let _ = writeln!(out, "    Play Preloaded Sound");

    if let (PlayState::Playing, Some(locator)) = (snapshot.play_state, &snapshot.active_locator) {
        let _ = writeln!(out, "Now playing: {}", locator);
    }

    out
}

pub fn render_recordings(records: &[IndexRecord]) -> String {
    if records.is_empty() {
        return "No saved recordings\n".to_string();
    }

    records.iter().fold(String::new(), |mut out, record| {
        let _ = writeln!(out, "#{} slot {}: {}", record.id, record.slot + 1, record.locator);
        out
    })
}

/// Print the board every time the controller publishes a new snapshot
pub async fn present(mut state_rx: watch::Receiver<Snapshot>) {
    print!("{}", render(&state_rx.borrow_and_update()));
    while state_rx.changed().await.is_ok() {
        let screen = render(&state_rx.borrow_and_update());
        print!("{}", screen);
    }
}
