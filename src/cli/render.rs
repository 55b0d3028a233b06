//! Draws a session in the terminal. Only reads snapshots, all changes
//! to the session go through the controller.
use std::io::{self, Write};

use anyhow::{Result, bail};

use crate::ai::chat::{Message, Notice, Origin, SessionController, SessionSnapshot};
use crate::gemini::Gateway;
use crate::media::MediaSource;

pub struct Renderer<W: Write> {
    out: W,
    // Number of transcript entries already printed
    printed: usize,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, printed: 0 }
    }

    /// Prints every entry that hasn't been printed yet, newest last,
    /// followed by a notice and a busy indicator when relevant.
    pub fn render(&mut self, snapshot: &SessionSnapshot) -> io::Result<()> {
        for msg in snapshot.transcript.iter().skip(self.printed) {
            writeln!(self.out, "{}", format_message(msg))?;
        }
        self.printed = self.printed.max(snapshot.transcript.len());

        if let Some(notice) = &snapshot.notice {
            self.notice(notice)?;
        }
        if snapshot.busy {
            writeln!(self.out, "Thinking...")?;
        }
        self.out.flush()
    }

    pub fn notice(&mut self, notice: &Notice) -> io::Result<()> {
        writeln!(self.out, "⚠ {}", notice)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

pub fn format_message(msg: &Message) -> String {
    match msg.origin() {
        Origin::Bot => format!("🌾 Sahayi: {}", msg.text()),
        Origin::User => match msg.attachment() {
            // Base64 is 4 chars for every 3 bytes
            Some(image) => format!(
                "🧑 You: {} [{}, {} KB]",
                msg.text(),
                image.mime_type,
                image.data.len() * 3 / 4 / 1024
            ),
            None => format!("🧑 You: {}", msg.text()),
        },
    }
}

/// Prints the reply to a single turn session for scripted use. A
/// notice or a turn that never started is returned as an error.
pub fn print_reply<G: Gateway, M: MediaSource>(
    session: &mut SessionController<G, M>,
) -> Result<()> {
    if let Some(notice) = session.take_notice() {
        bail!("{}", notice);
    }
    match session.transcript().last() {
        // The greeting alone means nothing was sent
        Some(msg) if msg.is_bot() && session.transcript().len() > 1 => {
            println!("{}", msg.text());
            Ok(())
        }
        _ => bail!("Nothing was sent"),
    }
}
