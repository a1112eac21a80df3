//! Terminal render sink
//!
//! Writes the projection to a terminal with crossterm. Author names are coloured from
//! their colour seed so a participant keeps the same colour across sessions.

use std::io::{self, Stdout, Write};

use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};

use parley_core::{name_color_seed, Message, RenderError, RenderSink};

/// Render sink writing one line per message
pub struct TerminalRenderSink<W> {
    out: W,
    colored: bool,
    clear_screen: bool,
}

impl TerminalRenderSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalRenderSink<W> {
    /// Colour on, no screen clearing
    pub fn new(out: W) -> Self {
        Self {
            out,
            colored: true,
            clear_screen: false,
        }
    }

    pub fn colored(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    /// Clear the screen and home the cursor on every redraw
    pub fn clear_screen(mut self, clear_screen: bool) -> Self {
        self.clear_screen = clear_screen;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> RenderSink for TerminalRenderSink<W> {
    fn clear(&mut self) -> Result<(), RenderError> {
        if self.clear_screen {
            queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        }
        Ok(())
    }

    fn append(&mut self, message: &Message) -> Result<(), RenderError> {
        match message.author() {
            Some(author) if self.colored => {
                queue!(
                    self.out,
                    Print(format!("[{}] ", message.timestamp())),
                    SetForegroundColor(author_color(name_color_seed(author))),
                    Print(author),
                    ResetColor,
                    Print(format!(" > {}\n", message.content())),
                )?;
            }
            _ => writeln!(self.out, "{}", message)?,
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), RenderError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Map a colour seed to a terminal colour: low 24 bits as RGB, darkened for contrast
pub fn author_color(seed: u32) -> Color {
    let [_, r, g, b] = seed.to_be_bytes();
    Color::Rgb {
        r: darken(r),
        g: darken(g),
        b: darken(b),
    }
}

fn darken(channel: u8) -> u8 {
    (f32::from(channel) * 0.7) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{render_all, Timestamp};

    fn rendered(sink: TerminalRenderSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_plain_output_uses_message_display() {
        let mut sink = TerminalRenderSink::new(Vec::new()).colored(false);
        let messages = vec![
            Message::new("bob", "hi", Timestamp::new(1)),
            Message::notice("server restarting", Timestamp::new(2)),
        ];
        assert_eq!(render_all(&mut sink, &messages), 2);
        assert_eq!(rendered(sink), "[1] bob > hi\n[2] server restarting\n");
    }

    #[test]
    fn test_colored_output_keeps_text() {
        let mut sink = TerminalRenderSink::new(Vec::new());
        render_all(&mut sink, &[Message::new("bob", "hi", Timestamp::new(1))]);
        let out = rendered(sink);
        assert!(out.starts_with("[1] "));
        assert!(out.contains("bob"));
        assert!(out.ends_with(" > hi\n"));
        assert!(out.contains('\x1b'));
    }

    #[test]
    fn test_clear_only_when_enabled() {
        let mut sink = TerminalRenderSink::new(Vec::new()).colored(false);
        sink.clear().unwrap();
        assert!(rendered(sink).is_empty());

        let mut sink = TerminalRenderSink::new(Vec::new()).clear_screen(true);
        sink.clear().unwrap();
        assert!(!rendered(sink).is_empty());
    }

    #[test]
    fn test_author_color_is_stable_and_darkened() {
        assert_eq!(author_color(0x00FF_8000), Color::Rgb { r: 178, g: 89, b: 0 });
        assert_eq!(
            author_color(name_color_seed("alice")),
            author_color(name_color_seed("alice"))
        );
    }
}
