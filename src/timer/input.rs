use std::io::{BufRead, ErrorKind, Write};

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const INPUT_BUFFER: usize = 16;

/// Forwards stdin lines into a channel. Stdin is read on a detached thread so that leaving the
/// application never waits on a pending read.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (sender, receiver) = mpsc::channel(INPUT_BUFFER);
    std::thread::spawn(move || forward_lines(std::io::stdin().lock(), sender));
    receiver
}

/// Sends every line of `reader` without its line ending. Bytes that aren't UTF-8 are replaced
/// instead of ending the input. Must run outside of the async runtime.
fn forward_lines(mut reader: impl BufRead, sender: mpsc::Sender<String>) {
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer) {
            Ok(0) => {
                debug!("Reached end of input");
                break;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buffer);
                let line = line.trim_end_matches(['\n', '\r']);
                if sender.blocking_send(line.to_string()).is_err() {
                    debug!("Input receiver dropped, stopping stdin reader");
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                warn!("Failed reading stdin {e:?}");
                break;
            }
        }
    }
}

/// Asks questions on stdout and reads answers from the input channel. Invalid answers are
/// reported and asked again.
pub struct Prompter<'a> {
    input: &'a mut mpsc::Receiver<String>,
}

impl<'a> Prompter<'a> {
    pub fn new(input: &'a mut mpsc::Receiver<String>) -> Self {
        Self { input }
    }

    async fn line(&mut self, prompt: &str) -> Result<String> {
        print!("{prompt}");
        std::io::stdout().flush()?;
        let line = self
            .input
            .recv()
            .await
            .ok_or_else(|| anyhow!("Input was closed before an answer was given"))?;
        Ok(line.trim().to_string())
    }

    pub async fn non_empty(&mut self, prompt: &str) -> Result<String> {
        loop {
            let line = self.line(prompt).await?;
            if !line.is_empty() {
                return Ok(line);
            }
            println!("Value cannot be empty.");
        }
    }

    /// First character of the answer, or `default` for an empty answer.
    pub async fn letter(&mut self, prompt: &str, default: char) -> Result<char> {
        let line = self.line(prompt).await?;
        Ok(line.chars().next().unwrap_or(default))
    }

    pub async fn count(&mut self, prompt: &str, default: Option<u32>) -> Result<u32> {
        loop {
            let line = self.line(prompt).await?;
            if line.is_empty() {
                if let Some(default) = default {
                    return Ok(default);
                }
            }
            match line.parse::<i64>() {
                Ok(v) if v < 0 => println!("Please enter a non-negative integer."),
                Ok(v) => match u32::try_from(v) {
                    Ok(v) => return Ok(v),
                    Err(_) => println!("Please enter a smaller number."),
                },
                Err(_) => println!("Please enter an integer."),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tokio::sync::mpsc;

    use super::{forward_lines, Prompter};

    async fn channel_with(lines: &[&str]) -> mpsc::Receiver<String> {
        let (sender, receiver) = mpsc::channel(lines.len().max(1));
        for line in lines {
            sender.send(line.to_string()).await.unwrap();
        }
        receiver
    }

    #[tokio::test]
    async fn count_reprompts_until_valid() -> Result<()> {
        let mut input = channel_with(&["abc", "-1", "  3 "]).await;
        let value = Prompter::new(&mut input).count("wrong? ", None).await?;
        assert_eq!(value, 3);
        assert!(input.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn count_uses_default_for_empty_answer() -> Result<()> {
        let mut input = channel_with(&[""]).await;
        assert_eq!(Prompter::new(&mut input).count("n? ", Some(75)).await?, 75);
        Ok(())
    }

    #[tokio::test]
    async fn letter_defaults_and_takes_first_char() -> Result<()> {
        let mut input = channel_with(&["", "xyz"]).await;
        let mut prompter = Prompter::new(&mut input);
        assert_eq!(prompter.letter("exit? ", 'q').await?, 'q');
        assert_eq!(prompter.letter("exit? ", 'q').await?, 'x');
        Ok(())
    }

    #[tokio::test]
    async fn non_empty_skips_blank_lines() -> Result<()> {
        let mut input = channel_with(&["   ", "Physics"]).await;
        assert_eq!(Prompter::new(&mut input).non_empty("subject? ").await?, "Physics");
        Ok(())
    }

    #[tokio::test]
    async fn closed_input_is_an_error() {
        let mut input = channel_with(&[]).await;
        assert!(Prompter::new(&mut input).count("n? ", None).await.is_err());
    }

    #[test]
    fn invalid_utf8_line_keeps_input_open() {
        let (sender, mut receiver) = mpsc::channel(8);
        forward_lines(&b"\n\xffabc\r\n\nq\n1"[..], sender);

        let mut lines = vec![];
        while let Ok(line) = receiver.try_recv() {
            lines.push(line);
        }
        assert_eq!(lines, vec!["", "\u{FFFD}abc", "", "q", "1"]);
    }
}
