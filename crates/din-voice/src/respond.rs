//! Response capture: typed answers or spoken answers through STT.

use crate::recorder::Recorder;
use crate::stt::SttBackend;
use din_core::{DinError, DinResult, ResponseCapturer};
use std::io::{BufRead, Write};
use tracing::{debug, info};

/// Reads one answer per line from a text source (stdin by default).
pub struct CliResponder {
    input: Box<dyn BufRead>,
    prompt: String,
}

impl CliResponder {
    pub fn stdin() -> Self {
        Self::new(Box::new(std::io::BufReader::new(std::io::stdin())))
    }

    pub fn new(input: Box<dyn BufRead>) -> Self {
        Self {
            input,
            prompt: "What did you hear? ".to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

impl ResponseCapturer for CliResponder {
    fn respond(&mut self) -> DinResult<String> {
        let mut stderr = std::io::stderr();
        // Prompt failures do not affect the answer.
        let _ = write!(stderr, "{}", self.prompt);
        let _ = stderr.flush();

        // A closed or unreadable input cannot answer any later trial either.
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(DinError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "answer input closed",
            )));
        }
        Ok(line.trim().to_string())
    }
}

/// Records a spoken answer and transcribes it.
pub struct SpeechResponder {
    recorder: Recorder,
    stt: Box<dyn SttBackend>,
}

impl SpeechResponder {
    pub fn new(recorder: Recorder, stt: Box<dyn SttBackend>) -> Self {
        info!("Speech responses via {} STT", stt.name());
        Self { recorder, stt }
    }
}

impl ResponseCapturer for SpeechResponder {
    fn respond(&mut self) -> DinResult<String> {
        let clip = self.recorder.listen()?;
        if clip.is_empty() {
            return Ok(String::new());
        }
        let text = self.stt.transcribe(&clip)?;
        debug!(transcript = %text, "transcribed response");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_one_trimmed_line_per_trial() {
        let mut r = CliResponder::new(Box::new(Cursor::new("4 2 9\n  one two\n")));
        assert_eq!(r.respond().unwrap(), "4 2 9");
        assert_eq!(r.respond().unwrap(), "one two");
    }

    #[test]
    fn blank_line_is_an_empty_answer() {
        let mut r = CliResponder::new(Box::new(Cursor::new("\n")));
        assert_eq!(r.respond().unwrap(), "");
    }

    #[test]
    fn closed_input_ends_the_run() {
        let mut r = CliResponder::new(Box::new(Cursor::new("4 2 9\n")));
        assert_eq!(r.respond().unwrap(), "4 2 9");
        let err = r.respond().unwrap_err();
        assert!(err.is_fatal());
        match err {
            DinError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
