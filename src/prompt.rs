//! Interactive operator input.

use std::io::{self, BufRead, Write};

/// Source of operator answers. Returns `None` on end of input.
pub trait Prompt {
    fn ask(&mut self, question: &str) -> io::Result<Option<String>>;
}

/// Asks on stderr, reads one line from stdin.
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        let mut stderr = io::stderr().lock();
        write!(stderr, "{question}: ")?;
        stderr.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

#[cfg(test)]
pub(crate) struct ScriptedPrompt {
    answer: Option<String>,
    pub asked: usize,
}

#[cfg(test)]
impl ScriptedPrompt {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            asked: 0,
        }
    }

    pub fn silent() -> Self {
        Self {
            answer: None,
            asked: 0,
        }
    }
}

#[cfg(test)]
impl Prompt for ScriptedPrompt {
    fn ask(&mut self, _question: &str) -> io::Result<Option<String>> {
        self.asked += 1;
        Ok(self.answer.clone())
    }
}
