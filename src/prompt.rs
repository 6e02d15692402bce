//! Interactive input.
//!
//! Each prompt repeats until its validator accepts the answer. The reader
//! and writer are parameters so tests can drive the loop with in-memory
//! buffers.

use crate::error::ValidationError;
use std::io::{self, BufRead, IsTerminal, Write};

/// Ask `question` until `validate` accepts the answer.
///
/// Rejections are written back to `out` and the question is asked again.
/// Fails only when input ends or on an I/O error.
pub fn ask_until<T, R, W>(
    input: &mut R,
    out: &mut W,
    question: &str,
    validate: impl Fn(&str) -> Result<T, ValidationError>,
) -> io::Result<T>
where
    R: BufRead,
    W: Write,
{
    loop {
        write!(out, "{question}")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        match validate(line.trim_end_matches(['\r', '\n'])) {
            Ok(value) => return Ok(value),
            Err(e) => writeln!(out, "{e}.  Please try again.")?,
        }
    }
}

/// Non-empty answer.
pub fn non_empty(s: &str) -> Result<String, ValidationError> {
    let s = s.trim();
    if s.is_empty() {
        Err(ValidationError::Empty)
    } else {
        Ok(s.to_string())
    }
}

/// Read a password, masked when stdin is a terminal.
///
/// Outside a terminal (pipes, IDE consoles) the answer is read as a plain
/// line, since masking there tends to hang.
pub fn ask_password(question: &str) -> io::Result<String> {
    if io::stdin().is_terminal() {
        rpassword::prompt_password(question)
    } else {
        let stdin = io::stdin();
        ask_until(&mut stdin.lock(), &mut io::stdout(), question, |s| Ok(s.to_string()))
    }
}
