//! Interactive prompts.

use std::io::{self, BufRead, Write};

/// Prompts the user for a yes/no confirmation on stdin.
///
/// Accepts 'y', 'yes', 'n', 'no' (case insensitive).
/// Empty input is treated as 'no'.
pub fn prompt_confirmation(prompt: &str) -> io::Result<bool> {
    let stdin = io::stdin();
    prompt_confirmation_from(&mut stdin.lock(), &mut io::stderr(), prompt)
}

/// [`prompt_confirmation`] over arbitrary streams.
///
/// End of input counts as 'no'.
pub fn prompt_confirmation_from<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> io::Result<bool> {
    loop {
        write!(output, "{prompt} (y/N): ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" | "" => return Ok(false),
            _ => writeln!(output, "Please enter 'y' for yes or 'n' for no.")?,
        }
    }
}
