//! [libs/infra/connectors/src/ndjson.rs]
//! Minimal line-delimited JSON reader over a streaming HTTP response body,
//! shared by the intent feed and behavior feed connectors (§6).

use reqwest::Response;

use crate::errors::ConnectorError;

/// Pulls one complete line out of `buffer` if one is present, leaving any
/// remainder in place. Kept free of I/O so it is unit-testable without a
/// live HTTP response.
fn extract_line(buffer: &mut String) -> Option<String> {
    loop {
        let newline_at = buffer.find('\n')?;
        let line = buffer[..newline_at].trim_end_matches('\r').to_string();
        buffer.drain(..=newline_at);
        if !line.is_empty() {
            return Some(line);
        }
    }
}

pub struct LineStream {
    response: Response,
    buffer: String,
}

impl LineStream {
    pub fn new(response: Response) -> Self {
        Self { response, buffer: String::new() }
    }

    /// Returns the next complete line, pulling more bytes off the wire as
    /// needed. `Ok(None)` means the body ended cleanly.
    pub async fn next_line(&mut self) -> Result<Option<String>, ConnectorError> {
        loop {
            if let Some(line) = extract_line(&mut self.buffer) {
                return Ok(Some(line));
            }

            match self.response.chunk().await? {
                Some(bytes) => {
                    self.buffer.push_str(&String::from_utf8_lossy(&bytes));
                }
                None => {
                    let trimmed = self.buffer.trim().to_string();
                    self.buffer.clear();
                    return Ok(if trimmed.is_empty() { None } else { Some(trimmed) });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_complete_lines_and_leaves_the_remainder_buffered() {
        let mut buffer = "{\"a\":1}\n{\"b\":2}\n{\"c\"".to_string();
        assert_eq!(extract_line(&mut buffer), Some("{\"a\":1}".to_string()));
        assert_eq!(extract_line(&mut buffer), Some("{\"b\":2}".to_string()));
        assert_eq!(extract_line(&mut buffer), None);
        assert_eq!(buffer, "{\"c\"");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut buffer = "\n\n{\"a\":1}\n".to_string();
        assert_eq!(extract_line(&mut buffer), Some("{\"a\":1}".to_string()));
    }
}
