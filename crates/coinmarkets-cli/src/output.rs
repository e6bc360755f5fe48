use std::io::Write;

use serde::Serialize;

use crate::error::CliError;

pub fn render<T: Serialize>(payload: &T, pretty: bool) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    write_json(&mut stdout.lock(), payload, pretty)
}

/// Writes one JSON document followed by a newline. A closed pipe surfaces as
/// `CliError::Io` instead of a panic.
pub fn write_json<W: Write, T: Serialize>(
    out: &mut W,
    payload: &T,
    pretty: bool,
) -> Result<(), CliError> {
    let text = if pretty {
        serde_json::to_string_pretty(payload)?
    } else {
        serde_json::to_string(payload)?
    };
    writeln!(out, "{text}")?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io;

    use serde_json::json;

    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_one_line_per_document() {
        let mut out = Vec::new();
        write_json(&mut out, &json!({ "generation": 3 }), false).expect("writes");
        assert_eq!(String::from_utf8(out).expect("utf8"), "{\"generation\":3}\n");
    }

    #[test]
    fn closed_stdout_maps_to_io_exit_code() {
        let err = write_json(&mut ClosedPipe, &json!({ "generation": 3 }), true)
            .expect_err("write fails");
        assert!(matches!(err, CliError::Io(_)), "got {err:?}");
        assert_eq!(err.exit_code(), 10);
    }
}
