//! Where response lines end up.

use crate::line::Line;
use crate::runner::{CommandReport, EndReason, LineSink};
use std::io::{self, Write};

/// Width of the key column in verbose output.
const KEY_WIDTH: usize = 12;

/// Writes responses to stdout or a file.
///
/// `quiet` drops response lines; `verbose` prints settings and labels every
/// command and response. `quiet` wins when both are set.
#[derive(Debug)]
pub struct OutputSink<W: Write> {
    writer: W,
    quiet: bool,
    verbose: bool,
}

impl<W: Write> OutputSink<W> {
    pub fn new(writer: W, quiet: bool, verbose: bool) -> Self {
        Self {
            writer,
            quiet,
            verbose: verbose && !quiet,
        }
    }

    /// Print `key = value` pairs when verbose.
    pub fn write_settings<K, V>(&mut self, entries: &[(K, V)]) -> io::Result<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if !self.verbose {
            return Ok(());
        }
        for (key, value) in entries {
            self.labelled(key.as_ref(), value.as_ref())?;
        }
        self.writer.flush()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn labelled(&mut self, key: &str, value: &str) -> io::Result<()> {
        writeln!(self.writer, "{key:<width$} = {value}", width = KEY_WIDTH)
    }
}

impl<W: Write> LineSink for OutputSink<W> {
    fn command(&mut self, command: &str) -> io::Result<()> {
        if self.verbose {
            self.labelled("command", command)?;
        }
        Ok(())
    }

    fn line(&mut self, line: &Line) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        if self.verbose {
            self.labelled("response", &line.text())
        } else {
            writeln!(self.writer, "{line}")
        }
    }

    fn finished(&mut self, report: &CommandReport) -> io::Result<()> {
        if self.verbose && report.end == EndReason::TimedOut {
            self.labelled("response", "<timeout>")?;
        }
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn report(end: EndReason) -> CommandReport {
        CommandReport {
            command: "ID".to_string(),
            lines: 1,
            end,
            short_write: None,
        }
    }

    fn exchange(sink: &mut OutputSink<Vec<u8>>, end: EndReason) {
        sink.command("ID").unwrap();
        sink.line(&Line::from("MODEL-7")).unwrap();
        sink.finished(&report(end)).unwrap();
    }

    #[test]
    fn test_plain_output() {
        let mut sink = OutputSink::new(Vec::new(), false, false);
        exchange(&mut sink, EndReason::TimedOut);
        assert_eq!(String::from_utf8(sink.into_inner()).unwrap(), "MODEL-7\n");
    }

    #[test]
    fn test_verbose_output() {
        let mut sink = OutputSink::new(Vec::new(), false, true);
        sink.write_settings(&[("port", "/dev/ttyS0"), ("baudrate", "9600")])
            .unwrap();
        exchange(&mut sink, EndReason::TimedOut);
        assert_eq!(
            String::from_utf8(sink.into_inner()).unwrap(),
            "port         = /dev/ttyS0\n\
             baudrate     = 9600\n\
             command      = ID\n\
             response     = MODEL-7\n\
             response     = <timeout>\n"
        );
    }

    #[test]
    fn test_verbose_limit_reached_has_no_timeout_marker() {
        let mut sink = OutputSink::new(Vec::new(), false, true);
        exchange(&mut sink, EndReason::LimitReached);
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(!out.contains("<timeout>"));
    }

    #[test]
    fn test_quiet_suppresses_responses() {
        let mut sink = OutputSink::new(Vec::new(), true, false);
        exchange(&mut sink, EndReason::TimedOut);
        assert!(sink.into_inner().is_empty());
    }

    #[test]
    fn test_quiet_overrides_verbose() {
        let mut sink = OutputSink::new(Vec::new(), true, true);
        sink.write_settings(&[("device", "/dev/ttyS0")]).unwrap();
        exchange(&mut sink, EndReason::TimedOut);
        assert!(sink.into_inner().is_empty());
    }
}
