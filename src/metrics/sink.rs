//! Record sink - the single CSV writer shared by the reporter loop and the
//! run controller
//!
//! Every write holds the lock across write and flush, so rows never
//! interleave and each row is on the destination before the lock is released.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use parking_lot::Mutex;

use super::record::MetricRecord;
use crate::config::OutputTarget;
use crate::utils::{BenchmarkError, Result};

struct SinkState {
    writer: csv::Writer<Box<dyn Write + Send>>,
    records_written: u64,
    closed: bool,
}

pub struct RecordSink {
    state: Mutex<SinkState>,
}

impl RecordSink {
    /// Open the configured destination, truncating an existing file
    pub fn open(target: &OutputTarget) -> Result<Self> {
        let out: Box<dyn Write + Send> = match target {
            OutputTarget::Stdout => Box::new(io::stdout()),
            OutputTarget::File(path) => Box::new(BufWriter::new(File::create(path)?)),
        };
        Ok(Self::from_boxed(out))
    }

    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self::from_boxed(Box::new(writer))
    }

    fn from_boxed(out: Box<dyn Write + Send>) -> Self {
        Self {
            state: Mutex::new(SinkState {
                writer: csv::Writer::from_writer(out),
                records_written: 0,
                closed: false,
            }),
        }
    }

    /// Write the column header row
    pub fn write_header(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(BenchmarkError::SinkClosed);
        }
        state.writer.write_record(MetricRecord::HEADER)?;
        state.writer.flush()?;
        Ok(())
    }

    /// Write and flush one record
    pub fn write(&self, record: &MetricRecord) -> Result<()> {
        let mut state = self.state.lock();
        Self::write_locked(&mut state, record)
    }

    /// Write the final record; later writes fail with `SinkClosed`
    pub fn close_with(&self, record: &MetricRecord) -> Result<()> {
        let mut state = self.state.lock();
        Self::write_locked(&mut state, record)?;
        state.closed = true;
        Ok(())
    }

    fn write_locked(state: &mut SinkState, record: &MetricRecord) -> Result<()> {
        if state.closed {
            return Err(BenchmarkError::SinkClosed);
        }
        state.writer.write_record(record.to_csv_row())?;
        state.writer.flush()?;
        state.records_written += 1;
        Ok(())
    }

    /// Data rows written so far (header excluded)
    pub fn records_written(&self) -> u64 {
        self.state.lock().records_written
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::{self, Write};
    use std::sync::Arc;

    use parking_lot::Mutex;

    /// In-memory destination that stays readable after the sink takes it
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }

        /// Parsed rows, header included
        pub(crate) fn rows(&self) -> Vec<Vec<String>> {
            self.contents()
                .lines()
                .map(|l| l.split(',').map(str::to_string).collect())
                .collect()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Destination that accepts `rows_ok` lines and fails every write after them
    pub(crate) struct FailAfterLines {
        buffer: SharedBuffer,
        rows_ok: usize,
        lines: usize,
    }

    impl FailAfterLines {
        pub(crate) fn new(buffer: SharedBuffer, rows_ok: usize) -> Self {
            Self {
                buffer,
                rows_ok,
                lines: 0,
            }
        }
    }

    impl Write for FailAfterLines {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.lines >= self.rows_ok {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.lines += buf.iter().filter(|b| **b == b'\n').count();
            self.buffer.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Destination whose every write fails
    pub(crate) struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink unavailable"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink unavailable"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{BrokenWriter, SharedBuffer};
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_header_and_rows() {
        let buffer = SharedBuffer::default();
        let sink = RecordSink::from_writer(buffer.clone());

        sink.write_header().unwrap();
        sink.write(&MetricRecord::start("run-1", None)).unwrap();
        sink.write(&MetricRecord::metric("run-1", 10, Duration::from_secs(1)))
            .unwrap();

        let rows = buffer.rows();
        assert_eq!(rows[0], MetricRecord::HEADER);
        assert_eq!(rows[1][2], "start");
        assert_eq!(rows[2][2], "metric");
        assert_eq!(rows[2][4], "100.000");
        assert_eq!(sink.records_written(), 2);
    }

    #[test]
    fn test_closed_sink_rejects_writes() {
        let sink = RecordSink::from_writer(SharedBuffer::default());

        sink.close_with(&MetricRecord::end("run-1")).unwrap();
        assert!(sink.is_closed());
        assert!(matches!(
            sink.write(&MetricRecord::metric("run-1", 1, Duration::from_secs(1))),
            Err(BenchmarkError::SinkClosed)
        ));
        assert_eq!(sink.records_written(), 1);
    }

    #[test]
    fn test_broken_destination_is_an_error() {
        let sink = RecordSink::from_writer(BrokenWriter);
        assert!(sink.write_header().is_err());
        assert!(sink.write(&MetricRecord::start("run-1", None)).is_err());
    }

    #[test]
    fn test_concurrent_writers_do_not_interleave() {
        let buffer = SharedBuffer::default();
        let sink = Arc::new(RecordSink::from_writer(buffer.clone()));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for _ in 0..50 {
                        sink.write(&MetricRecord::metric(
                            &format!("run-{}", i),
                            7,
                            Duration::from_secs(1),
                        ))
                        .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let rows = buffer.rows();
        assert_eq!(rows.len(), 200);
        assert!(rows.iter().all(|r| r.len() == 7 && r[3] == "7"));
    }

    #[test]
    fn test_open_file_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let sink = RecordSink::open(&OutputTarget::File(path.clone())).unwrap();
        sink.write_header().unwrap();
        sink.close_with(&MetricRecord::end("run-1")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "_time,uuid,type,count,avg_time_ms,interval,info");
        assert!(lines[1].contains(",run-1,end,"));
    }

    #[test]
    fn test_open_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        assert!(matches!(
            RecordSink::open(&OutputTarget::File(path)),
            Err(BenchmarkError::Io(_))
        ));
    }
}
