use std::{
    io::{self, Write},
    sync::atomic::{AtomicBool, Ordering},
};

use tracing::level_filters::LevelFilter;

/// Set while the terminal is in raw mode, where a bare `\n` does not return the cursor.
static RAW_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_raw_mode(enabled: bool) {
    RAW_MODE.store(enabled, Ordering::Relaxed);
}

/// Installs the global subscriber writing to stderr.
///
/// `verbose` counts `-v` flags: none logs `info` and above, one adds `debug`, two or
/// more add `trace`. `quiet` limits output to warnings and errors.
pub fn init(verbose: u8, quiet: bool) {
    tracing_subscriber::fmt()
        .with_max_level(max_level(verbose, quiet))
        .with_target(false)
        .with_writer(|| TerminalWriter::new(io::stderr()))
        .init();
}

fn max_level(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::WARN,
        (false, 0) => LevelFilter::INFO,
        (false, 1) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    }
}

/// Translates `\n` to `\r\n` while the terminal is in raw mode.
#[derive(Debug)]
struct TerminalWriter<W> {
    inner: W,
}

impl<W> TerminalWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W> Write for TerminalWriter<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !RAW_MODE.load(Ordering::Relaxed) {
            return self.inner.write(buf);
        }
        write_crlf(&mut self.inner, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn write_crlf<W>(writer: &mut W, buf: &[u8]) -> io::Result<()>
where
    W: Write + ?Sized,
{
    let mut lines = buf.split(|b| *b == b'\n');
    if let Some(first) = lines.next() {
        writer.write_all(first)?;
    }
    for line in lines {
        writer.write_all(b"\r\n")?;
        writer.write_all(line)?;
    }
    Ok(())
}
