use std::{
    io::{self, IsTerminal as _},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::Context;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};
use rally_engine::CancelToken;
use tracing::{info, warn};

use crate::logging;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Trips a [`CancelToken`] when Esc, `q` or Ctrl-C is pressed.
///
/// The terminal stays in raw mode until the watcher is dropped.
#[derive(Debug)]
pub struct InterruptWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InterruptWatcher {
    /// Starts watching the keyboard, or returns `None` when stdin is not a terminal.
    ///
    /// Without a terminal there is no cooperative stop: killing the process loses the
    /// phase in progress, while checkpoints saved before stay intact.
    pub fn spawn(cancel: CancelToken) -> anyhow::Result<Option<Self>> {
        if !io::stdin().is_terminal() {
            info!("stdin is not a terminal, keyboard interrupt disabled");
            return Ok(None);
        }
        terminal::enable_raw_mode().context("Failed to enable terminal raw mode")?;
        logging::set_raw_mode(true);

        let stop = Arc::new(AtomicBool::new(false));
        let spawned = thread::Builder::new()
            .name("interrupt-watcher".to_owned())
            .spawn({
                let stop = Arc::clone(&stop);
                move || watch(&cancel, &stop)
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                restore_terminal();
                return Err(e).context("Failed to spawn interrupt watcher thread");
            }
        };
        info!("press Esc, q or Ctrl-C to stop");
        Ok(Some(Self {
            stop,
            handle: Some(handle),
        }))
    }
}

impl Drop for InterruptWatcher {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        restore_terminal();
    }
}

fn restore_terminal() {
    if let Err(e) = terminal::disable_raw_mode() {
        warn!(error = %e, "failed to restore terminal mode");
    }
    logging::set_raw_mode(false);
}

fn watch(cancel: &CancelToken, stop: &AtomicBool) {
    while !stop.load(Ordering::Relaxed) && !cancel.is_cancelled() {
        match event::poll(POLL_INTERVAL) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                warn!(error = %e, "stopped watching the keyboard");
                return;
            }
        }
        match event::read() {
            Ok(Event::Key(key)) if is_interrupt(&key) => {
                warn!("interrupt requested, stopping");
                cancel.cancel();
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "stopped watching the keyboard");
                return;
            }
        }
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
