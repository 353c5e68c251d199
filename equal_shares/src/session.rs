//! Running computations in the background.
//!
//! A [`Session`] runs at most one computation at a time on a worker thread.
//! The worker sends progress messages followed by exactly one
//! [`Event::Finished`]. Submitting a new computation abandons the previous
//! one: its remaining events are dropped.
//!
//! ```
//! use equal_shares::builder::Builder;
//! use equal_shares::session::Session;
//! use equal_shares::{AllocationParams, NoProgress};
//!
//! let mut builder = Builder::new(10.0);
//! builder.project("bench", 4.0)?;
//! builder.approve("alice", &["bench"])?;
//!
//! let mut session = Session::new();
//! session.submit(builder.build(), AllocationParams::default());
//! let (result, _elapsed) = session.wait(&mut NoProgress)?;
//! assert_eq!(result.winners, vec!["bench".to_string()]);
//! # Ok::<(), equal_shares::AllocationErrors>(())
//! ```

use log::{debug, info};

use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::*;
use crate::{run_equal_shares, ProgressListener};

#[derive(Debug)]
pub enum Event {
    Progress(String),
    Finished {
        result: Result<AllocationResult, AllocationErrors>,
        elapsed: Duration,
    },
}

struct ChannelProgress {
    sender: Sender<Event>,
}

impl ProgressListener for ChannelProgress {
    fn progress(&mut self, text: &str) {
        // The session may have moved on to another computation.
        let _ = self.sender.send(Event::Progress(text.to_string()));
    }
}

/// Holds the computation in flight, if any.
#[derive(Default)]
pub struct Session {
    current: Option<Receiver<Event>>,
    submitted: u64,
}

impl Session {
    pub fn new() -> Session {
        Session::default()
    }

    /// Starts a computation, abandoning the one in flight.
    pub fn submit(&mut self, instance: Instance, params: AllocationParams) {
        if self.current.take().is_some() {
            info!("Session: abandoning computation {}", self.submitted);
        }
        self.submitted += 1;
        let id = self.submitted;
        let (sender, receiver) = channel();
        thread::spawn(move || {
            let start = Instant::now();
            let mut listener = ChannelProgress {
                sender: sender.clone(),
            };
            let result = run_equal_shares(&instance, &params, &mut listener);
            let elapsed = start.elapsed();
            debug!("Session: computation {} done in {:?}", id, elapsed);
            let _ = sender.send(Event::Finished { result, elapsed });
        });
        self.current = Some(receiver);
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    /// Blocks until the next event of the computation in flight.
    ///
    /// Fails with `WorkerDisconnected` if nothing is in flight or if the
    /// worker went away without a result.
    pub fn recv(&mut self) -> Result<Event, AllocationErrors> {
        let receiver = match self.current.as_ref() {
            Some(r) => r,
            None => return WorkerDisconnectedSnafu {}.fail(),
        };
        match receiver.recv() {
            Ok(event) => {
                if let Event::Finished { .. } = event {
                    self.current = None;
                }
                Ok(event)
            }
            Err(_) => {
                self.current = None;
                WorkerDisconnectedSnafu {}.fail()
            }
        }
    }

    /// Forwards the progress messages until the computation in flight ends.
    pub fn wait(
        &mut self,
        progress: &mut dyn ProgressListener,
    ) -> Result<(AllocationResult, Duration), AllocationErrors> {
        loop {
            match self.recv()? {
                Event::Progress(text) => progress.progress(&text),
                Event::Finished { result, elapsed } => {
                    info!("Session: finished in {:.1}s", elapsed.as_secs_f64());
                    return result.map(|r| (r, elapsed));
                }
            }
        }
    }
}
