use std::{future::Future, ops::ControlFlow, time::Duration};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::utils::clock::Clock;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Something that reacts to user lines and clock ticks. Returning [ControlFlow::Break] ends the
/// loop. An error only aborts the call that produced it.
pub trait TickHandler {
    fn on_input(&mut self, line: String) -> impl Future<Output = Result<ControlFlow<()>>>;

    fn on_tick(&mut self) -> impl Future<Output = Result<ControlFlow<()>>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Handler asked to stop.
    Requested,
    /// Shutdown token was cancelled, usually by Ctrl-C.
    Interrupted,
    /// Input reached EOF.
    InputClosed,
}

pub struct TickLoop {
    clock: Box<dyn Clock>,
    shutdown: CancellationToken,
    frequency: Duration,
}

impl TickLoop {
    pub fn new(clock: Box<dyn Clock>, shutdown: CancellationToken, frequency: Duration) -> Self {
        Self {
            clock,
            shutdown,
            frequency,
        }
    }

    /// Executes the event loop. Input is drained as soon as it arrives, ticks fire on fixed
    /// deadlines so that slow handlers don't make the timers drift.
    pub async fn run(
        &self,
        input: &mut mpsc::Receiver<String>,
        handler: &mut impl TickHandler,
    ) -> LoopExit {
        let mut tick_point = self.clock.instant() + self.frequency;
        loop {
            let flow = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Tick loop interrupted");
                    return LoopExit::Interrupted;
                }
                line = input.recv() => match line {
                    Some(line) => {
                        debug!("Received line {line:?}");
                        handler.on_input(line).await
                    }
                    None => {
                        info!("Input closed, leaving tick loop");
                        return LoopExit::InputClosed;
                    }
                },
                _ = self.clock.sleep_until(tick_point) => {
                    tick_point += self.frequency;
                    handler.on_tick().await
                }
            };

            match flow {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => return LoopExit::Requested,
                Err(e) => error!("Handler failed, continuing {e:?}"),
            }
        }
    }
}
