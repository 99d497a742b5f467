//! Single-consumer event queue. Transport callbacks and user input arrive on arbitrary threads;
//! they only post events here, and one consumer applies them to the controller in order.

use tokio::sync::mpsc;

use crate::session::SessionController;
use crate::transport::TransportEvent;

/// User action forwarded by the UI surface.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum UiCommand {
    Send(String),
    Clear,
    Browse,
    /// UI went away; tear the session down and stop the consumer.
    Shutdown,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Event {
    Transport(TransportEvent),
    Ui(UiCommand),
}

/// Producer half. Cheap to clone; usable from any thread, never blocks.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSender {
    /// Post an event. Returns false once the consumer is gone.
    pub fn post(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn transport(&self, event: TransportEvent) -> bool {
        self.post(Event::Transport(event))
    }

    pub fn command(&self, command: UiCommand) -> bool {
        self.post(Event::Ui(command))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half. Exactly one exists per session.
#[derive(Debug)]
pub struct EventQueue {
    rx: mpsc::UnboundedReceiver<Event>,
}

/// Create a connected sender/queue pair.
pub fn event_queue() -> (EventSender, EventQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventQueue { rx })
}

impl EventQueue {
    /// Next event, or `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Next already-queued event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Start the controller and apply events until `Shutdown` or until every sender is dropped,
    /// then tear the session down. Returns the controller for inspection.
    pub async fn run(mut self, mut controller: SessionController) -> SessionController {
        controller.start();
        while let Some(event) = self.rx.recv().await {
            if !controller.handle(event) {
                break;
            }
        }
        controller.teardown();
        self.rx.close();
        controller
    }

    /// Apply every event already queued. Returns how many were applied, stopping early (and
    /// leaving the rest queued) at `Shutdown`.
    pub fn dispatch_pending(&mut self, controller: &mut SessionController) -> usize {
        let mut n = 0;
        while let Ok(event) = self.rx.try_recv() {
            n += 1;
            if !controller.handle(event) {
                break;
            }
        }
        n
    }
}
