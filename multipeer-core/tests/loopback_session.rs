use std::sync::{Arc, Mutex};
use std::time::Duration;

use multipeer_core::{
    event_queue, EventQueue, EventSender, IdentityStore, LocalIdentity, LoopbackHub,
    MemorySettings, MessageLog, Origin, ServiceTag, SessionController, UiCommand, UiSurface,
};

#[derive(Default)]
struct View {
    lines: Vec<String>,
    title: String,
    alerts: Vec<String>,
}

struct SharedView(Arc<Mutex<View>>);

impl UiSurface for SharedView {
    fn messages_changed(&mut self, log: &MessageLog) {
        self.0.lock().unwrap().lines = log.iter().map(|m| m.text.clone()).collect();
    }
    fn title_changed(&mut self, title: &str) {
        self.0.lock().unwrap().title = title.to_string();
    }
    fn show_alert(&mut self, _title: &str, message: &str) {
        self.0.lock().unwrap().alerts.push(message.to_string());
    }
}

struct Device {
    controller: SessionController,
    queue: EventQueue,
    tx: EventSender,
    view: Arc<Mutex<View>>,
}

fn device(hub: &LoopbackHub, name: &str) -> Device {
    let identity = IdentityStore::new(MemorySettings::new())
        .get_or_create_identity(name)
        .unwrap();
    let (tx, queue) = event_queue();
    let view = Arc::new(Mutex::new(View::default()));
    let controller = SessionController::new(
        identity.clone(),
        ServiceTag::default(),
        Box::new(hub.attach(&identity, tx.clone())),
        Box::new(SharedView(view.clone())),
    );
    Device {
        controller,
        queue,
        tx,
        view,
    }
}

/// Pump every device until no events are left anywhere.
fn settle(devices: &mut [&mut Device]) {
    loop {
        let mut applied = 0;
        for d in devices.iter_mut() {
            applied += d.queue.dispatch_pending(&mut d.controller);
        }
        if applied == 0 {
            break;
        }
    }
}

#[test]
fn browse_connects_and_messages_flow_both_ways() {
    let hub = LoopbackHub::new();
    let mut a = device(&hub, "iPhone A");
    let mut b = device(&hub, "iPhone B");
    a.controller.start();
    b.controller.start();

    a.tx.command(UiCommand::Browse);
    settle(&mut [&mut a, &mut b]);
    assert_eq!(a.view.lock().unwrap().title, "1 friend");
    assert_eq!(b.view.lock().unwrap().title, "1 friend");

    a.tx.command(UiCommand::Send("hello from A".into()));
    settle(&mut [&mut a, &mut b]);
    b.tx.command(UiCommand::Send("hi A".into()));
    settle(&mut [&mut a, &mut b]);

    assert_eq!(a.view.lock().unwrap().lines, ["hello from A", "hi A"]);
    assert_eq!(b.view.lock().unwrap().lines, ["hello from A", "hi A"]);
    let b_id = b.controller.identity().peer_id();
    assert_eq!(
        a.controller.messages().last().map(|m| m.origin),
        Some(Origin::Remote(b_id))
    );
}

#[test]
fn teardown_empties_the_other_roster() {
    let hub = LoopbackHub::new();
    let mut a = device(&hub, "A");
    let mut b = device(&hub, "B");
    let mut c = device(&hub, "C");
    a.controller.start();
    b.controller.start();
    c.controller.start();
    a.tx.command(UiCommand::Browse);
    settle(&mut [&mut a, &mut b, &mut c]);
    assert_eq!(a.controller.roster().len(), 2);
    assert_eq!(a.view.lock().unwrap().title, "2 friends");

    b.controller.teardown();
    settle(&mut [&mut a, &mut b, &mut c]);
    assert_eq!(a.controller.roster().len(), 1);
    assert!(b.controller.roster().is_empty());
    assert_eq!(b.view.lock().unwrap().title, "No friends yet");

    // Messages after the teardown only reach the remaining peer.
    a.tx.command(UiCommand::Send("still here?".into()));
    settle(&mut [&mut a, &mut b, &mut c]);
    assert!(b.controller.messages().is_empty());
    assert_eq!(c.controller.messages().len(), 1);
}

#[test]
fn clear_only_touches_local_log() {
    let hub = LoopbackHub::new();
    let mut a = device(&hub, "A");
    let mut b = device(&hub, "B");
    a.controller.start();
    b.controller.start();
    b.tx.command(UiCommand::Browse);
    settle(&mut [&mut a, &mut b]);
    a.tx.command(UiCommand::Send("one".into()));
    a.tx.command(UiCommand::Clear);
    settle(&mut [&mut a, &mut b]);
    assert!(a.controller.messages().is_empty());
    assert_eq!(a.controller.roster().len(), 1);
    assert_eq!(b.view.lock().unwrap().lines, ["one"]);
}

#[test]
fn advertising_failure_is_shown() {
    let hub = LoopbackHub::new();
    hub.set_advertising_unavailable(true);
    let mut a = device(&hub, "A");
    a.controller.start();
    settle(&mut [&mut a]);
    assert_eq!(a.view.lock().unwrap().alerts.len(), 1);
}

#[test]
fn peers_with_other_service_tag_stay_apart() {
    let hub = LoopbackHub::new();
    let mut a = device(&hub, "A");
    let identity = LocalIdentity::generate("Other");
    let (tx, mut queue) = event_queue();
    let mut other = SessionController::new(
        identity.clone(),
        "other-app".parse().unwrap(),
        Box::new(hub.attach(&identity, tx)),
        Box::new(SharedView(Arc::new(Mutex::new(View::default())))),
    );
    other.start();
    a.controller.start();
    a.tx.command(UiCommand::Browse);
    settle(&mut [&mut a]);
    queue.dispatch_pending(&mut other);
    assert!(a.controller.roster().is_empty());
    assert!(other.roster().is_empty());
}

#[tokio::test]
async fn queue_consumers_run_concurrently() {
    let hub = LoopbackHub::new();
    let a = device(&hub, "A");
    let b = device(&hub, "B");
    let (a_tx, b_tx) = (a.tx.clone(), b.tx.clone());
    let (a_view, b_view) = (a.view.clone(), b.view.clone());
    let a_task = tokio::spawn(a.queue.run(a.controller));
    let b_task = tokio::spawn(b.queue.run(b.controller));

    // Wait until B is advertising before browsing.
    let tag = ServiceTag::default();
    while hub.advertisers(&tag).len() < 2 {
        tokio::task::yield_now().await;
    }
    a_tx.command(UiCommand::Browse);
    wait_for(|| b_view.lock().unwrap().title == "1 friend").await;
    wait_for(|| a_view.lock().unwrap().title == "1 friend").await;
    b_tx.command(UiCommand::Send("ping".into()));
    wait_for(|| a_view.lock().unwrap().lines == ["ping"]).await;

    a_tx.command(UiCommand::Shutdown);
    let a_done = a_task.await.unwrap();
    assert_eq!(a_done.messages().len(), 1);
    wait_for(|| b_view.lock().unwrap().title == "No friends yet").await;
    b_tx.command(UiCommand::Shutdown);
    let b_done = b_task.await.unwrap();
    assert!(b_done.roster().is_empty());
}

async fn wait_for(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
