mod common;

use common::{rig, BoardLog, FakeFs, MockBoard, ADDRESS};
use mpsync_core::{
    ActionQueue, ActivityClock, BatchOutcome, ConnectionManager, Dispatcher, EventIntake, PathKind,
    SessionState, TaskState,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn burst_is_one_session_in_arrival_order() {
    let rig = rig(true);
    rig.fs.set("root/x.txt", PathKind::File);

    rig.intake.on_create("root/x.txt".into());
    sleep(Duration::from_millis(100)).await;
    rig.intake.on_modify("root/x.txt".into());
    sleep(Duration::from_millis(100)).await;
    rig.intake.on_delete("root/x.txt".into());

    // still inside the quiet period: nothing happened yet
    sleep(Duration::from_millis(300)).await;
    assert!(rig.log.calls().is_empty());
    assert_eq!(rig.queue.len(), 3);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(
        rig.log.calls(),
        strings(&["open", "put /x.txt", "put /x.txt", "remove /x.txt", "close"])
    );
    assert!(rig.queue.is_empty());

    rig.handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn separated_bursts_get_separate_sessions() {
    let rig = rig(true);
    rig.fs.set("root/a.py", PathKind::File);
    rig.fs.set("root/b.py", PathKind::File);

    rig.intake.on_modify("root/a.py".into());
    sleep(Duration::from_secs(2)).await;
    rig.intake.on_modify("root/b.py".into());
    sleep(Duration::from_secs(2)).await;

    assert_eq!(
        rig.log.calls(),
        strings(&["open", "put /a.py", "close", "open", "put /b.py", "close"])
    );
    rig.handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unreachable_board_keeps_queue_and_retries_after_backoff() {
    let rig = rig(false);
    rig.fs.set("root/main.py", PathKind::File);
    rig.fs.set("root/lib", PathKind::Directory);

    rig.intake.on_create("root/lib".into());
    rig.intake.on_modify("root/main.py".into());
    rig.intake.on_delete("root/old.py".into());
    let before = rig.queue.snapshot();

    sleep(Duration::from_secs(1)).await;
    assert_eq!(rig.log.opens.load(Ordering::SeqCst), 5);
    assert!(rig.log.calls().is_empty());
    assert_eq!(rig.queue.snapshot(), before);
    assert!(matches!(*rig.handle.state(), TaskState::Retrying(_)));

    // still inside the backoff window: no new attempts
    sleep(Duration::from_secs(3)).await;
    assert_eq!(rig.log.opens.load(Ordering::SeqCst), 5);

    rig.log.reachable.store(true, Ordering::SeqCst);
    sleep(Duration::from_secs(3)).await;
    assert_eq!(
        rig.log.calls(),
        strings(&["open", "mkdir /lib", "put /main.py", "remove /old.py", "close"])
    );
    assert!(rig.queue.is_empty());
    assert_eq!(*rig.handle.state(), TaskState::Watching);
    rig.handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn events_arriving_mid_batch_wait_for_next_cycle() {
    let rig = rig(true);
    rig.fs.set("root/a.py", PathKind::File);
    rig.fs.set("root/late.py", PathKind::File);

    let late = rig.intake.clone();
    *rig.log.on_put.lock().unwrap() = Some(Box::new(move || late.on_create("root/late.py".into())));

    rig.intake.on_modify("root/a.py".into());
    sleep(Duration::from_secs(3)).await;

    assert_eq!(
        rig.log.calls(),
        strings(&["open", "put /a.py", "close", "open", "put /late.py", "close"])
    );
    rig.handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stop_while_backing_off_returns_and_keeps_events() {
    let rig = rig(false);
    rig.intake.on_delete("root/x.py".into());
    sleep(Duration::from_secs(1)).await;

    let queue = rig.queue.clone();
    rig.handle.stop().await.unwrap();
    assert_eq!(queue.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_during_a_batch_lets_it_finish() {
    let rig = rig(true);
    *rig.log.put_delay.lock().unwrap() = Duration::from_secs(1);
    rig.fs.set("root/a.py", PathKind::File);
    rig.fs.set("root/b.py", PathKind::File);
    rig.intake.on_modify("root/a.py".into());
    rig.intake.on_modify("root/b.py".into());

    // gate opened at 600ms; the first put is still running
    sleep(Duration::from_millis(700)).await;
    assert_eq!(rig.log.calls(), strings(&["open"]));
    assert!(matches!(*rig.handle.state(), TaskState::Syncing));

    let queue = rig.queue.clone();
    rig.handle.stop().await.unwrap();
    assert_eq!(
        rig.log.calls(),
        strings(&["open", "put /a.py", "put /b.py", "close"])
    );
    assert!(queue.is_empty());
}

fn dispatcher(log: &Arc<BoardLog>, fs: &FakeFs) -> Dispatcher<MockBoard, FakeFs> {
    let connection = ConnectionManager::new(MockBoard(log.clone()), ADDRESS, 5);
    Dispatcher::new("root", "/", fs.clone(), connection)
}

fn intake() -> (Arc<ActionQueue>, EventIntake) {
    let queue = Arc::new(ActionQueue::new());
    (queue.clone(), EventIntake::new(queue, Arc::new(ActivityClock::new())))
}

#[tokio::test]
async fn folder_move_is_logged_and_dropped() {
    let log = BoardLog::new(true);
    let fs = FakeFs::default();
    fs.set("root/pkg2", PathKind::Directory);
    let (queue, intake) = intake();
    intake.on_move("root/pkg".into(), "root/pkg2".into());

    let mut d = dispatcher(&log, &fs);
    let BatchOutcome::Completed(report) = d.run_batch(&queue).await else {
        panic!("expected a completed batch");
    };
    assert_eq!(report.unsupported, 1);
    assert_eq!(report.total(), 1);
    assert_eq!(log.calls(), strings(&["open", "close"]));
    assert!(queue.is_empty());
}

#[tokio::test]
async fn file_move_removes_then_uploads() {
    let log = BoardLog::new(true);
    let fs = FakeFs::default();
    fs.set("root/lib/new.py", PathKind::File);
    let (queue, intake) = intake();
    intake.on_move("root/old.py".into(), "root/lib/new.py".into());

    dispatcher(&log, &fs).run_batch(&queue).await;
    assert_eq!(log.calls(), strings(&["open", "remove /old.py", "put /lib/new.py", "close"]));
}

#[tokio::test]
async fn failed_item_does_not_abort_batch() {
    let log = BoardLog::new(true);
    log.failing.lock().unwrap().push("/a.py".into());
    let fs = FakeFs::default();
    fs.set("root/a.py", PathKind::File);
    fs.set("root/b.py", PathKind::File);
    let (queue, intake) = intake();
    intake.on_create("root/a.py".into());
    intake.on_create("root/b.py".into());
    intake.on_modify("root/gone.py".into());

    let mut d = dispatcher(&log, &fs);
    let BatchOutcome::Completed(report) = d.run_batch(&queue).await else {
        panic!("expected a completed batch");
    };
    assert_eq!((report.applied, report.failed, report.skipped), (1, 1, 1));
    assert_eq!(log.calls(), strings(&["open", "put /a.py", "put /b.py", "close"]));
    // at-most-once: the failed event is gone
    assert!(queue.is_empty());
    assert_eq!(d.connection().state(), SessionState::Closed);
}

#[tokio::test]
async fn deferred_batch_leaves_queue_untouched() {
    let log = BoardLog::new(false);
    let fs = FakeFs::default();
    let (queue, intake) = intake();
    intake.on_delete("root/a.py".into());
    intake.on_delete("root/b.py".into());

    let mut d = dispatcher(&log, &fs);
    assert!(matches!(d.run_batch(&queue).await, BatchOutcome::Deferred(_)));
    assert_eq!(log.opens.load(Ordering::SeqCst), 5);
    assert_eq!(queue.len(), 2);
    assert_eq!(d.connection().state(), SessionState::Failed);
}
