//! Drives the pure dispatch state machine by hand, with no runtime.

use taskvisor::graph::{Resource, Task, TaskSet};
use taskvisor::supervisor::{CoreCommand, DispatchCore, TaskState};
use taskvisor_test_utils::empty_task;

fn names(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(Task::name).collect()
}

#[test]
fn start_launches_only_ready_roots() {
    let a = empty_task("a");
    let b = empty_task("b").after(&a);

    let mut core = DispatchCore::new(vec![a.clone(), b.clone()]);
    let step = core.start();

    assert_eq!(names(&step.launched()), vec!["a"]);
    assert!(!step.finished);
    assert_eq!(core.state_of(a.id()), TaskState::Started);
    assert_eq!(core.state_of(b.id()), TaskState::Unknown);
    assert_eq!(core.pending(), vec![b.id()]);
    assert_eq!(core.active_count(), 1);
}

#[test]
fn completion_releases_downstream_once_all_upstream_finished() {
    let left = empty_task("left");
    let right = empty_task("right");
    let join = empty_task("join").after(&TaskSet::new([left.clone(), right.clone()]).unwrap());

    let mut core = DispatchCore::new(vec![left.clone(), right.clone()]);
    let step = core.start();
    assert_eq!(names(&step.launched()), vec!["left", "right"]);

    let step = core.complete(left.id(), true);
    assert!(step.launched().is_empty());
    assert!(!step.finished);
    assert_eq!(core.pending(), vec![join.id()]);

    let step = core.complete(right.id(), true);
    assert_eq!(names(&step.launched()), vec!["join"]);
    assert!(core.pending().is_empty());

    let step = core.complete(join.id(), true);
    assert!(step.finished);
    assert!(step.commands.is_empty());

    let report = core.into_report();
    assert!(report.is_success());
    assert_eq!(names(report.started()), vec!["left", "right", "join"]);
}

#[test]
fn failure_does_not_dispatch_downstream() {
    let a = empty_task("a");
    let b = empty_task("b").after(&a);

    let mut core = DispatchCore::new(vec![a.clone()]);
    core.start();
    let step = core.complete(a.id(), false);

    assert!(step.launched().is_empty());
    assert!(step.finished);

    let report = core.into_report();
    assert_eq!(report.failed(), &[a.id()]);
    assert_eq!(report.stranded(), &[b.clone()]);
}

#[test]
fn shared_resource_serialises_dispatch() {
    let db = Resource::new("db");
    let one = empty_task("one").uses(&db);
    let two = empty_task("two").uses(&db);

    let mut core = DispatchCore::new(vec![one.clone(), two.clone()]);
    let step = core.start();
    assert_eq!(names(&step.launched()), vec!["one"]);
    assert!(!db.is_available());
    assert_eq!(core.pending(), vec![two.id()]);

    let step = core.complete(one.id(), true);
    assert_eq!(names(&step.launched()), vec!["two"]);
    assert!(!db.is_available());

    let step = core.complete(two.id(), true);
    assert!(step.finished);
    assert!(db.is_available());
}

#[test]
fn pending_tasks_are_rechecked_after_unrelated_completions() {
    let db = Resource::new("db");
    let holder = empty_task("holder").uses(&db);
    let other = empty_task("other");
    let waiter = empty_task("waiter").uses(&db).after(&other);

    let mut core = DispatchCore::new(vec![holder.clone(), other.clone()]);
    core.start();

    // `other` finishes first; `waiter` is ready but the resource is held.
    let step = core.complete(other.id(), true);
    assert!(step.launched().is_empty());
    assert_eq!(core.pending(), vec![waiter.id()]);

    // Releasing the resource re-checks the pending set.
    let step = core.complete(holder.id(), true);
    assert_eq!(names(&step.launched()), vec!["waiter"]);
}

#[test]
fn cancel_interrupts_tracked_tasks_and_stops_dispatching() {
    let a = empty_task("a");
    let b = empty_task("b").after(&a);

    let mut core = DispatchCore::new(vec![a.clone()]);
    core.start();

    let step = core.cancel();
    assert!(core.is_dying());
    assert!(!step.finished);
    match step.commands.as_slice() {
        [CoreCommand::Interrupt(tasks)] => assert_eq!(names(tasks), vec!["a"]),
        other => panic!("unexpected commands: {other:?}"),
    }

    // A second request is a no-op.
    assert!(core.cancel().commands.is_empty());

    let step = core.complete(a.id(), true);
    assert!(step.launched().is_empty());
    assert!(step.finished);

    let report = core.into_report();
    assert!(report.was_cancelled());
    assert_eq!(report.stranded(), &[b.clone()]);
}

#[test]
fn cancel_before_start_dispatches_nothing() {
    let a = empty_task("a");
    let mut core = DispatchCore::new(vec![a.clone()]);
    core.cancel();

    let step = core.start();
    assert!(step.launched().is_empty());
    assert!(step.finished);
    assert_eq!(core.state_of(a.id()), TaskState::Unknown);
}

#[test]
fn stray_completions_are_ignored() {
    let a = empty_task("a");
    let stranger = empty_task("stranger");

    let mut core = DispatchCore::new(vec![a.clone()]);
    core.start();

    let step = core.complete(stranger.id(), true);
    assert!(!step.finished);
    assert_eq!(core.active_count(), 1);

    core.complete(a.id(), true);
    let step = core.complete(a.id(), true);
    assert!(step.finished);
    assert_eq!(core.active_count(), 0);
}

#[test]
fn resource_fault_aborts_dispatching() {
    let db = Resource::new("db");
    let a = empty_task("a").uses(&db);
    let b = empty_task("b").after(&a);
    let c = empty_task("c");

    let mut core = DispatchCore::new(vec![a.clone(), c.clone()]);
    core.start();

    // Someone else released the lock while `a` was running.
    db.unlock().unwrap();
    let step = core.complete(a.id(), true);

    assert!(core.is_dying());
    assert!(step.launched().is_empty());
    match step.commands.as_slice() {
        [CoreCommand::Interrupt(tasks)] => assert_eq!(names(tasks), vec!["c"]),
        other => panic!("unexpected commands: {other:?}"),
    }

    core.complete(c.id(), true);
    let report = core.into_report();
    assert!(report.fault().is_some());
    assert_eq!(report.state_of(b.id()), TaskState::Unknown);
}

#[test]
fn dropped_upstream_keeps_task_pending() {
    let keep = empty_task("keep");
    let orphan = {
        let gone = empty_task("gone");
        empty_task("orphan").after(&gone)
    };

    let mut core = DispatchCore::new(vec![keep.clone(), orphan.clone()]);
    let step = core.start();

    assert_eq!(names(&step.launched()), vec!["keep"]);
    assert_eq!(core.pending(), vec![orphan.id()]);
    assert_eq!(orphan.upstream(), Vec::<Task>::new());
}

#[test]
fn join_after_a_failed_branch_is_never_dispatched() {
    let left = empty_task("left");
    let right = empty_task("right");
    let join = empty_task("join").after(&TaskSet::new([left.clone(), right.clone()]).unwrap());

    let mut core = DispatchCore::new(vec![left.clone(), right.clone()]);
    core.start();
    core.complete(left.id(), false);
    let step = core.complete(right.id(), true);

    assert!(step.launched().is_empty());
    assert!(step.finished);
    assert_eq!(core.pending(), vec![join.id()]);
    assert_eq!(core.into_report().stranded(), &[join.clone()]);
}
