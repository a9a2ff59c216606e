use taskvisor::errors::TaskvisorError;
use taskvisor::graph::{Graph, Task, TaskChain, TaskSet, ensure_acyclic};
use taskvisor_test_utils::empty_task;

fn names(tasks: Vec<Task>) -> Vec<String> {
    tasks.iter().map(|t| t.name().to_string()).collect()
}

#[test]
fn empty_builders_are_rejected() {
    assert!(matches!(
        TaskSet::new(Vec::new()),
        Err(TaskvisorError::NoTasksSpecified)
    ));
    assert!(matches!(
        TaskChain::new(Vec::new()),
        Err(TaskvisorError::NoTasksSpecified)
    ));

    let mut chain = TaskChain::new([empty_task("a")]).unwrap();
    assert!(matches!(
        chain.append(Vec::new()),
        Err(TaskvisorError::NoTasksSpecified)
    ));
    assert_eq!(chain.last().name(), "a");
}

#[test]
fn single_task_is_its_own_root_and_leaf() {
    let a = empty_task("a");
    assert_eq!(a.roots(), vec![a.clone()]);
    assert_eq!(a.leaves(), vec![a.clone()]);
}

#[test]
fn chain_links_each_task_after_the_previous_one() {
    let a = empty_task("a");
    let b = empty_task("b");
    let c = empty_task("c");

    let mut chain = TaskChain::new([a.clone(), b.clone()]).unwrap();
    chain.append([c.clone()]).unwrap();

    assert_eq!(chain.first(), &a);
    assert_eq!(chain.last(), &c);
    assert_eq!(names(chain.roots()), vec!["a"]);
    assert_eq!(names(chain.leaves()), vec!["c"]);

    assert_eq!(b.upstream(), vec![a.clone()]);
    assert_eq!(c.upstream(), vec![b.clone()]);
    assert_eq!(a.downstream(), vec![b.clone()]);
    assert!(c.downstream().is_empty());
}

#[test]
fn set_leaves_follow_downstream_edges() {
    // a -> b -> d
    // a -> c -> d
    // e
    let a = empty_task("a");
    let b = empty_task("b").after(&a);
    let c = empty_task("c").after(&a);
    let d = empty_task("d").after(&TaskSet::new([b.clone(), c.clone()]).unwrap());
    let e = empty_task("e");

    let set = TaskSet::new([a.clone(), e.clone()]).unwrap();
    assert_eq!(names(set.roots()), vec!["a", "e"]);

    // `d` is reachable along two paths and is reported once per path.
    assert_eq!(names(set.leaves()), vec!["d", "d", "e"]);
    assert_eq!(d.upstream(), vec![b, c]);
}

#[test]
fn after_a_set_waits_for_each_leaf() {
    let a = empty_task("a");
    let b = empty_task("b");
    let set = TaskSet::new([a.clone(), b.clone()]).unwrap();

    let join = empty_task("join").after(&set);
    assert_eq!(join.upstream(), vec![a.clone(), b.clone()]);
    assert_eq!(a.downstream(), vec![join.clone()]);
    assert_eq!(b.downstream(), vec![join.clone()]);
}

#[test]
fn after_the_same_graph_twice_adds_one_edge() {
    let a = empty_task("a");
    let b = empty_task("b").after(&a).after(&a);

    assert_eq!(b.upstream(), vec![a.clone()]);
    assert_eq!(a.downstream(), vec![b.clone()]);
}

#[test]
fn chain_of_sets_joins_through_leaves() {
    let first = TaskSet::new([empty_task("x"), empty_task("y")]).unwrap();
    let tail = empty_task("tail").after(&first);
    let chain = TaskChain::new([tail.clone(), empty_task("end")]).unwrap();

    assert_eq!(names(tail.upstream()), vec!["x", "y"]);
    assert_eq!(names(chain.leaves()), vec!["end"]);
}

#[test]
fn acyclic_graph_passes_the_cycle_check() {
    let a = empty_task("a");
    let b = empty_task("b").after(&a);
    let _c = empty_task("c").after(&TaskSet::new([a.clone(), b]).unwrap());

    assert!(ensure_acyclic(&[a]).is_ok());
}

#[test]
fn cycle_is_detected() {
    let a = empty_task("a");
    let b = empty_task("b").after(&a);
    let c = empty_task("c").after(&b);
    let a = a.after(&c);

    let err = ensure_acyclic(&[a]).unwrap_err();
    assert!(matches!(err, TaskvisorError::GraphCycle(_)));
    assert!(err.to_string().contains("cycle detected"));
}

#[test]
fn self_dependency_is_a_cycle() {
    let a = empty_task("a");
    let a = a.clone().after(&a);

    assert_eq!(a.upstream(), vec![a.clone()]);
    assert!(matches!(
        ensure_acyclic(&[a]),
        Err(TaskvisorError::GraphCycle(_))
    ));
}
