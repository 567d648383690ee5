//! End-to-end scenarios driving tasks the way an actor would.

use std::cell::Cell;
use std::rc::Rc;

use serde_json::{Value, json};
use spindle_core::app::{Command, MailboxLoop, mailbox};
use spindle_core::{
    ActorConfig, Bindings, ContextTask, LocalActor, Task, TaskError, TaskStatus, task,
};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq)]
enum Waiting {
    Reply,
    Loop,
}

#[test]
fn doubling_task_runs_to_completion() {
    let actor = LocalActor::new("calc");
    let answer = Rc::new(Cell::new(0));
    let out = Rc::clone(&answer);

    let t: Task<Waiting, i64> = Task::new(&actor, "call", move |s| async move {
        let x = s.suspend(Waiting::Reply).await?;
        out.set(x * 2);
        Ok(())
    });

    t.resume(0).unwrap();
    assert_eq!(t.status(), TaskStatus::Suspended(Waiting::Reply));
    assert!(actor.contains_task(t.id()));

    t.resume(21).unwrap();
    assert_eq!(answer.get(), 42);
    assert!(!actor.contains_task(t.id()));
    assert!(!t.is_alive());

    assert!(matches!(t.resume(1), Err(TaskError::DeadTask(_))));
}

#[test]
fn infinite_loop_stops_at_its_suspend_point() {
    let actor = LocalActor::new("looper");
    let iterations = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&iterations);

    let u: Task<Waiting, ()> = Task::new(&actor, "loop", move |s| async move {
        loop {
            counter.set(counter.get() + 1);
            s.suspend(Waiting::Loop).await?;
        }
    });

    u.resume(()).unwrap();
    u.resume(()).unwrap();
    u.resume(()).unwrap();
    assert_eq!(iterations.get(), 3);

    u.terminate().unwrap();

    assert_eq!(iterations.get(), 3);
    assert!(!u.is_alive());
    assert_eq!(actor.task_count(), 0);
}

#[test]
fn current_task_outside_any_task_is_an_error() {
    assert!(matches!(task::current(), Err(TaskError::NoCurrentTask)));
}

#[test]
fn shutdown_terminates_every_outstanding_task() {
    let actor = LocalActor::new("svc");
    let tasks: Vec<Task<Waiting, ()>> = (0..4)
        .map(|_| {
            Task::new(&actor, "call", |s| async move {
                s.suspend(Waiting::Reply).await?;
                Ok(())
            })
        })
        .collect();
    for t in &tasks {
        t.resume(()).unwrap();
    }
    assert_eq!(actor.counts().suspended, 4);

    actor.terminate_all().unwrap();

    assert_eq!(actor.task_count(), 0);
    assert!(tasks.iter().all(|t| !t.is_alive()));
    for t in &tasks {
        t.terminate().unwrap();
    }
}

#[test]
fn context_follows_each_task_across_interleaving() {
    let actor = LocalActor::new("ctx");
    actor.set_binding("tenant", "acme");

    let observed: Rc<std::cell::RefCell<Vec<(String, Option<Value>)>>> = Rc::default();

    let spawn = |label: &'static str| {
        let observed = Rc::clone(&observed);
        ContextTask::<&str, ()>::new(&actor, "req", move |s| async move {
            s.set("request", label);
            s.suspend("io").await?;
            observed
                .borrow_mut()
                .push((label.to_string(), s.get("request")));
            observed
                .borrow_mut()
                .push((format!("{label}/tenant"), s.get("tenant")));
            Ok(())
        })
    };

    let first = spawn("first");
    let second = spawn("second");
    first.resume(()).unwrap();
    second.resume(()).unwrap();

    let mut moved = first.suspended_bindings().unwrap();
    assert_eq!(moved.get("request"), Some(&json!("first")));
    moved.insert("tenant", "globex");

    second.resume(()).unwrap();
    first.resume_with((), moved).unwrap();

    assert_eq!(
        *observed.borrow(),
        vec![
            ("second".to_string(), Some(json!("second"))),
            ("second/tenant".to_string(), Some(json!("acme"))),
            ("first".to_string(), Some(json!("first"))),
            ("first/tenant".to_string(), Some(json!("globex"))),
        ]
    );
}

#[test]
fn child_task_inherits_parent_bindings() {
    let actor = LocalActor::new("tree");
    let seen = Rc::new(std::cell::RefCell::new(None));
    let slot = Rc::clone(&seen);
    let owner = Rc::clone(&actor);

    let parent: ContextTask<(), ()> = ContextTask::new(&actor, "parent", move |s| async move {
        s.set("span", "parent-span");
        let child: ContextTask<(), ()> =
            ContextTask::with_bindings(&owner, "child", &s.bindings(), move |c| async move {
                *slot.borrow_mut() = c.get("span");
                Ok(())
            });
        child.resume(())?;
        Ok(())
    });
    parent.resume(()).unwrap();

    assert_eq!(*seen.borrow(), Some(json!("parent-span")));
    assert_eq!(actor.task_count(), 0);
}

#[tokio::test]
async fn timer_collaborator_resumes_through_the_mailbox() {
    let actor = LocalActor::new("timers");
    let mut driver: MailboxLoop<Value> = MailboxLoop::new(Rc::clone(&actor));
    let fired = Rc::new(Cell::new(false));
    let flag = Rc::clone(&fired);

    let sleeper: ContextTask<&str, Value> = ContextTask::new(&actor, "sleep", move |s| async move {
        let reason = s.suspend("timer").await?;
        flag.set(reason == json!("timeout"));
        Ok(())
    });
    let id = driver.spawn(sleeper, Value::Null).unwrap();

    let (tx, rx) = mailbox(&ActorConfig::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let timer = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        tx.send(Command::ResumeWith {
            task: id,
            value: json!("timeout"),
            bindings: Bindings::new(),
        })
        .await
        .unwrap();
    });

    driver.run(rx, shutdown_rx).await.unwrap();
    timer.await.unwrap();
    drop(shutdown_tx);

    assert!(fired.get());
    assert_eq!(actor.task_count(), 0);
}
