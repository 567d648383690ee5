use std::rc::Rc;

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::watch;
use tokio::time::{Duration, sleep};
use tracing::info;

use spindle_core::app::{Command, MailboxLoop, mailbox};
use spindle_core::observability::init_logging;
use spindle_core::{ActorConfig, Bindings, ContextTask, LocalActor, Task, TaskError};

#[derive(Debug, Deserialize)]
struct GreetPayload {
    name: String,
}

/// ticker: 呼ばれるたびにカウントして待つ。shutdown で terminate される
fn ticker(actor: &Rc<LocalActor>) -> Task<&'static str, Value> {
    Task::new(actor, "ticker", |s| async move {
        let mut ticks = 0u32;
        loop {
            s.suspend("tick").await?;
            ticks += 1;
            println!("tick #{ticks}");
        }
    })
}

/// greeter: タイマーからの payload を待ち、コンテキストの request_id 付きで挨拶する
fn greeter(actor: &Rc<LocalActor>) -> ContextTask<&'static str, Value> {
    ContextTask::new(actor, "greeter", |s| async move {
        let payload = s.suspend("waiting-for-timer").await?;
        let p: GreetPayload = serde_json::from_value(payload)
            .map_err(|e| TaskError::failed(format!("json decode: {e}")))?;

        let request = s.get("request_id").unwrap_or(Value::Null);
        println!("Hello, {}! (request_id={request})", p.name);
        Ok(())
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // (A) 設定を読む（引数なしならデフォルト）
    let config = match std::env::args().nth(1) {
        Some(path) => ActorConfig::from_path(path)?,
        None => ActorConfig::default(),
    };
    init_logging(&config.log_filter);

    // (B) アクターとドライバを用意
    let actor = LocalActor::new(config.name.clone());
    actor.set_binding("request_id", "req-1");
    let mut driver: MailboxLoop<Value> = MailboxLoop::new(Rc::clone(&actor));

    let tick = driver.spawn(ticker(&actor), Value::Null)?;
    let greet = driver.spawn(greeter(&actor), Value::Null)?;
    info!(actor = %actor.name(), live = actor.task_count(), "tasks started");

    // (C) タイマー役: 別タスクから mailbox に Command を送る
    let (tx, rx) = mailbox(&config);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let timer = tokio::spawn(async move {
        for _ in 0..3 {
            sleep(Duration::from_millis(20)).await;
            if tx
                .send(Command::Resume {
                    task: tick,
                    value: Value::Null,
                })
                .await
                .is_err()
            {
                return;
            }
        }

        let bindings: Bindings = [("request_id", "req-from-timer")].into_iter().collect();
        let _ = tx
            .send(Command::ResumeWith {
                task: greet,
                value: json!({ "name": "spindle" }),
                bindings,
            })
            .await;

        sleep(Duration::from_millis(20)).await;
        let _ = shutdown_tx.send(true);
    });

    // (D) shutdown まで mailbox を処理。残った ticker はここで terminate される
    let counts_before = actor.counts();
    driver.run(rx, shutdown_rx).await?;
    timer.await?;

    println!("counts at start: {counts_before:?}");
    println!("counts at exit: {:?}", actor.counts());
    Ok(())
}
