//! spindle-core
//!
//! Cooperative tasks for single-threaded actors.
//!
//! # モジュール構成
//! - **coroutine**: 再開可能な実行コンテキスト（resume / suspend で値を受け渡し）
//! - **domain**: ドメインモデル（ids, task_type, status, resume, bindings）
//! - **task**: Task と ContextTask（suspend / resume / terminate プロトコル）
//! - **scope**: 実行中のタスク・アクターの参照
//! - **ports**: 抽象化レイヤー（Actor）
//! - **impls**: 実装（LocalActor）
//! - **app**: mailbox からタスクを駆動するループ
//! - **config** / **observability** / **error**

pub mod app;
pub mod config;
pub mod coroutine;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod scope;
pub mod task;

pub use config::ActorConfig;
pub use domain::{ActorId, Bindings, Resume, StatusKind, TaskId, TaskStatus, TaskType};
pub use error::{ConfigError, CoroutineError, TaskError};
pub use impls::LocalActor;
pub use ports::Actor;
pub use task::{ContextSuspender, ContextTask, Suspender, Task, TaskControl, TaskHandle};
