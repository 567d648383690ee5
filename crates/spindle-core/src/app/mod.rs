//! App - アプリケーション層
//!
//! Task の上に載るもの。現在は mailbox からタスクを駆動するループのみ。

pub mod mailbox_loop;

pub use self::mailbox_loop::{Command, Drivable, MailboxLoop, mailbox};
