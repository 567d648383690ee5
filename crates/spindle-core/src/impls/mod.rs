//! Impls - ports の実装
//!
//! - LocalActor: 単一スレッドのアクター（開発用・デモ用）

pub mod local_actor;

pub use self::local_actor::LocalActor;
