//! verbwire-core
//!
//! Wires clap-parsed options and verbs to their handlers through one
//! explicitly built application value.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（arguments, errors, type_name）
//! - **typed**: 型付き verb API（Verb / Upcast trait, Handler trait, VerbRegistry, AnyVerb）
//! - **ports**: 抽象化レイヤー（ArgumentParser）
//! - **impls**: 実装（ClapParser, ParserSettings）
//! - **app**: アプリケーション層（AppBuilder, App, ParseSession, runners, host）
//! - **observability**: tracing subscriber の初期化

pub mod app;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod typed;

pub use self::app::{App, AppBuilder, BuildError, CommandLineRunner, exit_code, run_command_line};
pub use self::domain::{CommandLineArguments, HandlerError, LookupError, ParseFailure, RunError};
pub use self::impls::{ClapParser, ParserSettings};
pub use self::typed::{AnyVerb, Handler, Upcast, Verb};
