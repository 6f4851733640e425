//! App - アプリケーション層
//!
//! registry・parser・arguments を組み合わせてコマンドラインアプリを構成します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: 登録とワイヤリング、起動時検証
//! - **App**: 構築済みアプリ（options / verb / base の参照、run）
//! - **ParseSession**: 1 回の実行で共有されるメモ化済みパース結果
//! - **CommandRunner / VerbBaseRunner**: handler を 1 回だけ実行
//! - **host**: run_command_line と終了コード

pub mod builder;
pub mod host;
pub mod runner;
pub mod session;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::host::{USAGE_EXIT_CODE, exit_code, run_command_line};
pub use self::runner::{CommandLineRunner, CommandRunner, VerbBaseRunner};
pub use self::session::ParseSession;
