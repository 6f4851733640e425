//! Ports - 抽象化レイヤー
//!
//! 外部の collaborator との境界を trait で定義します。
//!
//! # 主要な Port
//! - **ArgumentParser**: 引数ベクタから options / verb の値を作る

pub mod parser;

pub use self::parser::ArgumentParser;
