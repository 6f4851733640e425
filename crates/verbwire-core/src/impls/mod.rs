//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **ClapParser**: clap による ArgumentParser
//! - **ParserSettings**: ClapParser の設定

pub mod clap_parser;
pub mod settings;

pub use self::clap_parser::ClapParser;
pub use self::settings::ParserSettings;
