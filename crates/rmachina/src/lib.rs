//! Robot motion pipeline: actions are replayed by virtual cursors and turned
//! into device programs or streamed wire messages.

mod action;
mod buffers;
pub mod compiler;
mod config;
mod cursor;
mod geometry;
pub mod protocol;
mod session;
mod tool_library;
mod types;

pub use action::*;
pub use buffers::*;
pub use compiler::{
    CommentMode, Compiler, CompilerOptions, Decimals, GCodeCompiler, KrlCompiler,
    MachinaCompiler, Program, RapidCompiler, UrScriptCompiler,
};
pub use config::*;
pub use cursor::*;
pub use geometry::*;
pub use protocol::{
    AbbOpcode, AbbProtocol, AbbRequest, StreamingProtocol, UrOpcode, UrProtocol, WireMessage,
};
pub use session::*;
pub use tool_library::*;
pub use types::*;
