//! OTF Core Decoder
//!
//! On-the-fly, event-based decoder for fixed-layout binary messages whose
//! schema is supplied at runtime as a flat token stream. Emits field and
//! group events without building a message object.
//!
//! # Architecture
//!
//! - **token.rs** - Signal, PrimitiveType, ByteOrder, Token
//! - **ir.rs** - Token stream (`Ir`)
//! - **dispatch.rs** - Template id -> token range index, balance checking
//! - **buffer.rs** - Bounds-checked primitive reads
//! - **value.rs** - Decoded primitive values
//! - **event.rs** - Field / Group / ErrorEvent views passed to handlers
//! - **handler.rs** - Handler traits and closure adapters
//! - **listener.rs** - Traversal engine

pub mod buffer;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod handler;
pub mod ir;
pub mod listener;
pub mod token;
pub mod value;

pub use dispatch::{BodyRange, DispatchIndex};
pub use error::{Error, Result};
pub use event::{ErrorEvent, Field, Group, GroupEvent};
pub use handler::{CompletionHandler, DecodeHandler, ErrorHandler, FieldHandler, GroupHandler, IgnoreCompletion};
pub use ir::Ir;
pub use listener::{decode_header, DecodeOptions, HeaderInfo, Listener, ListenerState, Outcome};
pub use token::{ByteOrder, Family, PrimitiveType, Signal, Token, INVALID_ID, VARIABLE_SIZE};
pub use value::PrimitiveValue;
