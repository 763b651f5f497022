//! Handler capabilities the listener calls into.
//!
//! Each callback returns `ControlFlow<()>`: `Continue(())` keeps walking,
//! `Break(())` stops the walk where it is. A stopped walk reports neither
//! completion nor error.
//!
//! Closures implement the single-callback traits directly, so the usual call
//! site looks like:
//!
//! ```
//! use std::ops::ControlFlow;
//! use otf_core::{
//!     ByteOrder, DispatchIndex, ErrorEvent, Field, Group, Ir, Listener, Outcome, PrimitiveType,
//!     Signal, INVALID_ID, VARIABLE_SIZE,
//! };
//!
//! const LE: ByteOrder = ByteOrder::LittleEndian;
//! let mut ir = Ir::new();
//! ir.add_token(0, VARIABLE_SIZE, Signal::BeginMessage, LE, PrimitiveType::None, 1, "Ping")
//!     .add_token(0, 0, Signal::BeginField, LE, PrimitiveType::None, 1, "seq")
//!     .add_token(0, 4, Signal::Encoding, LE, PrimitiveType::Uint32, INVALID_ID, "uint32")
//!     .add_token(0, 0, Signal::EndField, LE, PrimitiveType::None, 1, "seq")
//!     .add_token(0, VARIABLE_SIZE, Signal::EndMessage, LE, PrimitiveType::None, 1, "Ping");
//! let index = DispatchIndex::build(&ir).unwrap();
//! let buf = 7u32.to_le_bytes();
//!
//! let mut fields = 0;
//! let mut listener = Listener::new(&ir, &index);
//! listener.dispatch_message(1).unwrap().reset_for_decode(&buf, buf.len());
//! let outcome = listener.subscribe(
//!     &mut |_: &Field<'_>| {
//!         fields += 1;
//!         ControlFlow::Continue(())
//!     },
//!     &mut |_: &Group<'_>| ControlFlow::Continue(()),
//!     &mut |e: &ErrorEvent<'_>| {
//!         eprintln!("{}", e.message());
//!         ControlFlow::Continue(())
//!     },
//! );
//! assert_eq!(outcome, Outcome::Completed);
//! assert_eq!(fields, 1);
//! ```

use std::ops::ControlFlow;

use crate::event::{ErrorEvent, Field, Group};

pub trait FieldHandler {
    fn on_field(&mut self, field: &Field<'_>) -> ControlFlow<()>;
}

pub trait GroupHandler {
    fn on_group(&mut self, group: &Group<'_>) -> ControlFlow<()>;
}

pub trait ErrorHandler {
    fn on_error(&mut self, error: &ErrorEvent<'_>) -> ControlFlow<()>;
}

pub trait CompletionHandler {
    fn on_completed(&mut self) -> ControlFlow<()>;
}

impl<F> FieldHandler for F
where
    F: FnMut(&Field<'_>) -> ControlFlow<()>,
{
    #[inline]
    fn on_field(&mut self, field: &Field<'_>) -> ControlFlow<()> {
        self(field)
    }
}

impl<F> GroupHandler for F
where
    F: FnMut(&Group<'_>) -> ControlFlow<()>,
{
    #[inline]
    fn on_group(&mut self, group: &Group<'_>) -> ControlFlow<()> {
        self(group)
    }
}

impl<F> ErrorHandler for F
where
    F: FnMut(&ErrorEvent<'_>) -> ControlFlow<()>,
{
    #[inline]
    fn on_error(&mut self, error: &ErrorEvent<'_>) -> ControlFlow<()> {
        self(error)
    }
}

impl<F> CompletionHandler for F
where
    F: FnMut() -> ControlFlow<()>,
{
    #[inline]
    fn on_completed(&mut self) -> ControlFlow<()> {
        self()
    }
}

/// One object receiving every kind of event.
///
/// All methods default to `Continue`, so implementors override only what
/// they care about.
pub trait DecodeHandler {
    fn on_field(&mut self, _field: &Field<'_>) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn on_group(&mut self, _group: &Group<'_>) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn on_error(&mut self, _error: &ErrorEvent<'_>) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn on_completed(&mut self) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Completion handler that ignores completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreCompletion;

impl CompletionHandler for IgnoreCompletion {
    #[inline]
    fn on_completed(&mut self) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Bundles separate handlers into a single `DecodeHandler`.
pub(crate) struct Handlers<'h, F: ?Sized, G: ?Sized, E: ?Sized, C: ?Sized> {
    pub field: &'h mut F,
    pub group: &'h mut G,
    pub error: &'h mut E,
    pub completion: &'h mut C,
}

impl<F, G, E, C> DecodeHandler for Handlers<'_, F, G, E, C>
where
    F: FieldHandler + ?Sized,
    G: GroupHandler + ?Sized,
    E: ErrorHandler + ?Sized,
    C: CompletionHandler + ?Sized,
{
    #[inline]
    fn on_field(&mut self, field: &Field<'_>) -> ControlFlow<()> {
        self.field.on_field(field)
    }

    #[inline]
    fn on_group(&mut self, group: &Group<'_>) -> ControlFlow<()> {
        self.group.on_group(group)
    }

    #[inline]
    fn on_error(&mut self, error: &ErrorEvent<'_>) -> ControlFlow<()> {
        self.error.on_error(error)
    }

    #[inline]
    fn on_completed(&mut self) -> ControlFlow<()> {
        self.completion.on_completed()
    }
}
