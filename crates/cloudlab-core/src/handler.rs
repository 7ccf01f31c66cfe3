//! Event handling.

use crate::event::Event;

/// Component that receives events delivered by [`Simulation`](crate::Simulation).
///
/// The handler runs to completion: events emitted while processing are only put into the queue
/// and are delivered after `on` returns. See the crate docs for a complete component.
pub trait EventHandler {
    /// Processes event addressed to the component.
    fn on(&mut self, event: Event);
}

/// Dispatches the event payload to the arm with the matching type.
///
/// Each arm destructures one payload struct. Arms need not be exhaustive,
/// a payload matching none of them is logged as an error and dropped.
#[macro_export]
macro_rules! cast {
    ( match $event:ident.data { $($arms:tt)+ } ) => {
        $crate::__cast_arms!($event, $($arms)+)
    };
}

// Tries arms in order, a failed downcast hands the payload back to the event for the next arm.
#[doc(hidden)]
#[macro_export]
macro_rules! __cast_arms {
    ($event:ident, $type:ident { $($tt:tt)* } => { $($expr:tt)* } $($rest:tt)*) => {
        match $event.data.downcast::<$type>() {
            Ok(__value) => {
                let $type { $($tt)* } = *__value;
                $($expr)*
            }
            Err(__data) => {
                let $event = $crate::Event { data: __data, ..$event };
                $crate::__cast_arms!($event, $($rest)*)
            }
        }
    };
    ($event:ident,) => {
        $crate::log::log_unhandled_event($event)
    };
}
