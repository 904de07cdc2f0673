//! Redraw requests shared between the UI loop and background workers.

use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;


/// A cloneable flag raised whenever something visible changed.
///
/// Widgets and fetch workers call [`RedrawSignal::request`] after every
/// mutation; the main loop consumes it with [`RedrawSignal::take`].
#[derive( Debug, Clone, Default )]
pub struct RedrawSignal {
    pending: Arc<AtomicBool>,
}


impl RedrawSignal {
    pub fn new() -> Self {
        Self::default()
    }


    /// Marks the screen as stale.
    pub fn request( &self ) {
        self.pending.store( true, Ordering::Release );
    }


    /// Returns true (once) if a redraw was requested since the last call.
    pub fn take( &self ) -> bool {
        self.pending.swap( false, Ordering::AcqRel )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_take_consumes_request() {
        let signal = RedrawSignal::new();
        let worker = signal.clone();
        assert!( !signal.take() );

        worker.request();
        assert!( signal.take() );
        assert!( !signal.take() );
    }
}
