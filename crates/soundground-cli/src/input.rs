//! Terminal input.
//!
//! Provides the event source the main loop and the prompt poll, and the
//! text buffer the prompt collects into.

use std::io;
use std::time::Duration;

use crossterm::event::{ self, Event, KeyEvent, KeyEventKind };


/// Input relevant to the UI.
#[derive( Debug, Clone, PartialEq, Eq )]
pub enum InputEvent {
    Key( KeyEvent ),
    Resize,
}


/// Source of input events.
pub trait EventSource {
    /// Waits up to `timeout` for the next event.
    ///
    /// Returns `Ok(None)` when nothing relevant arrived in time.
    fn next_event( &mut self, timeout: Duration ) -> io::Result<Option<InputEvent>>;
}


/// Reads events from the real terminal through crossterm.
#[derive( Debug, Default )]
pub struct TerminalEvents;


impl EventSource for TerminalEvents {
    fn next_event( &mut self, timeout: Duration ) -> io::Result<Option<InputEvent>> {
        if !event::poll( timeout )? {
            return Ok( None );
        }

        Ok( match event::read()? {
            Event::Key( key ) if key.kind == KeyEventKind::Press => Some( InputEvent::Key( key ) ),
            Event::Resize( _, _ ) => Some( InputEvent::Resize ),
            _ => None,
        })
    }
}


/// Text buffer for prompt entry.
///
/// Editing happens at the end of the line only.
#[derive( Debug, Clone, Default, PartialEq, Eq )]
pub struct InputBuffer {
    content: String,
}


impl InputBuffer {
    /// Creates a new empty input buffer.
    pub fn new() -> Self {
        Self::default()
    }


    /// Appends a character.
    pub fn insert( &mut self, c: char ) {
        self.content.push( c );
    }


    /// Deletes the last character.
    pub fn backspace( &mut self ) {
        self.content.pop();
    }


    /// Clears the buffer.
    pub fn clear( &mut self ) {
        self.content.clear();
    }


    /// Gets the current content.
    pub fn content( &self ) -> &str {
        &self.content
    }


    /// Text to show on screen; one `*` per character when masked.
    pub fn display( &self, masked: bool ) -> String {
        if masked {
            "*".repeat( self.content.chars().count() )
        } else {
            self.content.clone()
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_backspace_removes_whole_char() {
        let mut buffer = InputBuffer::new();
        buffer.insert( 'h' );
        buffer.insert( 'é' );
        buffer.backspace();
        assert_eq!( buffer.content(), "h" );

        buffer.backspace();
        buffer.backspace();
        assert_eq!( buffer.content(), "" );
    }


    #[test]
    fn test_masked_display_counts_chars() {
        let mut buffer = InputBuffer::new();
        for c in "pä55".chars() {
            buffer.insert( c );
        }
        assert_eq!( buffer.display( true ), "****" );
        assert_eq!( buffer.display( false ), "pä55" );
    }
}
