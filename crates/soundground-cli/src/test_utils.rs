//! Fakes shared by the UI tests.

use std::cell::{ Cell, RefCell };
use std::collections::{ HashMap, VecDeque };
use std::io;
use std::rc::Rc;
use std::time::Duration;

use crossterm::event::{ KeyCode, KeyEvent, KeyModifiers };
use soundground_core::{
    CredentialError, CredentialStore, Credentials, ExtractError, MetadataSource, Playback,
    PlaybackError, TrackInfo,
};

use crate::input::{ EventSource, InputEvent };


pub fn key( code: KeyCode ) -> KeyEvent {
    KeyEvent::new( code, KeyModifiers::NONE )
}


/// Keys for typing `text`. `\n` is Enter, `\x1b` Esc and `\x08` Backspace.
pub fn typing( text: &str ) -> Vec<KeyEvent> {
    text.chars()
        .map( |c| match c {
            '\n' => key( KeyCode::Enter ),
            '\x1b' => key( KeyCode::Esc ),
            '\x08' => key( KeyCode::Backspace ),
            c => key( KeyCode::Char( c ) ),
        })
        .collect()
}


/// Playback engine whose state tests set directly.
pub struct FakePlayback {
    pub playing: Cell<bool>,
    pub title: RefCell<String>,
    pub source: RefCell<Option<String>>,
    pub fraction: Cell<f64>,
    pub length: Cell<i64>,
    pub volume: Cell<i32>,
    pub reject: Cell<bool>,
}


impl Default for FakePlayback {
    fn default() -> Self {
        Self {
            playing: Cell::new( false ),
            title: RefCell::new( String::new() ),
            source: RefCell::new( None ),
            fraction: Cell::new( 0.0 ),
            length: Cell::new( 0 ),
            volume: Cell::new( 100 ),
            reject: Cell::new( false ),
        }
    }
}


impl FakePlayback {
    fn check( &self ) -> Result<(), PlaybackError> {
        if self.reject.get() {
            Err( PlaybackError::Rejected( "fake failure".into() ) )
        } else {
            Ok(())
        }
    }
}


impl Playback for FakePlayback {
    fn play( &self ) -> Result<(), PlaybackError> {
        self.check()?;
        self.playing.set( true );
        Ok(())
    }

    fn pause( &self ) -> Result<(), PlaybackError> {
        self.check()?;
        self.playing.set( false );
        Ok(())
    }

    fn is_playing( &self ) -> bool {
        self.playing.get()
    }

    fn set_source( &self, identifier: &str ) -> Result<(), PlaybackError> {
        self.check()?;
        self.source.replace( Some( identifier.to_string() ) );
        self.playing.set( true );
        Ok(())
    }

    fn title( &self ) -> String {
        self.title.borrow().clone()
    }

    fn position_fraction( &self ) -> f64 {
        self.fraction.get()
    }

    fn length_millis( &self ) -> i64 {
        self.length.get()
    }

    fn volume( &self ) -> i32 {
        self.volume.get()
    }

    fn set_volume( &self, volume: i32 ) -> Result<(), PlaybackError> {
        self.check()?;
        self.volume.set( volume );
        Ok(())
    }
}


/// Read-only view onto a [`FakePlayback`] after it was boxed into the UI.
#[derive( Clone )]
pub struct SharedPlayback( pub Rc<FakePlayback> );


impl Playback for SharedPlayback {
    fn play( &self ) -> Result<(), PlaybackError> {
        self.0.play()
    }

    fn pause( &self ) -> Result<(), PlaybackError> {
        self.0.pause()
    }

    fn is_playing( &self ) -> bool {
        self.0.is_playing()
    }

    fn set_source( &self, identifier: &str ) -> Result<(), PlaybackError> {
        self.0.set_source( identifier )
    }

    fn title( &self ) -> String {
        self.0.title()
    }

    fn position_fraction( &self ) -> f64 {
        self.0.position_fraction()
    }

    fn length_millis( &self ) -> i64 {
        self.0.length_millis()
    }

    fn volume( &self ) -> i32 {
        self.0.volume()
    }

    fn set_volume( &self, volume: i32 ) -> Result<(), PlaybackError> {
        self.0.set_volume( volume )
    }
}


/// In-memory credential store; clones share the saved value.
#[derive( Clone, Default )]
pub struct MemoryStore {
    pub saved: Rc<RefCell<Option<Credentials>>>,
    pub fail: bool,
}


impl MemoryStore {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }
}


impl CredentialStore for MemoryStore {
    fn load( &self ) -> Result<Credentials, CredentialError> {
        self.saved.borrow().clone().ok_or( CredentialError::NotFound )
    }

    fn save( &self, credentials: &Credentials ) -> Result<(), CredentialError> {
        if self.fail {
            return Err( CredentialError::Io( io::Error::new( io::ErrorKind::PermissionDenied, "read-only" ) ) );
        }
        self.saved.replace( Some( credentials.clone() ) );
        Ok(())
    }
}


/// Metadata source answering from fixed tables.
#[derive( Default )]
pub struct StaticSource {
    pub tracks: HashMap<String, TrackInfo>,
    pub listings: HashMap<String, Vec<String>>,
}


impl MetadataSource for StaticSource {
    fn extract( &self, url: &str ) -> Result<TrackInfo, ExtractError> {
        self.tracks
            .get( url )
            .cloned()
            .ok_or_else( || ExtractError::Failed( format!( "ERROR: Unable to download {}", url ) ) )
    }

    fn list( &self, url: &str ) -> Result<Vec<String>, ExtractError> {
        self.listings
            .get( url )
            .cloned()
            .ok_or_else( || ExtractError::Failed( format!( "ERROR: {} not found", url ) ) )
    }
}


/// Event source replaying a fixed script.
///
/// Runs out with an `UnexpectedEof` error so a test that forgets to quit
/// fails instead of hanging.
#[derive( Default )]
pub struct ScriptedEvents {
    events: VecDeque<InputEvent>,
}


impl ScriptedEvents {
    pub fn new( events: impl IntoIterator<Item = InputEvent> ) -> Self {
        Self { events: events.into_iter().collect() }
    }


    pub fn keys( keys: impl IntoIterator<Item = KeyEvent> ) -> Self {
        Self::new( keys.into_iter().map( InputEvent::Key ) )
    }
}


impl EventSource for ScriptedEvents {
    fn next_event( &mut self, _timeout: Duration ) -> io::Result<Option<InputEvent>> {
        self.events
            .pop_front()
            .map( Some )
            .ok_or_else( || io::Error::new( io::ErrorKind::UnexpectedEof, "event script exhausted" ) )
    }
}
