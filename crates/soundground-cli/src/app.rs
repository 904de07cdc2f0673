//! Application context and main loop.
//!
//! [`App`] owns every piece of UI state and routes keys and typed commands
//! to the widgets and collaborators. The loop itself is synchronous; the
//! fetch pool runs on the tokio runtime handed in at construction.

use std::io;
use std::sync::{ Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard };
use std::time::{ Duration, Instant };

use crossterm::event::{ KeyCode, KeyEvent, KeyModifiers };
use ratatui::backend::Backend;
use ratatui::Terminal;
use soundground_core::command::expand_list_path;
use soundground_core::metadata::catalog_url;
use soundground_core::playback::{ adjust_volume, toggle_pause };
use soundground_core::{
    Command, CredentialStore, Credentials, EntryStatus, EntryStore, FetchJob, FetchPool,
    ListEntry, MetadataSource, Playback, RedrawSignal,
};
use tokio::runtime::Handle;

use crate::input::{ EventSource, InputEvent };
use crate::layout::LayoutValue;
use crate::list::SelectableList;
use crate::status::{ PromptHost, StatusLine };
use crate::window::{ TitleBar, WindowGroup };


pub const PLAYLIST_PANE: &str = "playlist";
pub const STATUS_PANE: &str = "status";

/// Input poll interval of the main loop.
const POLL: Duration = Duration::from_millis( 50 );

/// Idle redraw interval, keeps the playback readout moving.
const TELEMETRY_TICK: Duration = Duration::from_millis( 200 );


/// Terminal, panes and the widgets that live in them.
pub struct Ui<B: Backend, E: EventSource> {
    terminal: Terminal<B>,
    group: WindowGroup,
    playlist: SelectableList,
    events: E,
    playback: Box<dyn Playback>,
}


impl<B: Backend, E: EventSource> Ui<B, E> {
    /// Lays out the screen: title row, playlist, and a status row at the
    /// bottom.
    pub fn new(
        terminal: Terminal<B>,
        events: E,
        playback: Box<dyn Playback>,
        redraw: RedrawSignal,
    ) -> anyhow::Result<Self> {
        let mut group = WindowGroup::new( terminal.size()? );
        group.create_pane(
            PLAYLIST_PANE,
            LayoutValue::fixed( 1 ),
            LayoutValue::fixed( 0 ),
            LayoutValue::percent( 100.0 ).offset( -2 ),
            LayoutValue::percent( 100.0 ),
        )?;
        group.create_pane(
            STATUS_PANE,
            LayoutValue::percent( 100.0 ).offset( -1 ),
            LayoutValue::fixed( 0 ),
            LayoutValue::fixed( 1 ),
            LayoutValue::percent( 100.0 ),
        )?;
        group.add_overlay( TitleBar::new() );

        Ok( Self {
            terminal,
            group,
            playlist: SelectableList::new( PLAYLIST_PANE, redraw ),
            events,
            playback,
        })
    }


    pub fn playback( &self ) -> &dyn Playback {
        self.playback.as_ref()
    }


    /// Repaints every widget and flushes one frame.
    pub fn render( &mut self, status: &mut StatusLine ) -> io::Result<()> {
        self.playlist.draw( &mut self.group );
        status.draw( &mut self.group, self.playback.as_ref() );
        self.group.draw( &mut self.terminal )
    }


    /// Follows a terminal resize.
    pub fn resize( &mut self, status: &mut StatusLine ) -> io::Result<()> {
        let playlist = &mut self.playlist;
        let playback = self.playback.as_ref();
        self.group.resize( &mut self.terminal, |group| {
            playlist.draw( group );
            status.draw( group, playback );
        })
    }
}


impl<B: Backend, E: EventSource> PromptHost for Ui<B, E> {
    fn next_key( &mut self, status: &mut StatusLine, timeout: Duration ) -> io::Result<Option<KeyEvent>> {
        match self.events.next_event( timeout )? {
            Some( InputEvent::Key( key ) ) => Ok( Some( key ) ),
            Some( InputEvent::Resize ) => {
                self.resize( status )?;
                Ok( None )
            }
            None => Ok( None ),
        }
    }


    fn redraw( &mut self, status: &mut StatusLine ) -> io::Result<()> {
        self.render( status )
    }
}


/// Collaborators the application is wired to.
pub struct Services {
    pub store: Box<dyn CredentialStore>,
    pub credentials: Arc<RwLock<Credentials>>,
    pub source: Arc<dyn MetadataSource>,
    pub workers: usize,
    pub catalog_base: String,
}


/// Application state.
pub struct App<B: Backend, E: EventSource> {
    ui: Ui<B, E>,
    status: StatusLine,
    credentials: Arc<RwLock<Credentials>>,
    store: Box<dyn CredentialStore>,
    pool: FetchPool,
    job: Option<FetchJob>,
    runtime: Handle,
    catalog_base: String,
    redraw: RedrawSignal,
    should_quit: bool,
}


impl<B: Backend, E: EventSource> App<B, E> {
    /// Creates the application. `redraw` must be the signal `ui` was
    /// built with.
    pub fn new( ui: Ui<B, E>, services: Services, runtime: Handle, redraw: RedrawSignal ) -> Self {
        Self {
            ui,
            status: StatusLine::new( STATUS_PANE, redraw.clone() ),
            credentials: services.credentials,
            store: services.store,
            pool: FetchPool::new( services.source, services.workers, redraw.clone() ),
            job: None,
            runtime,
            catalog_base: services.catalog_base,
            redraw,
            should_quit: false,
        }
    }


    pub fn status_mut( &mut self ) -> &mut StatusLine {
        &mut self.status
    }


    /// Runs until the user quits.
    pub fn run( &mut self ) -> io::Result<()> {
        tracing::info!( "Entering main loop" );
        self.ui.render( &mut self.status )?;
        let mut last_draw = Instant::now();

        while !self.should_quit {
            match self.ui.events.next_event( POLL )? {
                Some( InputEvent::Key( key ) ) => self.handle_key( key )?,
                Some( InputEvent::Resize ) => {
                    self.ui.resize( &mut self.status )?;
                    last_draw = Instant::now();
                    continue;
                }
                None => {}
            }

            if self.should_quit {
                break;
            }

            if self.redraw.take() || last_draw.elapsed() >= TELEMETRY_TICK {
                self.ui.render( &mut self.status )?;
                last_draw = Instant::now();
            }
        }

        self.cancel_job();
        tracing::info!( "Leaving main loop" );
        Ok(())
    }


    /// Handles one key press outside a prompt.
    pub fn handle_key( &mut self, key: KeyEvent ) -> io::Result<()> {
        if key.modifiers.contains( KeyModifiers::CONTROL ) {
            if key.code == KeyCode::Char( 'c' ) {
                self.should_quit = true;
            }
            return Ok(());
        }

        let playlist = &mut self.ui.playlist;
        match key.code {
            KeyCode::Char( ':' ) => {
                playlist.set_active( false );
                let line = self.status.prompt( &mut self.ui, ":", false );
                self.ui.playlist.set_active( true );
                if let Some( line ) = line? {
                    self.execute( &line )?;
                }
            }
            KeyCode::Char( 'q' ) => self.should_quit = true,
            KeyCode::Up | KeyCode::Char( 'k' ) => {
                playlist.select( -1, true );
            }
            KeyCode::Down | KeyCode::Char( 'j' ) => {
                playlist.select( 1, true );
            }
            KeyCode::PageUp => {
                playlist.page( -1 );
            }
            KeyCode::PageDown => {
                playlist.page( 1 );
            }
            KeyCode::Home => {
                playlist.first();
            }
            KeyCode::End => {
                playlist.last();
            }
            KeyCode::Enter => self.play_selected(),
            KeyCode::Delete | KeyCode::Char( 'x' ) => self.remove_selected(),
            KeyCode::Char( 'r' ) => self.retry_failed(),
            KeyCode::Char( ' ' ) => {
                if let Err( e ) = toggle_pause( self.ui.playback() ) {
                    self.status.notify( e.to_string() );
                }
                self.redraw.request();
            }
            KeyCode::Char( '+' ) | KeyCode::Char( '=' ) => self.change_volume( 1 ),
            KeyCode::Char( '-' ) => self.change_volume( -1 ),
            KeyCode::Esc => self.status.dismiss(),
            _ => {}
        }
        Ok(())
    }


    /// Parses and runs a command line typed at the prompt.
    ///
    /// Parse errors are shown on the status line. Only terminal IO errors
    /// are returned.
    pub fn execute( &mut self, line: &str ) -> io::Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        match Command::parse( line ) {
            Ok( command ) => self.run_command( command ),
            Err( e ) => {
                tracing::debug!( "Rejected command `{}`: {}", line, e );
                self.status.notify( e.to_string() );
                Ok(())
            }
        }
    }


    fn run_command( &mut self, command: Command ) -> io::Result<()> {
        tracing::debug!( "Running command: {:?}", command );
        match command {
            Command::Quit => self.should_quit = true,
            Command::PlayUrl { url } => self.play_source( &url ),
            Command::Login => self.login()?,
            Command::Logout => self.logout(),
            Command::List { path } => self.load_list( &path ),
        }
        Ok(())
    }


    fn read_credentials( &self ) -> RwLockReadGuard<'_, Credentials> {
        self.credentials.read().unwrap_or_else( PoisonError::into_inner )
    }


    fn write_credentials( &self ) -> RwLockWriteGuard<'_, Credentials> {
        self.credentials.write().unwrap_or_else( PoisonError::into_inner )
    }


    /// Asks for a username and password and optionally stores them.
    fn login( &mut self ) -> io::Result<()> {
        let current = self.read_credentials().username().map( str::to_string );
        if let Some( username ) = current {
            self.status.notify( format!( "Already logged in as {}", username ) );
            return Ok(());
        }

        let Some( username ) = self.status.prompt( &mut self.ui, "Username: ", false )? else {
            return Ok(());
        };
        let username = username.trim().to_string();
        if username.is_empty() {
            self.status.notify( "Login cancelled." );
            return Ok(());
        }

        let Some( password ) = self.status.prompt( &mut self.ui, "Password: ", true )? else {
            return Ok(());
        };
        let save = self.status
            .prompt( &mut self.ui, "Save credentials (y/N)? ", false )?
            .unwrap_or_default();

        let credentials = Credentials::new( username.as_str(), password );
        *self.write_credentials() = credentials.clone();
        tracing::info!( "Logged in as {}", username );

        if !save.trim().to_lowercase().starts_with( 'y' ) {
            self.status.notify( "Temporarily logged in. Restart soundground to log out." );
            return Ok(());
        }

        match self.store.save( &credentials ) {
            Ok(()) => self.status.notify( format!( "Logged in as {}.", username ) ),
            Err( e ) => {
                tracing::warn!( "Failed to save credentials: {}", e );
                self.status.notify( format!( "Logged in for this session only: {}", e ) );
            }
        }
        Ok(())
    }


    fn logout( &mut self ) {
        let cleared = {
            let mut credentials = self.write_credentials();
            credentials.clear();
            credentials.clone()
        };

        match self.store.save( &cleared ) {
            Ok(()) => self.status.notify( "Logged out." ),
            Err( e ) => {
                tracing::warn!( "Failed to clear stored credentials: {}", e );
                self.status.notify( format!( "Logged out for this session, stored login kept: {}", e ) );
            }
        }
    }


    /// Replaces the playlist with the contents of a catalog list.
    pub fn load_list( &mut self, path: &str ) {
        let username = self.read_credentials().username().map( str::to_string );
        let Some( path ) = expand_list_path( path, username.as_deref() ) else {
            self.show_message( "Please log in" );
            return;
        };

        let url = catalog_url( &self.catalog_base, &path );
        tracing::info!( "Loading list {}", url );

        self.show_message( format!( "Loading {}", url ) );
        let entries = self.ui.playlist.entries().clone();
        self.job = Some( self.pool.load( &self.runtime, url, entries ) );
    }


    /// Empties the playlist and leaves a single line of text in it.
    ///
    /// A store that a running fetch still writes to is swapped out instead
    /// of cleared, so its late results never reach the screen.
    fn show_message( &mut self, text: impl Into<String> ) {
        match self.job.take() {
            Some( job ) if !job.is_finished() => {
                job.cancel();
                self.ui.playlist.replace( EntryStore::new() );
            }
            _ => self.ui.playlist.clear(),
        }
        self.ui.playlist.add_entry( ListEntry::label( text ) );
    }


    fn cancel_job( &mut self ) {
        if let Some( job ) = self.job.take() {
            job.cancel();
        }
    }


    /// Returns true while a fetch run may still write into the playlist.
    fn fetch_running( &self ) -> bool {
        self.job.as_ref().is_some_and( |job| !job.is_finished() )
    }


    /// Drops the entry under the cursor. Refused while a fetch run is still
    /// writing into the list by index.
    fn remove_selected( &mut self ) {
        if self.fetch_running() {
            self.status.notify( "Wait for the list to finish loading." );
            return;
        }

        let index = self.ui.playlist.selected();
        match self.ui.playlist.remove( index ) {
            Ok( entry ) => tracing::debug!( "Removed {} from the playlist", entry.value ),
            Err( e ) => tracing::debug!( "Nothing to remove: {}", e ),
        }
    }


    /// Puts tracks whose fetch failed back to pending and fetches them again.
    fn retry_failed( &mut self ) {
        if self.fetch_running() {
            self.status.notify( "Wait for the list to finish loading." );
            return;
        }

        let retried = {
            let mut entries = self.ui.playlist.entries().write();
            let mut count = 0;
            for entry in entries.iter_mut().filter( |e| e.selectable && e.status == EntryStatus::Error ) {
                entry.caption = entry.value.clone();
                entry.status = EntryStatus::Pending;
                count += 1;
            }
            count
        };

        if retried == 0 {
            self.status.notify( "Nothing to retry." );
            return;
        }

        tracing::info!( "Retrying {} failed fetches", retried );
        self.redraw.request();
        let entries = self.ui.playlist.entries().clone();
        self.job = Some( self.pool.spawn( &self.runtime, entries ) );
    }


    fn play_selected( &mut self ) {
        let Some( entry ) = self.ui.playlist.selected_entry() else {
            return;
        };
        if !entry.selectable {
            return;
        }

        let source = entry.info
            .as_ref()
            .and_then( |info| info.playable_source() )
            .unwrap_or( &entry.value )
            .to_string();
        self.play_source( &source );
    }


    fn play_source( &mut self, source: &str ) {
        tracing::info!( "Playing {}", source );
        let playback = self.ui.playback();
        let result = playback.set_source( source ).and_then( |()| playback.play() );
        if let Err( e ) = result {
            tracing::warn!( "Failed to play {}: {}", source, e );
            self.status.notify( e.to_string() );
        }
        self.redraw.request();
    }


    fn change_volume( &mut self, steps: i32 ) {
        match adjust_volume( self.ui.playback(), steps ) {
            Ok( volume ) => tracing::debug!( "Volume set to {}", volume ),
            Err( e ) => self.status.notify( e.to_string() ),
        }
        self.redraw.request();
    }
}


#[cfg( test )]
mod tests {
    use std::collections::HashMap;
    use std::rc::Rc;

    use ratatui::backend::TestBackend;
    use soundground_core::TrackInfo;

    use super::*;
    use crate::layout::row_text;
    use crate::test_utils::{ key, typing, FakePlayback, MemoryStore, ScriptedEvents, SharedPlayback, StaticSource };


    struct Harness {
        app: App<TestBackend, ScriptedEvents>,
        playback: Rc<FakePlayback>,
        store: MemoryStore,
        runtime: tokio::runtime::Runtime,
    }


    fn harness( keys: Vec<KeyEvent>, store: MemoryStore, source: StaticSource ) -> Harness {
        // Spawned fetch tasks only make progress inside `block_on`.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let redraw = RedrawSignal::new();
        let playback = Rc::new( FakePlayback::default() );

        let terminal = Terminal::new( TestBackend::new( 40, 8 ) ).unwrap();
        let ui = Ui::new(
            terminal,
            ScriptedEvents::keys( keys ),
            Box::new( SharedPlayback( Rc::clone( &playback ) ) ),
            redraw.clone(),
        ).unwrap();

        let services = Services {
            store: Box::new( store.clone() ),
            credentials: Arc::new( RwLock::new( store.load().unwrap_or_default() ) ),
            source: Arc::new( source ),
            workers: 2,
            catalog_base: "https://soundcloud.com/".into(),
        };
        let app = App::new( ui, services, runtime.handle().clone(), redraw );

        Harness { app, playback, store, runtime }
    }


    fn status_text( app: &mut App<TestBackend, ScriptedEvents> ) -> String {
        app.status.render_text( &FakePlayback::default() )
    }


    fn captions( app: &App<TestBackend, ScriptedEvents> ) -> Vec<String> {
        app.ui.playlist.entries().read().iter().map( |e| e.caption.clone() ).collect()
    }


    #[test]
    fn test_quit_key_ends_loop() {
        let mut h = harness( typing( "jq" ), MemoryStore::default(), StaticSource::default() );
        h.app.run().unwrap();
        assert!( h.app.should_quit );
    }


    #[test]
    fn test_screen_layout() {
        let mut h = harness( typing( "q" ), MemoryStore::default(), StaticSource::default() );
        h.app.ui.playlist.add_entry( ListEntry::new( "first track" ) );
        h.app.run().unwrap();

        let buffer = h.app.ui.terminal.backend().buffer().clone();
        assert!( row_text( &buffer, 0 ).contains( "Soundground v" ) );
        assert!( row_text( &buffer, 1 ).starts_with( "first track" ) );
        assert!( row_text( &buffer, 7 ).contains( "vol 100" ) );
    }


    #[test]
    fn test_login_and_save() {
        let keys = [ typing( ":login\n" ), typing( "bob\n" ), typing( "hunter2\n" ), typing( "y\nq" ) ].concat();
        let mut h = harness( keys, MemoryStore::default(), StaticSource::default() );
        h.app.run().unwrap();

        assert_eq!( h.app.read_credentials().username(), Some( "bob" ) );
        assert_eq!( h.store.saved.borrow().clone(), Some( Credentials::new( "bob", "hunter2" ) ) );
        assert_eq!( status_text( &mut h.app ), "Logged in as bob." );
    }


    #[test]
    fn test_login_without_saving() {
        let keys = [ typing( ":login\n" ), typing( "bob\n" ), typing( "pw\n" ), typing( "\nq" ) ].concat();
        let mut h = harness( keys, MemoryStore::default(), StaticSource::default() );
        h.app.run().unwrap();

        assert_eq!( h.app.read_credentials().username(), Some( "bob" ) );
        assert!( h.store.saved.borrow().is_none() );
        assert_eq!( status_text( &mut h.app ), "Temporarily logged in. Restart soundground to log out." );
    }


    #[test]
    fn test_login_when_already_logged_in() {
        let store = MemoryStore::default();
        store.save( &Credentials::new( "alice", "pw" ) ).unwrap();
        let mut h = harness( typing( ":login\nq" ), store, StaticSource::default() );
        h.app.run().unwrap();

        assert_eq!( status_text( &mut h.app ), "Already logged in as alice" );
    }


    #[test]
    fn test_login_save_failure_keeps_session() {
        let keys = [ typing( ":login\n" ), typing( "bob\n" ), typing( "pw\n" ), typing( "y\nq" ) ].concat();
        let mut h = harness( keys, MemoryStore::failing(), StaticSource::default() );
        h.app.run().unwrap();

        assert_eq!( h.app.read_credentials().username(), Some( "bob" ) );
        assert!( status_text( &mut h.app ).starts_with( "Logged in for this session only" ) );
    }


    #[test]
    fn test_logout() {
        let store = MemoryStore::default();
        store.save( &Credentials::new( "alice", "pw" ) ).unwrap();
        let mut h = harness( typing( ":logout\nq" ), store, StaticSource::default() );
        h.app.run().unwrap();

        assert!( !h.app.read_credentials().is_logged_in() );
        assert_eq!( h.store.saved.borrow().clone(), Some( Credentials::default() ) );
        assert_eq!( status_text( &mut h.app ), "Logged out." );
    }


    #[test]
    fn test_unknown_and_incomplete_commands_notify() {
        let mut h = harness( typing( ":frobnicate\nq" ), MemoryStore::default(), StaticSource::default() );
        h.app.run().unwrap();
        assert_eq!( status_text( &mut h.app ), "Unknown command `frobnicate`" );

        h.app.execute( "playurl" ).unwrap();
        assert_eq!( status_text( &mut h.app ), "Missing argument: url" );
    }


    #[test]
    fn test_cancelled_prompt_runs_nothing() {
        let mut h = harness( typing( ":quit\x1bj" ), MemoryStore::default(), StaticSource::default() );
        // The script runs dry after `j`, which ends the loop with an error.
        assert!( h.app.run().is_err() );
        assert!( !h.app.should_quit );
    }


    #[test]
    fn test_list_you_requires_login() {
        let mut h = harness( typing( ":list you/likes\nq" ), MemoryStore::default(), StaticSource::default() );
        h.app.run().unwrap();

        assert_eq!( captions( &h.app ), vec![ "Please log in".to_string() ] );
        assert!( h.app.job.is_none() );
    }


    #[test]
    fn test_list_loads_and_fetches() {
        let store = MemoryStore::default();
        store.save( &Credentials::new( "bob", "pw" ) ).unwrap();

        let one = "https://soundcloud.com/bob/one".to_string();
        let two = "https://soundcloud.com/bob/two".to_string();
        let source = StaticSource {
            tracks: HashMap::from([(
                one.clone(),
                TrackInfo {
                    title: "One".into(),
                    uploader: Some( "Bob".into() ),
                    webpage_url: Some( one.clone() ),
                    ..Default::default()
                },
            )]),
            listings: HashMap::from([(
                "https://soundcloud.com/bob/likes".to_string(),
                vec![ one.clone(), two.clone() ],
            )]),
        };

        let mut h = harness( Vec::new(), store, source );
        h.app.load_list( "you/likes" );
        assert_eq!( captions( &h.app ), vec![ "Loading https://soundcloud.com/bob/likes".to_string() ] );

        let job = h.app.job.take().unwrap();
        h.runtime.block_on( job.wait() );

        let entries = h.app.ui.playlist.entries().read().clone();
        assert_eq!( entries.len(), 2 );
        assert_eq!( entries[ 0 ].caption, "Bob - One" );
        assert_eq!( entries[ 0 ].status, EntryStatus::Ready );
        assert_eq!( entries[ 1 ].status, EntryStatus::Error );
    }


    #[test]
    fn test_retry_refetches_failed_entries() {
        let url = "https://soundcloud.com/bob/one".to_string();
        let mut h = harness( Vec::new(), MemoryStore::default(), StaticSource::default() );
        h.app.ui.playlist.add_entry( ListEntry::new( url.clone() ) );
        h.app.ui.playlist.entries().update( 0, |e| {
            e.caption = "Unable to download".into();
            e.status = EntryStatus::Error;
        });

        h.app.handle_key( key( KeyCode::Char( 'r' ) ) ).unwrap();
        assert_eq!( captions( &h.app ), vec![ url.clone() ] );

        // The source knows no tracks, so the retry fails again.
        let job = h.app.job.take().unwrap();
        h.runtime.block_on( job.wait() );
        let entry = h.app.ui.playlist.selected_entry().unwrap();
        assert_eq!( entry.status, EntryStatus::Error );
        assert_eq!( entry.value, url );

        h.app.ui.playlist.entries().update( 0, |e| e.status = EntryStatus::Ready );
        h.app.handle_key( key( KeyCode::Char( 'r' ) ) ).unwrap();
        assert!( h.app.job.is_none() );
        assert_eq!( status_text( &mut h.app ), "Nothing to retry." );
    }


    #[test]
    fn test_new_list_swaps_store() {
        let mut h = harness( Vec::new(), MemoryStore::default(), StaticSource::default() );
        h.app.load_list( "someone/likes" );
        let first = h.app.ui.playlist.entries().clone();

        h.app.load_list( "someone/reposts" );
        assert!( h.app.job.is_some() );
        assert_eq!( captions( &h.app ), vec![ "Loading https://soundcloud.com/someone/reposts".to_string() ] );

        // A late write from the abandoned run stays off screen.
        assert_eq!( first.get( 0 ).unwrap().caption, "Loading https://soundcloud.com/someone/likes" );
        first.update( 0, |e| e.caption = "stale".into() );
        assert_eq!( captions( &h.app ), vec![ "Loading https://soundcloud.com/someone/reposts".to_string() ] );
    }


    #[test]
    fn test_message_reuses_idle_store() {
        let mut h = harness( Vec::new(), MemoryStore::default(), StaticSource::default() );
        h.app.ui.playlist.add_entry( ListEntry::new( "old track" ) );
        let handle = h.app.ui.playlist.entries().clone();

        h.app.load_list( "you/likes" );
        let shown: Vec<String> = handle.read().iter().map( |e| e.caption.clone() ).collect();
        assert_eq!( shown, vec![ "Please log in".to_string() ] );
        assert!( !h.app.ui.playlist.selected_entry().unwrap().selectable );
    }


    #[test]
    fn test_delete_key_removes_selected_entry() {
        let mut h = harness( typing( "jxq" ), MemoryStore::default(), StaticSource::default() );
        for caption in [ "a", "b", "c" ] {
            h.app.ui.playlist.add_entry( ListEntry::new( caption ) );
        }
        h.app.run().unwrap();

        assert_eq!( captions( &h.app ), vec![ "a".to_string(), "c".to_string() ] );
        assert_eq!( h.app.ui.playlist.selected(), 1 );

        h.app.handle_key( key( KeyCode::Delete ) ).unwrap();
        h.app.handle_key( key( KeyCode::Delete ) ).unwrap();
        h.app.handle_key( key( KeyCode::Delete ) ).unwrap();
        assert!( h.app.ui.playlist.entries().is_empty() );
    }


    #[test]
    fn test_delete_refused_while_loading() {
        let mut h = harness( Vec::new(), MemoryStore::default(), StaticSource::default() );
        h.app.load_list( "someone/likes" );
        h.app.handle_key( key( KeyCode::Char( 'x' ) ) ).unwrap();

        assert_eq!( captions( &h.app ), vec![ "Loading https://soundcloud.com/someone/likes".to_string() ] );
        assert_eq!( status_text( &mut h.app ), "Wait for the list to finish loading." );
    }


    #[test]
    fn test_enter_plays_selected_entry() {
        let mut h = harness( vec![ key( KeyCode::Enter ), key( KeyCode::Char( 'q' ) ) ], MemoryStore::default(), StaticSource::default() );
        h.app.ui.playlist.add_entry( ListEntry::with_value( "Bob - One", "https://soundcloud.com/bob/one" ) );
        h.app.run().unwrap();

        assert_eq!( h.playback.source.borrow().as_deref(), Some( "https://soundcloud.com/bob/one" ) );
        assert!( h.playback.is_playing() );
    }


    #[test]
    fn test_playurl_failure_notifies() {
        let mut h = harness( typing( ":playurl https://example.com/a.mp3\nq" ), MemoryStore::default(), StaticSource::default() );
        h.playback.reject.set( true );
        h.app.run().unwrap();

        assert_eq!( status_text( &mut h.app ), "Player rejected command: fake failure" );
    }


    #[test]
    fn test_volume_keys_clamp() {
        let mut h = harness( typing( "+++q" ), MemoryStore::default(), StaticSource::default() );
        h.playback.volume.set( 120 );
        h.app.run().unwrap();
        assert_eq!( h.playback.volume.get(), 150 );

        h.app.handle_key( key( KeyCode::Char( '-' ) ) ).unwrap();
        assert_eq!( h.playback.volume.get(), 140 );
    }


    #[test]
    fn test_space_toggles_pause() {
        let mut h = harness( Vec::new(), MemoryStore::default(), StaticSource::default() );
        h.app.handle_key( key( KeyCode::Char( ' ' ) ) ).unwrap();
        assert!( h.playback.is_playing() );
        h.app.handle_key( key( KeyCode::Char( ' ' ) ) ).unwrap();
        assert!( !h.playback.is_playing() );
    }


    #[test]
    fn test_navigation_keys() {
        let mut h = harness( Vec::new(), MemoryStore::default(), StaticSource::default() );
        for i in 0..10 {
            h.app.ui.playlist.add_entry( ListEntry::new( format!( "track {}", i ) ) );
        }
        h.app.ui.playlist.set_viewport( 4 );

        h.app.handle_key( key( KeyCode::End ) ).unwrap();
        assert_eq!( h.app.ui.playlist.selected(), 9 );
        h.app.handle_key( key( KeyCode::PageUp ) ).unwrap();
        assert_eq!( h.app.ui.playlist.selected(), 5 );
        h.app.handle_key( key( KeyCode::Char( 'k' ) ) ).unwrap();
        assert_eq!( h.app.ui.playlist.selected(), 4 );
        h.app.handle_key( key( KeyCode::Home ) ).unwrap();
        assert_eq!( h.app.ui.playlist.selected(), 0 );
    }


    #[test]
    fn test_escape_dismisses_notification() {
        let mut h = harness( Vec::new(), MemoryStore::default(), StaticSource::default() );
        h.app.status_mut().notify( "hello" );
        h.app.handle_key( key( KeyCode::Esc ) ).unwrap();
        assert!( status_text( &mut h.app ).contains( "vol" ) );
    }
}
