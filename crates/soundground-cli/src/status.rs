//! Status line.
//!
//! One row at the bottom of the screen. By default it shows what the player
//! is doing; [`StatusLine::notify`] temporarily replaces that with a message,
//! and [`StatusLine::prompt`] turns the row into a blocking text field.
//!
//! The prompt is a small state machine. Keys are fed to
//! [`StatusLine::handle_key`] one at a time, and the blocking call just polls
//! the host for keys until the machine reaches a terminal state.

use std::io;
use std::time::Duration;

use crossterm::event::{ KeyCode, KeyEvent, KeyModifiers };
use ratatui::style::{ Modifier, Style };
use soundground_core::playback::format_millis;
use soundground_core::{ Playback, RedrawSignal };
use unicode_width::UnicodeWidthStr;

use crate::input::InputBuffer;
use crate::window::WindowGroup;


/// Number of draws a notification stays up.
pub const NOTIFY_TICKS: u32 = 30;

/// How long the prompt waits for a key before checking for redraws.
const PROMPT_POLL: Duration = Duration::from_millis( 50 );


/// Prompt progress.
#[derive( Debug, Clone, Default, PartialEq, Eq )]
pub enum PromptState {
    #[default]
    Idle,
    Collecting {
        label: String,
        masked: bool,
        buffer: InputBuffer,
    },
    Done( String ),
    Cancelled,
}


/// What the prompt needs from the surrounding UI while it blocks.
pub trait PromptHost {
    /// Waits up to `timeout` for a key press.
    ///
    /// Non-key events such as resizes are handled by the host before it
    /// returns.
    fn next_key( &mut self, status: &mut StatusLine, timeout: Duration ) -> io::Result<Option<KeyEvent>>;

    /// Repaints the screen, status line included.
    fn redraw( &mut self, status: &mut StatusLine ) -> io::Result<()>;
}


/// Single-row status and prompt widget.
pub struct StatusLine {
    pane: String,
    override_text: Option<String>,
    ticks: u32,
    prompt: PromptState,
    redraw: RedrawSignal,
}


impl StatusLine {
    /// Creates a status line drawn into the pane named `pane`.
    pub fn new( pane: impl Into<String>, redraw: RedrawSignal ) -> Self {
        Self {
            pane: pane.into(),
            override_text: None,
            ticks: 0,
            prompt: PromptState::Idle,
            redraw,
        }
    }


    /// Shows `text` for the next [`NOTIFY_TICKS`] draws.
    pub fn notify( &mut self, text: impl Into<String> ) {
        let text = text.into();
        tracing::debug!( "Notify: {}", text );
        self.override_text = Some( text );
        self.ticks = NOTIFY_TICKS;
        self.redraw.request();
    }


    /// Drops the current notification.
    pub fn dismiss( &mut self ) {
        self.ticks = 0;
        self.redraw.request();
    }


    pub fn is_prompting( &self ) -> bool {
        matches!( self.prompt, PromptState::Collecting { .. } )
    }


    /// Text for the next draw.
    ///
    /// Each call outside a prompt spends one tick of the notification.
    pub fn render_text( &mut self, playback: &dyn Playback ) -> String {
        if let PromptState::Collecting { label, masked, buffer } = &self.prompt {
            return format!( "{}{}", label, buffer.display( *masked ) );
        }

        if self.ticks > 0 {
            if let Some( text ) = &self.override_text {
                self.ticks -= 1;
                return text.clone();
            }
        }

        telemetry( playback )
    }


    /// Renders into the bound pane.
    pub fn draw( &mut self, group: &mut WindowGroup, playback: &dyn Playback ) {
        let text = self.render_text( playback );
        let Some( pane ) = group.pane_mut( &self.pane ) else {
            return;
        };

        pane.clear();
        pane.put_line( 0, &text, Style::default() );
        if self.is_prompting() {
            let col = u16::try_from( text.width() ).unwrap_or( u16::MAX );
            pane.style_cell( 0, col, Style::default().add_modifier( Modifier::REVERSED ) );
        }
    }


    /// Starts collecting input behind `label`.
    pub fn begin_prompt( &mut self, label: &str, masked: bool ) {
        self.prompt = PromptState::Collecting {
            label: label.to_string(),
            masked,
            buffer: InputBuffer::new(),
        };
        self.redraw.request();
    }


    /// Feeds one key to the prompt.
    ///
    /// @returns true if the key was consumed
    pub fn handle_key( &mut self, key: KeyEvent ) -> bool {
        let PromptState::Collecting { buffer, .. } = &mut self.prompt else {
            return false;
        };

        let control = key.modifiers.contains( KeyModifiers::CONTROL );
        let next = match key.code {
            KeyCode::Enter => Some( PromptState::Done( buffer.content().to_string() ) ),
            KeyCode::Esc => Some( PromptState::Cancelled ),
            KeyCode::Char( 'c' ) if control => Some( PromptState::Cancelled ),
            KeyCode::Char( 'u' ) if control => {
                buffer.clear();
                None
            }
            KeyCode::Char( c ) if !control && !key.modifiers.contains( KeyModifiers::ALT ) => {
                buffer.insert( c );
                None
            }
            KeyCode::Backspace => {
                buffer.backspace();
                None
            }
            _ => return false,
        };

        if let Some( state ) = next {
            self.prompt = state;
        }
        self.redraw.request();
        true
    }


    /// Takes the outcome of a finished prompt and returns to idle.
    ///
    /// Returns `None` if the prompt was cancelled or never finished.
    pub fn finish_prompt( &mut self ) -> Option<String> {
        match std::mem::take( &mut self.prompt ) {
            PromptState::Done( text ) => Some( text ),
            PromptState::Collecting { .. } | PromptState::Cancelled | PromptState::Idle => None,
        }
    }


    /// Asks the user for a line of text, blocking until Enter or Esc.
    ///
    /// Masked prompts echo `*` per character. The result never includes
    /// the label.
    ///
    /// @returns The entered text, or `None` when cancelled
    pub fn prompt<H: PromptHost + ?Sized>(
        &mut self,
        host: &mut H,
        label: &str,
        masked: bool,
    ) -> io::Result<Option<String>> {
        self.begin_prompt( label, masked );

        let outcome = loop {
            if !self.is_prompting() {
                break Ok( self.finish_prompt() );
            }

            if self.redraw.take() {
                if let Err( e ) = host.redraw( self ) {
                    break Err( e );
                }
            }

            match host.next_key( self, PROMPT_POLL ) {
                Ok( Some( key ) ) => {
                    self.handle_key( key );
                }
                Ok( None ) => {}
                Err( e ) => break Err( e ),
            }
        };

        if outcome.is_err() {
            self.prompt = PromptState::Idle;
        }
        self.redraw.request();
        outcome
    }
}


/// Default player readout.
fn telemetry( playback: &dyn Playback ) -> String {
    let glyph = if playback.is_playing() { '▶' } else { '⏸' };
    let length = playback.length_millis();
    let position = ( playback.position_fraction().clamp( 0.0, 1.0 ) * length as f64 ) as i64;

    format!(
        "{} {} {}/{} vol {}",
        glyph,
        playback.title(),
        format_millis( position ),
        format_millis( length ),
        playback.volume(),
    )
}


#[cfg( test )]
mod tests {
    use std::collections::VecDeque;

    use ratatui::layout::Size;

    use super::*;
    use crate::layout::{ row_text, LayoutValue };
    use crate::test_utils::{ key, typing, FakePlayback };


    fn status_group( width: u16 ) -> WindowGroup {
        let mut group = WindowGroup::new( Size::new( width, 1 ) );
        group.create_pane(
            "status",
            LayoutValue::fixed( 0 ),
            LayoutValue::fixed( 0 ),
            LayoutValue::fixed( 1 ),
            LayoutValue::percent( 100.0 ),
        ).unwrap();
        group
    }


    /// Feeds scripted keys and records every repaint of the status row.
    struct ScriptedHost {
        keys: VecDeque<KeyEvent>,
        group: WindowGroup,
        playback: FakePlayback,
        frames: Vec<String>,
    }


    impl ScriptedHost {
        fn new( keys: Vec<KeyEvent> ) -> Self {
            Self {
                keys: keys.into(),
                group: status_group( 30 ),
                playback: FakePlayback::default(),
                frames: Vec::new(),
            }
        }
    }


    impl PromptHost for ScriptedHost {
        fn next_key( &mut self, _status: &mut StatusLine, _timeout: Duration ) -> io::Result<Option<KeyEvent>> {
            self.keys
                .pop_front()
                .map( Some )
                .ok_or_else( || io::Error::new( io::ErrorKind::UnexpectedEof, "script exhausted" ) )
        }

        fn redraw( &mut self, status: &mut StatusLine ) -> io::Result<()> {
            status.draw( &mut self.group, &self.playback );
            let row = row_text( self.group.pane( "status" ).unwrap().surface(), 0 );
            self.frames.push( row.trim_end().to_string() );
            Ok(())
        }
    }


    #[test]
    fn test_telemetry_readout() {
        let playback = FakePlayback::default();
        playback.title.replace( "Night Drive".into() );
        playback.playing.set( true );
        playback.length.set( 200_000 );
        playback.fraction.set( 0.5 );
        playback.volume.set( 80 );

        let mut status = StatusLine::new( "status", RedrawSignal::new() );
        assert_eq!( status.render_text( &playback ), "▶ Night Drive 01:40/03:20 vol 80" );

        playback.playing.set( false );
        assert!( status.render_text( &playback ).starts_with( '⏸' ) );
    }


    #[test]
    fn test_notification_expires_after_budget() {
        let playback = FakePlayback::default();
        let redraw = RedrawSignal::new();
        let mut status = StatusLine::new( "status", redraw.clone() );

        status.notify( "Logged out." );
        assert!( redraw.take() );
        assert_eq!( status.render_text( &playback ), "Logged out." );

        for _ in 1..NOTIFY_TICKS {
            assert_eq!( status.render_text( &playback ), "Logged out." );
        }
        assert!( status.render_text( &playback ).contains( "vol" ) );
        assert_eq!( status.ticks, 0 );
    }


    #[test]
    fn test_dismiss_reverts_immediately() {
        let playback = FakePlayback::default();
        let mut status = StatusLine::new( "status", RedrawSignal::new() );
        status.notify( "Unknown command: foo" );
        status.dismiss();
        assert!( status.render_text( &playback ).contains( "vol" ) );
    }


    #[test]
    fn test_prompt_returns_typed_text() {
        let mut host = ScriptedHost::new( typing( "bob\n" ) );
        let mut status = StatusLine::new( "status", RedrawSignal::new() );

        let answer = status.prompt( &mut host, "Username: ", false ).unwrap();
        assert_eq!( answer.as_deref(), Some( "bob" ) );
        assert_eq!( host.frames.first().map( String::as_str ), Some( "Username:" ) );
        assert_eq!( host.frames.last().map( String::as_str ), Some( "Username: bob" ) );
        assert!( !status.is_prompting() );
    }


    #[test]
    fn test_masked_prompt_echoes_stars() {
        let mut host = ScriptedHost::new( typing( "bob\n" ) );
        let mut status = StatusLine::new( "status", RedrawSignal::new() );

        let answer = status.prompt( &mut host, "Password: ", true ).unwrap();
        assert_eq!( answer.as_deref(), Some( "bob" ) );
        assert_eq!( host.frames.last().map( String::as_str ), Some( "Password: ***" ) );
        assert!( host.frames.iter().all( |f| !f.contains( "bob" ) ) );
    }


    #[test]
    fn test_prompt_backspace_and_cancel() {
        let mut host = ScriptedHost::new( typing( "bax\x08b\n" ) );
        let mut status = StatusLine::new( "status", RedrawSignal::new() );
        assert_eq!( status.prompt( &mut host, "> ", false ).unwrap().as_deref(), Some( "bab" ) );

        let mut host = ScriptedHost::new( typing( "nope\x1b" ) );
        assert_eq!( status.prompt( &mut host, "> ", false ).unwrap(), None );
        assert_eq!( status.prompt, PromptState::Idle );
    }


    #[test]
    fn test_prompt_io_error_resets_state() {
        let mut host = ScriptedHost::new( typing( "half" ) );
        let mut status = StatusLine::new( "status", RedrawSignal::new() );

        assert!( status.prompt( &mut host, "> ", false ).is_err() );
        assert!( !status.is_prompting() );
    }


    #[test]
    fn test_prompt_shadows_notification() {
        let playback = FakePlayback::default();
        let mut status = StatusLine::new( "status", RedrawSignal::new() );
        status.notify( "hello" );
        status.begin_prompt( "Username: ", false );
        status.handle_key( key( KeyCode::Char( 'a' ) ) );

        assert_eq!( status.render_text( &playback ), "Username: a" );
        assert_eq!( status.finish_prompt(), None );
        assert_eq!( status.render_text( &playback ), "hello" );
    }


    #[test]
    fn test_prompt_draws_cursor_cell() {
        let playback = FakePlayback::default();
        let mut group = status_group( 20 );
        let mut status = StatusLine::new( "status", RedrawSignal::new() );
        status.begin_prompt( ":", false );
        status.handle_key( key( KeyCode::Char( 'q' ) ) );
        status.draw( &mut group, &playback );

        let surface = group.pane( "status" ).unwrap().surface();
        assert!( surface.cell(( 2, 0 )).unwrap().modifier.contains( Modifier::REVERSED ) );
        assert!( !surface.cell(( 1, 0 )).unwrap().modifier.contains( Modifier::REVERSED ) );
    }


    #[test]
    fn test_keys_ignored_when_idle() {
        let mut status = StatusLine::new( "status", RedrawSignal::new() );
        assert!( !status.handle_key( key( KeyCode::Char( 'x' ) ) ) );
    }
}
