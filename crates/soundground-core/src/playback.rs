//! Playback capability interface.
//!
//! The audio engine is external; the UI drives it only through
//! [`Playback`]. Getters are queried at draw time and are expected to be
//! cheap and infallible, falling back to neutral values when the engine
//! cannot answer.

use thiserror::Error;


/// Upper bound for the volume level.
pub const MAX_VOLUME: i32 = 150;

/// Volume change applied per adjustment command.
pub const VOLUME_STEP: i32 = 10;


/// Errors reported by a playback engine.
#[derive( Debug, Error )]
pub enum PlaybackError {
    #[error( "Playback unavailable: {0}" )]
    Unavailable( String ),

    #[error( "Player rejected command: {0}" )]
    Rejected( String ),

    #[error( "IO error: {0}" )]
    Io( #[from] std::io::Error ),
}


/// Control surface of an audio engine.
pub trait Playback {
    fn play( &self ) -> Result<(), PlaybackError>;

    fn pause( &self ) -> Result<(), PlaybackError>;

    fn is_playing( &self ) -> bool;

    /// Loads a new source (URL or path), replacing the current one.
    fn set_source( &self, identifier: &str ) -> Result<(), PlaybackError>;

    fn title( &self ) -> String;

    /// Position within the current source, in `[0, 1]`.
    fn position_fraction( &self ) -> f64;

    fn length_millis( &self ) -> i64;

    fn volume( &self ) -> i32;

    fn set_volume( &self, volume: i32 ) -> Result<(), PlaybackError>;
}


/// Applies one volume adjustment of `steps * VOLUME_STEP`, clamped to
/// `[0, MAX_VOLUME]`.
///
/// @returns The new volume
pub fn adjust_volume( playback: &dyn Playback, steps: i32 ) -> Result<i32, PlaybackError> {
    let volume = step_volume( playback.volume(), steps );
    playback.set_volume( volume )?;
    Ok( volume )
}


/// Pure form of [`adjust_volume`].
pub fn step_volume( current: i32, steps: i32 ) -> i32 {
    current
        .saturating_add( steps.saturating_mul( VOLUME_STEP ) )
        .clamp( 0, MAX_VOLUME )
}


/// Toggles between playing and paused.
pub fn toggle_pause( playback: &dyn Playback ) -> Result<(), PlaybackError> {
    if playback.is_playing() {
        playback.pause()
    } else {
        playback.play()
    }
}


/// Formats milliseconds as `mm:ss`.
pub fn format_millis( millis: i64 ) -> String {
    let secs = millis.max( 0 ) / 1000;
    format!( "{:02}:{:02}", secs / 60, secs % 60 )
}


/// Stand-in used when no audio engine could be started.
#[derive( Debug, Default )]
pub struct NullPlayback;


impl Playback for NullPlayback {
    fn play( &self ) -> Result<(), PlaybackError> {
        Err( PlaybackError::Unavailable( "no player running".into() ) )
    }

    fn pause( &self ) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn is_playing( &self ) -> bool {
        false
    }

    fn set_source( &self, _identifier: &str ) -> Result<(), PlaybackError> {
        Err( PlaybackError::Unavailable( "no player running".into() ) )
    }

    fn title( &self ) -> String {
        String::new()
    }

    fn position_fraction( &self ) -> f64 {
        0.0
    }

    fn length_millis( &self ) -> i64 {
        0
    }

    fn volume( &self ) -> i32 {
        0
    }

    fn set_volume( &self, _volume: i32 ) -> Result<(), PlaybackError> {
        Ok(())
    }
}


#[cfg( test )]
mod tests {
    use std::cell::Cell;

    use super::*;


    struct Knob( Cell<i32> );

    impl Playback for Knob {
        fn play( &self ) -> Result<(), PlaybackError> { Ok(()) }
        fn pause( &self ) -> Result<(), PlaybackError> { Ok(()) }
        fn is_playing( &self ) -> bool { true }
        fn set_source( &self, _: &str ) -> Result<(), PlaybackError> { Ok(()) }
        fn title( &self ) -> String { String::new() }
        fn position_fraction( &self ) -> f64 { 0.0 }
        fn length_millis( &self ) -> i64 { 0 }
        fn volume( &self ) -> i32 { self.0.get() }
        fn set_volume( &self, volume: i32 ) -> Result<(), PlaybackError> {
            self.0.set( volume );
            Ok(())
        }
    }


    #[test]
    fn test_volume_clamps_at_max() {
        let knob = Knob( Cell::new( 120 ) );
        for _ in 0..3 {
            adjust_volume( &knob, 1 ).unwrap();
        }
        assert_eq!( knob.volume(), 150 );
    }


    #[test]
    fn test_volume_clamps_at_zero() {
        assert_eq!( step_volume( 10, -1 ), 0 );
        assert_eq!( step_volume( 0, -1 ), 0 );
        assert_eq!( step_volume( 95, 1 ), 105 );
    }


    #[test]
    fn test_format_millis() {
        assert_eq!( format_millis( 0 ), "00:00" );
        assert_eq!( format_millis( 61_500 ), "01:01" );
        assert_eq!( format_millis( -5 ), "00:00" );
    }
}
