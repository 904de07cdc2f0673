//! Playback through an `mpv` child process.
//!
//! mpv is started idle with a JSON IPC socket. Every [`Playback`] call is
//! one request line on the socket followed by a wait for the reply carrying
//! the same `request_id`; unsolicited event lines are skipped.

use std::fs;
use std::io::{ BufRead, BufReader, Write };
use std::os::unix::net::UnixStream;
use std::path::{ Path, PathBuf };
use std::process::{ Child, Command, Stdio };
use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::{ Mutex, PoisonError };
use std::thread;
use std::time::Duration;

use serde_json::{ json, Value };
use soundground_core::playback::MAX_VOLUME;
use soundground_core::{ Playback, PlaybackError };


/// How long to wait for mpv to create its socket.
const CONNECT_ATTEMPTS: u32 = 50;
const CONNECT_INTERVAL: Duration = Duration::from_millis( 100 );

/// Upper bound on a single IPC round trip.
const REPLY_TIMEOUT: Duration = Duration::from_millis( 500 );


struct Connection {
    writer: UnixStream,
    reader: BufReader<UnixStream>,
}


/// [`Playback`] implementation driving mpv over IPC.
pub struct MpvPlayback {
    child: Child,
    socket_path: PathBuf,
    connection: Mutex<Connection>,
    next_id: AtomicU64,
}


impl MpvPlayback {
    /// Starts `program` idle at `volume` and connects to it.
    pub fn spawn( program: &str, volume: i32 ) -> Result<Self, PlaybackError> {
        let socket_path = std::env::temp_dir()
            .join( format!( "soundground-mpv-{}.sock", std::process::id() ) );
        // A stale socket from a crashed run would make mpv fail to bind.
        let _ = fs::remove_file( &socket_path );

        let mut child = Command::new( program )
            .args( get_args( &socket_path, volume ) )
            .stdin( Stdio::null() )
            .stdout( Stdio::null() )
            .stderr( Stdio::null() )
            .spawn()
            .map_err( |e| PlaybackError::Unavailable( format!( "{}: {}", program, e ) ) )?;

        let stream = match connect( &socket_path, &mut child ) {
            Ok( stream ) => stream,
            Err( e ) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err( e );
            }
        };

        stream.set_read_timeout( Some( REPLY_TIMEOUT ) )?;
        let reader = BufReader::new( stream.try_clone()? );
        tracing::info!( "Started {} with IPC socket {}", program, socket_path.display() );

        Ok( Self {
            child,
            socket_path,
            connection: Mutex::new( Connection { writer: stream, reader } ),
            next_id: AtomicU64::new( 1 ),
        })
    }


    /// Sends one command and waits for its reply.
    fn request( &self, command: Value ) -> Result<Value, PlaybackError> {
        let id = self.next_id.fetch_add( 1, Ordering::Relaxed );
        let mut line = json!({ "command": command, "request_id": id }).to_string();
        line.push( '\n' );
        tracing::debug!( "mpv <- {}", line.trim_end() );

        let mut connection = self.connection.lock().unwrap_or_else( PoisonError::into_inner );
        connection.writer.write_all( line.as_bytes() )?;

        let mut reply = String::new();
        loop {
            reply.clear();
            if connection.reader.read_line( &mut reply )? == 0 {
                return Err( PlaybackError::Unavailable( "mpv closed the IPC socket".into() ) );
            }
            if let Some( result ) = parse_reply( &reply, id ) {
                return result;
            }
        }
    }


    fn get_property( &self, name: &str ) -> Option<Value> {
        match self.request( json!([ "get_property", name ]) ) {
            Ok( value ) => Some( value ),
            Err( e ) => {
                tracing::debug!( "get_property {} failed: {}", name, e );
                None
            }
        }
    }


    fn set_property( &self, name: &str, value: Value ) -> Result<(), PlaybackError> {
        self.request( json!([ "set_property", name, value ]) ).map( |_| () )
    }


    fn flag( &self, name: &str ) -> Option<bool> {
        self.get_property( name ).and_then( |v| v.as_bool() )
    }


    fn number( &self, name: &str ) -> Option<f64> {
        self.get_property( name ).and_then( |v| v.as_f64() )
    }
}


impl Playback for MpvPlayback {
    fn play( &self ) -> Result<(), PlaybackError> {
        self.set_property( "pause", json!( false ) )
    }

    fn pause( &self ) -> Result<(), PlaybackError> {
        self.set_property( "pause", json!( true ) )
    }

    fn is_playing( &self ) -> bool {
        self.flag( "idle-active" ) == Some( false ) && self.flag( "pause" ) == Some( false )
    }

    fn set_source( &self, identifier: &str ) -> Result<(), PlaybackError> {
        self.request( json!([ "loadfile", identifier, "replace" ]) ).map( |_| () )
    }

    fn title( &self ) -> String {
        self.get_property( "media-title" )
            .and_then( |v| v.as_str().map( str::to_string ) )
            .unwrap_or_default()
    }

    fn position_fraction( &self ) -> f64 {
        self.number( "percent-pos" ).map_or( 0.0, |p| ( p / 100.0 ).clamp( 0.0, 1.0 ) )
    }

    fn length_millis( &self ) -> i64 {
        self.number( "duration" ).map_or( 0, |secs| ( secs * 1000.0 ) as i64 )
    }

    fn volume( &self ) -> i32 {
        self.number( "volume" ).map_or( 0, |v| v.round() as i32 )
    }

    fn set_volume( &self, volume: i32 ) -> Result<(), PlaybackError> {
        self.set_property( "volume", json!( volume.clamp( 0, MAX_VOLUME ) ) )
    }
}


impl Drop for MpvPlayback {
    fn drop( &mut self ) {
        let _ = self.request( json!([ "quit" ]) );
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = fs::remove_file( &self.socket_path );
        tracing::info!( "Stopped mpv" );
    }
}


fn get_args( socket_path: &Path, volume: i32 ) -> Vec<String> {
    vec![
        "--idle=yes".to_string(),
        "--no-video".to_string(),
        "--no-terminal".to_string(),
        format!( "--volume-max={}", MAX_VOLUME ),
        format!( "--volume={}", volume.clamp( 0, MAX_VOLUME ) ),
        format!( "--input-ipc-server={}", socket_path.display() ),
    ]
}


fn connect( socket_path: &Path, child: &mut Child ) -> Result<UnixStream, PlaybackError> {
    let mut last_error = None;
    for _ in 0..CONNECT_ATTEMPTS {
        if let Some( status ) = child.try_wait()? {
            return Err( PlaybackError::Unavailable( format!( "mpv exited early ({})", status ) ) );
        }

        match UnixStream::connect( socket_path ) {
            Ok( stream ) => return Ok( stream ),
            Err( e ) => last_error = Some( e ),
        }
        thread::sleep( CONNECT_INTERVAL );
    }

    let reason = last_error.map_or_else( || "timed out".to_string(), |e| e.to_string() );
    Err( PlaybackError::Unavailable( format!( "could not connect to mpv: {}", reason ) ) )
}


/// Interprets one line read from the socket.
///
/// Returns `None` for lines that are not the reply to `id`, such as events.
fn parse_reply( line: &str, id: u64 ) -> Option<Result<Value, PlaybackError>> {
    let reply: Value = match serde_json::from_str( line.trim() ) {
        Ok( value ) => value,
        Err( e ) => {
            tracing::warn!( "Unparseable mpv reply: {}", e );
            return None;
        }
    };

    if reply.get( "request_id" ).and_then( Value::as_u64 ) != Some( id ) {
        return None;
    }

    Some( match reply.get( "error" ).and_then( Value::as_str ) {
        Some( "success" ) => Ok( reply.get( "data" ).cloned().unwrap_or( Value::Null ) ),
        Some( error ) => Err( PlaybackError::Rejected( error.to_string() ) ),
        None => Err( PlaybackError::Rejected( "reply without status".into() ) ),
    })
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_reply_matching_id() {
        let reply = parse_reply( r#"{"data":42.5,"request_id":7,"error":"success"}"#, 7 );
        assert_eq!( reply.unwrap().unwrap(), json!( 42.5 ) );
    }


    #[test]
    fn test_events_and_other_ids_are_skipped() {
        assert!( parse_reply( r#"{"event":"playback-restart"}"#, 1 ).is_none() );
        assert!( parse_reply( r#"{"data":null,"request_id":2,"error":"success"}"#, 1 ).is_none() );
        assert!( parse_reply( "garbage", 1 ).is_none() );
    }


    #[test]
    fn test_error_reply_is_rejected() {
        let reply = parse_reply( r#"{"request_id":3,"error":"property unavailable"}"#, 3 ).unwrap();
        assert!( matches!( reply, Err( PlaybackError::Rejected( msg ) ) if msg == "property unavailable" ) );
    }


    #[test]
    fn test_args_clamp_volume() {
        let args = get_args( Path::new( "/tmp/s.sock" ), 400 );
        assert!( args.contains( &"--volume=150".to_string() ) );
        assert!( args.contains( &"--volume-max=150".to_string() ) );
        assert!( args.contains( &"--input-ipc-server=/tmp/s.sock".to_string() ) );
    }
}
