//! Bounded metadata fetch pool.
//!
//! A driver task feeds entry indices, in list order, into a bounded queue.
//! A fixed set of long-lived workers pull from the queue, so at most
//! `workers` entries are ever in the `Fetching` state. Each worker runs the
//! blocking extractor on tokio's blocking pool and writes the result back
//! into the shared [`EntryStore`].
//!
//! Completion order is not constrained: a later entry may become `Ready`
//! before an earlier one.

use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{ mpsc, Mutex };
use tokio::task::JoinHandle;

use crate::entry::{ EntryStatus, EntryStore, ListEntry };
use crate::metadata::{ ExtractError, MetadataSource, TrackInfo };
use crate::signal::RedrawSignal;


/// Default number of concurrent fetches.
pub const DEFAULT_WORKERS: usize = 4;

/// Appended to an entry's caption while its fetch is in flight.
pub const FETCHING_SUFFIX: &str = " [fetching info]";


/// Runs metadata fetches for entry stores.
#[derive( Clone )]
pub struct FetchPool {
    source: Arc<dyn MetadataSource>,
    workers: usize,
    redraw: RedrawSignal,
}


/// Handle to a detached fetch run.
///
/// Dropping the handle does not stop the run.
#[derive( Debug )]
pub struct FetchJob {
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}


impl FetchJob {
    /// Stops feeding new entries to the workers.
    ///
    /// Fetches already in flight still complete and write into the store
    /// they were started for.
    pub fn cancel( &self ) {
        self.cancelled.store( true, Ordering::Release );
    }


    /// Returns true once the driver and all workers have exited.
    pub fn is_finished( &self ) -> bool {
        self.task.is_finished()
    }


    /// Waits for the run to finish.
    pub async fn wait( self ) {
        if let Err( e ) = self.task.await {
            tracing::warn!( "Fetch driver ended abnormally: {}", e );
        }
    }
}


impl FetchPool {
    /// Creates a pool running up to `workers` fetches at a time.
    pub fn new( source: Arc<dyn MetadataSource>, workers: usize, redraw: RedrawSignal ) -> Self {
        Self {
            source,
            workers: workers.max( 1 ),
            redraw,
        }
    }


    /// Starts fetching every pending entry of `entries` in the background.
    ///
    /// Returns immediately.
    pub fn spawn( &self, runtime: &Handle, entries: EntryStore ) -> FetchJob {
        let cancelled = Arc::new( AtomicBool::new( false ) );
        let pool = self.clone();
        let flag = Arc::clone( &cancelled );

        let task = runtime.spawn( async move {
            pool.populate( entries, flag ).await;
        });

        FetchJob { cancelled, task }
    }


    /// Resolves a collection URL into `entries`, then fetches each child.
    ///
    /// The shallow listing runs in the background too. On failure the store
    /// is replaced by a single non-selectable line carrying the error.
    pub fn load( &self, runtime: &Handle, url: String, entries: EntryStore ) -> FetchJob {
        let cancelled = Arc::new( AtomicBool::new( false ) );
        let pool = self.clone();
        let flag = Arc::clone( &cancelled );

        let task = runtime.spawn( async move {
            let source = Arc::clone( &pool.source );
            let target = url.clone();
            let listing = tokio::task::spawn_blocking( move || source.list( &target ) )
                .await
                .unwrap_or_else( |e| Err( ExtractError::Failed( e.to_string() ) ) );

            if flag.load( Ordering::Acquire ) {
                tracing::debug!( "Listing of {} discarded, job cancelled", url );
                return;
            }

            match listing {
                Ok( urls ) if urls.is_empty() => {
                    entries.replace( vec![ ListEntry::label( format!( "Nothing in {}", url ) ) ] );
                    pool.redraw.request();
                }
                Ok( urls ) => {
                    tracing::info!( "Listed {} tracks in {}", urls.len(), url );
                    entries.replace( urls.into_iter().map( ListEntry::new ).collect() );
                    pool.redraw.request();
                    pool.populate( entries, flag ).await;
                }
                Err( e ) => {
                    tracing::warn!( "Failed to list {}: {}", url, e );
                    entries.replace( vec![ ListEntry::label( e.to_string() ) ] );
                    pool.redraw.request();
                }
            }
        });

        FetchJob { cancelled, task }
    }


    /// Feeds pending entries to the workers and waits for them to drain.
    async fn populate( &self, entries: EntryStore, cancelled: Arc<AtomicBool> ) {
        let pending: Vec<usize> = entries.read()
            .iter()
            .enumerate()
            .filter( |( _, e )| e.selectable && e.status == EntryStatus::Pending )
            .map( |( i, _ )| i )
            .collect();

        if pending.is_empty() {
            return;
        }

        tracing::info!( "Fetching metadata for {} entries with {} workers", pending.len(), self.workers );

        let ( tx, rx ) = mpsc::channel::<usize>( self.workers );
        let queue = Arc::new( Mutex::new( rx ) );

        let workers: Vec<_> = ( 0..self.workers )
            .map( |id| {
                let worker = Worker {
                    id,
                    source: Arc::clone( &self.source ),
                    entries: entries.clone(),
                    redraw: self.redraw.clone(),
                    queue: Arc::clone( &queue ),
                    cancelled: Arc::clone( &cancelled ),
                };
                tokio::spawn( worker.run() )
            })
            .collect();

        for index in pending {
            if cancelled.load( Ordering::Acquire ) {
                tracing::debug!( "Fetch cancelled before entry {}", index );
                break;
            }
            if tx.send( index ).await.is_err() {
                break;
            }
        }

        // Closing the queue lets idle workers exit.
        drop( tx );

        for worker in workers {
            if let Err( e ) = worker.await {
                tracing::warn!( "Fetch worker ended abnormally: {}", e );
            }
        }

        tracing::info!(
            "Metadata fetch finished: {} ready, {} failed",
            entries.count_status( EntryStatus::Ready ),
            entries.count_status( EntryStatus::Error ),
        );
    }
}


struct Worker {
    id: usize,
    source: Arc<dyn MetadataSource>,
    entries: EntryStore,
    redraw: RedrawSignal,
    queue: Arc<Mutex<mpsc::Receiver<usize>>>,
    cancelled: Arc<AtomicBool>,
}


impl Worker {
    async fn run( self ) {
        loop {
            let next = self.queue.lock().await.recv().await;
            let Some( index ) = next else {
                break;
            };

            // Queued before the cancel; leave it pending.
            if self.cancelled.load( Ordering::Acquire ) {
                continue;
            }

            self.fetch( index ).await;
        }
    }


    async fn fetch( &self, index: usize ) {
        let url = {
            let mut entries = self.entries.write();
            let Some( entry ) = entries.get_mut( index ) else {
                return;
            };
            entry.status = EntryStatus::Fetching;
            entry.caption.push_str( FETCHING_SUFFIX );
            entry.value.clone()
        };
        self.redraw.request();

        tracing::debug!( "Worker {} fetching entry {}: {}", self.id, index, url );

        let source = Arc::clone( &self.source );
        let result = tokio::task::spawn_blocking( move || source.extract( &url ) )
            .await
            .unwrap_or_else( |e| Err( ExtractError::Failed( e.to_string() ) ) );

        self.entries.update( index, |entry| apply_result( entry, result ) );
        self.redraw.request();
    }
}


/// Writes a fetch outcome into an entry.
fn apply_result( entry: &mut ListEntry, result: Result<TrackInfo, ExtractError> ) {
    match result {
        Ok( info ) => {
            entry.caption = info.caption();
            entry.info = Some( info );
            entry.status = EntryStatus::Ready;
        }
        Err( e ) => {
            entry.caption = e.to_string();
            entry.status = EntryStatus::Error;
        }
    }
}


#[cfg( test )]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;
    use std::thread;
    use std::time::Duration;

    use super::*;


    /// Fake extractor that records call order and the peak number of
    /// `Fetching` entries it observes in the store.
    struct FakeSource {
        store: StdMutex<Option<EntryStore>>,
        calls: StdMutex<Vec<String>>,
        peak_fetching: AtomicUsize,
        delay: Duration,
        listing: Vec<String>,
    }


    impl FakeSource {
        fn new( delay_ms: u64 ) -> Self {
            Self {
                store: StdMutex::new( None ),
                calls: StdMutex::new( Vec::new() ),
                peak_fetching: AtomicUsize::new( 0 ),
                delay: Duration::from_millis( delay_ms ),
                listing: Vec::new(),
            }
        }


        fn watch( &self, store: &EntryStore ) {
            *self.store.lock().unwrap() = Some( store.clone() );
        }
    }


    impl MetadataSource for FakeSource {
        fn extract( &self, url: &str ) -> Result<TrackInfo, ExtractError> {
            self.calls.lock().unwrap().push( url.to_string() );
            if let Some( store ) = self.store.lock().unwrap().as_ref() {
                let fetching = store.count_status( EntryStatus::Fetching );
                self.peak_fetching.fetch_max( fetching, Ordering::SeqCst );
            }
            thread::sleep( self.delay );

            if url.contains( "bad" ) {
                return Err( ExtractError::Failed( format!( "ERROR: unable to download {}", url ) ) );
            }
            Ok( TrackInfo {
                title: format!( "Title of {}", url ),
                uploader: Some( "uploader".into() ),
                ..Default::default()
            })
        }


        fn list( &self, _url: &str ) -> Result<Vec<String>, ExtractError> {
            thread::sleep( self.delay );
            Ok( self.listing.clone() )
        }
    }


    fn store_of( urls: &[&str] ) -> EntryStore {
        EntryStore::from_entries( urls.iter().map( |u| ListEntry::new( *u ) ).collect() )
    }


    #[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
    async fn test_never_more_than_n_fetching() {
        let urls: Vec<String> = ( 0..12 ).map( |i| format!( "user/track-{}", i ) ).collect();
        let store = EntryStore::from_entries( urls.iter().map( ListEntry::new ).collect() );

        let source = Arc::new( FakeSource::new( 20 ) );
        source.watch( &store );
        let redraw = RedrawSignal::new();
        let pool = FetchPool::new( source.clone(), 3, redraw.clone() );

        pool.spawn( &Handle::current(), store.clone() ).wait().await;

        assert!( source.peak_fetching.load( Ordering::SeqCst ) <= 3 );
        assert_eq!( store.count_status( EntryStatus::Ready ), 12 );
        assert_eq!( store.count_status( EntryStatus::Fetching ), 0 );
        assert_eq!( source.calls.lock().unwrap().len(), 12 );
        assert!( redraw.take() );
    }


    #[tokio::test]
    async fn test_single_worker_follows_list_order() {
        let store = store_of( &[ "a", "b", "c", "d" ] );
        let source = Arc::new( FakeSource::new( 1 ) );
        let pool = FetchPool::new( source.clone(), 1, RedrawSignal::new() );

        pool.spawn( &Handle::current(), store.clone() ).wait().await;

        assert_eq!( *source.calls.lock().unwrap(), vec![ "a", "b", "c", "d" ] );
        assert_eq!( store.get( 2 ).unwrap().caption, "uploader - Title of c" );
    }


    #[tokio::test]
    async fn test_failure_is_rendered_inline() {
        let store = store_of( &[ "good", "bad-one", "good-too" ] );
        let pool = FetchPool::new( Arc::new( FakeSource::new( 1 ) ), 2, RedrawSignal::new() );

        pool.spawn( &Handle::current(), store.clone() ).wait().await;

        let failed = store.get( 1 ).unwrap();
        assert_eq!( failed.status, EntryStatus::Error );
        assert_eq!( failed.caption, "ERROR: unable to download bad-one" );
        assert!( failed.info.is_none() );
        assert_eq!( store.count_status( EntryStatus::Ready ), 2 );
    }


    #[tokio::test]
    async fn test_labels_and_finished_entries_are_skipped() {
        let mut entries = vec![ ListEntry::label( "Heading" ), ListEntry::new( "a" ), ListEntry::new( "b" ) ];
        entries[ 2 ].status = EntryStatus::Ready;
        let store = EntryStore::from_entries( entries );
        let source = Arc::new( FakeSource::new( 1 ) );
        let pool = FetchPool::new( source.clone(), 4, RedrawSignal::new() );

        pool.spawn( &Handle::current(), store.clone() ).wait().await;

        assert_eq!( *source.calls.lock().unwrap(), vec![ "a" ] );
        assert_eq!( store.get( 0 ).unwrap().status, EntryStatus::Pending );
    }


    #[tokio::test]
    async fn test_load_replaces_entries_and_fetches() {
        let mut source = FakeSource::new( 1 );
        source.listing = vec![ "bob/one".into(), "bob/two".into() ];
        let store = EntryStore::from_entries( vec![ ListEntry::label( "Loading bob/likes" ) ] );
        let pool = FetchPool::new( Arc::new( source ), 2, RedrawSignal::new() );

        pool.load( &Handle::current(), "bob/likes".into(), store.clone() ).wait().await;

        assert_eq!( store.len(), 2 );
        assert_eq!( store.get( 0 ).unwrap().value, "bob/one" );
        assert_eq!( store.count_status( EntryStatus::Ready ), 2 );
    }


    #[tokio::test]
    async fn test_empty_listing_shows_message() {
        let store = EntryStore::from_entries( vec![ ListEntry::label( "Loading" ) ] );
        let pool = FetchPool::new( Arc::new( FakeSource::new( 1 ) ), 2, RedrawSignal::new() );

        pool.load( &Handle::current(), "bob/likes".into(), store.clone() ).wait().await;

        let only = store.get( 0 ).unwrap();
        assert_eq!( only.caption, "Nothing in bob/likes" );
        assert!( !only.selectable );
    }


    #[tokio::test]
    async fn test_cancelled_load_leaves_store_alone() {
        let mut source = FakeSource::new( 50 );
        source.listing = vec![ "bob/one".into() ];
        let store = EntryStore::from_entries( vec![ ListEntry::label( "Loading" ) ] );
        let pool = FetchPool::new( Arc::new( source ), 2, RedrawSignal::new() );

        let job = pool.load( &Handle::current(), "bob/likes".into(), store.clone() );
        job.cancel();
        job.wait().await;

        assert_eq!( store.get( 0 ).unwrap().caption, "Loading" );
    }
}
