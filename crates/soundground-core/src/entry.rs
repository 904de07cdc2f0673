//! List entries and the shared store that owns them.
//!
//! The UI list and the fetch workers both reach entries through an
//! [`EntryStore`]. Workers only ever hold indices into it, so their writes
//! are visible to the list as soon as the lock is released.

use std::sync::{ Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard };

use crate::metadata::TrackInfo;


/// Fetch progress of an entry.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum EntryStatus {
    #[default]
    Pending,
    Fetching,
    Ready,
    Error,
}


/// One row of a selectable list.
#[derive( Debug, Clone, PartialEq )]
pub struct ListEntry {
    pub caption: String,
    pub selectable: bool,
    /// Opaque payload; for playlists this is the track URL.
    pub value: String,
    pub info: Option<TrackInfo>,
    pub status: EntryStatus,
}


impl ListEntry {
    /// Creates a selectable entry whose value is its caption.
    pub fn new( caption: impl Into<String> ) -> Self {
        let caption = caption.into();
        Self::with_value( caption.clone(), caption )
    }


    /// Creates a selectable entry with an explicit payload.
    pub fn with_value( caption: impl Into<String>, value: impl Into<String> ) -> Self {
        Self {
            caption: caption.into(),
            value: value.into(),
            selectable: true,
            info: None,
            status: EntryStatus::Pending,
        }
    }


    /// Creates a non-selectable line such as a heading or a message.
    pub fn label( caption: impl Into<String> ) -> Self {
        Self { selectable: false, ..Self::new( caption ) }
    }
}


/// Shared, lock-protected sequence of entries.
///
/// Cloning the store clones the handle, not the entries.
#[derive( Debug, Clone, Default )]
pub struct EntryStore {
    inner: Arc<RwLock<Vec<ListEntry>>>,
}


impl EntryStore {
    pub fn new() -> Self {
        Self::from_entries( Vec::new() )
    }


    /// Creates a store pre-filled with entries.
    pub fn from_entries( entries: Vec<ListEntry> ) -> Self {
        Self { inner: Arc::new( RwLock::new( entries ) ) }
    }


    pub fn read( &self ) -> RwLockReadGuard<'_, Vec<ListEntry>> {
        self.inner.read().unwrap_or_else( PoisonError::into_inner )
    }


    pub fn write( &self ) -> RwLockWriteGuard<'_, Vec<ListEntry>> {
        self.inner.write().unwrap_or_else( PoisonError::into_inner )
    }


    pub fn len( &self ) -> usize {
        self.read().len()
    }


    pub fn is_empty( &self ) -> bool {
        self.read().is_empty()
    }


    /// Returns a copy of the entry at `index`.
    pub fn get( &self, index: usize ) -> Option<ListEntry> {
        self.read().get( index ).cloned()
    }


    /// Applies `f` to the entry at `index`.
    ///
    /// Returns false when the index no longer exists, which happens when a
    /// worker finishes after its list was cleared.
    pub fn update( &self, index: usize, f: impl FnOnce( &mut ListEntry ) ) -> bool {
        match self.write().get_mut( index ) {
            Some( entry ) => {
                f( entry );
                true
            }
            None => false,
        }
    }


    /// Replaces every entry.
    pub fn replace( &self, entries: Vec<ListEntry> ) {
        *self.write() = entries;
    }


    /// Counts entries in the given state.
    pub fn count_status( &self, status: EntryStatus ) -> usize {
        self.read().iter().filter( |e| e.status == status ).count()
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_value_defaults_to_caption() {
        let entry = ListEntry::new( "bob/track" );
        assert_eq!( entry.value, "bob/track" );
        assert!( entry.selectable );
        assert_eq!( entry.status, EntryStatus::Pending );
    }


    #[test]
    fn test_clone_shares_entries() {
        let store = EntryStore::from_entries( vec![ ListEntry::new( "a" ) ] );
        let handle = store.clone();
        assert!( handle.update( 0, |e| e.status = EntryStatus::Ready ) );
        assert_eq!( store.get( 0 ).unwrap().status, EntryStatus::Ready );
    }


    #[test]
    fn test_update_out_of_range() {
        let store = EntryStore::new();
        assert!( !store.update( 3, |e| e.caption.clear() ) );
    }
}
