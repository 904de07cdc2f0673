//! Scrollable selection list.
//!
//! The list renders an [`EntryStore`] into a pane, one entry per row, and
//! keeps a selection cursor that never rests on a non-selectable entry
//! while a selectable one exists. Scrolling follows the cursor with the
//! least movement that keeps it visible.

use ratatui::style::{ Color, Modifier, Style };
use soundground_core::{ EntryStatus, EntryStore, ListEntry, RedrawSignal };
use thiserror::Error;

use crate::window::WindowGroup;


/// Out-of-range list operation.
#[derive( Debug, Error, PartialEq, Eq )]
#[error( "Index {index} out of range for list of {len}" )]
pub struct IndexError {
    pub index: usize,
    pub len: usize,
}


/// Paginated list widget bound to a pane.
pub struct SelectableList {
    pane: String,
    entries: EntryStore,
    selected: usize,
    scroll_offset: usize,
    visible_height: usize,
    active: bool,
    redraw: RedrawSignal,
}


impl SelectableList {
    /// Creates an empty list drawn into the pane named `pane`.
    pub fn new( pane: impl Into<String>, redraw: RedrawSignal ) -> Self {
        Self {
            pane: pane.into(),
            entries: EntryStore::new(),
            selected: 0,
            scroll_offset: 0,
            visible_height: 1,
            active: true,
            redraw,
        }
    }


    /// Shared handle to the entries, for background writers.
    pub fn entries( &self ) -> &EntryStore {
        &self.entries
    }


    /// Swaps in a different store and resets the cursor.
    ///
    /// Writers still holding the old store keep writing to it unseen.
    pub fn replace( &mut self, entries: EntryStore ) {
        self.entries = entries;
        self.selected = 0;
        self.scroll_offset = 0;
        self.settle();
        self.redraw.request();
    }


    /// Appends an entry.
    pub fn add_entry( &mut self, entry: ListEntry ) {
        self.entries.write().push( entry );
        self.settle();
        self.redraw.request();
    }


    /// Removes the entry at `index`.
    pub fn remove( &mut self, index: usize ) -> Result<ListEntry, IndexError> {
        let removed = {
            let mut entries = self.entries.write();
            let len = entries.len();
            if index >= len {
                return Err( IndexError { index, len } );
            }
            entries.remove( index )
        };

        self.settle();
        self.redraw.request();
        Ok( removed )
    }


    /// Removes every entry.
    pub fn clear( &mut self ) {
        self.entries.write().clear();
        self.settle();
        self.redraw.request();
    }


    pub fn selected( &self ) -> usize {
        self.selected
    }


    /// Copy of the entry under the cursor.
    pub fn selected_entry( &self ) -> Option<ListEntry> {
        self.entries.get( self.selected )
    }


    pub fn set_active( &mut self, active: bool ) {
        self.active = active;
        self.redraw.request();
    }


    /// Moves the cursor.
    ///
    /// With `relative` the cursor moves by `delta`, otherwise it jumps to
    /// index `delta`. The target is clamped to the list. A relative move
    /// that lands on a non-selectable entry keeps stepping in the same
    /// direction; if that runs off either end nothing changes. An absolute
    /// jump onto a non-selectable entry fails without moving.
    ///
    /// @returns true if the cursor landed on a selectable entry
    pub fn select( &mut self, delta: isize, relative: bool ) -> bool {
        let target = {
            let entries = self.entries.read();
            if entries.is_empty() {
                return false;
            }

            let last = entries.len() as isize - 1;
            let start = if relative { ( self.selected as isize ).saturating_add( delta ) } else { delta };
            let mut target = start.clamp( 0, last );

            if !entries[ target as usize ].selectable {
                let step = delta.signum();
                if !relative || step == 0 {
                    return false;
                }
                loop {
                    target += step;
                    if target < 0 || target > last {
                        return false;
                    }
                    if entries[ target as usize ].selectable {
                        break;
                    }
                }
            }
            target as usize
        };

        self.selected = target;
        self.rescroll();
        self.redraw.request();
        true
    }


    /// Moves one visible page up (`-1`) or down (`1`).
    pub fn page( &mut self, direction: isize ) -> bool {
        let height = self.visible_height.max( 1 ) as isize;
        self.select( direction.signum() * height, true )
    }


    /// Jumps to the first selectable entry.
    pub fn first( &mut self ) -> bool {
        let index = self.entries.read().iter().position( |e| e.selectable );
        index.is_some_and( |i| self.select( i as isize, false ) )
    }


    /// Jumps to the last selectable entry.
    pub fn last( &mut self ) -> bool {
        let index = self.entries.read().iter().rposition( |e| e.selectable );
        index.is_some_and( |i| self.select( i as isize, false ) )
    }


    /// Sets the number of rows on screen.
    pub fn set_viewport( &mut self, height: usize ) {
        self.visible_height = height.max( 1 );
        self.rescroll();
    }


    /// Adopts the height of the bound pane.
    pub fn fit( &mut self, group: &WindowGroup ) {
        if let Some( pane ) = group.pane( &self.pane ) {
            self.set_viewport( usize::from( pane.height() ) );
        }
    }


    /// Renders the visible window of entries into the bound pane.
    pub fn draw( &mut self, group: &mut WindowGroup ) {
        self.fit( group );
        self.settle();

        let Some( pane ) = group.pane_mut( &self.pane ) else {
            return;
        };
        pane.clear();

        let entries = self.entries.read();
        let visible = entries.iter()
            .enumerate()
            .skip( self.scroll_offset )
            .take( self.visible_height );

        for ( row, ( index, entry ) ) in visible.enumerate() {
            let style = self.row_style( entry, index == self.selected );
            // Rows past the pane are clipped by the pane itself.
            let _ = pane.put_line( row as u16, &entry.caption, style );
        }
    }


    fn row_style( &self, entry: &ListEntry, selected: bool ) -> Style {
        let mut style = match entry.status {
            EntryStatus::Error => Style::default().fg( Color::Red ),
            EntryStatus::Pending | EntryStatus::Fetching if entry.selectable => {
                Style::default().fg( Color::DarkGray )
            }
            _ => Style::default(),
        };

        if selected && entry.selectable {
            style = style.add_modifier( Modifier::REVERSED );
            if !self.active {
                style = style.add_modifier( Modifier::DIM );
            }
        }
        style
    }


    /// Restores the cursor invariants after the entries changed.
    ///
    /// Clamps the cursor into the list and moves it off a non-selectable
    /// entry, preferring the next selectable one below, then above.
    fn settle( &mut self ) {
        {
            let entries = self.entries.read();
            let len = entries.len();
            if len == 0 {
                self.selected = 0;
                self.scroll_offset = 0;
                return;
            }

            self.selected = self.selected.min( len - 1 );
            if !entries[ self.selected ].selectable {
                let below = ( self.selected..len ).find( |&i| entries[ i ].selectable );
                let above = || ( 0..self.selected ).rev().find( |&i| entries[ i ].selectable );
                if let Some( i ) = below.or_else( above ) {
                    self.selected = i;
                }
            }
        }
        self.rescroll();
    }


    fn rescroll( &mut self ) {
        let height = self.visible_height.max( 1 );
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + height {
            self.scroll_offset = self.selected + 1 - height;
        }
    }
}


#[cfg( test )]
mod tests {
    use proptest::prelude::*;
    use ratatui::layout::Size;

    use super::*;
    use crate::layout::{ row_text, LayoutValue };


    fn list_of( items: &[( &str, bool )], height: usize ) -> SelectableList {
        let mut list = SelectableList::new( "list", RedrawSignal::new() );
        list.set_viewport( height );
        for ( caption, selectable ) in items {
            let entry = if *selectable { ListEntry::new( *caption ) } else { ListEntry::label( *caption ) };
            list.add_entry( entry );
        }
        list
    }


    fn group_with_list_pane( height: u16, width: u16 ) -> WindowGroup {
        let mut group = WindowGroup::new( Size::new( width, height ) );
        group.create_pane(
            "list",
            LayoutValue::fixed( 0 ),
            LayoutValue::fixed( 0 ),
            LayoutValue::percent( 100.0 ),
            LayoutValue::percent( 100.0 ),
        ).unwrap();
        group
    }


    #[test]
    fn test_skips_unselectable_entry() {
        let mut list = list_of( &[ ( "a", true ), ( "", false ), ( "b", true ) ], 5 );
        assert_eq!( list.selected(), 0 );
        assert!( list.select( 1, true ) );
        assert_eq!( list.selected(), 2 );
        assert!( list.select( -1, true ) );
        assert_eq!( list.selected(), 0 );
    }


    #[test]
    fn test_walk_off_the_end_leaves_cursor() {
        let mut list = list_of( &[ ( "a", true ), ( "b", true ), ( "end", false ) ], 5 );
        assert!( list.select( 1, true ) );
        assert!( !list.select( 1, true ) );
        assert_eq!( list.selected(), 1 );
        assert!( !list.select( 10, true ) );
        assert_eq!( list.selected(), 1 );
    }


    #[test]
    fn test_absolute_onto_unselectable_fails() {
        let mut list = list_of( &[ ( "a", true ), ( "--", false ), ( "b", true ) ], 5 );
        assert!( !list.select( 1, false ) );
        assert_eq!( list.selected(), 0 );
        assert!( list.select( 2, false ) );
        assert!( list.select( 99, false ) );
        assert_eq!( list.selected(), 2 );
    }


    #[test]
    fn test_cursor_moves_off_leading_label() {
        let list = list_of( &[ ( "Heading", false ), ( "a", true ) ], 5 );
        assert_eq!( list.selected(), 1 );
    }


    #[test]
    fn test_minimal_scroll() {
        let items: Vec<( String, bool )> = ( 0..10 ).map( |i| ( format!( "t{}", i ), true ) ).collect();
        let refs: Vec<( &str, bool )> = items.iter().map( |( c, s )| ( c.as_str(), *s ) ).collect();
        let mut list = list_of( &refs, 3 );

        list.select( 2, true );
        assert_eq!( list.scroll_offset, 0 );
        list.select( 1, true );
        assert_eq!( list.scroll_offset, 1 );
        list.select( 4, true );
        assert_eq!( ( list.selected(), list.scroll_offset ), ( 7, 5 ) );
        list.select( -1, true );
        assert_eq!( list.scroll_offset, 5 );
        list.select( -2, true );
        assert_eq!( ( list.selected(), list.scroll_offset ), ( 4, 4 ) );
    }


    #[test]
    fn test_paging() {
        let items: Vec<( String, bool )> = ( 0..10 ).map( |i| ( format!( "t{}", i ), true ) ).collect();
        let refs: Vec<( &str, bool )> = items.iter().map( |( c, s )| ( c.as_str(), *s ) ).collect();
        let mut list = list_of( &refs, 4 );

        assert!( list.page( 1 ) );
        assert_eq!( list.selected(), 4 );
        assert!( list.last() );
        assert_eq!( ( list.selected(), list.scroll_offset ), ( 9, 6 ) );
        assert!( list.first() );
        assert_eq!( ( list.selected(), list.scroll_offset ), ( 0, 0 ) );
    }


    #[test]
    fn test_extreme_deltas_clamp_to_ends() {
        let mut list = list_of( &[ ( "a", true ), ( "b", true ), ( "c", true ) ], 2 );
        list.select( 1, false );

        assert!( list.select( isize::MAX, true ) );
        assert_eq!( list.selected(), 2 );
        assert!( list.select( isize::MIN, true ) );
        assert_eq!( ( list.selected(), list.scroll_offset ), ( 0, 0 ) );
        assert!( list.select( isize::MAX, false ) );
        assert_eq!( list.selected(), 2 );
    }


    #[test]
    fn test_remove_clamps_cursor() {
        let mut list = list_of( &[ ( "a", true ), ( "b", true ), ( "c", true ) ], 2 );
        list.select( 2, false );

        let removed = list.remove( 2 ).unwrap();
        assert_eq!( removed.caption, "c" );
        assert_eq!( list.selected(), 1 );

        assert_eq!( list.remove( 5 ), Err( IndexError { index: 5, len: 2 } ) );
        assert_eq!( list.entries().len(), 2 );
    }


    #[test]
    fn test_mutations_request_redraw() {
        let redraw = RedrawSignal::new();
        let mut list = SelectableList::new( "list", redraw.clone() );
        list.add_entry( ListEntry::new( "a" ) );
        assert!( redraw.take() );
        list.select( 0, false );
        assert!( redraw.take() );
        list.clear();
        assert!( redraw.take() );
        assert!( list.entries().is_empty() );
    }


    #[test]
    fn test_draw_renders_visible_window() {
        let mut group = group_with_list_pane( 3, 6 );
        let items: Vec<( String, bool )> = ( 0..6 ).map( |i| ( format!( "track{}", i ), true ) ).collect();
        let refs: Vec<( &str, bool )> = items.iter().map( |( c, s )| ( c.as_str(), *s ) ).collect();
        let mut list = list_of( &refs, 1 );

        list.draw( &mut group );
        assert_eq!( list.visible_height, 3 );
        list.select( 4, false );
        list.draw( &mut group );

        let surface = group.pane( "list" ).unwrap().surface();
        assert_eq!( row_text( surface, 0 ), "track2" );
        assert_eq!( row_text( surface, 2 ), "track4" );

        let selected = surface.cell(( 0, 2 )).unwrap();
        assert!( selected.modifier.contains( Modifier::REVERSED ) );
        let normal = surface.cell(( 0, 1 )).unwrap();
        assert!( !normal.modifier.contains( Modifier::REVERSED ) );
    }


    #[test]
    fn test_draw_leaves_rows_past_end_blank() {
        let mut group = group_with_list_pane( 4, 5 );
        let mut list = list_of( &[ ( "one", true ) ], 4 );
        list.draw( &mut group );

        let surface = group.pane( "list" ).unwrap().surface();
        assert_eq!( row_text( surface, 0 ), "one  " );
        assert_eq!( row_text( surface, 3 ), "     " );
    }


    #[test]
    fn test_draw_sees_background_writes() {
        let mut group = group_with_list_pane( 2, 12 );
        let mut list = list_of( &[ ( "bob/one", true ) ], 2 );
        let writer = list.entries().clone();

        writer.update( 0, |e| {
            e.caption = "Bob - One".into();
            e.status = EntryStatus::Ready;
        });
        list.draw( &mut group );

        assert_eq!( row_text( group.pane( "list" ).unwrap().surface(), 0 ), "Bob - One   " );
    }


    fn entries_strategy() -> impl Strategy<Value = Vec<bool>> {
        prop::collection::vec( any::<bool>(), 1..24 )
            .prop_filter( "needs a selectable entry", |v| v.iter().any( |s| *s ) )
    }


    fn check_invariants( list: &SelectableList ) -> Result<(), TestCaseError> {
        let len = list.entries().len();
        if len == 0 {
            return Ok(());
        }
        let selected = list.selected();
        prop_assert!( selected < len );
        prop_assert!( list.scroll_offset <= selected );
        prop_assert!( selected < list.scroll_offset + list.visible_height );
        let any_selectable = list.entries().read().iter().any( |e| e.selectable );
        if any_selectable {
            prop_assert!( list.selected_entry().unwrap().selectable );
        }
        Ok(())
    }


    proptest! {
        #[test]
        fn prop_relative_moves_keep_invariants(
            flags in entries_strategy(),
            height in 1usize..8,
            moves in prop::collection::vec( -6isize..=6, 0..40 ),
        ) {
            let mut list = SelectableList::new( "list", RedrawSignal::new() );
            list.set_viewport( height );
            for ( i, selectable ) in flags.iter().enumerate() {
                let caption = format!( "entry {}", i );
                list.add_entry( if *selectable { ListEntry::new( caption ) } else { ListEntry::label( caption ) } );
                check_invariants( &list )?;
            }

            for delta in moves {
                list.select( delta, true );
                check_invariants( &list )?;
            }
        }


        #[test]
        fn prop_removals_keep_invariants(
            flags in entries_strategy(),
            height in 1usize..8,
            removals in prop::collection::vec( 0usize..30, 0..10 ),
            jump in 0isize..30,
        ) {
            let mut list = SelectableList::new( "list", RedrawSignal::new() );
            list.set_viewport( height );
            for ( i, selectable ) in flags.iter().enumerate() {
                let caption = format!( "entry {}", i );
                list.add_entry( if *selectable { ListEntry::new( caption ) } else { ListEntry::label( caption ) } );
            }
            list.select( jump, false );

            for index in removals {
                let len = list.entries().len();
                let result = list.remove( index );
                prop_assert_eq!( result.is_ok(), index < len );
                check_invariants( &list )?;
            }
        }
    }
}
