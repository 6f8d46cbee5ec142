//! QueueViewModel — last known now-playing song and queue.
//!
//! Owned by the App loop and only mutated there.  Background work never
//! touches it directly; results are posted through `UiHandle` and applied
//! when the loop picks them up.

use chrono::{DateTime, Local};
use play_proto::protocol::{Song, StatusUpdate};

/// A selectable row: the now-playing song (when present) comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    NowPlaying,
    Queued(usize),
}

#[derive(Debug, Default)]
pub struct QueueViewModel {
    now_playing: Option<Song>,
    queue: Vec<Song>,
    selected: usize,
    updated_at: Option<DateTime<Local>>,
}

impl QueueViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with `update`.  Never merges.
    pub fn apply_update(&mut self, update: StatusUpdate) {
        self.now_playing = update.playing;
        self.queue = update.queued;
        self.updated_at = Some(Local::now());
        self.clamp_selection();
    }

    #[cfg(test)]
    pub fn now_playing(&self) -> Option<&Song> {
        self.now_playing.as_ref()
    }

    pub fn queue(&self) -> &[Song] {
        &self.queue
    }

    pub fn updated_at(&self) -> Option<DateTime<Local>> {
        self.updated_at
    }

    pub fn row_count(&self) -> usize {
        self.queue.len() + usize::from(self.now_playing.is_some())
    }

    pub fn row(&self, idx: usize) -> Option<Row> {
        let offset = usize::from(self.now_playing.is_some());
        if offset == 1 && idx == 0 {
            return Some(Row::NowPlaying);
        }
        let q = idx.checked_sub(offset)?;
        (q < self.queue.len()).then_some(Row::Queued(q))
    }

    pub fn song(&self, row: Row) -> Option<&Song> {
        match row {
            Row::NowPlaying => self.now_playing.as_ref(),
            Row::Queued(i) => self.queue.get(i),
        }
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_row(&self) -> Option<Row> {
        self.row(self.selected)
    }

    pub fn selected_song(&self) -> Option<&Song> {
        self.selected_row().and_then(|row| self.song(row))
    }

    pub fn select_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
    }

    pub fn select_down(&mut self, n: usize) {
        self.selected = (self.selected + n).min(self.row_count().saturating_sub(1));
    }

    fn clamp_selection(&mut self) {
        if self.selected >= self.row_count() {
            self.selected = self.row_count().saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str, name: &str, artist: &str) -> Song {
        Song {
            id: id.to_string(),
            name: name.to_string(),
            artist: artist.to_string(),
            album: "..".to_string(),
            starred: false,
        }
    }

    #[test]
    fn hey_jude_example() {
        let mut vm = QueueViewModel::new();
        vm.apply_update(StatusUpdate::new(
            Some(song("1", "Hey Jude", "Beatles")),
            vec![song("2", "SongA", "A"), song("3", "SongB", "B")],
        ));
        assert_eq!(vm.now_playing().unwrap().name, "Hey Jude");
        assert_eq!(vm.queue().len(), 2);
        assert_eq!(vm.queue()[0].name, "SongA");
        assert_eq!(vm.queue()[1].name, "SongB");
        assert!(vm.updated_at().is_some());
    }

    #[test]
    fn update_replaces_instead_of_merging() {
        let mut vm = QueueViewModel::new();
        vm.apply_update(StatusUpdate::new(
            Some(song("1", "Hey Jude", "Beatles")),
            vec![song("2", "SongA", "A"), song("3", "SongB", "B"), song("4", "SongC", "C")],
        ));
        vm.apply_update(StatusUpdate::new(None, vec![song("9", "Other", "X")]));

        assert!(vm.now_playing().is_none());
        let names: Vec<&str> = vm.queue().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Other"]);
    }

    #[test]
    fn rows_put_now_playing_first() {
        let mut vm = QueueViewModel::new();
        vm.apply_update(StatusUpdate::new(
            Some(song("1", "Hey Jude", "Beatles")),
            vec![song("2", "SongA", "A")],
        ));
        assert_eq!(vm.row_count(), 2);
        assert_eq!(vm.row(0), Some(Row::NowPlaying));
        assert_eq!(vm.row(1), Some(Row::Queued(0)));
        assert_eq!(vm.row(2), None);

        vm.apply_update(StatusUpdate::new(None, vec![song("2", "SongA", "A")]));
        assert_eq!(vm.row(0), Some(Row::Queued(0)));
    }

    #[test]
    fn selection_is_clamped_when_queue_shrinks() {
        let mut vm = QueueViewModel::new();
        vm.apply_update(StatusUpdate::new(
            None,
            vec![song("1", "a", ""), song("2", "b", ""), song("3", "c", "")],
        ));
        vm.select_down(10);
        assert_eq!(vm.selected_index(), 2);

        vm.apply_update(StatusUpdate::new(None, vec![song("1", "a", "")]));
        assert_eq!(vm.selected_index(), 0);
        assert_eq!(vm.selected_song().unwrap().name, "a");

        vm.apply_update(StatusUpdate::default());
        assert!(vm.selected_song().is_none());
    }
}
