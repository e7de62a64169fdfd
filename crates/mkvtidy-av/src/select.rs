//! Partitioning tracks into selected and not-selected sets.
//!
//! A [`TrackSelection`] owns a copy of every track it has seen in an arena
//! keyed by kind and the tool's own track identifier. The two partitions are index sets over that arena,
//! so a track is always in exactly one of them and moving it never depends
//! on object identity.

use crate::probe::{MediaInfo, Parser, Track, TrackKind, TrackState};
use std::collections::{BTreeSet, HashMap};

/// Durable identity of a track within one parser's model.
///
/// Keyed by [`Track::source_id`] rather than the numeric id, which
/// mediainfo shares between a track and the streams embedded in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackKey {
    pub kind: TrackKind,
    pub source_id: String,
}

impl From<&Track> for TrackKey {
    fn from(track: &Track) -> Self {
        Self {
            kind: track.kind,
            source_id: track.source_id.clone(),
        }
    }
}

/// Two disjoint track aggregates built from one parser's [`MediaInfo`].
#[derive(Debug, Clone)]
pub struct TrackSelection {
    facts: MediaInfo,
    arena: Vec<Track>,
    slots: HashMap<TrackKey, usize>,
    selected: BTreeSet<usize>,
    not_selected: BTreeSet<usize>,
}

impl TrackSelection {
    /// Create an empty selection for tracks produced by `parser`.
    pub fn new(parser: Parser) -> Self {
        Self {
            facts: MediaInfo::new(parser),
            arena: Vec::new(),
            slots: HashMap::new(),
            selected: BTreeSet::new(),
            not_selected: BTreeSet::new(),
        }
    }

    /// Partition every track of `info` with a predicate.
    pub fn from_media_by(info: &MediaInfo, select: impl FnMut(&Track) -> bool) -> Self {
        let mut selection = Self::new(info.parser);
        selection.add_by(info, select);
        selection
    }

    /// Put every track of `info` into one partition.
    pub fn from_media(info: &MediaInfo, select: bool) -> Self {
        Self::from_media_by(info, |_| select)
    }

    /// Parser shared by both partitions.
    pub fn parser(&self) -> Parser {
        self.facts.parser
    }

    /// Add every track of `info` to the partition chosen by `select`.
    ///
    /// # Panics
    ///
    /// Panics if `info` was produced by a different parser; ids from
    /// different tools cannot share a selection.
    pub fn add_by(&mut self, info: &MediaInfo, mut select: impl FnMut(&Track) -> bool) {
        self.assert_parser(info, "add");
        self.absorb_facts(info);
        for track in info.tracks() {
            let chosen = select(track);
            self.place(track, chosen, true);
        }
    }

    /// Add every track of `info` to one partition.
    ///
    /// # Panics
    ///
    /// Panics if `info` was produced by a different parser.
    pub fn add(&mut self, info: &MediaInfo, select: bool) {
        self.add_by(info, |_| select);
    }

    /// Move one track to the partition chosen by `select`.
    ///
    /// A track that is not yet part of the selection is inserted.
    ///
    /// # Panics
    ///
    /// Panics if the track was not produced by this selection's parser.
    pub fn move_track(&mut self, track: &Track, select: bool) {
        self.move_track_by(track, |_| select);
    }

    /// Move one track to the partition chosen by a predicate.
    ///
    /// # Panics
    ///
    /// Panics if the track was not produced by this selection's parser.
    pub fn move_track_by(&mut self, track: &Track, mut select: impl FnMut(&Track) -> bool) {
        self.assert_track_parser(track);
        let chosen = select(track);
        self.place(track, chosen, false);
    }

    /// Move every track of `info` to the partition chosen by `select`.
    ///
    /// # Panics
    ///
    /// Panics if `info` was produced by a different parser.
    pub fn move_media(&mut self, info: &MediaInfo, select: bool) {
        self.move_media_by(info, |_| select);
    }

    /// Move every track of `info` to the partition chosen by a predicate.
    ///
    /// # Panics
    ///
    /// Panics if `info` was produced by a different parser.
    pub fn move_media_by(&mut self, info: &MediaInfo, mut select: impl FnMut(&Track) -> bool) {
        self.assert_parser(info, "move");
        for track in info.tracks() {
            let chosen = select(track);
            self.place(track, chosen, false);
        }
    }

    /// Assign `selected` to every selected track and `not_selected` to the rest.
    pub fn set_state(&mut self, selected: TrackState, not_selected: TrackState) {
        for &slot in &self.selected {
            self.arena[slot].state = selected;
        }
        for &slot in &self.not_selected {
            self.arena[slot].state = not_selected;
        }
    }

    /// Whether a track is selected, or `None` if it is not part of the selection.
    pub fn is_selected(&self, key: &TrackKey) -> Option<bool> {
        self.slots
            .get(key)
            .map(|slot| self.selected.contains(slot))
    }

    /// Number of tracks across both partitions.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether no tracks have been added.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// The selected partition as a [`MediaInfo`].
    pub fn selected(&self) -> MediaInfo {
        self.materialize(&self.selected)
    }

    /// The not-selected partition as a [`MediaInfo`].
    pub fn not_selected(&self) -> MediaInfo {
        self.materialize(&self.not_selected)
    }

    /// Log both partitions.
    pub fn log(&self, selected_prefix: &str, not_selected_prefix: &str) {
        self.selected().log(selected_prefix);
        self.not_selected().log(not_selected_prefix);
    }

    fn assert_parser(&self, info: &MediaInfo, operation: &str) {
        assert_eq!(
            info.parser,
            self.facts.parser,
            "cannot {} {} tracks into a {} selection",
            operation,
            info.parser,
            self.facts.parser
        );
    }

    fn assert_track_parser(&self, track: &Track) {
        assert!(
            track.parser == Some(self.facts.parser),
            "cannot move {} tracks into a {} selection",
            track.parser.map_or_else(|| "untagged".to_string(), |p| p.to_string()),
            self.facts.parser
        );
    }

    fn absorb_facts(&mut self, info: &MediaInfo) {
        self.facts.container = info.container.clone();
        self.facts.attachments = info.attachments;
        self.facts.chapters = info.chapters;
        self.facts.duration = info.duration;
        self.facts.has_tags = info.has_tags;
    }

    fn place(&mut self, track: &Track, select: bool, refresh: bool) {
        let key = TrackKey::from(track);
        let slot = match self.slots.get(&key) {
            Some(&slot) => {
                if refresh {
                    self.arena[slot] = track.clone();
                }
                slot
            }
            None => {
                if !refresh {
                    tracing::debug!(kind = %key.kind, id = %key.source_id, "Moving untracked track, inserting");
                }
                self.arena.push(track.clone());
                let slot = self.arena.len() - 1;
                self.slots.insert(key, slot);
                slot
            }
        };

        self.selected.remove(&slot);
        self.not_selected.remove(&slot);
        if select {
            self.selected.insert(slot);
        } else {
            self.not_selected.insert(slot);
        }
    }

    fn materialize(&self, slots: &BTreeSet<usize>) -> MediaInfo {
        let mut info = MediaInfo::new(self.facts.parser);
        info.container = self.facts.container.clone();
        info.attachments = self.facts.attachments;
        info.chapters = self.facts.chapters;
        info.duration = self.facts.duration;
        info.has_tags = self.facts.has_tags;
        for &slot in slots {
            info.push(self.arena[slot].clone());
        }
        info.has_errors = info.any_track_errors();
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(parser: Parser) -> MediaInfo {
        let mut info = MediaInfo::new(parser);
        info.container = "Matroska".to_string();
        info.push(Track::new(TrackKind::Video, "AVC", "V_MPEG4/ISO/AVC", 0));
        let mut eng = Track::new(TrackKind::Audio, "AC-3", "A_AC3", 1);
        eng.language = "eng".to_string();
        info.push(eng);
        let mut ger = Track::new(TrackKind::Audio, "DTS", "A_DTS", 2);
        ger.language = "ger".to_string();
        info.push(ger);
        let mut sub = Track::new(TrackKind::Subtitle, "SubRip/SRT", "S_TEXT/UTF8", 3);
        sub.language = "eng".to_string();
        info.push(sub);
        info
    }

    fn ids(info: &MediaInfo) -> Vec<u32> {
        info.tracks().map(|t| t.id).collect()
    }

    fn assert_partition(selection: &TrackSelection, source: &MediaInfo) {
        let selected = selection.selected();
        let not_selected = selection.not_selected();
        let contains = |info: &MediaInfo, track: &Track| {
            info.tracks_of(track.kind)
                .iter()
                .any(|t| t.source_id == track.source_id)
        };
        for track in source.tracks() {
            let in_selected = contains(&selected, track);
            let in_not_selected = contains(&not_selected, track);
            assert!(
                in_selected ^ in_not_selected,
                "track {} {} must be in exactly one partition",
                track.kind,
                track.source_id
            );
        }
        assert_eq!(selected.count() + not_selected.count(), selection.len());
    }

    #[test]
    fn test_add_by_predicate() {
        let info = media(Parser::MkvMerge);
        let selection = TrackSelection::from_media_by(&info, |t| {
            t.kind == TrackKind::Video || t.language == "eng"
        });

        assert_eq!(ids(&selection.selected()), vec![0, 1, 3]);
        assert_eq!(ids(&selection.not_selected()), vec![2]);
        assert_eq!(selection.selected().container, "Matroska");
        assert_eq!(selection.parser(), Parser::MkvMerge);
        assert_partition(&selection, &info);
    }

    #[test]
    fn test_add_boolean() {
        let info = media(Parser::FfProbe);
        let selection = TrackSelection::from_media(&info, false);
        assert!(selection.selected().is_empty());
        assert_eq!(selection.not_selected().count(), 4);
    }

    #[test]
    fn test_move_sequence_keeps_partition() {
        let info = media(Parser::MkvMerge);
        let mut selection = TrackSelection::from_media(&info, true);

        selection.move_track(&info.audio[1], false);
        selection.move_track(&info.audio[1], false);
        selection.move_media_by(&info, |t| t.kind != TrackKind::Subtitle);
        selection.move_track_by(&info.video[0], |_| false);
        selection.add(&info, true);
        selection.move_media(&info, false);
        selection.move_track(&info.subtitle[0], true);

        assert_partition(&selection, &info);
        assert_eq!(ids(&selection.selected()), vec![3]);
        assert_eq!(selection.len(), 4);
    }

    #[test]
    fn test_move_untracked_inserts() {
        let info = media(Parser::MkvMerge);
        let mut selection = TrackSelection::new(Parser::MkvMerge);
        assert!(selection.is_empty());

        selection.move_track(&info.audio[0], true);
        assert_eq!(selection.len(), 1);
        assert_eq!(
            selection.is_selected(&TrackKey::from(&info.audio[0])),
            Some(true)
        );
        assert_eq!(selection.is_selected(&TrackKey::from(&info.video[0])), None);
    }

    #[test]
    fn test_set_state() {
        let info = media(Parser::MkvMerge);
        let mut selection = TrackSelection::from_media_by(&info, |t| t.language != "ger");
        selection.set_state(TrackState::Keep, TrackState::Remove);

        assert!(selection
            .selected()
            .tracks()
            .all(|t| t.state == TrackState::Keep));
        assert!(selection
            .not_selected()
            .tracks()
            .all(|t| t.state == TrackState::Remove));

        // Moving keeps the decided state until it is assigned again
        selection.move_track(&info.audio[1], true);
        let moved = selection.selected();
        assert_eq!(moved.find(TrackKind::Audio, 2).map(|t| t.state), Some(TrackState::Remove));
    }

    #[test]
    fn test_same_id_different_kind_are_distinct() {
        let mut info = MediaInfo::new(Parser::MediaInfo);
        info.push(Track::new(TrackKind::Video, "AVC", "avc1", 1));
        info.push(Track::new(TrackKind::Subtitle, "EIA-608", "c608", 1));

        let selection = TrackSelection::from_media_by(&info, |t| t.kind == TrackKind::Video);
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.selected().video.len(), 1);
        assert_eq!(selection.not_selected().subtitle.len(), 1);
    }

    #[test]
    #[should_panic(expected = "cannot add ffprobe tracks into a mkvmerge selection")]
    fn test_add_mismatched_parser_panics() {
        let mut selection = TrackSelection::new(Parser::MkvMerge);
        selection.add(&media(Parser::FfProbe), true);
    }

    #[test]
    #[should_panic(expected = "cannot move mediainfo tracks into a mkvmerge selection")]
    fn test_move_mismatched_parser_panics() {
        let mut selection = TrackSelection::from_media(&media(Parser::MkvMerge), true);
        selection.move_media(&media(Parser::MediaInfo), false);
    }

    #[test]
    #[should_panic(expected = "cannot move ffprobe tracks into a mkvmerge selection")]
    fn test_move_foreign_track_panics() {
        let mut selection = TrackSelection::from_media(&media(Parser::MkvMerge), false);
        let foreign = media(Parser::FfProbe);
        selection.move_track(&foreign.audio[0], true);
    }

    #[test]
    #[should_panic(expected = "cannot move untagged tracks into a mkvmerge selection")]
    fn test_move_untagged_track_panics() {
        let mut selection = TrackSelection::new(Parser::MkvMerge);
        selection.move_track(&Track::new(TrackKind::Audio, "AC-3", "A_AC3", 1), true);
    }

    #[test]
    fn test_embedded_streams_sharing_an_id_stay_distinct() {
        let mut info = MediaInfo::new(Parser::MediaInfo);
        info.push(Track::new(TrackKind::Video, "AVC", "V_MPEG4/ISO/AVC", 1));
        for cc in ["1-CC1", "1-CC3"] {
            let mut caption = Track::new(TrackKind::Subtitle, "EIA-608", "c608", 1);
            caption.source_id = cc.to_string();
            info.push(caption);
        }

        let mut selection = TrackSelection::from_media(&info, true);
        assert_eq!(selection.len(), info.count());

        selection.move_track(&info.subtitle[1], false);
        assert_eq!(selection.selected().subtitle[0].source_id, "1-CC1");
        assert_eq!(selection.not_selected().subtitle[0].source_id, "1-CC3");
        assert_partition(&selection, &info);
    }
}
