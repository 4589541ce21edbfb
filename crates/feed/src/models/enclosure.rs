// ABOUTME: Media enclosures (audio, video, image attachments) of entries.
// ABOUTME: EnclosureCollection ranks enclosures by media class and per-class attributes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::mime::MimeType;
use crate::url::Url;

/// Represents a media enclosure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enclosure {
    pub url: Url,
    #[serde(rename = "type")]
    pub mime: Option<MimeType>,
    pub title: Option<String>,
    pub height: Option<u32>,
    pub width: Option<u32>,
    pub duration: Option<Duration>,
    /// Bits per second.
    pub bitrate: Option<u64>,
    /// Bytes.
    pub size: Option<u64>,
    /// Marked as the default rendition by the publisher.
    pub preferred: bool,
}

impl Enclosure {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            mime: None,
            title: None,
            height: None,
            width: None,
            duration: None,
            bitrate: None,
            size: None,
            preferred: false,
        }
    }

    /// `height × width`, when both are known.
    pub fn resolution(&self) -> Option<u64> {
        Some(u64::from(self.height?) * u64::from(self.width?))
    }

    fn media_class(&self) -> u8 {
        match self.mime.as_ref().map(MimeType::medium) {
            Some("video") => 3,
            Some("audio") => 2,
            Some("image") => 1,
            _ => 0,
        }
    }

    /// Ordering key: media class, then class-specific attributes, then the
    /// preferred flag. Missing attributes sort lowest.
    fn rank(&self) -> (u8, [Option<u64>; 4], bool) {
        let duration = self.duration.map(|d| d.as_micros() as u64);
        let attrs = match self.media_class() {
            3 => [duration, self.resolution(), self.bitrate, self.size],
            2 => [duration, self.bitrate, self.size, None],
            1 => [self.resolution(), self.size, None, None],
            _ => [self.size, None, None, None],
        };
        (self.media_class(), attrs, self.preferred)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnclosureCollection(Vec<Enclosure>);

impl EnclosureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, enclosure: Enclosure) {
        self.0.push(enclosure);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Enclosure> {
        self.0.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Enclosure> {
        self.0.iter_mut()
    }

    /// Best enclosure: video over audio over image over anything else;
    /// ties within a class go to the longest, largest, highest-bitrate
    /// rendition, then to the first inserted.
    pub fn primary(&self) -> Option<&Enclosure> {
        let mut best: Option<&Enclosure> = None;
        for enclosure in &self.0 {
            if best.map_or(true, |b| enclosure.rank() > b.rank()) {
                best = Some(enclosure);
            }
        }
        best
    }
}

impl FromIterator<Enclosure> for EnclosureCollection {
    fn from_iter<I: IntoIterator<Item = Enclosure>>(iter: I) -> Self {
        EnclosureCollection(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a EnclosureCollection {
    type Item = &'a Enclosure;
    type IntoIter = std::slice::Iter<'a, Enclosure>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enclosure(path: &str, mime: &str) -> Enclosure {
        Enclosure {
            mime: MimeType::parse(mime),
            ..Enclosure::new(Url::parse(&format!("https://cdn.example/{}", path)).unwrap())
        }
    }

    #[test]
    fn test_longer_video_wins() {
        let short = Enclosure {
            duration: Some(Duration::from_secs(100)),
            ..enclosure("short.mp4", "video/mp4")
        };
        let long = Enclosure {
            duration: Some(Duration::from_secs(200)),
            ..enclosure("long.mp4", "video/mp4")
        };
        let all: EnclosureCollection = vec![short, long].into_iter().collect();
        assert_eq!(all.primary().unwrap().url.path(), "/long.mp4");
    }

    #[test]
    fn test_video_beats_audio_regardless_of_attributes() {
        let audio = Enclosure {
            duration: Some(Duration::from_secs(9000)),
            bitrate: Some(320_000),
            size: Some(1 << 30),
            preferred: true,
            ..enclosure("a.mp3", "audio/mpeg")
        };
        let video = enclosure("v.mp4", "video/mp4");
        let all: EnclosureCollection = vec![audio, video].into_iter().collect();
        assert_eq!(all.primary().unwrap().url.path(), "/v.mp4");
    }

    #[test]
    fn test_video_resolution_breaks_duration_tie() {
        let sd = Enclosure {
            height: Some(480),
            width: Some(640),
            ..enclosure("sd.mp4", "video/mp4")
        };
        let hd = Enclosure {
            height: Some(1080),
            width: Some(1920),
            ..enclosure("hd.mp4", "video/mp4")
        };
        let all: EnclosureCollection = vec![sd, hd].into_iter().collect();
        assert_eq!(all.primary().unwrap().url.path(), "/hd.mp4");
    }

    #[test]
    fn test_image_by_resolution_then_size_and_unknown_lowest() {
        let sized = Enclosure {
            size: Some(10),
            ..enclosure("small.png", "image/png")
        };
        let big = Enclosure {
            height: Some(10),
            width: Some(10),
            ..enclosure("big.png", "image/png")
        };
        let all: EnclosureCollection = vec![sized, big].into_iter().collect();
        assert_eq!(all.primary().unwrap().url.path(), "/big.png");
    }

    #[test]
    fn test_ties_keep_first_and_empty_is_none() {
        let all: EnclosureCollection =
            vec![enclosure("1.mp3", "audio/mpeg"), enclosure("2.mp3", "audio/mpeg")]
                .into_iter()
                .collect();
        assert_eq!(all.primary().unwrap().url.path(), "/1.mp3");
        assert!(EnclosureCollection::new().primary().is_none());
    }
}
