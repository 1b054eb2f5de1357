//! Track classes and exploration claims.

/// Role of the byte stream at an address.
///
/// The declaration order is the exploration priority: the engine always
/// services the smallest pending class first, so every channel is fully
/// explored before the voice table is looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrackClass {
    Header,
    DacInit,
    PcmInit,
    PwmInit,
    FmInit,
    PsgInit,
    DacTrack,
    PcmTrack,
    PwmTrack,
    FmTrack,
    PsgTrack,
    Voices,
    ExtVoices,
}

impl TrackClass {
    /// Rewrite a channel seed class to the class used while decoding.
    ///
    /// Classes that are not `*Init` are returned unchanged.
    pub fn to_track(self) -> Self {
        match self {
            TrackClass::DacInit => TrackClass::DacTrack,
            TrackClass::PcmInit => TrackClass::PcmTrack,
            TrackClass::PwmInit => TrackClass::PwmTrack,
            TrackClass::FmInit => TrackClass::FmTrack,
            TrackClass::PsgInit => TrackClass::PsgTrack,
            other => other,
        }
    }

    /// True for classes whose notes are sample indices rather than tones.
    pub fn plays_samples(self) -> bool {
        matches!(
            self.to_track(),
            TrackClass::DacTrack | TrackClass::PcmTrack | TrackClass::PwmTrack
        )
    }

    /// True for the two voice-table classes.
    pub fn is_voice_table(self) -> bool {
        matches!(self, TrackClass::Voices | TrackClass::ExtVoices)
    }
}

/// A unit of exploration work: decode the stream at `address` as `class`,
/// starting with key displacement `keydisp`.
///
/// The derived ordering compares `class` first and `address` second, which
/// is exactly the worklist priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocationClaim {
    pub class: TrackClass,
    pub address: usize,
    pub keydisp: i8,
}

impl LocationClaim {
    pub fn new(class: TrackClass, address: usize, keydisp: i8) -> Self {
        Self {
            class,
            address,
            keydisp,
        }
    }
}
