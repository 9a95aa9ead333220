//! System states and the indicator derivation table.

/// Current mode of the device. Exactly one value at a time. Informational
/// states persist until the next trigger; none is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SystemState {
    Init,
    Normal,
    Mounting,
    Unmounting,
    Reading,
    Listing,
    CaptureStarting,
    CaptureStopping,
    Error,
    Help,
    FreeSpace,
    Format,
}

/// Tri-color lamp; each channel is independently on/off.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Lamp {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
}

impl Lamp {
    pub const OFF: Lamp = Lamp::rgb(false, false, false);

    pub const fn rgb(red: bool, green: bool, blue: bool) -> Self {
        Self { red, green, blue }
    }
}

/// Audible cadence classes. The beep pattern is data so the outer loop owns
/// the buzzer timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Chime {
    /// Two short beeps, quick.
    MountDone,
    /// Two short beeps.
    UnmountDone,
    /// One long beep.
    CaptureStart,
    /// Short beep then long beep.
    CaptureStop,
    /// Three short beeps.
    Read,
    /// Three long beeps.
    Fault,
}

impl Chime {
    /// Beep durations in milliseconds, played with a fixed gap between them.
    pub fn pattern(&self) -> &'static [u16] {
        match self {
            Chime::MountDone => &[100, 100],
            Chime::UnmountDone => &[200, 200],
            Chime::CaptureStart => &[300],
            Chime::CaptureStop => &[100, 300],
            Chime::Read => &[100, 100, 100],
            Chime::Fault => &[300, 300, 300],
        }
    }
}

/// Indicator update derived on entry into a state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndicatorUpdate {
    /// New lamp color; `None` leaves the lamp as it was.
    pub lamp: Option<Lamp>,
    pub chime: Option<Chime>,
}

/// Lamp color and chime class are a pure function of the state being
/// entered. States not in the table change nothing.
pub fn indicators_for(state: SystemState) -> Option<IndicatorUpdate> {
    use SystemState::*;

    let update = match state {
        Init => IndicatorUpdate {
            lamp: Some(Lamp::rgb(true, true, false)),
            chime: Some(Chime::UnmountDone),
        },
        Normal => IndicatorUpdate {
            lamp: Some(Lamp::rgb(true, true, true)),
            chime: None,
        },
        Mounting => IndicatorUpdate {
            lamp: None,
            chime: Some(Chime::MountDone),
        },
        Unmounting => IndicatorUpdate {
            lamp: None,
            chime: Some(Chime::UnmountDone),
        },
        Reading | Listing => IndicatorUpdate {
            lamp: Some(Lamp::rgb(false, false, true)),
            chime: Some(Chime::Read),
        },
        CaptureStarting => IndicatorUpdate {
            lamp: Some(Lamp::rgb(true, false, true)),
            chime: Some(Chime::CaptureStart),
        },
        CaptureStopping => IndicatorUpdate {
            lamp: Some(Lamp::rgb(false, true, false)),
            chime: Some(Chime::CaptureStop),
        },
        Error => IndicatorUpdate {
            lamp: Some(Lamp::rgb(true, false, false)),
            chime: Some(Chime::Fault),
        },
        Help | FreeSpace | Format => return None,
    };
    Some(update)
}
