use std::fmt;

/// Where a file state sits in its open/load pipeline. The `-ing` variants are only observed
/// while a hook is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum State {
    Closed = 0,
    Opening = 1,
    Opened = 2,
    Loading = 3,
    Loaded = 4,
    Unloading = 5,
    Closing = 6,
}

impl From<u8> for State {
    fn from(state: u8) -> Self {
        match state {
            0 => State::Closed,
            1 => State::Opening,
            2 => State::Opened,
            3 => State::Loading,
            4 => State::Loaded,
            5 => State::Unloading,
            6 => State::Closing,
            _ => unreachable!("invalid file state {state}"),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Closed => write!(f, "Closed"),
            State::Opening => write!(f, "Opening"),
            State::Opened => write!(f, "Opened"),
            State::Loading => write!(f, "Loading"),
            State::Loaded => write!(f, "Loaded"),
            State::Unloading => write!(f, "Unloading"),
            State::Closing => write!(f, "Closing"),
        }
    }
}
