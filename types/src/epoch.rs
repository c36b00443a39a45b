//! Account generation tags.

/// Generational marker on account and pending records. Accounts are promoted
/// from [`Epoch::Epoch0`] to [`Epoch::Epoch1`] by a signed epoch state block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Epoch {
    #[default]
    Epoch0,
    Epoch1,
}

impl Epoch {
    pub fn as_u8(self) -> u8 {
        match self {
            Epoch::Epoch0 => 0,
            Epoch::Epoch1 => 1,
        }
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Epoch::Epoch0),
            1 => Some(Epoch::Epoch1),
            _ => None,
        }
    }
}
