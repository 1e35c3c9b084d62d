use crate::atomic_cell::AtomicCellMember;

/// Status of a transfer channel.
///
/// `Finished` and `Error` are sticky: they stay until the caller resets the
/// channel to `Idle`.
#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransferState {
    #[default]
    Idle,
    InProgress,
    Finished,
    Error,
}

impl TransferState {
    #[inline]
    pub fn is_in_progress(self) -> bool {
        self == Self::InProgress
    }
}

impl AtomicCellMember for TransferState {
    #[inline]
    fn to_num(self) -> usize {
        match self {
            Self::Idle => 0,
            Self::InProgress => 1,
            Self::Finished => 2,
            Self::Error => 3,
        }
    }

    #[inline]
    fn from_num(value: usize) -> Self {
        match value {
            1 => Self::InProgress,
            2 => Self::Finished,
            3 => Self::Error,
            _ => Self::Idle,
        }
    }
}
