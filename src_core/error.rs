use core::fmt;

/// Pass-wide error code shared by every worker of a spreading pass.
///
/// Workers only ever merge codes into the shared flag with a
/// worst-code-wins rule; the orchestrator reads the merged value once,
/// after the pass completes.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u32)]
pub enum SpreadErrorCode {
    /// The pass completed without incident.
    None = 0,
    /// At least one particle mapped outside the local grid region.
    OutOfDomain = 1,
    /// At least one cell received more particles than its capacity.
    CellOverflow = 2,
}

impl SpreadErrorCode {
    /// Recovers a code from the raw flag value. Unknown values collapse to
    /// the most severe known code.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::OutOfDomain,
            _ => Self::CellOverflow,
        }
    }

    pub fn to_raw(self) -> u32 {
        self as u32
    }

    /// Worst-code-wins merge of two observations.
    pub fn merge(self, other: Self) -> Self {
        self.max(other)
    }

    pub fn is_ok(self) -> bool {
        self == Self::None
    }
}

impl fmt::Display for SpreadErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::None => write!(f, "no error"),
            Self::OutOfDomain => write!(f, "particle mapped outside the local grid region"),
            Self::CellOverflow => write!(f, "cell atom list capacity exceeded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_the_worst_code() {
        use SpreadErrorCode::*;
        assert_eq!(None.merge(OutOfDomain), OutOfDomain);
        assert_eq!(OutOfDomain.merge(CellOverflow), CellOverflow);
        assert_eq!(CellOverflow.merge(None), CellOverflow);
        assert_eq!(None.merge(None), None);
    }

    #[test]
    fn raw_round_trip() {
        for code in [
            SpreadErrorCode::None,
            SpreadErrorCode::OutOfDomain,
            SpreadErrorCode::CellOverflow,
        ] {
            assert_eq!(SpreadErrorCode::from_raw(code.to_raw()), code);
        }
    }
}
