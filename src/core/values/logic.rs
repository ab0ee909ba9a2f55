use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Not;

/// Nine-valued standard logic, as used by HDL `std_logic` signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Logic {
    /// Uninitialized
    U,
    /// Forcing unknown
    X,
    /// Forcing 0
    Zero,
    /// Forcing 1
    One,
    /// High impedance
    Z,
    /// Weak unknown
    W,
    /// Weak 0
    L,
    /// Weak 1
    H,
    /// Don't care
    DontCare,
}

/// Single-bit value as written in a VCD value-change record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcdBit {
    Zero,
    One,
    X,
    Z,
}

impl Logic {
    pub const ALL: [Logic; 9] = [
        Logic::U,
        Logic::X,
        Logic::Zero,
        Logic::One,
        Logic::Z,
        Logic::W,
        Logic::L,
        Logic::H,
        Logic::DontCare,
    ];

    /// Forcing or weak 0
    pub fn is_low(self) -> bool {
        matches!(self, Logic::Zero | Logic::L)
    }

    /// Forcing or weak 1
    pub fn is_high(self) -> bool {
        matches!(self, Logic::One | Logic::H)
    }

    pub fn as_char(self) -> char {
        match self {
            Logic::U => 'U',
            Logic::X => 'X',
            Logic::Zero => '0',
            Logic::One => '1',
            Logic::Z => 'Z',
            Logic::W => 'W',
            Logic::L => 'L',
            Logic::H => 'H',
            Logic::DontCare => '-',
        }
    }

    pub fn to_vcd_bit(self) -> VcdBit {
        if self.is_high() {
            VcdBit::One
        } else if self.is_low() {
            VcdBit::Zero
        } else if self == Logic::Z {
            VcdBit::Z
        } else {
            VcdBit::X
        }
    }
}

impl Not for Logic {
    type Output = Logic;

    fn not(self) -> Logic {
        match self {
            Logic::Zero => Logic::One,
            Logic::One => Logic::Zero,
            Logic::L => Logic::H,
            Logic::H => Logic::L,
            _ => Logic::X,
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl TryFrom<char> for Logic {
    type Error = char;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        Logic::ALL
            .iter()
            .copied()
            .find(|l| l.as_char() == c.to_ascii_uppercase())
            .ok_or(c)
    }
}

impl VcdBit {
    pub fn as_char(self) -> char {
        match self {
            VcdBit::Zero => '0',
            VcdBit::One => '1',
            VcdBit::X => 'x',
            VcdBit::Z => 'z',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(VcdBit::Zero),
            '1' => Some(VcdBit::One),
            'x' | 'X' => Some(VcdBit::X),
            'z' | 'Z' => Some(VcdBit::Z),
            _ => None,
        }
    }
}
