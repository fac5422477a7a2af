use std::fmt;

/// Battery level band, shared by the alert policy and the tray icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Red,
    Orange,
    Yellow,
    Green,
}

impl Tier {
    /// `>=75` Green, `50..75` Yellow, `30..50` Orange, `<30` Red.
    pub fn from_percentage(percentage: u8) -> Self {
        match percentage {
            75.. => Tier::Green,
            50..=74 => Tier::Yellow,
            30..=49 => Tier::Orange,
            _ => Tier::Red,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Red => "red",
            Tier::Orange => "orange",
            Tier::Yellow => "yellow",
            Tier::Green => "green",
        };
        f.write_str(name)
    }
}
