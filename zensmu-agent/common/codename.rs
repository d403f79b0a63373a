// Processor codename and SMU interface version as reported by the driver

use serde::Serialize;

use crate::enum_with_data;

enum_with_data! {
    /// Silicon variant; the data is the id the ryzen_smu driver reports
    #[derive(Serialize)]
    pub enum Codename: u32 {
        Undefined => ("Undefined", 0),
        Colfax => ("Colfax", 1),
        Renoir => ("Renoir", 2),
        Picasso => ("Picasso", 3),
        Matisse => ("Matisse", 4),
        Threadripper => ("Threadripper", 5),
        CastlePeak => ("Castle Peak", 6),
        RavenRidge => ("Raven Ridge", 7),
        RavenRidge2 => ("Raven Ridge 2", 8),
        SummitRidge => ("Summit Ridge", 9),
        PinnacleRidge => ("Pinnacle Ridge", 10),
        Rembrandt => ("Rembrandt", 11),
        Vermeer => ("Vermeer", 12),
        VanGogh => ("Van Gogh", 13),
        Cezanne => ("Cezanne", 14),
        Milan => ("Milan", 15),
        Dali => ("Dali", 16),
        Lucienne => ("Lucienne", 17),
        Naples => ("Naples", 18),
        Chagall => ("Chagall", 19),
        Raphael => ("Raphael", 20),
        Phoenix => ("Phoenix", 21),
        StrixPoint => ("Strix Point", 22),
        GraniteRidge => ("Granite Ridge", 23),
        HawkPoint => ("Hawk Point", 24),
        StormPeak => ("Storm Peak", 25),
        StrixHalo => ("Strix Halo", 26),
        ShimadaPeak => ("Shimada Peak", 27),
    }
    impl driver_id -> u32
}

impl Codename {
    pub fn from_driver_id(id: u32) -> Self {
        Codename::all()
            .into_iter()
            .find(|codename| codename.driver_id() == id)
            .unwrap_or_else(|| {
                tracing::warn!("Unknown codename id {} reported by driver", id);
                Codename::Undefined
            })
    }
}

impl std::fmt::Display for Codename {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// MP1 command interface version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InterfaceVersion {
    V9,
    V10,
    V11,
    V12,
    V13,
    Unknown,
}

impl InterfaceVersion {
    /// The driver enumerates versions from 9 starting at zero
    pub fn from_driver_index(index: u32) -> Self {
        match index {
            0 => InterfaceVersion::V9,
            1 => InterfaceVersion::V10,
            2 => InterfaceVersion::V11,
            3 => InterfaceVersion::V12,
            4 => InterfaceVersion::V13,
            _ => InterfaceVersion::Unknown,
        }
    }

    /// Numeric version, `None` when unknown
    pub fn number(&self) -> Option<u32> {
        match self {
            InterfaceVersion::V9 => Some(9),
            InterfaceVersion::V10 => Some(10),
            InterfaceVersion::V11 => Some(11),
            InterfaceVersion::V12 => Some(12),
            InterfaceVersion::V13 => Some(13),
            InterfaceVersion::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codename_from_driver_id() {
        assert_eq!(Codename::from_driver_id(4), Codename::Matisse);
        assert_eq!(Codename::from_driver_id(23), Codename::GraniteRidge);
        assert_eq!(Codename::from_driver_id(999), Codename::Undefined);
        assert_eq!(Codename::Vermeer.to_string(), "Vermeer");
    }

    #[test]
    fn test_interface_version() {
        assert_eq!(InterfaceVersion::from_driver_index(2).number(), Some(11));
        assert_eq!(InterfaceVersion::from_driver_index(7), InterfaceVersion::Unknown);
        assert_eq!(InterfaceVersion::Unknown.number(), None);
    }
}
