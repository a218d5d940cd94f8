// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fixed lookup tables: blood groups and wilayas.
//!
//! Both types serialize as the display string stored in the `profiles`
//! table and parse case-insensitively, so legacy rows written as `o-`
//! still load.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a lookup value is not in its table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind}: {value:?}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

/// ABO/Rh blood group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BloodGroup {
    APos,
    ANeg,
    BPos,
    BNeg,
    AbPos,
    AbNeg,
    OPos,
    ONeg,
}

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::APos,
        BloodGroup::ANeg,
        BloodGroup::BPos,
        BloodGroup::BNeg,
        BloodGroup::AbPos,
        BloodGroup::AbNeg,
        BloodGroup::OPos,
        BloodGroup::ONeg,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BloodGroup::APos => "A+",
            BloodGroup::ANeg => "A-",
            BloodGroup::BPos => "B+",
            BloodGroup::BNeg => "B-",
            BloodGroup::AbPos => "AB+",
            BloodGroup::AbNeg => "AB-",
            BloodGroup::OPos => "O+",
            BloodGroup::ONeg => "O-",
        }
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodGroup {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept the typographic minus sign as well as ASCII hyphen.
        let normalized = s.trim().replace('\u{2212}', "-").to_ascii_uppercase();
        BloodGroup::ALL
            .into_iter()
            .find(|g| g.as_str() == normalized)
            .ok_or_else(|| UnknownValue {
                kind: "blood group",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for BloodGroup {
    type Error = UnknownValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BloodGroup> for String {
    fn from(value: BloodGroup) -> Self {
        value.as_str().to_string()
    }
}

macro_rules! wilayas {
    ($($code:literal => $variant:ident => $name:literal,)+) => {
        /// Algerian administrative region, numbered by its official code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum Wilaya {
            $($variant,)+
        }

        impl Wilaya {
            pub const ALL: &'static [Wilaya] = &[$(Wilaya::$variant,)+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Wilaya::$variant => $name,)+
                }
            }

            /// Official wilaya code (1-58).
            pub fn code(self) -> u8 {
                match self {
                    $(Wilaya::$variant => $code,)+
                }
            }
        }
    };
}

wilayas! {
    1 => Adrar => "Adrar",
    2 => Chlef => "Chlef",
    3 => Laghouat => "Laghouat",
    4 => OumElBouaghi => "Oum El Bouaghi",
    5 => Batna => "Batna",
    6 => Bejaia => "Bejaia",
    7 => Biskra => "Biskra",
    8 => Bechar => "Bechar",
    9 => Blida => "Blida",
    10 => Bouira => "Bouira",
    11 => Tamanrasset => "Tamanrasset",
    12 => Tebessa => "Tebessa",
    13 => Tlemcen => "Tlemcen",
    14 => Tiaret => "Tiaret",
    15 => TiziOuzou => "Tizi Ouzou",
    16 => Alger => "Alger",
    17 => Djelfa => "Djelfa",
    18 => Jijel => "Jijel",
    19 => Setif => "Setif",
    20 => Saida => "Saida",
    21 => Skikda => "Skikda",
    22 => SidiBelAbbes => "Sidi Bel Abbes",
    23 => Annaba => "Annaba",
    24 => Guelma => "Guelma",
    25 => Constantine => "Constantine",
    26 => Medea => "Medea",
    27 => Mostaganem => "Mostaganem",
    28 => MSila => "M'Sila",
    29 => Mascara => "Mascara",
    30 => Ouargla => "Ouargla",
    31 => Oran => "Oran",
    32 => ElBayadh => "El Bayadh",
    33 => Illizi => "Illizi",
    34 => BordjBouArreridj => "Bordj Bou Arreridj",
    35 => Boumerdes => "Boumerdes",
    36 => ElTarf => "El Tarf",
    37 => Tindouf => "Tindouf",
    38 => Tissemsilt => "Tissemsilt",
    39 => ElOued => "El Oued",
    40 => Khenchela => "Khenchela",
    41 => SoukAhras => "Souk Ahras",
    42 => Tipaza => "Tipaza",
    43 => Mila => "Mila",
    44 => AinDefla => "Ain Defla",
    45 => Naama => "Naama",
    46 => AinTemouchent => "Ain Temouchent",
    47 => Ghardaia => "Ghardaia",
    48 => Relizane => "Relizane",
    49 => Timimoun => "Timimoun",
    50 => BordjBadjiMokhtar => "Bordj Badji Mokhtar",
    51 => OuledDjellal => "Ouled Djellal",
    52 => BeniAbbes => "Beni Abbes",
    53 => InSalah => "In Salah",
    54 => InGuezzam => "In Guezzam",
    55 => Touggourt => "Touggourt",
    56 => Djanet => "Djanet",
    57 => ElMghair => "El M'Ghair",
    58 => ElMeniaa => "El Meniaa",
}

impl fmt::Display for Wilaya {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Wilaya {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Wilaya::ALL
            .iter()
            .copied()
            .find(|w| w.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownValue {
                kind: "wilaya",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for Wilaya {
    type Error = UnknownValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Wilaya> for String {
    fn from(value: Wilaya) -> Self {
        value.as_str().to_string()
    }
}
