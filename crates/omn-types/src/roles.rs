use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::directory::{loose_role_key, normalize_house_key};

/// Whether a house is a sorority or a fraternity. Only fraternities host
/// calendar events and receive event requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseKind {
    Sorority,
    Fraternity,
}

/// Sub-category of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Member,
    SocialChair,
    /// Not scoped to a single house; authorized everywhere.
    Administrator,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unrecognized house: {0:?}")]
    UnknownHouse(String),
    #[error("unrecognized role: {0:?}")]
    UnknownRole(String),
}

macro_rules! houses {
    ($( $variant:ident => $key:literal, $kind:ident; )*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum House {
            $( $variant, )*
        }

        impl House {
            pub const ALL: &'static [House] = &[ $( House::$variant, )* ];

            /// Canonical key, e.g. `SIG_CHI`.
            pub fn key(self) -> &'static str {
                match self {
                    $( House::$variant => $key, )*
                }
            }

            pub fn kind(self) -> HouseKind {
                match self {
                    $( House::$variant => HouseKind::$kind, )*
                }
            }
        }
    };
}

houses! {
    Kkg => "KKG", Sorority;
    Aphi => "APHI", Sorority;
    Tridelt => "TRIDELT", Sorority;
    Dg => "DG", Sorority;
    Phisig => "PHISIG", Sorority;
    Axo => "AXO", Sorority;
    Aephi => "AEPHI", Sorority;
    Sdt => "SDT", Sorority;
    Axid => "AXID", Sorority;
    Theta => "THETA", Sorority;
    Agd => "AGD", Sorority;
    Dphie => "DPHIE", Sorority;
    ThetaChi => "THETA_CHI", Fraternity;
    Dke => "DKE", Fraternity;
    Du => "DU", Fraternity;
    Zbt => "ZBT", Fraternity;
    Aepi => "AEPI", Fraternity;
    Sae => "SAE", Fraternity;
    Pike => "PIKE", Fraternity;
    Sammy => "SAMMY", Fraternity;
    Tke => "TKE", Fraternity;
    PsiU => "PSI_U", Fraternity;
    SigChi => "SIG_CHI", Fraternity;
    Dtd => "DTD", Fraternity;
}

impl House {
    /// Exact lookup of an already-normalized key.
    pub fn from_key(key: &str) -> Option<House> {
        House::ALL.iter().copied().find(|h| h.key() == key)
    }

    pub fn is_fraternity(self) -> bool {
        self.kind() == HouseKind::Fraternity
    }

    /// Every role belonging to this house, in table order.
    pub fn roles(self) -> Vec<Role> {
        Role::ALL.iter().copied().filter(|r| r.house() == self).collect()
    }
}

impl fmt::Display for House {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Parses free text (`"sig chi"`, `"Psi-U"`) through house-key normalization.
impl FromStr for House {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize_house_key(s);
        House::from_key(key.as_str()).ok_or_else(|| ParseError::UnknownHouse(s.to_string()))
    }
}

impl Serialize for House {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for House {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

macro_rules! roles {
    ($( $variant:ident => $id:literal, $label:literal, $house:ident, $tier:ident; )*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Role {
            $( $variant, )*
        }

        impl Role {
            pub const ALL: &'static [Role] = &[ $( Role::$variant, )* ];

            /// Canonical identifier as stored on user records, e.g. `KKG_SOCIAL`.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Role::$variant => $id, )*
                }
            }

            /// Human-readable label, e.g. `KKG Social`.
            pub fn label(self) -> &'static str {
                match self {
                    $( Role::$variant => $label, )*
                }
            }

            pub fn house(self) -> House {
                match self {
                    $( Role::$variant => House::$house, )*
                }
            }

            pub fn tier(self) -> Tier {
                match self {
                    $( Role::$variant => Tier::$tier, )*
                }
            }
        }
    };
}

roles! {
    Brother => "BROTHER", "Brother", SigChi, Member;
    BluechSocial => "BLUECH_SOCIAL", "Bluech Social", SigChi, Administrator;
    Owner => "OWNER", "Owner", SigChi, Administrator;
    Neo => "NEO", "Neo", SigChi, Member;
    KkgSister => "KKG_SISTER", "KKG Sister", Kkg, Member;
    KkgSocial => "KKG_SOCIAL", "KKG Social", Kkg, SocialChair;
    AphiSister => "APHI_SISTER", "APhi Sister", Aphi, Member;
    AphiSocial => "APHI_SOCIAL", "APhi Social", Aphi, SocialChair;
    TrideltSister => "TRIDELT_SISTER", "TriDelt Sister", Tridelt, Member;
    TrideltSocial => "TRIDELT_SOCIAL", "TriDelt Social", Tridelt, SocialChair;
    DgSister => "DG_SISTER", "DG Sister", Dg, Member;
    DgSocial => "DG_SOCIAL", "DG Social", Dg, SocialChair;
    PhisigSister => "PHISIG_SISTER", "PhiSig Sister", Phisig, Member;
    PhisigSocial => "PHISIG_SOCIAL", "PhiSig Social", Phisig, SocialChair;
    AxoSister => "AXO_SISTER", "AXO Sister", Axo, Member;
    AxoSocial => "AXO_SOCIAL", "AXO Social", Axo, SocialChair;
    AephiSister => "AEPHI_SISTER", "AEPhi Sister", Aephi, Member;
    AephiSocial => "AEPHI_SOCIAL", "AEPhi Social", Aephi, SocialChair;
    SdtSister => "SDT_SISTER", "SDT Sister", Sdt, Member;
    SdtSocial => "SDT_SOCIAL", "SDT Social", Sdt, SocialChair;
    AxidSister => "AXID_SISTER", "AXID Sister", Axid, Member;
    AxidSocial => "AXID_SOCIAL", "AXID Social", Axid, SocialChair;
    ThetaSister => "THETA_SISTER", "Theta Sister", Theta, Member;
    ThetaSocial => "THETA_SOCIAL", "Theta Social", Theta, SocialChair;
    AgdSister => "AGD_SISTER", "AGD Sister", Agd, Member;
    AgdSocial => "AGD_SOCIAL", "AGD Social", Agd, SocialChair;
    DphieSister => "DPHIE_SISTER", "DphiE Sister", Dphie, Member;
    DphieSocial => "DPHIE_SOCIAL", "DphiE Social", Dphie, SocialChair;
    ThetaChiBrother => "THETA_CHI_BROTHER", "Theta Chi Brother", ThetaChi, Member;
    ThetaChiSocial => "THETA_CHI_SOCIAL", "Theta Chi Social", ThetaChi, SocialChair;
    DkeBrother => "DKE_BROTHER", "DKE Brother", Dke, Member;
    DkeSocial => "DKE_SOCIAL", "DKE Social", Dke, SocialChair;
    DuBrother => "DU_BROTHER", "DU Brother", Du, Member;
    DuSocial => "DU_SOCIAL", "DU Social", Du, SocialChair;
    ZbtBrother => "ZBT_BROTHER", "ZBT Brother", Zbt, Member;
    ZbtSocial => "ZBT_SOCIAL", "ZBT Social", Zbt, SocialChair;
    AepiBrother => "AEPI_BROTHER", "AEPI Brother", Aepi, Member;
    AepiSocial => "AEPI_SOCIAL", "AEPI Social", Aepi, SocialChair;
    SaeBrother => "SAE_BROTHER", "SAE Brother", Sae, Member;
    SaeSocial => "SAE_SOCIAL", "SAE Social", Sae, SocialChair;
    PikeBrother => "PIKE_BROTHER", "PIKE Brother", Pike, Member;
    PikeSocial => "PIKE_SOCIAL", "PIKE Social", Pike, SocialChair;
    SammyBrother => "SAMMY_BROTHER", "Sammy Brother", Sammy, Member;
    SammySocial => "SAMMY_SOCIAL", "Sammy Social", Sammy, SocialChair;
    TkeBrother => "TKE_BROTHER", "TKE Brother", Tke, Member;
    TkeSocial => "TKE_SOCIAL", "TKE Social", Tke, SocialChair;
    PsiUBrother => "PSI_U_BROTHER", "Psi U Brother", PsiU, Member;
    PsiUSocial => "PSI_U_SOCIAL", "Psi U Social", PsiU, SocialChair;
    DtdBrother => "DTD_BROTHER", "DTD Brother", Dtd, Member;
    DtdSocial => "DTD_SOCIAL", "DTD Social", Dtd, SocialChair;
}

impl Role {
    /// Resolves role text in any casing or separator style, so `"KKG Social"`,
    /// `"KKG_SOCIAL"` and `"kkg-social"` all name the same role.
    pub fn parse_loose(text: &str) -> Option<Role> {
        let wanted = loose_role_key(text);
        if wanted.is_empty() {
            return None;
        }
        Role::ALL
            .iter()
            .copied()
            .find(|r| loose_role_key(r.as_str()) == wanted)
    }

    pub fn is_administrator(self) -> bool {
        self.tier() == Tier::Administrator
    }

    pub fn is_social_chair(self) -> bool {
        self.tier() == Tier::SocialChair
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse_loose(s).ok_or_else(|| ParseError::UnknownRole(s.to_string()))
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
