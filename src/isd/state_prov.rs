use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// State/Province abbreviations as used in the ST column of the ISD station list.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr, EnumIter)]
pub enum StateProv {
    /// Alabama
    AL,
    /// Alaska
    AK,
    /// Arizona
    AZ,
    /// Arkansas
    AR,
    /// California
    CA,
    /// Colorado
    CO,
    /// Connecticut
    CT,
    /// Delaware
    DE,
    /// Florida
    FL,
    /// Georgia
    GA,
    /// Hawaii
    HI,
    /// Idaho
    ID,
    /// Illinois
    IL,
    /// Indiana
    IN,
    /// Iowa
    IA,
    /// Kansas
    KS,
    /// Kentucky
    KY,
    /// Louisiana
    LA,
    /// Maine
    ME,
    /// Maryland
    MD,
    /// Massachusetts
    MA,
    /// Michigan
    MI,
    /// Minnesota
    MN,
    /// Mississippi
    MS,
    /// Missouri
    MO,
    /// Montana
    MT,
    /// Nebraska
    NE,
    /// Nevada
    NV,
    /// New Hampshire
    NH,
    /// New Jersey
    NJ,
    /// New Mexico
    NM,
    /// New York
    NY,
    /// North Carolina
    NC,
    /// North Dakota
    ND,
    /// Ohio
    OH,
    /// Oklahoma
    OK,
    /// Oregon
    OR,
    /// Pennsylvania
    PA,
    /// Rhode Island
    RI,
    /// South Carolina
    SC,
    /// South Dakota
    SD,
    /// Tennessee
    TN,
    /// Texas
    TX,
    /// Utah
    UT,
    /// Vermont
    VT,
    /// Virginia
    VA,
    /// Washington
    WA,
    /// West Virginia
    WV,
    /// Wisconsin
    WI,
    /// Wyoming
    WY,
    // US commonwealth and territories
    /// American Samoa
    AS,
    /// District of Columbia
    DC,
    /// Federated States of Micronesia
    FM,
    /// Guam
    GU,
    /// Marshall Islands
    MH,
    /// Northern Mariana Islands
    MP,
    /// Palau
    PW,
    /// Puerto Rico
    PR,
    /// Virgin Islands
    VI,
    // Canada
    /// Alberta
    AB,
    /// British Columbia
    BC,
    /// Manitoba
    MB,
    /// New Brunswick
    NB,
    /// Newfoundland and Labrador
    NL,
    /// Nova Scotia
    NS,
    /// Northwest Territories
    NT,
    /// Nunavut
    NU,
    /// Ontario
    ON,
    /// Prince Edward Island
    PE,
    /// Quebec
    QC,
    /// Saskatchewan
    SK,
    /// Yukon
    YT,
}

/// The states considered by default: New England and New York.
pub const NEW_ENGLAND_AND_NY: [StateProv; 7] = [
    StateProv::RI,
    StateProv::MA,
    StateProv::VT,
    StateProv::NH,
    StateProv::ME,
    StateProv::CT,
    StateProv::NY,
];

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_to_string_for_state_prov() {
        assert_eq!(<&str>::from(StateProv::RI), "RI");
        assert_eq!(<&str>::from(StateProv::QC), "QC");
    }

    #[test]
    fn test_from_string_for_state_prov() {
        assert_eq!(StateProv::from_str("NH").unwrap(), StateProv::NH);
        assert!(StateProv::from_str("XX").is_err());
    }

    #[test]
    fn round_trip_strings_for_state_prov() {
        for state_prov in StateProv::iter() {
            assert_eq!(
                StateProv::from_str(state_prov.into()).unwrap(),
                state_prov
            );
        }
    }
}
